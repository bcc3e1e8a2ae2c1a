//! # Keyboard Navigation
//!
//! Maps key events onto editor commands over the flattened layer list.
//!
//! | Key                 | Effect                                          |
//! |---------------------|-------------------------------------------------|
//! | ↑ / ↓               | move focus; replace selection, reset anchor     |
//! | Shift + ↑ / ↓       | move focus; select anchor..focus                |
//! | Home / End          | same as arrows, jumping to first / last         |
//! | Tab / Shift + Tab   | move focus only, wrapping                       |
//! | Enter               | edit callback on the focused block              |
//! | Space               | toggle focused block in the selection           |
//! | Escape              | clear selection, anchor = focus                 |
//! | Delete / Backspace  | delete selection, then refocus a neighbour      |
//! | Mod + D             | duplicate selection                             |
//! | Mod + A             | select all                                      |
//!
//! Events targeting a text input are ignored.

use crate::block::BlockId;
use crate::editor::{Editor, SelectMode};
use crate::mutations;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    Home,
    End,
    Tab,
    Enter,
    Space,
    Escape,
    Delete,
    Backspace,
    /// A printable character (used with the modifier: `d`, `a`)
    Char(char),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown key: {0}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    /// Accepts DOM `KeyboardEvent.key` names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "Home" => Key::Home,
            "End" => Key::End,
            "Tab" => Key::Tab,
            "Enter" => Key::Enter,
            " " | "Space" | "Spacebar" => Key::Space,
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => return Err(UnknownKey(other.to_string())),
                }
            }
        };
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Element that had native focus when the key was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyTarget {
    #[default]
    Canvas,
    TextInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
    /// Ctrl on Linux/Windows, Cmd on macOS
    #[serde(default)]
    pub modifier: bool,
    #[serde(default)]
    pub target: KeyTarget,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            shift: false,
            modifier: false,
            target: KeyTarget::Canvas,
        }
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn modifier(mut self) -> Self {
        self.modifier = true;
        self
    }

    pub fn in_text_input(mut self) -> Self {
        self.target = KeyTarget::TextInput;
        self
    }
}

/// Callback for Enter on the focused block
pub type EditHandler = Box<dyn FnMut(&BlockId) + Send>;

/// Keyboard state that outlives single events: the range anchor and the
/// edit callback. Focus itself lives on the editor.
#[derive(Default)]
pub struct KeyboardNavigator {
    anchor: Option<BlockId>,
    on_edit: Option<EditHandler>,
}

impl fmt::Debug for KeyboardNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardNavigator")
            .field("anchor", &self.anchor)
            .field("on_edit", &self.on_edit.is_some())
            .finish()
    }
}

impl KeyboardNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edit_handler(mut self, handler: impl FnMut(&BlockId) + Send + 'static) -> Self {
        self.on_edit = Some(Box::new(handler));
        self
    }

    pub fn anchor(&self) -> Option<&BlockId> {
        self.anchor.as_ref()
    }

    /// Handle one key event. Returns true if the event was consumed.
    pub fn handle_key(&mut self, editor: &mut Editor, event: &KeyEvent) -> bool {
        if event.target == KeyTarget::TextInput {
            return false;
        }

        let flat = editor.flattened_ids();
        if flat.is_empty() {
            return false;
        }
        if let Some(anchor) = &self.anchor {
            if !flat.contains(anchor) {
                self.anchor = None;
            }
        }

        trace!(key = %event.key, shift = event.shift, modifier = event.modifier, "Key event");

        if event.modifier {
            return match event.key {
                Key::Char('d') => self.duplicate(editor),
                Key::Char('a') => {
                    editor.select_all();
                    self.anchor = flat.first().cloned();
                    true
                }
                _ => false,
            };
        }

        let position = editor
            .focused_id()
            .and_then(|id| flat.iter().position(|f| f == id));

        let is_navigation = matches!(
            event.key,
            Key::ArrowUp | Key::ArrowDown | Key::Home | Key::End | Key::Tab
        );
        if is_navigation && position.is_none() {
            // First navigation key only places the cursor
            let first = flat[0].clone();
            editor.set_focus(Some(first.clone()));
            self.anchor = Some(first);
            return true;
        }

        let last = flat.len() - 1;
        match (event.key, position) {
            (Key::ArrowUp, Some(pos)) => {
                self.move_focus(editor, &flat, pos.saturating_sub(1), event.shift)
            }
            (Key::ArrowDown, Some(pos)) => {
                self.move_focus(editor, &flat, (pos + 1).min(last), event.shift)
            }
            (Key::Home, Some(_)) => self.move_focus(editor, &flat, 0, event.shift),
            (Key::End, Some(_)) => self.move_focus(editor, &flat, last, event.shift),
            (Key::Tab, Some(pos)) => {
                let next = if event.shift {
                    if pos == 0 {
                        last
                    } else {
                        pos - 1
                    }
                } else if pos == last {
                    0
                } else {
                    pos + 1
                };
                editor.set_focus(Some(flat[next].clone()))
            }
            (Key::Enter, Some(pos)) => match &mut self.on_edit {
                Some(handler) => {
                    handler(&flat[pos]);
                    true
                }
                None => false,
            },
            (Key::Space, Some(pos)) => {
                let id = flat[pos].clone();
                editor.select_block(&id, SelectMode::Toggle);
                if editor.is_selected(&id) {
                    self.anchor = Some(id);
                }
                true
            }
            (Key::Escape, _) => {
                editor.clear_selection();
                self.anchor = editor.focused_id().cloned();
                true
            }
            (Key::Delete | Key::Backspace, _) => self.delete(editor, &flat, position),
            _ => false,
        }
    }

    fn move_focus(
        &mut self,
        editor: &mut Editor,
        flat: &[BlockId],
        target: usize,
        extend: bool,
    ) -> bool {
        let id = flat[target].clone();
        editor.set_focus(Some(id.clone()));

        if extend {
            let anchor = self
                .anchor
                .clone()
                .filter(|anchor| flat.contains(anchor))
                .unwrap_or_else(|| id.clone());
            editor.set_range_selection(&anchor, &id);
            self.anchor = Some(anchor);
        } else {
            editor.select_block(&id, SelectMode::Replace);
            self.anchor = Some(id);
        }
        true
    }

    fn duplicate(&mut self, editor: &mut Editor) -> bool {
        if editor.selection().is_empty() {
            return false;
        }
        !editor.bulk_duplicate().is_empty()
    }

    /// Delete the selection and move focus to the nearest surviving block
    fn delete(&mut self, editor: &mut Editor, flat: &[BlockId], position: Option<usize>) -> bool {
        if editor.selection().is_empty() {
            return false;
        }

        let doomed = |id: &BlockId| {
            editor.selected_block_ids().iter().any(|selected| {
                selected == id || mutations::is_descendant(editor.blocks(), selected, id)
            })
        };
        let pivot = position.unwrap_or(0);
        let next_focus = flat[pivot..]
            .iter()
            .skip(1)
            .find(|id| !doomed(*id))
            .or_else(|| flat[..pivot].iter().rev().find(|id| !doomed(*id)))
            .cloned();

        if !editor.bulk_delete() {
            return false;
        }

        // Locked blocks survive a bulk delete
        let next_focus = next_focus.filter(|id| editor.contains(id));
        editor.set_focus(next_focus.clone());
        self.anchor = next_focus;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockType};
    use crate::config::EditorConfig;
    use std::sync::{Arc, Mutex};

    fn text(id: &str) -> Block {
        Block::new(BlockType::Text, "default").with_id(id)
    }

    fn editor() -> Editor {
        Editor::with_blocks(
            vec![
                text("a"),
                Block::new(BlockType::Section, "default")
                    .with_id("s")
                    .with_children(vec![text("x"), text("y")]),
                text("b"),
            ],
            &EditorConfig::default(),
        )
    }

    fn press(nav: &mut KeyboardNavigator, editor: &mut Editor, event: KeyEvent) -> bool {
        nav.handle_key(editor, &event)
    }

    fn selected(editor: &Editor) -> Vec<&str> {
        editor.selected_block_ids().iter().map(|id| id.as_str()).collect()
    }

    fn focused(editor: &Editor) -> Option<&str> {
        editor.focused_id().map(|id| id.as_str())
    }

    #[test]
    fn test_parse_dom_key_names() {
        assert_eq!("ArrowDown".parse::<Key>().unwrap(), Key::ArrowDown);
        assert_eq!(" ".parse::<Key>().unwrap(), Key::Space);
        assert_eq!("D".parse::<Key>().unwrap(), Key::Char('d'));
        assert!("F13".parse::<Key>().is_err());
    }

    #[test]
    fn test_first_navigation_snaps_to_first_block() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();

        assert!(press(&mut nav, &mut editor, KeyEvent::new(Key::End)));
        assert_eq!(focused(&editor), Some("a"));
        assert_eq!(nav.anchor().map(|id| id.as_str()), Some("a"));
        assert!(selected(&editor).is_empty());
    }

    #[test]
    fn test_arrows_walk_flattened_list() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown));

        for expected in ["s", "x", "y", "b", "b"] {
            press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown));
            assert_eq!(focused(&editor), Some(expected));
            assert_eq!(selected(&editor), vec![expected]);
        }

        press(&mut nav, &mut editor, KeyEvent::new(Key::Home));
        assert_eq!(focused(&editor), Some("a"));
        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowUp));
        assert_eq!(focused(&editor), Some("a"));
    }

    #[test]
    fn test_shift_extends_from_anchor() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        editor.set_focus(Some("s".into()));
        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown));
        assert_eq!(focused(&editor), Some("x"));

        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown).shift());
        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown).shift());
        assert_eq!(selected(&editor), vec!["x", "y", "b"]);
        assert_eq!(nav.anchor().map(|id| id.as_str()), Some("x"));

        press(&mut nav, &mut editor, KeyEvent::new(Key::Home).shift());
        assert_eq!(selected(&editor), vec!["a", "s", "x"]);
        assert_eq!(editor.selected_block_id().map(|id| id.as_str()), Some("a"));
    }

    #[test]
    fn test_shift_extension_pulls_in_whole_groups() {
        let grouped = || {
            let mut editor = editor();
            editor.set_selection(vec!["x".into(), "y".into()]);
            assert!(editor.group_selected_blocks().is_some());
            editor.clear_selection();
            editor
        };
        let mut pointer = grouped();
        let mut editor = grouped();

        let mut nav = KeyboardNavigator::new();
        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown));
        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown).shift());
        assert_eq!(selected(&editor), vec!["a", "s"]);

        press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown).shift());
        assert_eq!(focused(&editor), Some("x"));
        assert_eq!(selected(&editor), vec!["a", "s", "x", "y"]);
        assert_eq!(editor.selected_block_id().map(|id| id.as_str()), Some("x"));

        // Same result as a pointer range selection
        pointer.select_range(&"a".into(), &"x".into());
        assert_eq!(selected(&pointer), selected(&editor));
    }

    #[test]
    fn test_tab_moves_focus_only_and_wraps() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        editor.set_focus(Some("b".into()));
        editor.select_block(&"a".into(), SelectMode::Replace);

        press(&mut nav, &mut editor, KeyEvent::new(Key::Tab));
        assert_eq!(focused(&editor), Some("a"));
        press(&mut nav, &mut editor, KeyEvent::new(Key::Tab).shift());
        assert_eq!(focused(&editor), Some("b"));
        assert_eq!(selected(&editor), vec!["a"]);
    }

    #[test]
    fn test_enter_invokes_edit_handler() {
        let edited = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&edited);
        let mut nav = KeyboardNavigator::new()
            .with_edit_handler(move |id| sink.lock().unwrap().push(id.clone()));
        let mut editor = editor();

        assert!(!press(&mut nav, &mut editor, KeyEvent::new(Key::Enter)));
        editor.set_focus(Some("x".into()));
        assert!(press(&mut nav, &mut editor, KeyEvent::new(Key::Enter)));
        assert_eq!(edited.lock().unwrap().as_slice(), &[BlockId::from("x")]);
    }

    #[test]
    fn test_space_toggles_and_sets_anchor_on_add() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        editor.set_focus(Some("y".into()));

        press(&mut nav, &mut editor, KeyEvent::new(Key::Space));
        assert_eq!(selected(&editor), vec!["y"]);
        assert_eq!(nav.anchor().map(|id| id.as_str()), Some("y"));

        editor.set_focus(Some("b".into()));
        press(&mut nav, &mut editor, KeyEvent::new(Key::Space));
        press(&mut nav, &mut editor, KeyEvent::new(Key::Space));
        assert_eq!(selected(&editor), vec!["y"]);
        assert_eq!(nav.anchor().map(|id| id.as_str()), Some("b"));
    }

    #[test]
    fn test_escape_clears_selection_keeps_focus() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        editor.set_focus(Some("x".into()));
        editor.select_all();

        assert!(press(&mut nav, &mut editor, KeyEvent::new(Key::Escape)));
        assert!(selected(&editor).is_empty());
        assert_eq!(focused(&editor), Some("x"));
        assert_eq!(nav.anchor().map(|id| id.as_str()), Some("x"));
    }

    #[test]
    fn test_delete_refocuses_next_survivor() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        editor.set_focus(Some("s".into()));
        editor.select_block(&"s".into(), SelectMode::Replace);

        assert!(press(&mut nav, &mut editor, KeyEvent::new(Key::Delete)));
        // Children of the deleted section are skipped
        assert_eq!(focused(&editor), Some("b"));
        assert_eq!(editor.flattened_ids().len(), 2);
        assert!(selected(&editor).is_empty());
    }

    #[test]
    fn test_delete_last_falls_back_to_previous() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        editor.set_focus(Some("b".into()));
        editor.select_block(&"b".into(), SelectMode::Replace);

        assert!(press(&mut nav, &mut editor, KeyEvent::new(Key::Backspace)));
        assert_eq!(focused(&editor), Some("y"));
    }

    #[test]
    fn test_delete_without_selection_is_ignored() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        assert!(!press(&mut nav, &mut editor, KeyEvent::new(Key::Delete)));
        assert_eq!(editor.flattened_ids().len(), 5);
    }

    #[test]
    fn test_modifier_shortcuts() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();

        assert!(!press(&mut nav, &mut editor, KeyEvent::new(Key::Char('d')).modifier()));

        assert!(press(&mut nav, &mut editor, KeyEvent::new(Key::Char('a')).modifier()));
        assert_eq!(editor.selection().len(), 5);
        assert_eq!(nav.anchor().map(|id| id.as_str()), Some("a"));

        editor.select_block(&"a".into(), SelectMode::Replace);
        assert!(press(&mut nav, &mut editor, KeyEvent::new(Key::Char('d')).modifier()));
        assert_eq!(editor.blocks().len(), 4);
    }

    #[test]
    fn test_text_input_events_are_ignored() {
        let mut editor = editor();
        let mut nav = KeyboardNavigator::new();
        editor.select_all();

        assert!(!press(&mut nav, &mut editor, KeyEvent::new(Key::Delete).in_text_input()));
        assert!(!press(&mut nav, &mut editor, KeyEvent::new(Key::ArrowDown).in_text_input()));
        assert_eq!(editor.flattened_ids().len(), 5);
        assert_eq!(editor.focused_id(), None);
    }
}
