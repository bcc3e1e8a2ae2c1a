//! Operations over the whole selection

use super::{duplicate_in, Editor};
use crate::block::{Block, BlockId};
use crate::mutations::{self, MutationError};
use tracing::debug;

impl Editor {
    /// Selected ids that still exist, in flattened document order, without
    /// blocks whose ancestor is also selected
    fn selected_roots(&self) -> Vec<BlockId> {
        let selected = self.selection.ids();
        mutations::flatten(&self.blocks)
            .into_iter()
            .filter(|b| selected.contains(&b.id))
            .filter(|b| {
                !selected.iter().any(|other| {
                    other != &b.id && mutations::is_descendant(&self.blocks, other, &b.id)
                })
            })
            .map(|b| b.id.clone())
            .collect()
    }

    /// Majority vote: if more than half the selection is visible, hide all;
    /// otherwise show all
    pub fn bulk_toggle_visibility(&mut self) -> bool {
        self.bulk_toggle_flag("bulk_toggle_visibility", |b| &mut b.visible)
    }

    /// Same majority rule as visibility, over the `locked` flag
    pub fn bulk_toggle_lock(&mut self) -> bool {
        self.bulk_toggle_flag("bulk_toggle_lock", |b| &mut b.locked)
    }

    fn bulk_toggle_flag(
        &mut self,
        action: &'static str,
        flag: impl Fn(&mut Block) -> &mut bool,
    ) -> bool {
        let ids = self.selection.ids().to_vec();
        self.transact(action, |forest| {
            let mut on = 0;
            let mut total = 0;
            for id in &ids {
                if let Some(block) = mutations::find_mut(forest, id) {
                    total += 1;
                    if *flag(block) {
                        on += 1;
                    }
                }
            }
            if total == 0 {
                return Err(MutationError::InsufficientSelection { required: 1, found: 0 });
            }

            let target = on * 2 <= total;
            for id in &ids {
                if let Some(block) = mutations::find_mut(forest, id) {
                    *flag(block) = target;
                }
            }
            Ok(())
        })
        .is_some()
    }

    /// Duplicate every selected block in document order, then select only
    /// the copies
    pub fn bulk_duplicate(&mut self) -> Vec<BlockId> {
        let roots = self.selected_roots();
        let copies = self.transact("bulk_duplicate", |forest| {
            if roots.is_empty() {
                return Err(MutationError::InsufficientSelection { required: 1, found: 0 });
            }
            roots
                .iter()
                .map(|id| duplicate_in(forest, id))
                .collect::<Result<Vec<_>, _>>()
        });

        match copies {
            Some(copies) => {
                self.selection.set(copies.clone());
                copies
            }
            None => Vec::new(),
        }
    }

    /// Delete every selected unlocked block (with descendants), then clear
    /// the selection. Locked blocks are skipped.
    pub fn bulk_delete(&mut self) -> bool {
        let roots = self.selected_roots();
        let removed = self.transact("bulk_delete", |forest| {
            let mut removed = 0;
            // Deepest-last first so earlier positions stay valid
            for id in roots.iter().rev() {
                let locked = mutations::find(forest, id).map(|b| b.locked).unwrap_or(true);
                if locked {
                    debug!(%id, "Skipping locked block in bulk delete");
                    continue;
                }
                if mutations::take(forest, id).is_some() {
                    removed += 1;
                }
            }
            if removed == 0 {
                return Err(MutationError::InsufficientSelection { required: 1, found: 0 });
            }
            Ok(removed)
        });

        if removed.is_some() {
            self.selection.clear();
        }
        removed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{section, text, top_ids};
    use super::super::SelectMode;
    use super::*;
    use crate::config::EditorConfig;

    fn editor(blocks: Vec<Block>) -> Editor {
        Editor::with_blocks(blocks, &EditorConfig::default())
    }

    fn select(editor: &mut Editor, ids: &[&str]) {
        editor.clear_selection();
        for id in ids {
            editor.select_block(&BlockId::from(*id), SelectMode::Add);
        }
    }

    fn visible(editor: &Editor, id: &str) -> bool {
        editor.block(&id.into()).unwrap().visible
    }

    #[test]
    fn test_bulk_visibility_majority_on_hides_all() {
        let mut editor = editor(vec![text("a"), text("b"), text("c")]);
        editor.toggle_block_visibility(&"c".into());
        select(&mut editor, &["a", "b", "c"]);

        assert!(editor.bulk_toggle_visibility());
        assert!(!visible(&editor, "a"));
        assert!(!visible(&editor, "b"));
        assert!(!visible(&editor, "c"));
    }

    #[test]
    fn test_bulk_visibility_tie_shows_all() {
        let mut editor = editor(vec![text("a"), text("b")]);
        editor.toggle_block_visibility(&"b".into());
        select(&mut editor, &["a", "b"]);

        assert!(editor.bulk_toggle_visibility());
        assert!(visible(&editor, "a"));
        assert!(visible(&editor, "b"));
    }

    #[test]
    fn test_bulk_lock_is_one_undo_step() {
        let mut editor = editor(vec![text("a"), text("b")]);
        select(&mut editor, &["a", "b"]);
        assert!(editor.bulk_toggle_lock());
        assert!(editor.blocks().iter().all(|b| b.locked));
        assert_eq!(editor.undo_depth(), 1);
    }

    #[test]
    fn test_bulk_toggle_empty_selection() {
        let mut editor = editor(vec![text("a")]);
        assert!(!editor.bulk_toggle_visibility());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_bulk_duplicate_selects_copies() {
        let mut editor = editor(vec![text("a"), text("b"), text("c")]);
        select(&mut editor, &["c", "a"]);

        let copies = editor.bulk_duplicate();
        assert_eq!(copies.len(), 2);
        assert_eq!(editor.blocks().len(), 5);
        assert_eq!(editor.blocks()[1].id, copies[0]);
        assert_eq!(editor.blocks()[4].id, copies[1]);
        assert_eq!(editor.selected_block_ids(), copies.as_slice());
        assert_eq!(editor.undo_depth(), 1);
    }

    #[test]
    fn test_bulk_duplicate_skips_selected_descendants() {
        let mut editor = editor(vec![section("s", vec![text("x")])]);
        select(&mut editor, &["s", "x"]);
        let copies = editor.bulk_duplicate();
        assert_eq!(copies.len(), 1);
        assert_eq!(editor.blocks().len(), 2);
        assert_eq!(editor.block(&"s".into()).unwrap().children().len(), 1);
    }

    #[test]
    fn test_bulk_delete_skips_locked() {
        let mut editor = editor(vec![
            text("a"),
            section("s", vec![text("x"), text("y")]),
            text("b"),
        ]);
        editor.toggle_block_lock(&"b".into());
        select(&mut editor, &["a", "y", "b"]);

        assert!(editor.bulk_delete());
        assert_eq!(top_ids(&editor), vec!["s", "b"]);
        assert_eq!(editor.block(&"s".into()).unwrap().children().len(), 1);
        assert!(editor.selection().is_empty());
        assert_eq!(editor.blocks()[1].order, 1);
    }

    #[test]
    fn test_bulk_delete_all_locked_is_noop() {
        let mut editor = editor(vec![text("a")]);
        editor.toggle_block_lock(&"a".into());
        select(&mut editor, &["a"]);
        let depth = editor.undo_depth();

        assert!(!editor.bulk_delete());
        assert_eq!(editor.undo_depth(), depth);
        assert_eq!(editor.selection().len(), 1);
    }
}
