//! # Editor State
//!
//! The live document of one editing session plus everything the editor
//! tracks about it: selection, keyboard focus, hover, undo/redo history,
//! inline edit session, clipboards and autosave status.
//!
//! State changes only through the named commands on [`Editor`]. Every
//! command that touches the forest runs as a transaction:
//!
//! ```text
//! snapshot ─→ mutate ─┬─ Err ─→ restore snapshot (no-op)
//!                     └─ Ok ──→ normalize → record history → dirty
//! ```
//!
//! so a command either fully applies or leaves the forest untouched.
//! Rejected commands return `false`/`None` and log the reason at debug level.

mod bulk;
mod clipboard;
mod groups;
mod inline_edit;
mod selection;

pub use clipboard::STYLE_KEYS;
pub use inline_edit::InlineEdit;
pub use selection::{SelectMode, Selection};

use crate::autosave::{AutosaveSnapshot, AutosaveStatus};
use crate::block::{Block, BlockId, BlockType, Breakpoint, ResponsiveVisibility};
use crate::config::EditorConfig;
use crate::history::History;
use crate::mutations::{self, MutationError};
use crate::settings::{SettingValue, Settings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Field-level patch applied by [`Editor::update_block`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockPatch {
    pub variant: Option<String>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub custom_class: Option<String>,
    pub responsive_visibility: Option<ResponsiveVisibility>,
    /// Replaces the whole settings map
    pub settings: Option<Settings>,
}

/// Interactive state of one editing session
#[derive(Debug)]
pub struct Editor {
    blocks: Vec<Block>,
    selection: Selection,
    focused: Option<BlockId>,
    hovered: Option<BlockId>,
    history: History,
    dirty: bool,
    /// Bumped on every change to the forest
    revision: u64,
    /// Latest revision known to be persisted (or loaded)
    saved_revision: Option<u64>,
    inline_edit: Option<InlineEdit>,
    clipboard_block: Option<Block>,
    copied_styles: Option<Settings>,
    autosave_status: AutosaveStatus,
    last_autosave_at: Option<DateTime<Utc>>,
    autosave_error: Option<String>,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(&EditorConfig::default())
    }

    pub fn with_config(config: &EditorConfig) -> Self {
        Self {
            blocks: Vec::new(),
            selection: Selection::default(),
            focused: None,
            hovered: None,
            history: History::with_limit(config.history_limit),
            dirty: false,
            revision: 0,
            saved_revision: None,
            inline_edit: None,
            clipboard_block: None,
            copied_styles: None,
            autosave_status: AutosaveStatus::Idle,
            last_autosave_at: None,
            autosave_error: None,
        }
    }

    /// Create an editor over an existing forest (clean, empty history)
    pub fn with_blocks(blocks: Vec<Block>, config: &EditorConfig) -> Self {
        let mut editor = Self::with_config(config);
        editor.load_blocks(blocks);
        editor
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        mutations::find(&self.blocks, id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        mutations::contains(&self.blocks, id)
    }

    /// Pre-order ids with children inlined
    pub fn flattened_ids(&self) -> Vec<BlockId> {
        mutations::flatten_ids(&self.blocks)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_levels()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_levels()
    }

    pub fn hovered_block_id(&self) -> Option<&BlockId> {
        self.hovered.as_ref()
    }

    pub fn clipboard_block(&self) -> Option<&Block> {
        self.clipboard_block.as_ref()
    }

    pub fn copied_styles(&self) -> Option<&Settings> {
        self.copied_styles.as_ref()
    }

    pub fn autosave_status(&self) -> AutosaveStatus {
        self.autosave_status
    }

    pub fn last_autosave_at(&self) -> Option<DateTime<Utc>> {
        self.last_autosave_at
    }

    pub fn autosave_error(&self) -> Option<&str> {
        self.autosave_error.as_deref()
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Run a forest mutation all-or-nothing.
    ///
    /// Returns `None` when the mutation was rejected or changed nothing.
    fn transact<T>(
        &mut self,
        action: &'static str,
        f: impl FnOnce(&mut Vec<Block>) -> Result<T, MutationError>,
    ) -> Option<T> {
        self.settle_inline_edit(true);

        let before = self.blocks.clone();
        match f(&mut self.blocks) {
            Ok(value) => {
                mutations::normalize(&mut self.blocks);
                if self.blocks == before {
                    debug!(action, "Mutation changed nothing");
                    return None;
                }
                self.history.record(before);
                self.after_change();
                debug!(action, revision = self.revision, "Applied mutation");
                Some(value)
            }
            Err(error) => {
                self.blocks = before;
                debug!(action, %error, "Rejected mutation");
                None
            }
        }
    }

    /// Bookkeeping after the forest changed
    fn after_change(&mut self) {
        self.dirty = true;
        self.revision += 1;
        self.prune_references();
    }

    /// Drop selection/focus/hover/inline references to blocks that are gone
    fn prune_references(&mut self) {
        let blocks = &self.blocks;
        self.selection.retain(|id| mutations::contains(blocks, id));

        if let Some(focused) = &self.focused {
            if !mutations::contains(blocks, focused) {
                self.focused = None;
            }
        }
        if let Some(hovered) = &self.hovered {
            if !mutations::contains(blocks, hovered) {
                self.hovered = None;
            }
        }
        if let Some(edit) = &self.inline_edit {
            if !mutations::contains(blocks, &edit.block_id) {
                debug!(block_id = %edit.block_id, "Edited block removed, dropping inline edit");
                self.inline_edit = None;
            }
        }
    }

    /// Replace the forest for a new session: clean, no history, no selection
    pub fn load_blocks(&mut self, mut blocks: Vec<Block>) {
        mutations::normalize(&mut blocks);
        info!(blocks = blocks.len(), "Loaded layout into editor");
        self.blocks = blocks;
        self.history.clear();
        self.selection.clear();
        self.focused = None;
        self.hovered = None;
        self.inline_edit = None;
        self.dirty = false;
        self.revision += 1;
        self.saved_revision = Some(self.revision);
    }

    // ------------------------------------------------------------------
    // Top-level block operations
    // ------------------------------------------------------------------

    /// Append a block at the end of the top level and select it
    pub fn add_block(&mut self, block: Block) -> Option<BlockId> {
        let id = self.transact("add_block", |forest| {
            let block = ensure_unique_ids(forest, block);
            let id = block.id.clone();
            forest.push(block);
            Ok(id)
        })?;
        self.selection.select(id.clone(), SelectMode::Replace);
        Some(id)
    }

    pub fn add_block_by_type(&mut self, block_type: BlockType, variant: &str) -> Option<BlockId> {
        self.add_block(Block::new(block_type, variant))
    }

    /// Delete a top-level block
    pub fn remove_block(&mut self, id: &BlockId) -> bool {
        self.transact("remove_block", |forest| {
            let pos = match forest.iter().position(|b| &b.id == id) {
                Some(pos) => pos,
                None if mutations::contains(forest, id) => {
                    return Err(MutationError::NotTopLevel(id.clone()))
                }
                None => return Err(MutationError::BlockNotFound(id.clone())),
            };
            if forest[pos].locked {
                return Err(MutationError::Locked(id.clone()));
            }
            forest.remove(pos);
            Ok(())
        })
        .is_some()
    }

    /// Deep-copy a block (fresh ids) right after the source and select it
    pub fn duplicate_block(&mut self, id: &BlockId) -> Option<BlockId> {
        let copy_id = self.transact("duplicate_block", |forest| duplicate_in(forest, id))?;
        self.selection.select(copy_id.clone(), SelectMode::Replace);
        Some(copy_id)
    }

    /// Move the top-level block at `from` to `to` (whole group if grouped)
    pub fn move_block(&mut self, from: usize, to: usize) -> bool {
        self.transact("move_block", |forest| mutations::reorder(forest, from, to))
            .is_some()
    }

    // ------------------------------------------------------------------
    // Field-level patches
    // ------------------------------------------------------------------

    fn patch_block(
        &mut self,
        action: &'static str,
        id: &BlockId,
        f: impl FnOnce(&mut Block) -> Result<(), MutationError>,
    ) -> bool {
        self.transact(action, |forest| f(mutations::require_mut(forest, id)?))
            .is_some()
    }

    pub fn update_block(&mut self, id: &BlockId, patch: BlockPatch) -> bool {
        self.patch_block("update_block", id, |block| {
            if let Some(variant) = patch.variant {
                block.variant = variant;
            }
            if let Some(visible) = patch.visible {
                block.visible = visible;
            }
            if let Some(locked) = patch.locked {
                block.locked = locked;
            }
            if let Some(class) = patch.custom_class {
                block.custom_class = normalize_class(class);
            }
            if let Some(responsive) = patch.responsive_visibility {
                block.responsive_visibility = responsive;
            }
            if let Some(settings) = patch.settings {
                block.settings = settings;
            }
            Ok(())
        })
    }

    /// Shallow-merge into the block's settings
    pub fn update_block_settings(&mut self, id: &BlockId, settings: Settings) -> bool {
        self.patch_block("update_block_settings", id, |block| {
            block.settings.extend(settings);
            Ok(())
        })
    }

    pub fn change_block_variant(&mut self, id: &BlockId, variant: &str) -> bool {
        self.patch_block("change_block_variant", id, |block| {
            block.variant = variant.to_string();
            Ok(())
        })
    }

    pub fn toggle_block_visibility(&mut self, id: &BlockId) -> bool {
        self.patch_block("toggle_block_visibility", id, |block| {
            block.visible = !block.visible;
            Ok(())
        })
    }

    pub fn toggle_block_lock(&mut self, id: &BlockId) -> bool {
        self.patch_block("toggle_block_lock", id, |block| {
            block.locked = !block.locked;
            Ok(())
        })
    }

    pub fn set_block_responsive_visibility(
        &mut self,
        id: &BlockId,
        breakpoint: Breakpoint,
        visible: bool,
    ) -> bool {
        self.patch_block("set_block_responsive_visibility", id, |block| {
            block.responsive_visibility.set(breakpoint, visible);
            Ok(())
        })
    }

    /// Set or clear (`None` / empty) the custom CSS class
    pub fn set_block_custom_class(&mut self, id: &BlockId, class: Option<String>) -> bool {
        self.patch_block("set_block_custom_class", id, |block| {
            block.custom_class = class.and_then(normalize_class);
            Ok(())
        })
    }

    /// Write `width`/`height` size settings of a block
    pub fn resize_block(&mut self, id: &BlockId, width: Option<f64>, height: Option<f64>) -> bool {
        self.patch_block("resize_block", id, |block| {
            if block.locked {
                return Err(MutationError::Locked(block.id.clone()));
            }
            for (key, value) in [("width", width), ("height", height)] {
                let Some(value) = value else { continue };
                if !value.is_finite() || value < 0.0 {
                    return Err(MutationError::InvalidValue(format!("{} = {}", key, value)));
                }
                block.settings.insert(key.to_string(), SettingValue::Number(value));
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Nested containers
    // ------------------------------------------------------------------

    /// Insert a block into a container (at `index`, or appended) and select it
    pub fn add_block_to_container(
        &mut self,
        container_id: &BlockId,
        block: Block,
        index: Option<usize>,
    ) -> Option<BlockId> {
        let id = self.transact("add_block_to_container", |forest| {
            let block = ensure_unique_ids(forest, block);
            let container_locked = mutations::find(forest, container_id)
                .map(|c| c.locked)
                .unwrap_or(false);
            if container_locked {
                return Err(MutationError::Locked(container_id.clone()));
            }
            let children = mutations::container_children_mut(forest, container_id)?;
            let id = block.id.clone();
            mutations::insert_at(children, index, block);
            Ok(id)
        })?;
        self.selection.select(id.clone(), SelectMode::Replace);
        Some(id)
    }

    /// Move a block into another container, or to the top level when
    /// `container_id` is `None`. The block leaves its group.
    pub fn move_block_to_container(
        &mut self,
        id: &BlockId,
        container_id: Option<&BlockId>,
        index: Option<usize>,
    ) -> bool {
        self.transact("move_block_to_container", |forest| {
            let block = mutations::find(forest, id)
                .ok_or_else(|| MutationError::BlockNotFound(id.clone()))?;
            if block.locked {
                return Err(MutationError::Locked(id.clone()));
            }

            if let Some(target) = container_id {
                if target == id || mutations::is_descendant(forest, id, target) {
                    return Err(MutationError::CycleDetected);
                }
                let container = mutations::find(forest, target)
                    .ok_or_else(|| MutationError::ContainerNotFound(target.clone()))?;
                if !container.is_container() {
                    return Err(MutationError::NotAContainer(target.clone()));
                }
                if container.locked {
                    return Err(MutationError::Locked(target.clone()));
                }
            }

            let mut block = mutations::take(forest, id)
                .ok_or_else(|| MutationError::BlockNotFound(id.clone()))?;
            block.group_id = None;

            match container_id {
                Some(target) => {
                    let children = mutations::container_children_mut(forest, target)?;
                    mutations::insert_at(children, index, block);
                }
                None => {
                    mutations::insert_at(forest, index, block);
                }
            }
            Ok(())
        })
        .is_some()
    }

    /// Reorder inside one container (whole group if grouped)
    pub fn move_block_within_container(
        &mut self,
        container_id: &BlockId,
        from: usize,
        to: usize,
    ) -> bool {
        self.transact("move_block_within_container", |forest| {
            let children = mutations::container_children_mut(forest, container_id)?;
            mutations::reorder(children, from, to)
        })
        .is_some()
    }

    /// Remove a direct child of a container
    pub fn remove_block_from_container(&mut self, container_id: &BlockId, id: &BlockId) -> bool {
        self.transact("remove_block_from_container", |forest| {
            let children = mutations::container_children_mut(forest, container_id)?;
            let pos = children
                .iter()
                .position(|b| &b.id == id)
                .ok_or_else(|| MutationError::BlockNotFound(id.clone()))?;
            if children[pos].locked {
                return Err(MutationError::Locked(id.clone()));
            }
            children.remove(pos);
            Ok(())
        })
        .is_some()
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.settle_inline_edit(false);
        self.end_batch();
        if !self.history.undo(&mut self.blocks) {
            return false;
        }
        self.after_change();
        debug!(undo_levels = self.history.undo_levels(), "Undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        self.settle_inline_edit(false);
        self.end_batch();
        if !self.history.redo(&mut self.blocks) {
            return false;
        }
        self.after_change();
        debug!(redo_levels = self.history.redo_levels(), "Redo");
        true
    }

    /// Collapse the following mutations into one undo step (e.g. a resize drag)
    pub fn begin_batch(&mut self, label: Option<String>) -> bool {
        self.history.begin_batch(&self.blocks, label)
    }

    pub fn end_batch(&mut self) -> bool {
        self.history.end_batch(&self.blocks)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // Autosave bookkeeping
    // ------------------------------------------------------------------

    /// Mirror a scheduler status change into the editor.
    ///
    /// The dirty flag is cleared only when the saved revision is current.
    pub fn apply_autosave_snapshot(&mut self, snapshot: &AutosaveSnapshot) {
        self.autosave_status = snapshot.status;
        self.autosave_error = snapshot.last_error.clone();
        if snapshot.last_saved_at.is_some() {
            self.last_autosave_at = snapshot.last_saved_at;
        }
        if let Some(revision) = snapshot.saved_revision {
            self.mark_saved(revision);
        }
    }

    /// Clear the dirty flag if nothing changed since `revision` was saved
    pub fn mark_saved(&mut self, revision: u64) -> bool {
        if revision < self.revision {
            return false;
        }
        self.dirty = false;
        self.saved_revision = Some(revision);
        true
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_class(class: String) -> Option<String> {
    let trimmed = class.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Re-identify a block subtree if any of its ids already exist in the forest
fn ensure_unique_ids(forest: &[Block], block: Block) -> Block {
    let collides = block
        .subtree_ids()
        .iter()
        .any(|id| mutations::contains(forest, id));
    if collides {
        let group = block.group_id.clone();
        let mut fresh = block.clone_with_new_ids();
        fresh.group_id = group;
        fresh
    } else {
        block
    }
}

/// Insert a fresh-id copy right after `id` in its sibling list
fn duplicate_in(forest: &mut Vec<Block>, id: &BlockId) -> Result<BlockId, MutationError> {
    let siblings = mutations::siblings_of_mut(forest, id)
        .ok_or_else(|| MutationError::BlockNotFound(id.clone()))?;
    let pos = siblings
        .iter()
        .position(|b| &b.id == id)
        .ok_or_else(|| MutationError::BlockNotFound(id.clone()))?;
    let copy = siblings[pos].clone_with_new_ids();
    let copy_id = copy.id.clone();
    siblings.insert(pos + 1, copy);
    Ok(copy_id)
}
