//! Inline edit sessions
//!
//! Typing into a block on the canvas writes straight into the live forest
//! without a history entry per keystroke. Ending the session records one
//! undo step holding the value from before the session; cancelling puts the
//! original fields back (dropping containers the session created) and
//! records nothing.
//!
//! Field paths address `settings.<path>`, `variant` or `customClass`.

use super::Editor;
use crate::block::{Block, BlockId};
use crate::mutations;
use crate::settings::{get_path, set_path, FieldPath, PathSegment, SettingValue, Settings};
use tracing::debug;

/// Active inline edit
#[derive(Debug, Clone, PartialEq)]
pub struct InlineEdit {
    pub block_id: BlockId,
    pub path: FieldPath,
    /// Value before the session began (`None` if the field did not exist)
    pub original: Option<SettingValue>,
    /// Whether the live value was written during the session
    touched: bool,
    saved: SavedFields,
    was_dirty: bool,
    revision_at_start: u64,
}

/// Editable fields of the block as they were when the session began
#[derive(Debug, Clone, PartialEq)]
struct SavedFields {
    settings: Settings,
    variant: String,
    custom_class: Option<String>,
}

impl SavedFields {
    fn capture(block: &Block) -> Self {
        Self {
            settings: block.settings.clone(),
            variant: block.variant.clone(),
            custom_class: block.custom_class.clone(),
        }
    }

    fn restore(&self, block: &mut Block) {
        block.settings = self.settings.clone();
        block.variant = self.variant.clone();
        block.custom_class = self.custom_class.clone();
    }
}

/// Which part of a block a field path points at
enum Field<'p> {
    Settings(&'p [PathSegment]),
    Variant,
    CustomClass,
}

fn resolve(path: &FieldPath) -> Option<Field<'_>> {
    match (path.root()?, path.rest()) {
        ("settings", rest) if !rest.is_empty() => Some(Field::Settings(rest)),
        ("variant", []) => Some(Field::Variant),
        ("customClass", []) => Some(Field::CustomClass),
        _ => None,
    }
}

fn read_field(block: &Block, field: &Field<'_>) -> Option<SettingValue> {
    match field {
        Field::Settings(rest) => get_path(&block.settings, rest).cloned(),
        Field::Variant => Some(SettingValue::Text(block.variant.clone())),
        Field::CustomClass => block.custom_class.clone().map(SettingValue::Text),
    }
}

/// Write a field. Returns false for values the field cannot hold.
fn write_field(block: &mut Block, field: &Field<'_>, value: SettingValue) -> bool {
    match (field, value) {
        (Field::Settings(rest), value) => set_path(&mut block.settings, rest, value),
        (Field::Variant, SettingValue::Text(variant)) => {
            block.variant = variant;
            true
        }
        (Field::CustomClass, SettingValue::Text(class)) => {
            let class = class.trim();
            block.custom_class = (!class.is_empty()).then(|| class.to_string());
            true
        }
        (Field::CustomClass, SettingValue::Null) => {
            block.custom_class = None;
            true
        }
        _ => false,
    }
}

impl Editor {
    pub fn inline_edit(&self) -> Option<&InlineEdit> {
        self.inline_edit.as_ref()
    }

    /// Begin editing one field of a block. An active session is committed
    /// first.
    pub fn start_inline_edit(&mut self, id: &BlockId, path: &str) -> bool {
        let path = match FieldPath::parse(path) {
            Ok(path) => path,
            Err(error) => {
                debug!(%error, path, "Rejected inline edit path");
                return false;
            }
        };
        let Some(field) = resolve(&path) else {
            debug!(%path, "Inline edit path does not address an editable field");
            return false;
        };
        let Some(block) = mutations::find(&self.blocks, id) else {
            return false;
        };
        let original = read_field(block, &field);
        let saved = SavedFields::capture(block);

        self.settle_inline_edit(true);
        debug!(block_id = %id, %path, "Started inline edit");
        self.inline_edit = Some(InlineEdit {
            block_id: id.clone(),
            path,
            original,
            touched: false,
            saved,
            was_dirty: self.dirty,
            revision_at_start: self.revision,
        });
        true
    }

    /// Write the in-progress value into the live block (no history)
    pub fn update_inline_edit(&mut self, value: SettingValue) -> bool {
        let Some(edit) = &mut self.inline_edit else {
            return false;
        };
        let Some(field) = resolve(&edit.path) else {
            return false;
        };
        let Some(block) = mutations::find_mut(&mut self.blocks, &edit.block_id) else {
            return false;
        };
        if read_field(block, &field).as_ref() == Some(&value) {
            return true;
        }
        if !write_field(block, &field, value) {
            return false;
        }
        edit.touched = true;
        self.dirty = true;
        self.revision += 1;
        true
    }

    /// Commit the session as one undo step. Returns true if a step was recorded.
    pub fn end_inline_edit(&mut self) -> bool {
        let Some(edit) = self.inline_edit.take() else {
            return false;
        };
        let Some(field) = resolve(&edit.path) else {
            return false;
        };
        let Some(block) = mutations::find(&self.blocks, &edit.block_id) else {
            return false;
        };
        if read_field(block, &field) == edit.original {
            return false;
        }

        let mut before = self.blocks.clone();
        if let Some(block) = mutations::find_mut(&mut before, &edit.block_id) {
            edit.saved.restore(block);
        }
        self.history.record(before);
        self.dirty = true;
        debug!(block_id = %edit.block_id, path = %edit.path, "Committed inline edit");
        true
    }

    /// Put the original value back. No history is recorded.
    pub fn cancel_inline_edit(&mut self) -> bool {
        let Some(edit) = self.inline_edit.take() else {
            return false;
        };
        if !edit.touched {
            return true;
        }
        if let Some(block) = mutations::find_mut(&mut self.blocks, &edit.block_id) {
            // Drafts typed back to the original leave nothing to restore
            if SavedFields::capture(block) != edit.saved {
                edit.saved.restore(block);
                self.revision += 1;
            }
        }
        // Back to a clean state only if no draft was persisted meanwhile
        let saved_meanwhile = self
            .saved_revision
            .is_some_and(|saved| saved > edit.revision_at_start);
        self.dirty = edit.was_dirty || saved_meanwhile;
        debug!(block_id = %edit.block_id, path = %edit.path, "Cancelled inline edit");
        true
    }

    /// Resolve an active session before another command runs
    pub(super) fn settle_inline_edit(&mut self, commit: bool) {
        if self.inline_edit.is_none() {
            return;
        }
        if commit {
            self.end_inline_edit();
        } else {
            self.cancel_inline_edit();
        }
    }
}
