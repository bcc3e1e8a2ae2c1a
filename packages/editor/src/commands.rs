//! # Command Scripts
//!
//! Every public editor command as data, so sessions can be recorded,
//! replayed and generated.
//!
//! ```json
//! [
//!   { "op": "addBlockByType", "type": "text" },
//!   { "op": "moveBlock", "from": 0, "to": 1 },
//!   { "op": "undo" }
//! ]
//! ```

use crate::block::{Block, BlockId, BlockType, Breakpoint, GroupId};
use crate::editor::{BlockPatch, Editor, SelectMode};
use crate::settings::{SettingValue, Settings};
use crate::EditorError;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_variant() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    AddBlock {
        block: Block,
    },
    AddBlockByType {
        #[serde(rename = "type")]
        block_type: BlockType,
        #[serde(default = "default_variant")]
        variant: String,
    },
    RemoveBlock {
        id: BlockId,
    },
    DuplicateBlock {
        id: BlockId,
    },
    MoveBlock {
        from: usize,
        to: usize,
    },
    UpdateBlock {
        id: BlockId,
        patch: BlockPatch,
    },
    UpdateBlockSettings {
        id: BlockId,
        settings: Settings,
    },
    ChangeBlockVariant {
        id: BlockId,
        variant: String,
    },
    ToggleBlockVisibility {
        id: BlockId,
    },
    ToggleBlockLock {
        id: BlockId,
    },
    SetBlockResponsiveVisibility {
        id: BlockId,
        breakpoint: Breakpoint,
        visible: bool,
    },
    SetBlockCustomClass {
        id: BlockId,
        #[serde(default)]
        class: Option<String>,
    },
    ResizeBlock {
        id: BlockId,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        height: Option<f64>,
    },
    AddBlockToContainer {
        container_id: BlockId,
        block: Block,
        #[serde(default)]
        index: Option<usize>,
    },
    MoveBlockToContainer {
        id: BlockId,
        /// `None` moves to the top level
        #[serde(default)]
        container_id: Option<BlockId>,
        #[serde(default)]
        index: Option<usize>,
    },
    MoveBlockWithinContainer {
        container_id: BlockId,
        from: usize,
        to: usize,
    },
    RemoveBlockFromContainer {
        container_id: BlockId,
        id: BlockId,
    },
    GroupSelectedBlocks,
    UngroupBlock {
        group_id: GroupId,
    },
    CopyBlockStyles {
        id: BlockId,
    },
    PasteBlockStyles {
        id: BlockId,
    },
    CopyBlock {
        id: BlockId,
    },
    PasteBlock,
    SelectBlock {
        id: BlockId,
        #[serde(default)]
        mode: SelectMode,
    },
    SelectRange {
        from: BlockId,
        to: BlockId,
    },
    SelectAll,
    ClearSelection,
    SetFocus {
        #[serde(default)]
        id: Option<BlockId>,
    },
    SetHoveredBlock {
        #[serde(default)]
        id: Option<BlockId>,
    },
    BulkToggleVisibility,
    BulkToggleLock,
    BulkDuplicate,
    BulkDelete,
    StartInlineEdit {
        id: BlockId,
        path: String,
    },
    UpdateInlineEdit {
        value: SettingValue,
    },
    EndInlineEdit,
    CancelInlineEdit,
    Undo,
    Redo,
    BeginBatch {
        #[serde(default)]
        label: Option<String>,
    },
    EndBatch,
}

impl Command {
    /// Whether the command can change the forest
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Command::SelectBlock { .. }
                | Command::SelectRange { .. }
                | Command::SelectAll
                | Command::ClearSelection
                | Command::SetFocus { .. }
                | Command::SetHoveredBlock { .. }
                | Command::CopyBlockStyles { .. }
                | Command::CopyBlock { .. }
                | Command::BeginBatch { .. }
        )
    }
}

/// Parse a JSON array of commands
pub fn parse_script(source: &str) -> Result<Vec<Command>, EditorError> {
    Ok(serde_json::from_str(source)?)
}

impl Editor {
    /// Run one command. Returns false if it was rejected or had no effect.
    pub fn execute(&mut self, command: Command) -> bool {
        debug!(?command, "Executing command");
        match command {
            Command::AddBlock { block } => self.add_block(block).is_some(),
            Command::AddBlockByType {
                block_type,
                variant,
            } => self.add_block_by_type(block_type, &variant).is_some(),
            Command::RemoveBlock { id } => self.remove_block(&id),
            Command::DuplicateBlock { id } => self.duplicate_block(&id).is_some(),
            Command::MoveBlock { from, to } => self.move_block(from, to),
            Command::UpdateBlock { id, patch } => self.update_block(&id, patch),
            Command::UpdateBlockSettings { id, settings } => {
                self.update_block_settings(&id, settings)
            }
            Command::ChangeBlockVariant { id, variant } => {
                self.change_block_variant(&id, &variant)
            }
            Command::ToggleBlockVisibility { id } => self.toggle_block_visibility(&id),
            Command::ToggleBlockLock { id } => self.toggle_block_lock(&id),
            Command::SetBlockResponsiveVisibility {
                id,
                breakpoint,
                visible,
            } => self.set_block_responsive_visibility(&id, breakpoint, visible),
            Command::SetBlockCustomClass { id, class } => self.set_block_custom_class(&id, class),
            Command::ResizeBlock { id, width, height } => self.resize_block(&id, width, height),
            Command::AddBlockToContainer {
                container_id,
                block,
                index,
            } => self
                .add_block_to_container(&container_id, block, index)
                .is_some(),
            Command::MoveBlockToContainer {
                id,
                container_id,
                index,
            } => self.move_block_to_container(&id, container_id.as_ref(), index),
            Command::MoveBlockWithinContainer {
                container_id,
                from,
                to,
            } => self.move_block_within_container(&container_id, from, to),
            Command::RemoveBlockFromContainer { container_id, id } => {
                self.remove_block_from_container(&container_id, &id)
            }
            Command::GroupSelectedBlocks => self.group_selected_blocks().is_some(),
            Command::UngroupBlock { group_id } => self.ungroup_block(&group_id),
            Command::CopyBlockStyles { id } => self.copy_block_styles(&id),
            Command::PasteBlockStyles { id } => self.paste_block_styles(&id),
            Command::CopyBlock { id } => self.copy_block(&id),
            Command::PasteBlock => self.paste_block().is_some(),
            Command::SelectBlock { id, mode } => self.select_block(&id, mode),
            Command::SelectRange { from, to } => self.select_range(&from, &to),
            Command::SelectAll => self.select_all(),
            Command::ClearSelection => {
                self.clear_selection();
                true
            }
            Command::SetFocus { id } => self.set_focus(id),
            Command::SetHoveredBlock { id } => self.set_hovered_block(id),
            Command::BulkToggleVisibility => self.bulk_toggle_visibility(),
            Command::BulkToggleLock => self.bulk_toggle_lock(),
            Command::BulkDuplicate => !self.bulk_duplicate().is_empty(),
            Command::BulkDelete => self.bulk_delete(),
            Command::StartInlineEdit { id, path } => self.start_inline_edit(&id, &path),
            Command::UpdateInlineEdit { value } => self.update_inline_edit(value),
            Command::EndInlineEdit => self.end_inline_edit(),
            Command::CancelInlineEdit => self.cancel_inline_edit(),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::BeginBatch { label } => self.begin_batch(label),
            Command::EndBatch => self.end_batch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    #[test]
    fn test_parse_script() {
        let script = r#"[
            { "op": "addBlockByType", "type": "hero" },
            { "op": "addBlockByType", "type": "text", "variant": "muted" },
            { "op": "moveBlock", "from": 0, "to": 1 },
            { "op": "selectBlock", "id": "x", "mode": "toggle" },
            { "op": "moveBlockToContainer", "id": "a", "containerId": "s" },
            { "op": "updateInlineEdit", "value": { "title": "Hi", "items": [1, 2] } },
            { "op": "undo" }
        ]"#;
        let commands = parse_script(script).unwrap();
        assert_eq!(commands.len(), 7);
        assert_eq!(
            commands[1],
            Command::AddBlockByType {
                block_type: BlockType::Text,
                variant: "muted".to_string()
            }
        );
        assert_eq!(
            commands[3],
            Command::SelectBlock {
                id: "x".into(),
                mode: SelectMode::Toggle
            }
        );
        assert_eq!(
            commands[4],
            Command::MoveBlockToContainer {
                id: "a".into(),
                container_id: Some("s".into()),
                index: None
            }
        );
        assert_eq!(commands[6], Command::Undo);
    }

    #[test]
    fn test_unknown_op_is_an_error() {
        assert!(parse_script(r#"[{ "op": "explode" }]"#).is_err());
    }

    #[test]
    fn test_execute_script() {
        let mut editor = Editor::with_config(&EditorConfig::default());
        let script = parse_script(
            r#"[
                { "op": "addBlockByType", "type": "text" },
                { "op": "addBlockByType", "type": "text" },
                { "op": "moveBlock", "from": 0, "to": 1 },
                { "op": "undo" },
                { "op": "removeBlock", "id": "missing" }
            ]"#,
        )
        .unwrap();

        let results: Vec<bool> = script.into_iter().map(|c| editor.execute(c)).collect();
        assert_eq!(results, vec![true, true, true, true, false]);
        assert_eq!(editor.blocks().len(), 2);
        assert_eq!(editor.undo_depth(), 2);
    }

    #[test]
    fn test_is_mutation() {
        assert!(Command::Undo.is_mutation());
        assert!(Command::MoveBlock { from: 0, to: 1 }.is_mutation());
        assert!(!Command::SelectAll.is_mutation());
        assert!(!Command::CopyBlock { id: "a".into() }.is_mutation());
    }
}
