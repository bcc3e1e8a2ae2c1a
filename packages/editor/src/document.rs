//! # Layout Document
//!
//! The persisted shape of a storefront page layout.
//!
//! ```json
//! {
//!   "id": "home",
//!   "state": { "blocks": [ ... ] },
//!   "layout": { "columns": 12, "rowHeight": 80, "gap": 16 },
//!   "version": 7
//! }
//! ```
//!
//! Older layouts store the forest under `state.widgets`; both names are read,
//! `blocks` is written.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Editor::from_layout → Edit → Editor::to_layout
//!      → ensure_fresh → next_version → Save
//! ```
//!
//! `version` is an optimistic concurrency token: a writer checks that the
//! stored version is still the one it loaded before bumping and saving.

use crate::block::{Block, BlockId};
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::mutations;
use crate::EditorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub state: LayoutState,

    #[serde(default)]
    pub layout: GridLayout,

    /// Increases by one on every save
    #[serde(default)]
    pub version: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutState {
    #[serde(default, alias = "widgets")]
    pub blocks: Vec<Block>,
}

/// Grid metadata consumed by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridLayout {
    pub columns: u32,
    pub row_height: u32,
    pub gap: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 12,
            row_height: 80,
            gap: 16,
        }
    }
}

impl LayoutDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            state: LayoutState { blocks },
            ..Default::default()
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.state.blocks
    }

    /// Parse and validate a layout
    pub fn from_json(source: &str) -> Result<Self, EditorError> {
        let mut doc: LayoutDocument = serde_json::from_str(source)?;
        doc.validate()?;
        mutations::normalize(&mut doc.state.blocks);
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, EditorError> {
        let source = std::fs::read_to_string(path)?;
        let doc = Self::from_json(&source)?;
        info!(
            path = %path.display(),
            version = doc.version,
            blocks = doc.state.blocks.len(),
            "Loaded layout"
        );
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<(), EditorError> {
        std::fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), version = self.version, "Saved layout");
        Ok(())
    }

    /// Reject duplicate block ids anywhere in the forest
    pub fn validate(&self) -> Result<(), EditorError> {
        let mut seen: HashSet<&BlockId> = HashSet::new();
        for block in mutations::flatten(&self.state.blocks) {
            if !seen.insert(&block.id) {
                return Err(EditorError::DuplicateBlockId(block.id.clone()));
            }
        }
        Ok(())
    }

    /// Fail unless this document is still at `expected`
    pub fn ensure_fresh(&self, expected: u64) -> Result<(), EditorError> {
        if self.version != expected {
            return Err(EditorError::StaleVersion {
                expected,
                found: self.version,
            });
        }
        Ok(())
    }

    /// Bump the version for a save and stamp the time
    pub fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.updated_at = Some(Utc::now());
        self.version
    }
}

impl Editor {
    /// Start a session on a persisted layout
    pub fn from_layout(doc: &LayoutDocument, config: &EditorConfig) -> Self {
        Editor::with_blocks(doc.state.blocks.clone(), config)
    }

    /// The editor's forest in the persisted shape, keeping `base`'s metadata
    pub fn to_layout(&self, base: &LayoutDocument) -> LayoutDocument {
        LayoutDocument {
            state: LayoutState {
                blocks: self.blocks().to_vec(),
            },
            ..base.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    const LEGACY: &str = r#"{
        "id": "home",
        "state": {
            "widgets": [
                { "id": "hero-1", "type": "hero", "variant": "split", "order": 4 },
                { "id": "sec-1", "type": "section", "children": [
                    { "id": "t-1", "type": "text", "settings": { "text": "Hi" } }
                ]}
            ]
        },
        "version": 3
    }"#;

    #[test]
    fn test_reads_widgets_alias_and_normalizes() {
        let doc = LayoutDocument::from_json(LEGACY).unwrap();
        assert_eq!(doc.id.as_deref(), Some("home"));
        assert_eq!(doc.version, 3);
        assert_eq!(doc.layout, GridLayout::default());

        let blocks = doc.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].order, 0);
        assert_eq!(blocks[0].block_type, BlockType::Hero);
        assert_eq!(
            blocks[1].children()[0].parent_id,
            Some(BlockId::from("sec-1"))
        );
    }

    #[test]
    fn test_writes_blocks_key() {
        let doc = LayoutDocument::new(vec![Block::new(BlockType::Text, "default").with_id("a")]);
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"blocks\""));
        assert!(!json.contains("\"widgets\""));
        assert!(json.contains("\"rowHeight\": 80"));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let source = r#"{ "state": { "blocks": [
            { "id": "a", "type": "section", "children": [ { "id": "a", "type": "text" } ] }
        ]}}"#;
        assert!(matches!(
            LayoutDocument::from_json(source),
            Err(EditorError::DuplicateBlockId(_))
        ));
    }

    #[test]
    fn test_unknown_block_type_is_an_error() {
        let source = r#"{ "state": { "blocks": [ { "id": "a", "type": "carousel3d" } ] } }"#;
        assert!(LayoutDocument::from_json(source).is_err());
    }

    #[test]
    fn test_staleness_check() {
        let mut doc = LayoutDocument::from_json(LEGACY).unwrap();
        assert!(doc.ensure_fresh(3).is_ok());

        assert_eq!(doc.next_version(), 4);
        assert!(doc.updated_at.is_some());
        match doc.ensure_fresh(3) {
            Err(EditorError::StaleVersion { expected, found }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 4);
            }
            other => panic!("expected stale version, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load_round_trip_through_editor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("home.json");

        let base = LayoutDocument::from_json(LEGACY).unwrap();
        let mut editor = Editor::from_layout(&base, &EditorConfig::default());
        assert!(!editor.is_dirty());
        editor.move_block(0, 1);

        let mut out = editor.to_layout(&base);
        out.next_version();
        out.save(&path).unwrap();

        let reloaded = LayoutDocument::load(&path).unwrap();
        assert_eq!(reloaded.version, 4);
        assert_eq!(reloaded.id.as_deref(), Some("home"));
        assert_eq!(reloaded.blocks()[0].id.as_str(), "sec-1");
        assert_eq!(reloaded.blocks()[1].id.as_str(), "hero-1");
    }
}
