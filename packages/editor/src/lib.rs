//! # Storefront Editor
//!
//! Interactive state engine for the storefront visual page editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: persisted layout ⇄ JSON           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: live forest + session state         │
//! │  - Transactional block mutations            │
//! │  - Selection, focus, hover                  │
//! │  - Undo/redo snapshots, batches             │
//! │  - Inline edits, clipboards                 │
//! └─────────────────────────────────────────────┘
//!        ↑                ↑                ↓ revision
//! ┌─────────────┐ ┌──────────────┐ ┌─────────────────┐
//! │ keyboard    │ │ search       │ │ autosave        │
//! │ key → cmd   │ │ fuzzy layers │ │ debounce → save │
//! └─────────────┘ └──────────────┘ └─────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Commands only**: state changes through named operations on [`Editor`]
//! 2. **All or nothing**: a rejected command leaves the forest untouched
//! 3. **Silent no-ops**: invalid requests return `false`, never panic
//! 4. **Synchronous core**: the save call is the only suspension point
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_editor::{BlockType, Editor, EditorConfig, LayoutDocument};
//!
//! let doc = LayoutDocument::load(Path::new("home.json"))?;
//! let mut editor = Editor::from_layout(&doc, &EditorConfig::default());
//!
//! let id = editor.add_block_by_type(BlockType::Hero, "split").unwrap();
//! editor.move_block(editor.blocks().len() - 1, 0);
//! editor.undo();
//!
//! let mut out = editor.to_layout(&doc);
//! out.next_version();
//! out.save(Path::new("home.json"))?;
//! ```
//!
//! ### Autosave
//!
//! ```rust,ignore
//! let scheduler = AutosaveScheduler::new(config.autosave.clone(), move || {
//!     let doc = shared.clone();
//!     async move { persist(doc).await }
//! });
//!
//! if editor.toggle_block_visibility(&id) {
//!     scheduler.notify_dirty(editor.revision());
//! }
//! ```

pub mod autosave;
pub mod block;
pub mod commands;
pub mod config;
pub mod document;
pub mod editor;
mod errors;
pub mod history;
pub mod keyboard;
pub mod mutations;
pub mod search;
pub mod settings;

pub use autosave::{AutosaveScheduler, AutosaveSnapshot, AutosaveStatus};
pub use block::{Block, BlockId, BlockType, Breakpoint, GroupId, ResponsiveVisibility};
pub use commands::{parse_script, Command};
pub use config::{AutosaveConfig, EditorConfig};
pub use document::{GridLayout, LayoutDocument};
pub use editor::{BlockPatch, Editor, InlineEdit, SelectMode, Selection};
pub use errors::{EditorError, SaveError};
pub use history::History;
pub use keyboard::{Key, KeyEvent, KeyTarget, KeyboardNavigator};
pub use mutations::MutationError;
pub use search::{search_blocks, SearchHit};
pub use settings::{FieldPath, SettingValue, Settings};
