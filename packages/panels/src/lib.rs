//! # Storefront Panels
//!
//! Responsive state for the editor's side panels (layers, settings, ...).
//!
//! ```text
//!                 toggle_collapse
//!   Expanded ←──────────────────────→ Collapsed
//!      ↑  ╲  viewport < breakpoint       ↑
//!      │   ╲ (auto, restorable)          │ toggle_collapse
//!      │    ╲                            │
//!   Hidden   ╲──── float ────────→ Floating
//! ```
//!
//! Every explicit change is written through a [`PreferenceStore`] so the
//! next session restores it. Automatic collapses are never persisted.

mod config;
mod panel;
mod store;

pub use config::PanelConfig;
pub use panel::{PanelController, PanelPosition, PanelState};
pub use store::{FileStore, MemoryStore, PreferenceStore, StoreError};
