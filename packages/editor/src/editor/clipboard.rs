//! Style and block clipboards
//!
//! Styles are copied through an allow-list of presentation keys so content
//! (text, images, links) never travels with a style paste.

use super::{Editor, SelectMode};
use crate::block::BlockId;
use crate::mutations::{self, MutationError};
use crate::settings::Settings;
use tracing::debug;

/// Setting keys that count as style. Entries ending in `*` match by prefix.
pub const STYLE_KEYS: &[&str] = &[
    "background*",
    "padding*",
    "margin*",
    "gap",
    "font*",
    "lineHeight",
    "letterSpacing",
    "textColor",
    "color",
    "textAlign",
    "textTransform",
    "alignment",
    "verticalAlignment",
    "justifyContent",
    "alignItems",
    "border*",
    "boxShadow",
    "shadow",
    "animation*",
    "layout",
    "display",
    "flexDirection",
    "opacity",
    "zIndex",
];

pub fn is_style_key(key: &str) -> bool {
    STYLE_KEYS.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == *pattern,
    })
}

fn style_subset(settings: &Settings) -> Settings {
    settings
        .iter()
        .filter(|(key, _)| is_style_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

impl Editor {
    /// Copy the style settings of a block. Not an undoable operation.
    pub fn copy_block_styles(&mut self, id: &BlockId) -> bool {
        let Some(block) = self.block(id) else {
            return false;
        };
        let styles = style_subset(&block.settings);
        debug!(%id, keys = styles.len(), "Copied block styles");
        self.copied_styles = Some(styles);
        true
    }

    /// Merge the copied styles into a block's settings
    pub fn paste_block_styles(&mut self, id: &BlockId) -> bool {
        let styles = self.copied_styles.clone().unwrap_or_default();
        self.transact("paste_block_styles", |forest| {
            if styles.is_empty() {
                return Err(MutationError::EmptyClipboard);
            }
            mutations::require_mut(forest, id)?.settings.extend(styles);
            Ok(())
        })
        .is_some()
    }

    /// Keep a deep copy of a block (with descendants) for pasting
    pub fn copy_block(&mut self, id: &BlockId) -> bool {
        match self.block(id) {
            Some(block) => {
                self.clipboard_block = Some(block.clone());
                true
            }
            None => false,
        }
    }

    /// Paste the copied block with fresh ids after the primary selected
    /// top-level block (or at the end) and select it
    pub fn paste_block(&mut self) -> Option<BlockId> {
        let source = self.clipboard_block.clone();
        let anchor = self.selection.primary().cloned();
        let id = self.transact("paste_block", |forest| {
            let copy = source.ok_or(MutationError::EmptyClipboard)?.clone_with_new_ids();
            let id = copy.id.clone();
            let index = anchor
                .and_then(|anchor| forest.iter().position(|b| b.id == anchor))
                .map(|pos| pos + 1);
            mutations::insert_at(forest, index, copy);
            Ok(id)
        })?;
        self.selection.select(id.clone(), SelectMode::Replace);
        Some(id)
    }
}
