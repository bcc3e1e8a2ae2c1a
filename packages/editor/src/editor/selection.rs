//! Selection, keyboard focus and hover

use super::Editor;
use crate::block::BlockId;
use crate::mutations;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// How a click (or key) combines with the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectMode {
    #[default]
    Replace,
    Add,
    Toggle,
}

/// Ordered multi-selection with a primary member
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<BlockId>,
    primary: Option<BlockId>,
}

impl Selection {
    pub fn ids(&self) -> &[BlockId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<&BlockId> {
        self.primary.as_ref()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn select(&mut self, id: BlockId, mode: SelectMode) {
        match mode {
            SelectMode::Replace => {
                self.ids = vec![id.clone()];
                self.primary = Some(id);
            }
            SelectMode::Add => {
                if !self.ids.contains(&id) {
                    self.ids.push(id.clone());
                }
                self.primary = Some(id);
            }
            SelectMode::Toggle => {
                if let Some(pos) = self.ids.iter().position(|s| s == &id) {
                    self.ids.remove(pos);
                    self.primary = self.ids.last().cloned();
                } else {
                    self.ids.push(id.clone());
                    self.primary = Some(id);
                }
            }
        }
    }

    /// Replace the selection with `ids`; the last one becomes primary
    pub fn set(&mut self, ids: Vec<BlockId>) {
        self.primary = ids.last().cloned();
        self.ids = ids;
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }

    /// Keep only ids matching `keep`, re-pointing primary if it was dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&BlockId) -> bool) {
        self.ids.retain(|id| keep(id));
        let primary_gone = self
            .primary
            .as_ref()
            .map(|p| !self.ids.contains(p))
            .unwrap_or(false);
        if primary_gone {
            self.primary = self.ids.last().cloned();
        }
    }
}

impl Editor {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_block_ids(&self) -> &[BlockId] {
        self.selection.ids()
    }

    pub fn selected_block_id(&self) -> Option<&BlockId> {
        self.selection.primary()
    }

    pub fn is_selected(&self, id: &BlockId) -> bool {
        self.selection.contains(id)
    }

    pub fn focused_id(&self) -> Option<&BlockId> {
        self.focused.as_ref()
    }

    /// Select a block (any depth). Unknown ids are ignored.
    pub fn select_block(&mut self, id: &BlockId, mode: SelectMode) -> bool {
        if !self.contains(id) {
            trace!(%id, "Ignoring selection of unknown block");
            return false;
        }
        self.selection.select(id.clone(), mode);
        true
    }

    /// Ids between `from` and `to` (inclusive, flattened order). Grouped
    /// blocks in the range pull in their whole group.
    fn range_ids(&self, from: &BlockId, to: &BlockId) -> Option<Vec<BlockId>> {
        let flat = mutations::flatten(&self.blocks);
        let a = flat.iter().position(|blk| &blk.id == from)?;
        let b = flat.iter().position(|blk| &blk.id == to)?;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let groups: Vec<_> = flat[lo..=hi]
            .iter()
            .filter_map(|blk| blk.group_id.clone())
            .collect();

        let ids = flat
            .iter()
            .enumerate()
            .filter(|(i, blk)| {
                (lo..=hi).contains(i)
                    || blk.group_id.as_ref().map(|g| groups.contains(g)).unwrap_or(false)
            })
            .map(|(_, blk)| blk.id.clone())
            .collect();
        Some(ids)
    }

    /// Add the range from `from` to `to` to the selection; `to` becomes
    /// primary
    pub fn select_range(&mut self, from: &BlockId, to: &BlockId) -> bool {
        let Some(ids) = self.range_ids(from, to) else {
            return false;
        };
        for id in ids {
            self.selection.select(id, SelectMode::Add);
        }
        self.selection.primary = Some(to.clone());
        true
    }

    /// Replace the selection with the range from `from` to `to` (keyboard
    /// range extension)
    pub fn set_range_selection(&mut self, from: &BlockId, to: &BlockId) -> bool {
        let Some(ids) = self.range_ids(from, to) else {
            return false;
        };
        self.selection.set(ids);
        self.selection.primary = Some(to.clone());
        true
    }

    /// Replace the selection with an ordered id list (unknown ids dropped)
    pub fn set_selection(&mut self, ids: Vec<BlockId>) {
        let ids = ids.into_iter().filter(|id| self.contains(id)).collect();
        self.selection.set(ids);
    }

    pub fn select_all(&mut self) -> bool {
        let ids = self.flattened_ids();
        if ids.is_empty() {
            return false;
        }
        self.selection.set(ids);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Move the keyboard focus cursor (independent of selection)
    pub fn set_focus(&mut self, id: Option<BlockId>) -> bool {
        match id {
            Some(id) if !self.contains(&id) => false,
            id => {
                self.focused = id;
                true
            }
        }
    }

    pub fn set_hovered_block(&mut self, id: Option<BlockId>) -> bool {
        match id {
            Some(id) if !self.contains(&id) => false,
            id => {
                self.hovered = id;
                true
            }
        }
    }
}
