//! Block groups: sibling sets that move together

use super::Editor;
use crate::block::{Block, GroupId};
use crate::mutations::{self, MutationError};

impl Editor {
    /// Group the selected blocks under a fresh group id.
    ///
    /// Requires at least two selected, unlocked siblings. Members leave
    /// whatever group they were in before.
    pub fn group_selected_blocks(&mut self) -> Option<GroupId> {
        let selected = self.selection.ids().to_vec();
        self.transact("group_selected_blocks", |forest| {
            if selected.len() < 2 {
                return Err(MutationError::InsufficientSelection {
                    required: 2,
                    found: selected.len(),
                });
            }

            let siblings = mutations::siblings_of(forest, &selected[0])
                .ok_or_else(|| MutationError::BlockNotFound(selected[0].clone()))?;
            for id in &selected {
                let block = siblings
                    .iter()
                    .find(|b| &b.id == id)
                    .ok_or(MutationError::NotSiblings)?;
                if block.locked {
                    return Err(MutationError::Locked(id.clone()));
                }
            }

            let group = GroupId::generate();
            let siblings = mutations::siblings_of_mut(forest, &selected[0])
                .ok_or_else(|| MutationError::BlockNotFound(selected[0].clone()))?;
            for block in siblings.iter_mut().filter(|b| selected.contains(&b.id)) {
                block.group_id = Some(group.clone());
            }
            Ok(group)
        })
    }

    /// Dissolve a group. Rejected if any member is locked.
    pub fn ungroup_block(&mut self, group_id: &GroupId) -> bool {
        self.transact("ungroup_block", |forest| {
            let members = group_members(forest, group_id);
            if members.is_empty() {
                return Err(MutationError::GroupNotFound(group_id.clone()));
            }
            if members.iter().any(|b| b.locked) {
                return Err(MutationError::GroupLocked(group_id.clone()));
            }
            clear_group(forest, group_id);
            Ok(())
        })
        .is_some()
    }

    /// Members of a group in flattened order
    pub fn group_members(&self, group_id: &GroupId) -> Vec<&Block> {
        group_members(&self.blocks, group_id)
    }
}

fn group_members<'a>(forest: &'a [Block], group_id: &GroupId) -> Vec<&'a Block> {
    mutations::flatten(forest)
        .into_iter()
        .filter(|b| b.group_id.as_ref() == Some(group_id))
        .collect()
}

fn clear_group(forest: &mut [Block], group_id: &GroupId) {
    for block in forest.iter_mut() {
        if block.group_id.as_ref() == Some(group_id) {
            block.group_id = None;
        }
        if let Some(children) = &mut block.children {
            clear_group(children, group_id);
        }
    }
}
