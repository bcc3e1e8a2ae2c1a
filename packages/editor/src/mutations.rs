//! # Tree Mutations
//!
//! Pure structural operations on a block forest. Nothing here records
//! history or touches selection; the editor wraps these in a transaction.
//!
//! ## Mutation Semantics
//!
//! ### Reorder
//! - A locked block never moves
//! - A grouped block drags its whole group: members are lifted out in their
//!   current relative order and reinserted as one contiguous run, shifted by
//!   the requested index delta and clamped to the sibling bounds
//! - Any locked member rejects the whole group move
//!
//! ### Move across containers
//! - Fails if the target is the block itself or one of its descendants
//! - Fails if the target type cannot hold children
//! - The moved block leaves its group
//!
//! ### Remove
//! - Removes the block and all descendants

use crate::block::{Block, BlockId, GroupId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Container not found: {0}")]
    ContainerNotFound(BlockId),

    #[error("Block cannot have children: {0}")]
    NotAContainer(BlockId),

    #[error("Block is locked: {0}")]
    Locked(BlockId),

    #[error("Group has a locked member: {0}")]
    GroupLocked(GroupId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Index {index} out of bounds for {len} siblings")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Blocks are not siblings")]
    NotSiblings,

    #[error("Need at least {required} blocks, found {found}")]
    InsufficientSelection { required: usize, found: usize },

    #[error("Block is not at the top level: {0}")]
    NotTopLevel(BlockId),

    #[error("Nothing to paste")]
    EmptyClipboard,

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Find a block anywhere in the forest (depth-first)
pub fn find<'a>(forest: &'a [Block], id: &BlockId) -> Option<&'a Block> {
    for block in forest {
        if &block.id == id {
            return Some(block);
        }
        if let Some(found) = find(block.children(), id) {
            return Some(found);
        }
    }
    None
}

pub fn find_mut<'a>(forest: &'a mut [Block], id: &BlockId) -> Option<&'a mut Block> {
    for block in forest.iter_mut() {
        if &block.id == id {
            return Some(block);
        }
        if let Some(children) = block.children.as_mut() {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Find a block or report it missing
pub fn require_mut<'a>(
    forest: &'a mut [Block],
    id: &BlockId,
) -> Result<&'a mut Block, MutationError> {
    find_mut(forest, id).ok_or_else(|| MutationError::BlockNotFound(id.clone()))
}

/// The sibling list that holds `id`
pub fn siblings_of<'a>(forest: &'a [Block], id: &BlockId) -> Option<&'a [Block]> {
    if forest.iter().any(|b| &b.id == id) {
        return Some(forest);
    }
    for block in forest {
        if let Some(found) = siblings_of(block.children(), id) {
            return Some(found);
        }
    }
    None
}

pub fn siblings_of_mut<'a>(forest: &'a mut Vec<Block>, id: &BlockId) -> Option<&'a mut Vec<Block>> {
    if forest.iter().any(|b| &b.id == id) {
        return Some(forest);
    }
    for block in forest.iter_mut() {
        if let Some(children) = block.children.as_mut() {
            if let Some(found) = siblings_of_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Children list of a container, created empty if the container had none yet
pub fn container_children_mut<'a>(
    forest: &'a mut [Block],
    container_id: &BlockId,
) -> Result<&'a mut Vec<Block>, MutationError> {
    let container = find_mut(forest, container_id)
        .ok_or_else(|| MutationError::ContainerNotFound(container_id.clone()))?;
    if !container.is_container() {
        return Err(MutationError::NotAContainer(container_id.clone()));
    }
    Ok(container.children.get_or_insert_with(Vec::new))
}

/// Detach a block from wherever it lives and return it
pub fn take(forest: &mut Vec<Block>, id: &BlockId) -> Option<Block> {
    if let Some(pos) = forest.iter().position(|b| &b.id == id) {
        return Some(forest.remove(pos));
    }
    for block in forest.iter_mut() {
        if let Some(children) = block.children.as_mut() {
            if let Some(removed) = take(children, id) {
                return Some(removed);
            }
        }
    }
    None
}

/// Pre-order traversal with children inlined
pub fn flatten(forest: &[Block]) -> Vec<&Block> {
    let mut out = Vec::new();
    flatten_into(forest, &mut out);
    out
}

fn flatten_into<'a>(forest: &'a [Block], out: &mut Vec<&'a Block>) {
    for block in forest {
        out.push(block);
        flatten_into(block.children(), out);
    }
}

pub fn flatten_ids(forest: &[Block]) -> Vec<BlockId> {
    flatten(forest).into_iter().map(|b| b.id.clone()).collect()
}

pub fn contains(forest: &[Block], id: &BlockId) -> bool {
    find(forest, id).is_some()
}

/// Whether `id` lives strictly below `ancestor`
pub fn is_descendant(forest: &[Block], ancestor: &BlockId, id: &BlockId) -> bool {
    find(forest, ancestor)
        .map(|a| a.children().iter().any(|c| c.contains(id)))
        .unwrap_or(false)
}

/// Re-establish the structural invariants after a mutation:
/// dense `order` per sibling list, `parent_id` back-references, and no group
/// with fewer than two members at one sibling level.
pub fn normalize(forest: &mut [Block]) {
    normalize_level(forest, None);
}

fn normalize_level(siblings: &mut [Block], parent: Option<&BlockId>) {
    let mut group_sizes: HashMap<GroupId, usize> = HashMap::new();
    for block in siblings.iter() {
        if let Some(group) = &block.group_id {
            *group_sizes.entry(group.clone()).or_default() += 1;
        }
    }

    for (i, block) in siblings.iter_mut().enumerate() {
        block.order = i;
        block.parent_id = parent.cloned();

        let dissolve = block
            .group_id
            .as_ref()
            .map(|g| group_sizes.get(g).copied().unwrap_or(0) < 2)
            .unwrap_or(false);
        if dissolve {
            block.group_id = None;
        }

        if let Some(children) = &mut block.children {
            normalize_level(children, Some(&block.id));
        }
    }
}

/// Move the sibling at `from` towards `to`, dragging its group along
pub fn reorder(siblings: &mut Vec<Block>, from: usize, to: usize) -> Result<(), MutationError> {
    let len = siblings.len();
    let moved = siblings
        .get(from)
        .ok_or(MutationError::IndexOutOfBounds { index: from, len })?;

    if moved.locked {
        return Err(MutationError::Locked(moved.id.clone()));
    }

    let members: Vec<usize> = match &moved.group_id {
        Some(group) => siblings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.group_id.as_ref() == Some(group))
            .map(|(i, _)| i)
            .collect(),
        None => vec![from],
    };

    if members.len() < 2 {
        let to = to.min(len - 1);
        if from != to {
            let block = siblings.remove(from);
            siblings.insert(to, block);
        }
        return Ok(());
    }

    if let Some(locked) = members.iter().find(|&&i| siblings[i].locked) {
        let group = siblings[*locked].group_id.clone().unwrap_or_else(|| GroupId::new(""));
        return Err(MutationError::GroupLocked(group));
    }

    let delta = to as isize - from as isize;
    if delta == 0 {
        return Ok(());
    }

    let remaining_len = len - members.len();
    let start = (members[0] as isize + delta).clamp(0, remaining_len as isize) as usize;

    let mut group = Vec::with_capacity(members.len());
    let mut rest = Vec::with_capacity(remaining_len);
    for (i, block) in siblings.drain(..).enumerate() {
        if members.contains(&i) {
            group.push(block);
        } else {
            rest.push(block);
        }
    }
    rest.splice(start..start, group);
    *siblings = rest;

    Ok(())
}

/// Insert into a sibling list, clamping the index to the end
pub fn insert_at(siblings: &mut Vec<Block>, index: Option<usize>, block: Block) -> usize {
    let index = index.map(|i| i.min(siblings.len())).unwrap_or(siblings.len());
    siblings.insert(index, block);
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    fn text(id: &str) -> Block {
        Block::new(BlockType::Text, "default").with_id(id)
    }

    fn section(id: &str, children: Vec<Block>) -> Block {
        Block::new(BlockType::Section, "default")
            .with_id(id)
            .with_children(children)
    }

    fn ids(forest: &[Block]) -> Vec<&str> {
        forest.iter().map(|b| b.id.as_str()).collect()
    }

    fn grouped(mut forest: Vec<Block>, members: &[&str], group: &str) -> Vec<Block> {
        for b in forest.iter_mut() {
            if members.contains(&b.id.as_str()) {
                b.group_id = Some(GroupId::new(group));
            }
        }
        forest
    }

    #[test]
    fn test_find_nested_block() {
        let forest = vec![text("a"), section("s", vec![section("inner", vec![text("deep")])])];

        assert!(find(&forest, &"deep".into()).is_some());
        assert!(find(&forest, &"missing".into()).is_none());
        assert_eq!(ids(siblings_of(&forest, &"deep".into()).unwrap()), vec!["deep"]);
        assert!(is_descendant(&forest, &"s".into(), &"deep".into()));
        assert!(!is_descendant(&forest, &"deep".into(), &"s".into()));
    }

    #[test]
    fn test_flatten_is_preorder() {
        let forest = vec![
            section("s1", vec![text("a"), text("b")]),
            text("c"),
            section("s2", vec![text("d")]),
        ];
        let flat: Vec<BlockId> = flatten_ids(&forest);
        let flat: Vec<&str> = flat.iter().map(|id| id.as_str()).collect();
        assert_eq!(flat, vec!["s1", "a", "b", "c", "s2", "d"]);
    }

    #[test]
    fn test_take_removes_subtree() {
        let mut forest = vec![text("a"), section("s", vec![text("b"), text("c")])];
        let removed = take(&mut forest, &"s".into()).unwrap();

        assert_eq!(removed.children().len(), 2);
        assert_eq!(ids(&forest), vec!["a"]);
        assert!(!contains(&forest, &"b".into()));
    }

    #[test]
    fn test_normalize_reindexes_every_level() {
        let mut forest = vec![section("s", vec![text("a"), text("b")]), text("c")];
        forest[0].order = 7;
        forest[1].order = 7;
        if let Some(children) = forest[0].children.as_mut() {
            children[0].order = 3;
        }

        normalize(&mut forest);

        assert_eq!(forest[0].order, 0);
        assert_eq!(forest[1].order, 1);
        let children = forest[0].children();
        assert_eq!(children[0].order, 0);
        assert_eq!(children[1].order, 1);
        assert_eq!(children[1].parent_id, Some(BlockId::from("s")));
        assert_eq!(forest[1].parent_id, None);
    }

    #[test]
    fn test_normalize_dissolves_single_member_group() {
        let mut forest = grouped(vec![text("a"), text("b")], &["a"], "g");
        normalize(&mut forest);
        assert!(forest[0].group_id.is_none());
    }

    #[test]
    fn test_reorder_single_block() {
        let mut forest = vec![text("a"), text("b"), text("c")];
        reorder(&mut forest, 0, 2).unwrap();
        assert_eq!(ids(&forest), vec!["b", "c", "a"]);

        // Target past the end is clamped
        reorder(&mut forest, 0, 99).unwrap();
        assert_eq!(ids(&forest), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_reorder_locked_block_is_rejected() {
        let mut forest = vec![text("a"), text("b")];
        forest[0].locked = true;
        assert_eq!(
            reorder(&mut forest, 0, 1),
            Err(MutationError::Locked("a".into()))
        );
        assert_eq!(ids(&forest), vec!["a", "b"]);
    }

    #[test]
    fn test_reorder_out_of_bounds() {
        let mut forest = vec![text("a")];
        assert_eq!(
            reorder(&mut forest, 3, 0),
            Err(MutationError::IndexOutOfBounds { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_reorder_moves_whole_group_by_delta() {
        let forest = vec![text("a"), text("b"), text("c"), text("d")];
        let mut forest = grouped(forest, &["a", "b"], "g");

        // Dragging the second member forward by one moves the pair by one
        reorder(&mut forest, 1, 2).unwrap();
        assert_eq!(ids(&forest), vec!["c", "a", "b", "d"]);

        // Clamped at the end
        reorder(&mut forest, 1, 9).unwrap();
        assert_eq!(ids(&forest), vec!["c", "d", "a", "b"]);

        // And back to the front
        reorder(&mut forest, 3, 0).unwrap();
        assert_eq!(ids(&forest), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_reorder_gathers_scattered_group() {
        let forest = vec![text("a"), text("x"), text("b"), text("y")];
        let mut forest = grouped(forest, &["a", "b"], "g");

        reorder(&mut forest, 0, 1).unwrap();
        assert_eq!(ids(&forest), vec!["x", "a", "b", "y"]);
    }

    #[test]
    fn test_reorder_group_with_locked_member_is_rejected() {
        let forest = vec![text("a"), text("b"), text("c")];
        let mut forest = grouped(forest, &["a", "b"], "g");
        forest[1].locked = true;
        let before = forest.clone();

        assert_eq!(
            reorder(&mut forest, 0, 2),
            Err(MutationError::GroupLocked(GroupId::new("g")))
        );
        assert_eq!(forest, before);
    }

    #[test]
    fn test_container_children_requires_container() {
        let mut forest = vec![text("a"), section("s", vec![])];
        assert_eq!(
            container_children_mut(&mut forest, &"a".into()).err(),
            Some(MutationError::NotAContainer("a".into()))
        );
        assert_eq!(
            container_children_mut(&mut forest, &"zz".into()).err(),
            Some(MutationError::ContainerNotFound("zz".into()))
        );
        assert!(container_children_mut(&mut forest, &"s".into()).is_ok());
    }
}
