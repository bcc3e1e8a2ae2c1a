//! # Blocks
//!
//! A block is one node of the storefront document tree. Blocks are owned by
//! their parent's `children` list (or by the top-level forest); `parent_id`
//! is only a back-reference kept in sync by the editor after every mutation.

use crate::settings::{SettingValue, Settings};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Clock millis plus a process-wide counter, unique even within one millisecond.
fn next_id(prefix: &str) -> String {
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), seq)
}

/// Unique block identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(next_id("block"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier shared by the members of a block group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(next_id("group"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown block type: {0}")]
pub struct UnknownBlockType(pub String);

/// Renderer tag of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlockType {
    Hero,
    Header,
    Footer,
    Text,
    Heading,
    Image,
    Gallery,
    Video,
    Button,
    ProductGrid,
    FeaturedProduct,
    CollectionList,
    Testimonials,
    Newsletter,
    Spacer,
    Divider,
    CustomHtml,
    Container,
    Columns,
    Section,
}

impl BlockType {
    pub const ALL: [BlockType; 20] = [
        BlockType::Hero,
        BlockType::Header,
        BlockType::Footer,
        BlockType::Text,
        BlockType::Heading,
        BlockType::Image,
        BlockType::Gallery,
        BlockType::Video,
        BlockType::Button,
        BlockType::ProductGrid,
        BlockType::FeaturedProduct,
        BlockType::CollectionList,
        BlockType::Testimonials,
        BlockType::Newsletter,
        BlockType::Spacer,
        BlockType::Divider,
        BlockType::CustomHtml,
        BlockType::Container,
        BlockType::Columns,
        BlockType::Section,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Hero => "hero",
            BlockType::Header => "header",
            BlockType::Footer => "footer",
            BlockType::Text => "text",
            BlockType::Heading => "heading",
            BlockType::Image => "image",
            BlockType::Gallery => "gallery",
            BlockType::Video => "video",
            BlockType::Button => "button",
            BlockType::ProductGrid => "product-grid",
            BlockType::FeaturedProduct => "featured-product",
            BlockType::CollectionList => "collection-list",
            BlockType::Testimonials => "testimonials",
            BlockType::Newsletter => "newsletter",
            BlockType::Spacer => "spacer",
            BlockType::Divider => "divider",
            BlockType::CustomHtml => "custom-html",
            BlockType::Container => "container",
            BlockType::Columns => "columns",
            BlockType::Section => "section",
        }
    }

    /// Whether blocks of this type may hold children
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            BlockType::Container | BlockType::Columns | BlockType::Section
        )
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}

impl TryFrom<String> for BlockType {
    type Error = UnknownBlockType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlockType> for String {
    fn from(value: BlockType) -> Self {
        value.as_str().to_string()
    }
}

/// Viewport class used for per-breakpoint visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

/// Per-breakpoint visibility flags (all visible by default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsiveVisibility {
    pub mobile: bool,
    pub tablet: bool,
    pub desktop: bool,
}

impl Default for ResponsiveVisibility {
    fn default() -> Self {
        Self {
            mobile: true,
            tablet: true,
            desktop: true,
        }
    }
}

impl ResponsiveVisibility {
    pub fn get(&self, breakpoint: Breakpoint) -> bool {
        match breakpoint {
            Breakpoint::Mobile => self.mobile,
            Breakpoint::Tablet => self.tablet,
            Breakpoint::Desktop => self.desktop,
        }
    }

    pub fn set(&mut self, breakpoint: Breakpoint, visible: bool) {
        match breakpoint {
            Breakpoint::Mobile => self.mobile = visible,
            Breakpoint::Tablet => self.tablet = visible,
            Breakpoint::Desktop => self.desktop = visible,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_variant() -> String {
    "default".to_string()
}

/// One node of the editable document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    #[serde(default = "default_variant")]
    pub variant: String,

    /// Dense 0-based position among siblings
    #[serde(default)]
    pub order: usize,

    #[serde(default = "default_true")]
    pub visible: bool,

    /// Locked blocks refuse structural mutation
    #[serde(default)]
    pub locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,

    #[serde(default)]
    pub settings: Settings,

    /// Present only on container-capable types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BlockId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_class: Option<String>,

    #[serde(default)]
    pub responsive_visibility: ResponsiveVisibility,
}

impl Block {
    /// Create a block with a fresh id
    pub fn new(block_type: BlockType, variant: impl Into<String>) -> Self {
        Self {
            id: BlockId::generate(),
            block_type,
            variant: variant.into(),
            order: 0,
            visible: true,
            locked: false,
            group_id: None,
            settings: Settings::new(),
            children: block_type.is_container().then(Vec::new),
            parent_id: None,
            custom_class: None,
            responsive_visibility: ResponsiveVisibility::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn is_container(&self) -> bool {
        self.block_type.is_container()
    }

    pub fn children(&self) -> &[Block] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Deep copy with fresh ids for this block and every descendant.
    ///
    /// The copy itself keeps no group membership. Groups among its
    /// descendants are re-keyed so they stay grouped inside the copy but
    /// never share a group with the original.
    pub fn clone_with_new_ids(&self) -> Block {
        let mut copy = self.clone();
        copy.group_id = None;
        reassign_ids(&mut copy, &mut HashMap::new());
        copy
    }

    /// Ids of this block and all descendants, pre-order
    pub fn subtree_ids(&self) -> Vec<BlockId> {
        let mut ids = Vec::new();
        collect_ids(self, &mut ids);
        ids
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        &self.id == id || self.children().iter().any(|c| c.contains(id))
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

fn reassign_ids(block: &mut Block, groups: &mut HashMap<GroupId, GroupId>) {
    block.id = BlockId::generate();
    let parent = block.id.clone();
    if let Some(children) = &mut block.children {
        for child in children.iter_mut() {
            if let Some(group) = child.group_id.take() {
                let fresh = groups.entry(group).or_insert_with(GroupId::generate);
                child.group_id = Some(fresh.clone());
            }
            reassign_ids(child, groups);
            child.parent_id = Some(parent.clone());
        }
    }
}

fn collect_ids(block: &Block, out: &mut Vec<BlockId>) {
    out.push(block.id.clone());
    for child in block.children() {
        collect_ids(child, out);
    }
}
