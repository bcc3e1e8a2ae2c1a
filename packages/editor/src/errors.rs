//! Error types for the editor

use thiserror::Error;

use crate::block::{BlockId, UnknownBlockType};
use crate::settings::FieldPathError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Layout JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    UnknownBlockType(#[from] UnknownBlockType),

    #[error("Invalid field path: {0}")]
    FieldPath(#[from] FieldPathError),

    #[error("Duplicate block id in layout: {0}")]
    DuplicateBlockId(BlockId),

    #[error("Layout is stale: expected version {expected}, found {found}")]
    StaleVersion { expected: u64, found: u64 },
}

/// Failure reported by an injected save function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SaveError {
    pub message: String,
}

impl SaveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<EditorError> for SaveError {
    fn from(e: EditorError) -> Self {
        SaveError::new(e.to_string())
    }
}
