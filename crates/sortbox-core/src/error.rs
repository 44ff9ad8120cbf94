use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source root unavailable: {}: {source}", path.display())]
    SourceRootUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Library root unavailable: {}: {source}", path.display())]
    LibraryRootUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Planner failure: {0}")]
    Planner(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Why a single item was left out of a scan, plan, apply or undo run.
///
/// These never abort the enclosing operation; they are collected into
/// [`SkipRecord`]s and handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    SourceNotFound,
    DuplicatePlacement,
    MissingCategory,
    InvalidDepth,
    InvalidName,
    FolderCreateFailed(String),
    MoveFailed(String),
    DestinationNotFound,
    RestoreFailed(String),
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceNotFound => write!(f, "source not found"),
            Self::DuplicatePlacement => write!(f, "duplicate placement"),
            Self::MissingCategory => write!(f, "missing category"),
            Self::InvalidDepth => write!(f, "invalid destination depth"),
            Self::InvalidName => write!(f, "invalid destination name"),
            Self::FolderCreateFailed(e) => write!(f, "folder creation failed: {e}"),
            Self::MoveFailed(e) => write!(f, "move failed: {e}"),
            Self::DestinationNotFound => write!(f, "destination not found"),
            Self::RestoreFailed(e) => write!(f, "restore failed: {e}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A per-item skip as surfaced to callers and written into reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub item: String,
    pub reason: String,
}

impl SkipRecord {
    pub fn new(item: impl Into<String>, reason: &SkipReason) -> Self {
        Self {
            item: item.into(),
            reason: reason.to_string(),
        }
    }
}
