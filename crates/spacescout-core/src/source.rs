use std::time::Duration;
use thiserror::Error;

use crate::model::{ContentRef, Item, ItemKind};

/// Device capacity as reported by the platform, independent of the item set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapacity {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("content not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Other(String),
}

/// Collaborator that enumerates storage items and resolves content refs to
/// bytes. Platform bridges (filesystem, package manager) implement this.
pub trait ContentSource: Send + Sync {
    fn list_items(&self, kind: ItemKind) -> Result<Vec<Item>, SourceError>;

    fn read_content(&self, content_ref: &ContentRef) -> Result<Vec<u8>, SourceError>;

    fn capacity(&self) -> Option<DeviceCapacity> {
        None
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutatorError {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Collaborator that applies deletions: uninstall for apps, file removal
/// for photos and media.
pub trait StorageMutator: Send + Sync {
    /// Delete the item's backing storage and report the bytes actually
    /// freed. The call must return within `timeout`; an overrun is reported
    /// as `MutatorError::Timeout` and treated as a per-item failure.
    fn delete(&self, item_id: &str, timeout: Duration) -> Result<u64, MutatorError>;
}
