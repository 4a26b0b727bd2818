//! Destination abstraction trait
//!
//! This module defines the Destination trait that all destination backends must implement.

use crate::DestinationBackend;
use async_trait::async_trait;
use payslip_core::{MonthKey, PayslipArtifact};
use std::collections::BTreeSet;
use thiserror::Error;

/// Destination operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Listing failed: {0}")]
    ListFailed(String),

    #[error("Folder lookup or creation failed: {0}")]
    FolderFailed(String),

    #[error("Destination authentication failed: {0}")]
    AuthFailed(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for destination operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What happened to one write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new file was created.
    Uploaded {
        file_id: String,
        web_link: Option<String>,
    },
    /// A same-named file was already present; nothing was written.
    Duplicate,
}

/// Destination abstraction trait
///
/// Backends store at most one pay slip per month under
/// `{root}/{YYYY}/{MonthName}/` and never overwrite an existing file.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Walk root -> year -> month and return every month whose folder holds
    /// at least one PDF. Year folders that are not four digits and month
    /// folders that are not full English month names are ignored. A missing
    /// root yields an empty set and is not created.
    async fn list_stored_months(&self) -> StorageResult<BTreeSet<MonthKey>>;

    /// Find or create the month folder, then upload the artifact unless a
    /// file with the same name already exists there.
    async fn write(&self, artifact: &PayslipArtifact) -> StorageResult<WriteOutcome>;

    /// Get the destination backend type
    fn backend_type(&self) -> DestinationBackend;
}
