//! Payslip Sync Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by every payslip-sync component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, SyncConfig};
pub use error::{AuthenticationError, FetchError, SyncError};
pub use models::{
    AuthToken, FailureStage, MonthFailure, MonthKey, PayslipArtifact, SyncReport,
};
pub use storage_types::DestinationBackend;
