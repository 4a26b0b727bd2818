//! Domain models for the pay slip sync workflow.

pub mod artifact;
pub mod month;
pub mod report;
pub mod token;

pub use artifact::PayslipArtifact;
pub use month::{MonthKey, MONTH_NAMES};
pub use report::{FailureStage, MonthFailure, SyncReport};
pub use token::{AuthToken, StoredToken};
