//! Payslip Storage Library
//!
//! This crate provides the destination abstraction for pay slips and its
//! implementations for Google Drive and a local directory tree, plus the
//! local archive of downloaded files.
//!
//! # Destination layout
//!
//! Every backend uses the same tree:
//!
//! `{root}/{YYYY}/{MonthName}/{MonthName}_{YYYY}_PaySlip.pdf`
//!
//! Lookups only ever look at the immediate children of a folder. Name
//! generation lives in the `layout` module so all backends stay consistent.

pub mod archive;
#[cfg(feature = "storage-drive")]
pub mod drive;
pub mod factory;
pub(crate) mod layout;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use archive::LocalArchive;
#[cfg(feature = "storage-drive")]
pub use drive::{AuthorizedUserCredentials, DriveStorage};
pub use factory::create_destination;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use payslip_core::DestinationBackend;
pub use traits::{Destination, StorageError, StorageResult, WriteOutcome};
