//! Payslip Sync Services
//!
//! The sync engine and the collaborators it drives: the Paybooks source with
//! its token store and token probes, and the email notifier.

pub mod email;
pub mod source;
pub mod sync;
pub mod token_probe;
pub mod token_store;

pub use email::{EmailNotifier, Notifier, Outcome};
pub use source::{PaybooksSource, PayslipSource};
pub use sync::SyncEngine;
pub use token_probe::{
    normalize_token_input, CapturedRequestProbe, ConfiguredTokenProbe, LoginCommandProbe,
    TokenAcquirer, TokenProbe,
};
pub use token_store::TokenStore;
