//! Error types module
//!
//! The run-level taxonomy: authentication failures abort the run, fetch
//! failures are per month and never abort it. Storage errors live in
//! `payslip-storage`; notification failures never surface as errors at all.

/// No usable Paybooks login token. Fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("No Paybooks login token could be obtained; manual extraction required")]
    NoToken,

    #[error("Token store error: {0}")]
    Store(String),
}

/// Failure to retrieve one month's document. Logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Payslip request failed: {0}")]
    Transport(String),

    #[error("Payslip API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),
}

/// Errors that escalate to a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Configuration error: {0}")]
    Config(String),
}
