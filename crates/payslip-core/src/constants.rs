//! Fixed values shared across crates.

/// Default name of the top-level destination folder.
pub const DEFAULT_ROOT_FOLDER: &str = "Pay Slips";

/// A cached Paybooks login token is only reused within this many hours of issuance.
pub const TOKEN_FRESHNESS_HOURS: i64 = 24;

/// Default number of months scanned per run.
pub const DEFAULT_MAX_MONTHS_BACK: u32 = 24;

/// Upper bound on the look-back window (100 years).
pub const MAX_MONTHS_BACK_LIMIT: u32 = 1200;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

pub const PAYBOOKS_API_URL: &str = "https://apislip.paybooks.in/Payslip/PayslipDownload";

pub const GOOGLE_API_URL: &str = "https://www.googleapis.com";

pub const NOTIFICATION_FOOTER: &str = "Payslip Drive Sync - Automated System";
