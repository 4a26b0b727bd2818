//! Shared naming for destination backends.
//!
//! Layout: `{root}/{YYYY}/{MonthName}/{MonthName}_{YYYY}_PaySlip.pdf`.

use crate::traits::{StorageError, StorageResult};
use payslip_core::MonthKey;

/// Folder names from the root down to the month folder.
pub fn folder_chain(root: &str, month: &MonthKey) -> [String; 3] {
    [
        root.to_string(),
        month.year_folder_name(),
        month.month_name().to_string(),
    ]
}

/// A single path segment must not be empty, contain separators, or be `..`.
pub fn validate_segment(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\')
    {
        return Err(StorageError::InvalidName(format!(
            "'{}' is not a valid folder or file name",
            name
        )));
    }
    Ok(())
}

/// Whether a listed entry counts as a stored pay slip document.
pub fn is_document(name: &str, mime_type: Option<&str>) -> bool {
    mime_type == Some(payslip_core::constants::PDF_CONTENT_TYPE)
        || name.to_ascii_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_for_december() {
        let month = MonthKey::new(2025, 12).unwrap();
        assert_eq!(
            folder_chain("Pay Slips", &month),
            ["Pay Slips".to_string(), "2025".to_string(), "December".to_string()]
        );
    }

    #[test]
    fn rejects_traversal_segments() {
        assert!(validate_segment("Pay Slips").is_ok());
        assert!(matches!(validate_segment(".."), Err(StorageError::InvalidName(_))));
        assert!(matches!(validate_segment("a/b"), Err(StorageError::InvalidName(_))));
        assert!(matches!(validate_segment(""), Err(StorageError::InvalidName(_))));
    }

    #[test]
    fn document_detection() {
        assert!(is_document("December_2025_PaySlip.pdf", None));
        assert!(is_document("scan.PDF", None));
        assert!(is_document("untitled", Some("application/pdf")));
        assert!(!is_document("notes.txt", Some("text/plain")));
    }
}
