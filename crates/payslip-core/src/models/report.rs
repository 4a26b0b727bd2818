use serde::Serialize;

use super::MonthKey;

/// Which step of the per-month pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Fetch,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthFailure {
    pub month: MonthKey,
    pub stage: FailureStage,
    pub reason: String,
}

/// Aggregate outcome of one sync run.
///
/// `requested` counts the months that were missing from the destination and
/// therefore attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub requested: usize,
    pub fetched: usize,
    pub uploaded: usize,
    pub skipped_duplicate: usize,
    pub failed_fetches: usize,
    pub failed_writes: usize,
    pub uploaded_months: Vec<MonthKey>,
    pub failures: Vec<MonthFailure>,
}

impl SyncReport {
    pub fn record_failure(&mut self, month: MonthKey, stage: FailureStage, reason: impl Into<String>) {
        match stage {
            FailureStage::Fetch => self.failed_fetches += 1,
            FailureStage::Write => self.failed_writes += 1,
        }
        self.failures.push(MonthFailure {
            month,
            stage,
            reason: reason.into(),
        });
    }

    pub fn record_upload(&mut self, month: MonthKey) {
        self.uploaded += 1;
        self.uploaded_months.push(month);
    }

    pub fn has_failures(&self) -> bool {
        self.failed_fetches + self.failed_writes > 0
    }

    /// Nothing was missing, or everything missing turned out to be present.
    pub fn is_up_to_date(&self) -> bool {
        self.uploaded == 0 && !self.has_failures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_failure_counts_by_stage() {
        let month = MonthKey::new(2025, 11).unwrap();
        let mut report = SyncReport::default();
        report.record_failure(month, FailureStage::Fetch, "timeout");
        report.record_failure(month, FailureStage::Write, "quota");

        assert_eq!(report.failed_fetches, 1);
        assert_eq!(report.failed_writes, 1);
        assert_eq!(report.failures.len(), 2);
        assert!(report.has_failures());
        assert!(!report.is_up_to_date());
    }

    #[test]
    fn empty_report_is_up_to_date() {
        assert!(SyncReport::default().is_up_to_date());
    }
}
