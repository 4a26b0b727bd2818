use chrono::{Local, NaiveDate};
use payslip_core::{FailureStage, MonthKey, SyncError, SyncReport};
use payslip_storage::{Destination, LocalArchive, WriteOutcome};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::source::PayslipSource;

const DEFAULT_FETCH_DELAY: Duration = Duration::from_secs(1);

/// Brings the destination up to date with the source for a window of recent
/// months.
///
/// All work is sequential: one fetch, one archive write and one destination
/// write at a time.
#[derive(Clone)]
pub struct SyncEngine {
    source: Arc<dyn PayslipSource>,
    destination: Arc<dyn Destination>,
    archive: LocalArchive,
    fetch_delay: Duration,
    keep_local_copies: bool,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn PayslipSource>,
        destination: Arc<dyn Destination>,
        archive: LocalArchive,
    ) -> Self {
        Self {
            source,
            destination,
            archive,
            fetch_delay: DEFAULT_FETCH_DELAY,
            keep_local_copies: true,
        }
    }

    /// Pause between consecutive remote fetches.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn with_keep_local_copies(mut self, keep: bool) -> Self {
        self.keep_local_copies = keep;
        self
    }

    pub async fn sync(&self, max_months_back: u32) -> Result<SyncReport, SyncError> {
        self.sync_at(Local::now().date_naive(), max_months_back).await
    }

    /// Sync the `max_months_back` months before the month containing `today`.
    #[tracing::instrument(skip(self), fields(backend = %self.destination.backend_type()))]
    pub async fn sync_at(
        &self,
        today: NaiveDate,
        max_months_back: u32,
    ) -> Result<SyncReport, SyncError> {
        let stored = self.stored_months().await;

        let candidates = MonthKey::recent(today, max_months_back);
        let missing: Vec<MonthKey> = candidates
            .iter()
            .copied()
            .filter(|month| !stored.contains(month))
            .collect();

        tracing::info!(
            checked = candidates.len(),
            stored = candidates.len() - missing.len(),
            missing = missing.len(),
            "Computed missing months"
        );

        let mut report = SyncReport {
            requested: missing.len(),
            ..SyncReport::default()
        };
        if missing.is_empty() {
            tracing::info!("All months already synced");
            return Ok(report);
        }

        self.source.authenticate().await?;

        for (index, month) in missing.into_iter().enumerate() {
            if index > 0 && !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            self.sync_month(month, &mut report).await;
        }

        tracing::info!(
            requested = report.requested,
            fetched = report.fetched,
            uploaded = report.uploaded,
            skipped_duplicate = report.skipped_duplicate,
            failed_fetches = report.failed_fetches,
            failed_writes = report.failed_writes,
            "Sync complete"
        );
        Ok(report)
    }

    /// An unreadable destination is treated as empty; the writer's own
    /// same-name check still prevents overwrites.
    async fn stored_months(&self) -> BTreeSet<MonthKey> {
        match self.destination.list_stored_months().await {
            Ok(stored) => {
                tracing::info!(count = stored.len(), "Found existing months in destination");
                stored
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to list destination, assuming it is empty");
                BTreeSet::new()
            }
        }
    }

    async fn sync_month(&self, month: MonthKey, report: &mut SyncReport) {
        let artifact = match self.source.fetch(&month).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                tracing::warn!(month = %month, "No payslip available");
                report.record_failure(month, FailureStage::Fetch, "no document returned");
                return;
            }
            Err(e) => {
                tracing::warn!(month = %month, error = %e, "Payslip download failed");
                report.record_failure(month, FailureStage::Fetch, e.to_string());
                return;
            }
        };
        report.fetched += 1;

        let archived = match self.archive.save(&artifact).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(month = %month, error = %e, "Failed to keep local copy");
                None
            }
        };

        match self.destination.write(&artifact).await {
            Ok(WriteOutcome::Uploaded { file_id, .. }) => {
                tracing::info!(month = %month, file_id = %file_id, "Payslip uploaded");
                report.record_upload(month);
                if !self.keep_local_copies && archived.is_some() {
                    if let Err(e) = self.archive.remove(&month).await {
                        tracing::warn!(month = %month, error = %e, "Failed to remove local copy");
                    }
                }
            }
            Ok(WriteOutcome::Duplicate) => {
                tracing::info!(month = %month, "Payslip already in destination");
                report.skipped_duplicate += 1;
            }
            Err(e) => {
                tracing::error!(month = %month, error = %e, "Upload failed, local copy kept");
                report.record_failure(month, FailureStage::Write, e.to_string());
            }
        }
    }
}
