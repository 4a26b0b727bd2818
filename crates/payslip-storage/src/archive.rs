//! Local archive of downloaded pay slips.
//!
//! Files are written as `payslip_MMYY.pdf` inside the download folder. The
//! archive is a convenience copy; the destination is the source of truth.

use crate::traits::{StorageError, StorageResult};
use payslip_core::{MonthKey, PayslipArtifact};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct LocalArchive {
    folder: PathBuf,
}

impl LocalArchive {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn path_for(&self, month: &MonthKey) -> PathBuf {
        self.folder.join(month.archive_file_name())
    }

    /// Write the artifact, replacing any previous copy for the same month.
    pub async fn save(&self, artifact: &PayslipArtifact) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.folder).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create download folder {}: {}",
                self.folder.display(),
                e
            ))
        })?;

        let path = self.path_for(&artifact.month);
        fs::write(&path, &artifact.content).await?;

        tracing::debug!(path = %path.display(), size_bytes = artifact.size_bytes(), "Saved local copy");
        Ok(path)
    }

    /// Delete the archived copy for `month`. A missing file is not an error.
    pub async fn remove(&self, month: &MonthKey) -> StorageResult<()> {
        let path = self.path_for(month);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed local copy");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_uses_mmyy_name_and_creates_folder() {
        let dir = tempdir().unwrap();
        let archive = LocalArchive::new(dir.path().join("downloads"));
        let month = MonthKey::new(2025, 3).unwrap();

        let path = archive
            .save(&PayslipArtifact::new(month, b"%PDF".to_vec()))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("downloads").join("payslip_0325.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let archive = LocalArchive::new(dir.path());
        let month = MonthKey::new(2025, 3).unwrap();

        archive
            .save(&PayslipArtifact::new(month, b"%PDF".to_vec()))
            .await
            .unwrap();
        archive.remove(&month).await.unwrap();
        assert!(!archive.path_for(&month).exists());
        archive.remove(&month).await.unwrap();
    }
}
