use crate::layout::{folder_chain, is_document, validate_segment};
use crate::traits::{Destination, StorageError, StorageResult, WriteOutcome};
use crate::DestinationBackend;
use async_trait::async_trait;
use payslip_core::{MonthKey, PayslipArtifact};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem destination with the same root/year/month layout as Drive.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    root_folder: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Directory that contains the root folder (e.g., "/mnt/nas")
    /// * `root_folder` - Name of the root folder (e.g., "Pay Slips")
    pub async fn new(base_path: impl Into<PathBuf>, root_folder: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();
        let root_folder = root_folder.into();
        validate_segment(&root_folder)?;

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create destination directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            root_folder,
        })
    }

    fn root_path(&self) -> PathBuf {
        self.base_path.join(&self.root_folder)
    }

    fn month_dir(&self, month: &MonthKey) -> PathBuf {
        folder_chain(&self.root_folder, month)
            .iter()
            .fold(self.base_path.clone(), |path, segment| path.join(segment))
    }

    /// Immediate child directories of `dir` as (name, path) pairs.
    async fn child_dirs(dir: &Path) -> StorageResult<Vec<(String, PathBuf)>> {
        let mut entries = fs::read_dir(dir).await.map_err(|e| {
            StorageError::ListFailed(format!("Failed to read {}: {}", dir.display(), e))
        })?;

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    dirs.push((name.to_string(), entry.path()));
                }
            }
        }
        Ok(dirs)
    }

    async fn has_document(dir: &Path) -> StorageResult<bool> {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_document(name, None) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl Destination for LocalStorage {
    async fn list_stored_months(&self) -> StorageResult<BTreeSet<MonthKey>> {
        let root = self.root_path();
        let mut stored = BTreeSet::new();

        if !fs::try_exists(&root).await.unwrap_or(false) {
            tracing::debug!(root = %root.display(), "Destination root does not exist yet");
            return Ok(stored);
        }

        for (year_name, year_path) in Self::child_dirs(&root).await? {
            for (month_name, month_path) in Self::child_dirs(&year_path).await? {
                let Some(month) = MonthKey::from_names(&month_name, &year_name) else {
                    continue;
                };
                if Self::has_document(&month_path).await? {
                    stored.insert(month);
                }
            }
        }

        tracing::debug!(count = stored.len(), root = %root.display(), "Local destination indexed");
        Ok(stored)
    }

    async fn write(&self, artifact: &PayslipArtifact) -> StorageResult<WriteOutcome> {
        let dir = self.month_dir(&artifact.month);
        let file_name = artifact.destination_file_name();
        let path = dir.join(&file_name);
        let start = std::time::Instant::now();

        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::FolderFailed(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::info!(path = %path.display(), "File already exists at destination");
                return Ok(WriteOutcome::Duplicate);
            }
            Err(e) => {
                return Err(StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let written = async {
            file.write_all(&artifact.content).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // A half-written file would later be mistaken for a stored month.
            let _ = fs::remove_file(&path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            size_bytes = artifact.size_bytes(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local destination write successful"
        );

        Ok(WriteOutcome::Uploaded {
            file_id: path.display().to_string(),
            web_link: None,
        })
    }

    fn backend_type(&self) -> DestinationBackend {
        DestinationBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn artifact(year: i32, month: u32) -> PayslipArtifact {
        PayslipArtifact::new(MonthKey::new(year, month).unwrap(), b"%PDF-1.4 test".to_vec())
    }

    #[tokio::test]
    async fn test_write_then_list_round_trip() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "Pay Slips").await.unwrap();

        let outcome = storage.write(&artifact(2025, 12)).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Uploaded { .. }));

        let expected = dir
            .path()
            .join("Pay Slips")
            .join("2025")
            .join("December")
            .join("December_2025_PaySlip.pdf");
        assert!(expected.exists());

        let stored = storage.list_stored_months().await.unwrap();
        assert!(stored.contains(&MonthKey::new(2025, 12).unwrap()));
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_second_write_is_duplicate_and_keeps_original() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "Pay Slips").await.unwrap();

        let first = storage.write(&artifact(2025, 12)).await.unwrap();
        assert!(matches!(first, WriteOutcome::Uploaded { .. }));

        let replacement = PayslipArtifact::new(MonthKey::new(2025, 12).unwrap(), b"other".to_vec());
        let second = storage.write(&replacement).await.unwrap();
        assert_eq!(second, WriteOutcome::Duplicate);

        let month_dir = dir.path().join("Pay Slips").join("2025").join("December");
        let files: Vec<_> = std::fs::read_dir(&month_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        let content = std::fs::read(month_dir.join("December_2025_PaySlip.pdf")).unwrap();
        assert_eq!(content, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_missing_root_lists_empty_without_creating_it() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "Pay Slips").await.unwrap();

        let stored = storage.list_stored_months().await.unwrap();
        assert!(stored.is_empty());
        assert!(!dir.path().join("Pay Slips").exists());
    }

    #[tokio::test]
    async fn test_index_ignores_foreign_folders_and_empty_months() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("Pay Slips");
        std::fs::create_dir_all(root.join("Archive").join("December")).unwrap();
        std::fs::write(root.join("Archive").join("December").join("x.pdf"), b"x").unwrap();
        std::fs::create_dir_all(root.join("2025").join("Dec")).unwrap();
        std::fs::write(root.join("2025").join("Dec").join("x.pdf"), b"x").unwrap();
        std::fs::create_dir_all(root.join("2025").join("November")).unwrap();
        std::fs::create_dir_all(root.join("2025").join("October")).unwrap();
        std::fs::write(root.join("2025").join("October").join("notes.txt"), b"x").unwrap();
        std::fs::create_dir_all(root.join("2024").join("March")).unwrap();
        std::fs::write(root.join("2024").join("March").join("March_2024_PaySlip.pdf"), b"x").unwrap();

        let storage = LocalStorage::new(dir.path(), "Pay Slips").await.unwrap();
        let stored = storage.list_stored_months().await.unwrap();

        assert_eq!(stored.into_iter().collect::<Vec<_>>(), vec![MonthKey::new(2024, 3).unwrap()]);
    }

    #[tokio::test]
    async fn test_invalid_root_rejected() {
        let dir = tempdir().unwrap();
        let result = LocalStorage::new(dir.path(), "../escape").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }
}
