#[cfg(feature = "storage-drive")]
use crate::DriveStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Destination, DestinationBackend, StorageError, StorageResult};
use payslip_core::Config;
use std::sync::Arc;

/// Create a destination backend based on configuration
pub async fn create_destination(config: &Config) -> StorageResult<Arc<dyn Destination>> {
    match config.destination_backend() {
        #[cfg(feature = "storage-drive")]
        DestinationBackend::Drive => {
            let storage = DriveStorage::from_token_file(
                config.google_api_url(),
                config.drive_root_folder(),
                config.drive_token_file(),
                std::time::Duration::from_secs(config.http_timeout_secs()),
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-drive"))]
        DestinationBackend::Drive => Err(StorageError::ConfigError(
            "Google Drive backend not available (storage-drive feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        DestinationBackend::Local => {
            let base_path = config.local_destination_path().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_DESTINATION_PATH not configured".to_string())
            })?;

            let storage = LocalStorage::new(base_path, config.drive_root_folder()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        DestinationBackend::Local => Err(StorageError::ConfigError(
            "Local destination backend not available (storage-local feature not enabled)"
                .to_string(),
        )),
    }
}
