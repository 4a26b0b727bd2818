use chrono::{DateTime, Utc};
use payslip_core::models::StoredToken;
use payslip_core::{AuthToken, AuthenticationError};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Persists the Paybooks login token between runs.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load_token(&self) -> Option<AuthToken> {
        self.load_token_at(Utc::now()).await
    }

    /// The saved token, if one exists, parses, and is still fresh at `now`.
    pub async fn load_token_at(&self, now: DateTime<Utc>) -> Option<AuthToken> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No saved token");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read saved token");
                return None;
            }
        };

        let token = serde_json::from_str::<StoredToken>(&raw)
            .ok()
            .and_then(AuthToken::from_stored);
        let Some(token) = token else {
            tracing::warn!(path = %self.path.display(), "Saved token file is malformed, ignoring it");
            return None;
        };

        if !token.is_fresh_at(now) {
            tracing::info!(
                age_hours = token.age_at(now).num_hours(),
                "Saved token expired, fresh login required"
            );
            return None;
        }

        tracing::info!("Using saved token");
        Some(token)
    }

    /// Write to a sibling temp file and rename it into place.
    pub async fn save_token(&self, token: &AuthToken) -> Result<(), AuthenticationError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                AuthenticationError::Store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(&token.to_stored())
            .map_err(|e| AuthenticationError::Store(e.to_string()))?;

        let tmp = self.temp_path();
        fs::write(&tmp, json).await.map_err(|e| {
            AuthenticationError::Store(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(AuthenticationError::Store(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }

        tracing::info!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}
