use crate::layout::{folder_chain, is_document, validate_segment};
use crate::traits::{Destination, StorageError, StorageResult, WriteOutcome};
use crate::DestinationBackend;
use async_trait::async_trait;
use bytes::Bytes;
use payslip_core::constants::PDF_CONTENT_TYPE;
use payslip_core::{MonthKey, PayslipArtifact};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Alias for the top of "My Drive".
const MY_DRIVE: &str = "root";
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Google "authorized user" credentials, as saved in `token.json` after the
/// one-time OAuth consent.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUserCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl AuthorizedUserCredentials {
    pub async fn from_file(path: &Path) -> StorageResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to read Google Drive credentials {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::ConfigError(format!(
                "Invalid Google Drive credentials in {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedAccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    web_view_link: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum ChildKind {
    Folder,
    NonFolder,
}

/// Google Drive v3 destination
#[derive(Clone)]
pub struct DriveStorage {
    client: Client,
    api_base: String,
    root_folder: String,
    credentials: AuthorizedUserCredentials,
    access_token: std::sync::Arc<Mutex<Option<CachedAccessToken>>>,
}

impl DriveStorage {
    /// Create a new DriveStorage instance
    ///
    /// # Arguments
    /// * `api_base` - Google API base URL (e.g., "https://www.googleapis.com")
    /// * `root_folder` - Name of the top-level folder in My Drive (e.g., "Pay Slips")
    /// * `credentials` - Authorized-user OAuth credentials used to mint access tokens
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_base: impl Into<String>,
        root_folder: impl Into<String>,
        credentials: AuthorizedUserCredentials,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let root_folder = root_folder.into();
        validate_segment(&root_folder)?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(DriveStorage {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            root_folder,
            credentials,
            access_token: std::sync::Arc::new(Mutex::new(None)),
        })
    }

    /// Create from an authorized-user `token.json` file.
    pub async fn from_token_file(
        api_base: impl Into<String>,
        root_folder: impl Into<String>,
        token_file: &Path,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let credentials = AuthorizedUserCredentials::from_file(token_file).await?;
        Self::new(api_base, root_folder, credentials, timeout)
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.api_base)
    }

    /// Return a cached access token, minting a new one from the refresh token
    /// when the cached one is missing or about to expire.
    async fn access_token(&self) -> StorageResult<String> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(self.credentials.token_uri())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StorageError::AuthFailed(format!("Token request failed: {}", e)))?;

        let response = ensure_success(response)
            .await
            .map_err(StorageError::AuthFailed)?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| StorageError::AuthFailed(format!("Invalid token response: {}", e)))?;

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        *cached = Some(CachedAccessToken {
            value: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        tracing::debug!(expires_in_secs = lifetime.as_secs(), "Google Drive access token refreshed");

        Ok(body.access_token)
    }

    /// Immediate children of `parent_id`, optionally restricted to one exact name.
    async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
        name: Option<&str>,
    ) -> StorageResult<Vec<DriveFile>> {
        let token = self.access_token().await?;
        let q = child_query(parent_id, kind, name);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("q", q.clone()),
                ("spaces", "drive".to_string()),
                ("fields", "nextPageToken,files(id,name,mimeType)".to_string()),
                ("pageSize", "1000".to_string()),
            ];
            if let Some(page) = page_token.take() {
                query.push(("pageToken", page));
            }

            let response = self
                .client
                .get(self.files_url())
                .bearer_auth(&token)
                .query(&query)
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;
            let response = ensure_success(response)
                .await
                .map_err(StorageError::ListFailed)?;
            let page: FileList = response
                .json()
                .await
                .map_err(|e| StorageError::ListFailed(format!("Invalid file list: {}", e)))?;

            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn find_child(
        &self,
        parent_id: &str,
        kind: ChildKind,
        name: &str,
    ) -> StorageResult<Option<DriveFile>> {
        let mut matches = self.list_children(parent_id, kind, Some(name)).await?;
        // Drive allows same-named siblings; the first match wins.
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> StorageResult<String> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.files_url())
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&serde_json::json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }))
            .send()
            .await
            .map_err(|e| StorageError::FolderFailed(e.to_string()))?;
        let response = ensure_success(response)
            .await
            .map_err(StorageError::FolderFailed)?;

        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = response
            .json()
            .await
            .map_err(|e| StorageError::FolderFailed(format!("Invalid create response: {}", e)))?;

        tracing::info!(folder = %name, folder_id = %created.id, "Created Drive folder");
        Ok(created.id)
    }

    async fn find_or_create_folder(&self, parent_id: &str, name: &str) -> StorageResult<String> {
        if let Some(existing) = self.find_child(parent_id, ChildKind::Folder, name).await? {
            tracing::debug!(folder = %name, folder_id = %existing.id, "Found existing Drive folder");
            return Ok(existing.id);
        }
        self.create_folder(parent_id, name).await
    }

    /// Resumable upload: initiate a session with the metadata, then PUT the bytes.
    async fn upload_pdf(&self, folder_id: &str, name: &str, content: Bytes) -> StorageResult<DriveFile> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(&token)
            .query(&[("uploadType", "resumable"), ("fields", "id,name,webViewLink")])
            .header("X-Upload-Content-Type", PDF_CONTENT_TYPE)
            .header("X-Upload-Content-Length", content.len().to_string())
            .json(&serde_json::json!({
                "name": name,
                "mimeType": PDF_CONTENT_TYPE,
                "parents": [folder_id],
            }))
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        let response = ensure_success(response)
            .await
            .map_err(StorageError::UploadFailed)?;

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StorageError::UploadFailed("Upload session URI missing".to_string()))?;

        let response = self
            .client
            .put(&session_uri)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, PDF_CONTENT_TYPE)
            .body(content)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        let response = ensure_success(response)
            .await
            .map_err(StorageError::UploadFailed)?;

        response
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Invalid upload response: {}", e)))
    }
}

#[async_trait]
impl Destination for DriveStorage {
    async fn list_stored_months(&self) -> StorageResult<BTreeSet<MonthKey>> {
        let mut stored = BTreeSet::new();

        let Some(root) = self
            .find_child(MY_DRIVE, ChildKind::Folder, &self.root_folder)
            .await?
        else {
            tracing::info!(root = %self.root_folder, "Drive root folder not found");
            return Ok(stored);
        };

        for year in self.list_children(&root.id, ChildKind::Folder, None).await? {
            if year.name.len() != 4 || !year.name.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }

            for month_folder in self.list_children(&year.id, ChildKind::Folder, None).await? {
                let Some(month) = MonthKey::from_names(&month_folder.name, &year.name) else {
                    continue;
                };
                let entries = self
                    .list_children(&month_folder.id, ChildKind::NonFolder, None)
                    .await?;
                if entries
                    .iter()
                    .any(|entry| is_document(&entry.name, entry.mime_type.as_deref()))
                {
                    stored.insert(month);
                }
            }
        }

        tracing::debug!(count = stored.len(), "Drive destination indexed");
        Ok(stored)
    }

    async fn write(&self, artifact: &PayslipArtifact) -> StorageResult<WriteOutcome> {
        let start = Instant::now();
        let file_name = artifact.destination_file_name();

        let mut parent = MY_DRIVE.to_string();
        for segment in folder_chain(&self.root_folder, &artifact.month) {
            validate_segment(&segment)?;
            parent = self.find_or_create_folder(&parent, &segment).await?;
        }

        if self
            .find_child(&parent, ChildKind::NonFolder, &file_name)
            .await?
            .is_some()
        {
            tracing::info!(file = %file_name, "File already exists in Google Drive");
            return Ok(WriteOutcome::Duplicate);
        }

        let uploaded = self
            .upload_pdf(&parent, &file_name, artifact.content.clone())
            .await?;

        tracing::info!(
            file = %uploaded.name,
            file_id = %uploaded.id,
            size_bytes = artifact.size_bytes(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Google Drive upload successful"
        );

        Ok(WriteOutcome::Uploaded {
            file_id: uploaded.id,
            web_link: uploaded.web_view_link,
        })
    }

    fn backend_type(&self) -> DestinationBackend {
        DestinationBackend::Drive
    }
}

/// Drive query-language string literal escaping.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn child_query(parent_id: &str, kind: ChildKind, name: Option<&str>) -> String {
    let mut q = format!("'{}' in parents and trashed = false", escape_query(parent_id));
    if let Some(name) = name {
        q.push_str(&format!(" and name = '{}'", escape_query(name)));
    }
    match kind {
        ChildKind::Folder => q.push_str(&format!(" and mimeType = '{}'", FOLDER_MIME_TYPE)),
        ChildKind::NonFolder => q.push_str(&format!(" and mimeType != '{}'", FOLDER_MIME_TYPE)),
    }
    q
}

/// Pass successful responses through; turn anything else into a short message.
async fn ensure_success(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(format!("status {}: {}", status, body.chars().take(200).collect::<String>()))
}

#[cfg(all(test, feature = "storage-drive"))]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    const FILES_PATH: &str = r"^/drive/v3/files";

    fn credentials(server: &ServerGuard) -> AuthorizedUserCredentials {
        AuthorizedUserCredentials {
            client_id: "client".into(),
            client_secret: "secret".into(),
            refresh_token: "refresh".into(),
            token_uri: Some(format!("{}/token", server.url())),
        }
    }

    fn storage(server: &ServerGuard) -> DriveStorage {
        DriveStorage::new(server.url(), "Pay Slips", credentials(server), Duration::from_secs(5))
            .unwrap()
    }

    fn december() -> PayslipArtifact {
        PayslipArtifact::new(MonthKey::new(2025, 12).unwrap(), b"%PDF-1.4".to_vec())
    }

    async fn mock_token(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
            .with_status(200)
            .with_body(r#"{"access_token":"ya29.test","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await
    }

    async fn mock_list(
        server: &mut ServerGuard,
        parent: &str,
        kind: ChildKind,
        name: Option<&str>,
        files: &str,
    ) -> mockito::Mock {
        server
            .mock("GET", Matcher::Regex(FILES_PATH.into()))
            .match_query(Matcher::UrlEncoded("q".into(), child_query(parent, kind, name)))
            .match_header("authorization", "Bearer ya29.test")
            .with_status(200)
            .with_body(format!(r#"{{"files":{}}}"#, files))
            .create_async()
            .await
    }

    #[test]
    fn query_escapes_quotes() {
        let q = child_query("root", ChildKind::Folder, Some("Bob's Slips"));
        assert_eq!(
            q,
            "'root' in parents and trashed = false and name = 'Bob\\'s Slips' \
             and mimeType = 'application/vnd.google-apps.folder'"
        );
    }

    #[tokio::test]
    async fn test_write_creates_missing_folders_then_uploads() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server).await;
        let _list_1 = mock_list(&mut server, "root", ChildKind::Folder, Some("Pay Slips"), "[]").await;
        let _list_2 = mock_list(&mut server, "root-id", ChildKind::Folder, Some("2025"), "[]").await;
        let _list_3 = mock_list(&mut server, "year-id", ChildKind::Folder, Some("December"), "[]").await;
        let _list_4 = mock_list(
            &mut server,
            "month-id",
            ChildKind::NonFolder,
            Some("December_2025_PaySlip.pdf"),
            "[]",
        )
        .await;

        let mut creates = Vec::new();
        for (name, parent, id) in [
            ("Pay Slips", "root", "root-id"),
            ("2025", "root-id", "year-id"),
            ("December", "year-id", "month-id"),
        ] {
            creates.push(
                server
                    .mock("POST", Matcher::Regex(FILES_PATH.into()))
                    .match_body(Matcher::PartialJson(serde_json::json!({
                        "name": name,
                        "parents": [parent],
                    })))
                    .with_status(200)
                    .with_body(format!(r#"{{"id":"{}"}}"#, id))
                    .expect(1)
                    .create_async()
                    .await,
            );
        }

        let session = format!("{}/upload/session/1", server.url());
        let init = server
            .mock("POST", Matcher::Regex(r"^/upload/drive/v3/files".into()))
            .match_query(Matcher::UrlEncoded("uploadType".into(), "resumable".into()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "December_2025_PaySlip.pdf",
                "parents": ["month-id"],
            })))
            .with_status(200)
            .with_header("location", &session)
            .expect(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/upload/session/1")
            .match_body("%PDF-1.4")
            .with_status(200)
            .with_body(
                r#"{"id":"file-1","name":"December_2025_PaySlip.pdf","webViewLink":"https://drive/file-1"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let outcome = storage(&server).write(&december()).await.unwrap();

        assert_eq!(
            outcome,
            WriteOutcome::Uploaded {
                file_id: "file-1".into(),
                web_link: Some("https://drive/file-1".into()),
            }
        );
        for create in creates {
            create.assert_async().await;
        }
        init.assert_async().await;
        put.assert_async().await;
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_existing_file_is_reported_as_duplicate() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _list_5 = mock_list(
            &mut server,
            "root",
            ChildKind::Folder,
            Some("Pay Slips"),
            r#"[{"id":"root-id","name":"Pay Slips"}]"#,
        )
        .await;
        let _list_6 = mock_list(
            &mut server,
            "root-id",
            ChildKind::Folder,
            Some("2025"),
            r#"[{"id":"year-id","name":"2025"}]"#,
        )
        .await;
        let _list_7 = mock_list(
            &mut server,
            "year-id",
            ChildKind::Folder,
            Some("December"),
            r#"[{"id":"month-id","name":"December"}]"#,
        )
        .await;
        let _list_8 = mock_list(
            &mut server,
            "month-id",
            ChildKind::NonFolder,
            Some("December_2025_PaySlip.pdf"),
            r#"[{"id":"file-1","name":"December_2025_PaySlip.pdf","mimeType":"application/pdf"}]"#,
        )
        .await;
        let create = server
            .mock("POST", Matcher::Regex(FILES_PATH.into()))
            .expect(0)
            .create_async()
            .await;
        let upload = server
            .mock("POST", Matcher::Regex(r"^/upload/".into()))
            .expect(0)
            .create_async()
            .await;

        let outcome = storage(&server).write(&december()).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Duplicate);
        create.assert_async().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_index_walks_year_and_month_folders() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _list_9 = mock_list(
            &mut server,
            "root",
            ChildKind::Folder,
            Some("Pay Slips"),
            r#"[{"id":"root-id","name":"Pay Slips"}]"#,
        )
        .await;
        let _list_10 = mock_list(
            &mut server,
            "root-id",
            ChildKind::Folder,
            None,
            r#"[{"id":"y2025","name":"2025"},{"id":"misc","name":"Archive"}]"#,
        )
        .await;
        let _list_11 = mock_list(
            &mut server,
            "y2025",
            ChildKind::Folder,
            None,
            r#"[{"id":"dec","name":"December"},{"id":"nov","name":"November"},{"id":"odd","name":"Bonus"}]"#,
        )
        .await;
        let _list_12 = mock_list(
            &mut server,
            "dec",
            ChildKind::NonFolder,
            None,
            r#"[{"id":"f1","name":"December_2025_PaySlip.pdf","mimeType":"application/pdf"}]"#,
        )
        .await;
        let _list_13 = mock_list(&mut server, "nov", ChildKind::NonFolder, None, "[]").await;

        let stored = storage(&server).list_stored_months().await.unwrap();

        assert_eq!(
            stored.into_iter().collect::<Vec<_>>(),
            vec![MonthKey::new(2025, 12).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_missing_root_yields_empty_index() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _list_14 = mock_list(&mut server, "root", ChildKind::Folder, Some("Pay Slips"), "[]").await;

        let stored = storage(&server).list_stored_months().await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_refresh_token_is_auth_failure() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let result = storage(&server).list_stored_months().await;
        assert!(matches!(result, Err(StorageError::AuthFailed(_))));
    }
}
