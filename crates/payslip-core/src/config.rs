//! Configuration module
//!
//! Settings for the Paybooks source, the destination store, the local
//! archive and email notification. Loaded once from the environment (and an
//! optional `.env` file) and passed explicitly to every component.

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_MAX_MONTHS_BACK, DEFAULT_ROOT_FOLDER, GOOGLE_API_URL, MAX_MONTHS_BACK_LIMIT,
    PAYBOOKS_API_URL,
};
use crate::storage_types::DestinationBackend;

const HTTP_TIMEOUT_SECS: u64 = 30;
const LOGIN_TIMEOUT_SECS: u64 = 120;
const FETCH_DELAY_MS: u64 = 1000;
const SMTP_PORT: u16 = 587;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    // Paybooks source
    pub paybooks_api_url: String,
    pub paybooks_login_token: Option<String>,
    pub paybooks_request_data: Option<String>,
    pub paybooks_login_command: Option<String>,
    pub paybooks_login_timeout_secs: u64,
    pub token_file: PathBuf,
    pub http_timeout_secs: u64,
    pub fetch_delay_ms: u64,
    pub max_months_back: u32,
    // Local archive and logs
    pub download_folder: PathBuf,
    pub keep_local_copies: bool,
    pub log_folder: PathBuf,
    // Destination
    pub destination_backend: DestinationBackend,
    pub drive_root_folder: String,
    pub drive_token_file: PathBuf,
    pub google_api_url: String,
    pub local_destination_path: Option<PathBuf>,
    // Email notification
    pub email_sender: Option<String>,
    pub email_password: Option<String>,
    pub email_recipient: Option<String>,
    pub smtp_server: String,
    pub smtp_port: u16,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<SyncConfig>);

impl Config {
    fn inner(&self) -> &SyncConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = SyncConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn paybooks_api_url(&self) -> &str {
        &self.inner().paybooks_api_url
    }

    pub fn paybooks_login_token(&self) -> Option<&str> {
        self.inner().paybooks_login_token.as_deref()
    }

    pub fn paybooks_request_data(&self) -> Option<&str> {
        self.inner().paybooks_request_data.as_deref()
    }

    pub fn paybooks_login_command(&self) -> Option<&str> {
        self.inner().paybooks_login_command.as_deref()
    }

    pub fn paybooks_login_timeout_secs(&self) -> u64 {
        self.inner().paybooks_login_timeout_secs
    }

    pub fn token_file(&self) -> &Path {
        &self.inner().token_file
    }

    pub fn http_timeout_secs(&self) -> u64 {
        self.inner().http_timeout_secs
    }

    pub fn fetch_delay_ms(&self) -> u64 {
        self.inner().fetch_delay_ms
    }

    pub fn max_months_back(&self) -> u32 {
        self.inner().max_months_back
    }

    pub fn download_folder(&self) -> &Path {
        &self.inner().download_folder
    }

    pub fn keep_local_copies(&self) -> bool {
        self.inner().keep_local_copies
    }

    pub fn log_folder(&self) -> &Path {
        &self.inner().log_folder
    }

    pub fn destination_backend(&self) -> DestinationBackend {
        self.inner().destination_backend
    }

    pub fn drive_root_folder(&self) -> &str {
        &self.inner().drive_root_folder
    }

    pub fn drive_token_file(&self) -> &Path {
        &self.inner().drive_token_file
    }

    pub fn google_api_url(&self) -> &str {
        &self.inner().google_api_url
    }

    pub fn local_destination_path(&self) -> Option<&Path> {
        self.inner().local_destination_path.as_deref()
    }

    pub fn email_sender(&self) -> Option<&str> {
        self.inner().email_sender.as_deref()
    }

    pub fn email_password(&self) -> Option<&str> {
        self.inner().email_password.as_deref()
    }

    pub fn email_recipient(&self) -> Option<&str> {
        self.inner().email_recipient.as_deref()
    }

    pub fn smtp_server(&self) -> &str {
        &self.inner().smtp_server
    }

    pub fn smtp_port(&self) -> u16 {
        self.inner().smtp_port
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| {
            non_empty(key)
                .map(|v| v.to_lowercase().parse().unwrap_or(default))
                .unwrap_or(default)
        };

        let destination_backend = match non_empty("DESTINATION_BACKEND") {
            Some(raw) => raw.parse()?,
            None => DestinationBackend::Drive,
        };

        let max_months_back = match non_empty("MAX_MONTHS_BACK") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_MONTHS_BACK must be a positive number"))?,
            None => DEFAULT_MAX_MONTHS_BACK,
        };

        let config = SyncConfig {
            paybooks_api_url: non_empty("PAYBOOKS_API_URL")
                .unwrap_or_else(|| PAYBOOKS_API_URL.to_string()),
            paybooks_login_token: non_empty("PAYBOOKS_LOGIN_TOKEN"),
            paybooks_request_data: non_empty("PAYBOOKS_REQUEST_DATA"),
            paybooks_login_command: non_empty("PAYBOOKS_LOGIN_COMMAND"),
            paybooks_login_timeout_secs: non_empty("PAYBOOKS_LOGIN_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(LOGIN_TIMEOUT_SECS),
            token_file: non_empty("PAYBOOKS_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".paybooks_token")),
            http_timeout_secs: non_empty("PAYBOOKS_HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or(HTTP_TIMEOUT_SECS),
            fetch_delay_ms: non_empty("FETCH_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(FETCH_DELAY_MS),
            max_months_back,
            download_folder: non_empty("DOWNLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("downloads")),
            keep_local_copies: flag("KEEP_LOCAL_COPIES", true),
            log_folder: non_empty("LOG_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            destination_backend,
            drive_root_folder: lookup("GOOGLE_DRIVE_ROOT_FOLDER")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_ROOT_FOLDER.to_string()),
            drive_token_file: non_empty("GOOGLE_DRIVE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("token.json")),
            google_api_url: non_empty("GOOGLE_DRIVE_API_URL")
                .unwrap_or_else(|| GOOGLE_API_URL.to_string()),
            local_destination_path: non_empty("LOCAL_DESTINATION_PATH").map(PathBuf::from),
            email_sender: non_empty("EMAIL_SENDER"),
            email_password: non_empty("EMAIL_PASSWORD"),
            email_recipient: non_empty("EMAIL_RECIPIENT"),
            smtp_server: non_empty("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: non_empty("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0)
                .unwrap_or(SMTP_PORT),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(1..=MAX_MONTHS_BACK_LIMIT).contains(&self.max_months_back) {
            return Err(anyhow::anyhow!(
                "MAX_MONTHS_BACK must be between 1 and {}",
                MAX_MONTHS_BACK_LIMIT
            ));
        }

        if self.drive_root_folder.is_empty() {
            return Err(anyhow::anyhow!("GOOGLE_DRIVE_ROOT_FOLDER must not be empty"));
        }

        if self.destination_backend == DestinationBackend::Local
            && self.local_destination_path.is_none()
        {
            return Err(anyhow::anyhow!(
                "LOCAL_DESTINATION_PATH must be set when using the local destination backend"
            ));
        }

        Ok(())
    }
}
