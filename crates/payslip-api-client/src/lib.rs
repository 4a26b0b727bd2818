//! HTTP client for the Paybooks payslip API.
//!
//! Provides a minimal client around the single `PayslipDownload` endpoint,
//! a form POST helper, and the request/response codec in [`api`].
//! The services crate uses this client through its `PaybooksSource`.

pub mod api;

use anyhow::{Context, Result};
use payslip_core::{Config, FetchError};
use reqwest::Client;
use std::time::Duration;

/// Desktop browser User-Agent; the endpoint rejects obvious script clients.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const ERROR_BODY_LIMIT: usize = 200;

/// HTTP client for the Paybooks payslip endpoint.
#[derive(Clone, Debug)]
pub struct PaybooksClient {
    client: Client,
    endpoint: String,
}

impl PaybooksClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create client from configuration: PAYBOOKS_API_URL and PAYBOOKS_HTTP_TIMEOUT_SECS.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.paybooks_api_url(),
            Duration::from_secs(config.http_timeout_secs()),
        )
    }

    /// POST a form-urlencoded body and return the response text.
    ///
    /// Non-2xx responses become [`FetchError::Status`] with the body cut to
    /// 200 characters; connection errors and timeouts become
    /// [`FetchError::Transport`].
    pub async fn post_form(&self, fields: &[(&str, &str)]) -> Result<String, FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(fields)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&error_text, ERROR_BODY_LIMIT),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read response body: {}", e)))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
