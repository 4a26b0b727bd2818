//! Paybooks login token acquisition.
//!
//! A token is obtained by trying a prioritized list of probes. Each probe is
//! independent; the first one that produces a non-empty token wins.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use payslip_api_client::api::extract_login_token;
use payslip_core::{AuthToken, AuthenticationError, Config};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Inputs longer than this are assumed to be a captured `requestData` value
/// rather than a bare token.
const REQUEST_DATA_MIN_LEN: usize = 100;

/// One strategy for obtaining a login token.
#[async_trait]
pub trait TokenProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means this probe has nothing to offer.
    async fn probe(&self) -> anyhow::Result<Option<String>>;
}

/// Turn pasted input into a bare token: long inputs that decode as captured
/// request data are unwrapped, anything else is taken as-is.
pub fn normalize_token_input(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() > REQUEST_DATA_MIN_LEN {
        if let Some(token) = extract_login_token(trimmed) {
            return Some(token);
        }
    }
    Some(trimmed.to_string())
}

/// A token supplied directly in configuration.
pub struct ConfiguredTokenProbe {
    token: Option<String>,
}

impl ConfiguredTokenProbe {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProbe for ConfiguredTokenProbe {
    fn name(&self) -> &'static str {
        "configured-token"
    }

    async fn probe(&self) -> anyhow::Result<Option<String>> {
        Ok(self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }
}

/// A `requestData` value captured from the portal's PayslipDownload request.
pub struct CapturedRequestProbe {
    request_data: Option<String>,
}

impl CapturedRequestProbe {
    pub fn new(request_data: Option<String>) -> Self {
        Self { request_data }
    }
}

#[async_trait]
impl TokenProbe for CapturedRequestProbe {
    fn name(&self) -> &'static str {
        "captured-request"
    }

    async fn probe(&self) -> anyhow::Result<Option<String>> {
        let Some(raw) = self.request_data.as_deref() else {
            return Ok(None);
        };
        extract_login_token(raw)
            .map(Some)
            .ok_or_else(|| anyhow!("requestData does not contain a LoginToken"))
    }
}

/// Runs an external login helper (e.g. a headless browser script) through
/// the shell and reads the token from its stdout.
pub struct LoginCommandProbe {
    command: String,
    timeout: Duration,
}

impl LoginCommandProbe {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TokenProbe for LoginCommandProbe {
    fn name(&self) -> &'static str {
        "login-command"
    }

    async fn probe(&self) -> anyhow::Result<Option<String>> {
        tracing::info!(timeout_secs = self.timeout.as_secs(), "Running login command");

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| anyhow!("Login command timed out after {}s", self.timeout.as_secs()))?
            .context("Failed to run login command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Login command exited with {}: {}",
                output.status,
                stderr.trim().chars().take(200).collect::<String>()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .and_then(normalize_token_input))
    }
}

/// Tries each probe in order until one yields a token.
pub struct TokenAcquirer {
    probes: Vec<Box<dyn TokenProbe>>,
}

impl TokenAcquirer {
    pub fn new(probes: Vec<Box<dyn TokenProbe>>) -> Self {
        Self { probes }
    }

    /// Probes in priority order: configured token, captured request data,
    /// login command. Unconfigured sources are left out.
    pub fn from_config(config: &Config) -> Self {
        let mut probes: Vec<Box<dyn TokenProbe>> = vec![
            Box::new(ConfiguredTokenProbe::new(
                config.paybooks_login_token().map(String::from),
            )),
            Box::new(CapturedRequestProbe::new(
                config.paybooks_request_data().map(String::from),
            )),
        ];
        if let Some(command) = config.paybooks_login_command() {
            probes.push(Box::new(LoginCommandProbe::new(
                command,
                Duration::from_secs(config.paybooks_login_timeout_secs()),
            )));
        }
        Self::new(probes)
    }

    pub async fn acquire(&self) -> Result<AuthToken, AuthenticationError> {
        for probe in &self.probes {
            match probe.probe().await {
                Ok(Some(token)) if !token.trim().is_empty() => {
                    tracing::info!(probe = probe.name(), "Login token obtained");
                    return Ok(AuthToken::new(token.trim(), Utc::now()));
                }
                Ok(_) => {
                    tracing::debug!(probe = probe.name(), "Probe yielded no token");
                }
                Err(e) => {
                    tracing::debug!(probe = probe.name(), error = %e, "Probe failed");
                }
            }
        }

        tracing::error!("Could not obtain a Paybooks login token");
        tracing::error!(
            "Manual extraction: log in to the Paybooks portal, open the browser developer tools \
             (Network tab), download any payslip, copy the 'requestData' value of the \
             PayslipDownload request and run `payslip-sync save-token <value>`"
        );
        Err(AuthenticationError::NoToken)
    }
}
