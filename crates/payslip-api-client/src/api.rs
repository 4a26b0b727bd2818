//! Wire codec for the Paybooks `PayslipDownload` endpoint.
//!
//! Both directions wrap JSON in base64: the request is sent as the form field
//! `requestData`, the response carries `responseData`.

use crate::PaybooksClient;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use payslip_core::{FetchError, MonthKey};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Form field carrying the encoded request.
pub const REQUEST_FIELD: &str = "requestData";

/// Payload inside `requestData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PayslipRequest {
    pub payslip_month: String,
    pub is_mail_request: bool,
    pub login_token: String,
    pub is_send_mail: bool,
}

impl PayslipRequest {
    pub fn new(month: &MonthKey, login_token: impl Into<String>) -> Self {
        Self {
            payslip_month: month.api_month(),
            is_mail_request: false,
            login_token: login_token.into(),
            is_send_mail: false,
        }
    }

    pub fn encode(&self) -> Result<String, FetchError> {
        let json = serde_json::to_string(self)
            .map_err(|e| FetchError::Transport(format!("Failed to encode request: {}", e)))?;
        Ok(STANDARD.encode(json))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseEnvelope {
    response_data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayslipResponse {
    #[serde(default)]
    is_success: Option<bool>,
    #[serde(default)]
    file_content_base64: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Decode a response body into PDF bytes.
///
/// Returns `None` for anything that is not a successful, non-empty document;
/// the reason is logged.
pub fn decode_response(body: &str) -> Option<Vec<u8>> {
    let envelope: ResponseEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse API response");
            return None;
        }
    };

    let Some(encoded) = envelope.response_data else {
        tracing::error!("API response has no responseData");
        return None;
    };

    let payload: PayslipResponse = match decode_base64(&encoded)
        .and_then(|raw| serde_json::from_slice(&raw).map_err(|e| e.to_string()))
    {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Failed to decode responseData");
            return None;
        }
    };

    if payload.is_success != Some(true) {
        let message = payload.error_message.as_deref().unwrap_or("Unknown error");
        tracing::error!(error_message = %message, "API returned error");
        return None;
    }

    let Some(content) = payload.file_content_base64.filter(|c| !c.trim().is_empty()) else {
        tracing::error!("No PDF content in response");
        return None;
    };

    match decode_base64(&content) {
        Ok(pdf) if pdf.is_empty() => {
            tracing::error!("PDF content decoded to zero bytes");
            None
        }
        Ok(pdf) => Some(pdf),
        Err(e) => {
            tracing::error!(error = %e, "Failed to decode PDF content");
            None
        }
    }
}

/// Pull `LoginToken` out of a `requestData` value captured from the portal's
/// network traffic. Accepts percent-encoded input.
pub fn extract_login_token(request_data: &str) -> Option<String> {
    let raw = request_data.trim();
    let raw = raw.strip_prefix("requestData=").unwrap_or(raw);
    let unquoted = if raw.contains('%') {
        percent_decode_str(raw).decode_utf8().ok()?.into_owned()
    } else {
        raw.to_string()
    };

    let decoded = decode_base64(&unquoted).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    value
        .get("LoginToken")
        .and_then(|token| token.as_str())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn decode_base64(data: &str) -> Result<Vec<u8>, String> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| e.to_string())
}

impl PaybooksClient {
    /// Download one month's pay slip. Exactly one HTTP call, no retries.
    ///
    /// `Ok(None)` means the service answered but had no usable document.
    pub async fn download_payslip(
        &self,
        login_token: &str,
        month: &MonthKey,
    ) -> Result<Option<Vec<u8>>, FetchError> {
        let request_data = PayslipRequest::new(month, login_token).encode()?;
        tracing::info!(month = %month.api_month(), "API request for month");

        let body = self.post_form(&[(REQUEST_FIELD, request_data.as_str())]).await?;
        Ok(decode_response(&body))
    }
}
