use async_trait::async_trait;
use payslip_api_client::PaybooksClient;
use payslip_core::{AuthToken, AuthenticationError, Config, FetchError, MonthKey, PayslipArtifact};
use tokio::sync::Mutex;

use crate::token_probe::TokenAcquirer;
use crate::token_store::TokenStore;

/// Where pay slips come from.
#[async_trait]
pub trait PayslipSource: Send + Sync {
    /// Make sure a usable login token is held. Idempotent within a run.
    async fn authenticate(&self) -> Result<(), AuthenticationError>;

    /// Retrieve one month's document. `Ok(None)` means the remote side had
    /// no usable document for that month.
    async fn fetch(&self, month: &MonthKey) -> Result<Option<PayslipArtifact>, FetchError>;
}

/// Paybooks API source backed by a persisted login token.
pub struct PaybooksSource {
    client: PaybooksClient,
    store: TokenStore,
    acquirer: TokenAcquirer,
    token: Mutex<Option<AuthToken>>,
}

impl PaybooksSource {
    pub fn new(client: PaybooksClient, store: TokenStore, acquirer: TokenAcquirer) -> Self {
        Self {
            client,
            store,
            acquirer,
            token: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            PaybooksClient::from_config(config)?,
            TokenStore::new(config.token_file()),
            TokenAcquirer::from_config(config),
        ))
    }

    async fn login_token(&self) -> Result<String, AuthenticationError> {
        let mut held = self.token.lock().await;
        if let Some(token) = held.as_ref() {
            return Ok(token.token.clone());
        }

        let token = match self.store.load_token().await {
            Some(token) => token,
            None => {
                let token = self.acquirer.acquire().await?;
                if let Err(e) = self.store.save_token(&token).await {
                    tracing::warn!(error = %e, "Failed to persist login token");
                }
                token
            }
        };

        let value = token.token.clone();
        *held = Some(token);
        Ok(value)
    }
}

#[async_trait]
impl PayslipSource for PaybooksSource {
    async fn authenticate(&self) -> Result<(), AuthenticationError> {
        self.login_token().await.map(|_| ())
    }

    async fn fetch(&self, month: &MonthKey) -> Result<Option<PayslipArtifact>, FetchError> {
        let token = self.login_token().await?;
        tracing::info!(month = %month, "Downloading payslip via API");

        let Some(content) = self.client.download_payslip(&token, month).await? else {
            return Ok(None);
        };

        tracing::info!(month = %month, size_bytes = content.len(), "Payslip downloaded");
        Ok(Some(PayslipArtifact::new(*month, content)))
    }
}
