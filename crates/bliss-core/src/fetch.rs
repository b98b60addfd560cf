use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::BotConfig;
use crate::error::FetchError;

/// Builds the client shared by catalog and build-index requests.
///
/// The timeout bounds the whole request, so a stalled upstream surfaces as
/// `FetchError::Transport` instead of hanging the caller.
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| FetchError::Transport(format!("failed to build http client: {e}")))
}

/// One GET; only HTTP 200 counts as success.
pub(crate) async fn get_ok(client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if status != StatusCode::OK {
        debug!("GET {} returned {}", url, status);
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = resp.bytes().await?;
    Ok(body.to_vec())
}

/// Downloads the raw device catalog. No retries; callers own the fallback policy.
#[derive(Clone)]
pub struct CatalogFetcher {
    client: Client,
    url: String,
}

impl CatalogFetcher {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn from_config(cfg: &BotConfig) -> Result<Self, FetchError> {
        let client = http_client(cfg.user_agent(), cfg.http_timeout())?;
        Ok(Self::new(client, cfg.catalog_url.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        get_ok(&self.client, &self.url).await
    }
}
