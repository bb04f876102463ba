//! Page retrieval: a plain HTTP GET or a Browserless-rendered fetch.

use std::time::Duration;

use async_trait::async_trait;
use browserless_client::{BrowserlessClient, BrowserlessError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Rendered fetch failed: {0}")]
    Browserless(#[from] BrowserlessError),

    #[error("{0}")]
    Other(String),
}

/// Source of listing HTML.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "Fetching listing page");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Fetches through a Browserless `/content` endpoint, waiting for the
/// listing's item nodes to render.
pub struct BrowserlessPageSource {
    client: BrowserlessClient,
    wait_for: &'static str,
}

impl BrowserlessPageSource {
    pub fn new(client: BrowserlessClient, wait_for: &'static str) -> Self {
        Self { client, wait_for }
    }
}

#[async_trait]
impl PageSource for BrowserlessPageSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.client.content(url, Some(self.wait_for)).await?)
    }
}
