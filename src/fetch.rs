//! Remote CSV retrieval behind a trait so tests and embedders can supply
//! their own source.

use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetch the resource at `url` as text.
    async fn fetch_text(&self, url: &str) -> Result<String, AppError>;
}

/// HTTP fetcher with a shared client. All failure detail stays server-side;
/// clients only ever see the generic fetch message.
#[derive(Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Fetch(format!("{url} answered an error status: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("could not read body from {url}: {e}")))
    }
}
