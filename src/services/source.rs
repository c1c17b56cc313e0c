// src/services/source.rs

//! Carrier payload acquisition.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};

/// Supplies the raw carrier payload for a run.
#[async_trait]
pub trait SpecSource: Send + Sync {
    async fn fetch(&self) -> Result<String>;
}

/// Fetches the carrier with an HTTP GET.
pub struct HttpSpecSource {
    client: Client,
    url: String,
}

impl HttpSpecSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SpecSource for HttpSpecSource {
    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(format!("GET {} failed: {e}", self.url)))?;

        let text = response
            .text()
            .await
            .map_err(|e| AppError::fetch(format!("reading {} failed: {e}", self.url)))?;

        log::debug!("Fetched {} bytes from {}", text.len(), self.url);
        Ok(text)
    }
}
