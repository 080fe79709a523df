//! rembg background removal client
//!
//! Posts the raw photograph as multipart field `file` and returns the PNG
//! with its background made transparent.

use crate::types::BackgroundRemover;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct RembgClient {
    client: reqwest::Client,
    url: String,
}

impl RembgClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl BackgroundRemover for RembgClient {
    async fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("image");
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .context("rembg request failed")?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("rembg returned {}: {}", status, body);
        }

        let output = response.bytes().await.context("Failed to read rembg response")?;
        debug!(input = bytes.len(), output = output.len(), "Background removed");
        Ok(output.to_vec())
    }
}
