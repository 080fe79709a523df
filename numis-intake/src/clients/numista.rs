//! Numista catalog API client
//!
//! Every request is throttled through a shared `governor` limiter so that
//! bursts of per-candidate detail fetches stay under the API quota.

use crate::models::{CatalogDetail, TypeSearchResponse};
use crate::types::{CatalogClient, CatalogQuery};
use anyhow::{Context, Result};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

pub const NUMISTA_API_URL: &str = "https://api.numista.com/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::MIN.saturating_add(1);
const LANGUAGE: &str = "es";

pub struct NumistaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl NumistaClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, NUMISTA_API_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("Numista API key is not set");
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            rate_limiter: RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)),
        })
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .header("Numista-API-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .context("Numista request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Numista API error {}: {}", status, body);
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl CatalogClient for NumistaClient {
    async fn search_types(&self, query: &CatalogQuery) -> Result<TypeSearchResponse> {
        let mut params = vec![
            ("q", query.q.clone()),
            ("category", query.category.clone()),
            ("count", query.count.to_string()),
            ("lang", LANGUAGE.to_string()),
        ];
        if let Some(year) = query.year.filter(|y| *y > 0) {
            params.push(("year", year.to_string()));
        }

        debug!(q = %query.q, year = ?query.year, "Searching Numista types");
        let response = self.get(&format!("{}/types", self.base_url), &params).await?;

        response
            .json()
            .await
            .context("Failed to decode Numista search response")
    }

    async fn get_type(&self, id: i64) -> Result<CatalogDetail> {
        debug!(numista_id = id, "Fetching Numista type");
        let response = self
            .get(
                &format!("{}/types/{}", self.base_url, id),
                &[("lang", LANGUAGE.to_string())],
            )
            .await?;

        match response
            .json::<Value>()
            .await
            .context("Failed to decode Numista type")?
        {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!("Unexpected Numista type payload: {}", other),
        }
    }
}
