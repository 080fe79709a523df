//! Gemini coin analysis client
//!
//! Uses the REST `generateContent` endpoint with both photographs inlined
//! as base64 and JSON output requested.

use super::prompt::analysis_prompt;
use crate::models::CoinAnalysisResult;
use crate::types::{AnalysisOptions, CoinAnalyzer};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
}

impl GeminiClient {
    /// `api_key == None` yields a client whose every call fails
    pub fn new(api_key: Option<String>, default_model: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, default_model, GEMINI_API_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        default_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let default_model = default_model.into();
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            default_model: if default_model.trim().is_empty() {
                DEFAULT_GEMINI_MODEL.to_string()
            } else {
                default_model
            },
        })
    }

    async fn inline_image(path: &Path) -> Result<Value> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mime_type = image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type())
            .unwrap_or("image/jpeg");

        Ok(json!({
            "inline_data": {
                "mime_type": mime_type,
                "data": STANDARD.encode(bytes),
            }
        }))
    }
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Decode the model's text output into an analysis result
pub fn parse_analysis(text: &str) -> Result<CoinAnalysisResult> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(cleaned)
        .with_context(|| format!("Failed to parse model response: {}", cleaned))?;

    let Value::Object(object) = value else {
        anyhow::bail!("Model response is not a JSON object: {}", cleaned);
    };

    CoinAnalysisResult::from_json_object(object).context("Failed to decode analysis fields")
}

#[async_trait::async_trait]
impl CoinAnalyzer for GeminiClient {
    async fn analyze(
        &self,
        front_path: &Path,
        back_path: &Path,
        options: &AnalysisOptions,
    ) -> Result<CoinAnalysisResult> {
        let api_key = self
            .api_key
            .as_deref()
            .context("Gemini API key is not configured")?;

        let model = if options.model.trim().is_empty() {
            self.default_model.as_str()
        } else {
            options.model.trim()
        };

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": analysis_prompt(&options.language) },
                    Self::inline_image(front_path).await?,
                    Self::inline_image(back_path).await?,
                ]
            }],
            "generationConfig": {
                "temperature": options.temperature,
                "responseMimeType": "application/json",
            }
        });

        info!(model, temperature = options.temperature, language = %options.language, "Requesting coin analysis");

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini returned {}: {}", status, body);
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to decode Gemini response")?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            anyhow::bail!("No content returned from Gemini");
        }

        debug!(length = text.len(), "Gemini response received");
        parse_analysis(&text)
    }
}
