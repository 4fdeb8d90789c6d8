use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::adapter::GenerativeModel;
use crate::error::ModelError;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini adapter over the `generateContent` REST endpoint.
pub struct GeminiModel {
    model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiModel {
    pub fn new(model: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            model: model.to_owned(),
            api_key: api_key.to_owned(),
            base_url: GEMINI_API_BASE.to_owned(),
            http,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after, &detail));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transient(format!("unexpected response payload: {e}")))?;

        let text = flatten_response(parsed);
        if text.trim().is_empty() {
            // 空応答はリトライ対象として扱う
            return Err(ModelError::Transient("model returned no text".to_owned()));
        }
        Ok(text)
    }
}

fn classify_status(status: StatusCode, retry_after: Option<u64>, detail: &str) -> ModelError {
    let detail = detail.chars().take(200).collect::<String>();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => ModelError::Quota { retry_after },
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => ModelError::InvalidRequest(detail),
        s if s.is_server_error() => {
            ModelError::Transient(format!("model service responded with {s}"))
        }
        s => ModelError::Transient(format!("unexpected status {s}: {detail}")),
    }
}

/// Concatenate the text parts of the first candidate.
fn flatten_response(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
