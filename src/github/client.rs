use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("octotriage/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over the GitHub REST API. Holds the reqwest client and the
/// optional token; all typed fetchers in `issue.rs` go through `get_json`.
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_base: &str, timeout_secs: u64, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// GET an API path (relative, no leading slash) and decode the body.
    pub(crate) async fn get_json(&self, path: &str) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/{}", self.api_base, path);

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(classify_status(status, retry_after));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::UpstreamUnavailable(format!("invalid JSON from GitHub: {e}")))
    }
}

/// GitHub ステータスコード → FetchError 変換
pub(crate) fn classify_status(status: StatusCode, retry_after: Option<u64>) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound,
        // 403 is how GitHub signals rate limiting for unauthenticated calls
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            FetchError::RateLimited { retry_after }
        }
        s => FetchError::UpstreamUnavailable(format!("GitHub responded with {s}")),
    }
}
