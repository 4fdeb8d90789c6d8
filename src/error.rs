use serde::Serialize;
use thiserror::Error;

/// Errors from the GitHub fetch path. A failure here aborts the whole
/// analysis request; there is no partial view without a thread.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("issue or repository not found")]
    NotFound,

    /// 403/429. `retry_after` carries the Retry-After header when present.
    #[error("GitHub rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("GitHub unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Errors from a single model attempt, or from the invoker after the
/// primary→fallback handoff is exhausted.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model quota exceeded")]
    Quota { retry_after: Option<u64> },

    #[error("model call timed out")]
    Timeout,

    #[error("model transiently unavailable: {0}")]
    Transient(String),

    #[error("model authentication failed: {0}")]
    Auth(String),

    #[error("model rejected the request: {0}")]
    InvalidRequest(String),

    /// Terminal: the primary failed retryably and the fallback also failed.
    #[error("both models failed (primary: {primary}; fallback: {fallback})")]
    Unavailable { primary: String, fallback: String },
}

impl ModelError {
    /// Whether the fallback model is worth trying after this failure.
    /// Auth and malformed-request errors would fail identically on the
    /// fallback and only burn quota.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::Quota { .. } | ModelError::Timeout | ModelError::Transient(_)
        )
    }
}

/// Validation-stage failures, one per pipeline stage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no JSON object found in model output")]
    NoJsonFound,

    #[error("model output is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("model output has no usable summary")]
    IncompleteResult,
}

/// Machine-readable failure class carried by a degraded `AnalysisView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFailureKind {
    ModelUnavailable,
    ModelRejected,
    NoJsonFound,
    MalformedJson,
    IncompleteResult,
}

impl From<&ModelError> for AnalysisFailureKind {
    fn from(error: &ModelError) -> Self {
        match error {
            ModelError::Auth(_) | ModelError::InvalidRequest(_) => {
                AnalysisFailureKind::ModelRejected
            }
            _ => AnalysisFailureKind::ModelUnavailable,
        }
    }
}

impl From<&ValidationError> for AnalysisFailureKind {
    fn from(error: &ValidationError) -> Self {
        match error {
            ValidationError::NoJsonFound => AnalysisFailureKind::NoJsonFound,
            ValidationError::MalformedJson(_) => AnalysisFailureKind::MalformedJson,
            ValidationError::IncompleteResult => AnalysisFailureKind::IncompleteResult,
        }
    }
}
