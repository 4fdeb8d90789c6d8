use async_trait::async_trait;

use crate::error::ModelError;

/// A single text-generation capability. Primary and fallback models are
/// distinguished only by which instance sits in which slot of the invoker;
/// chaining more tiers is the same interface again.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    /// Send one prompt, get raw text back.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

impl std::fmt::Debug for dyn GenerativeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeModel")
            .field("name", &self.name())
            .finish()
    }
}
