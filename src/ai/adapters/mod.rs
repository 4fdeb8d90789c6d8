mod gemini;

pub use gemini::GeminiModel;

use anyhow::{anyhow, Result};

use super::adapter::GenerativeModel;

/// Create a model adapter from a model identifier.
pub fn create_model(
    model_id: &str,
    api_key: &str,
    timeout_secs: u64,
) -> Result<Box<dyn GenerativeModel>> {
    if model_id.starts_with("gemini-") {
        Ok(Box::new(GeminiModel::new(model_id, api_key, timeout_secs)?))
    } else {
        Err(anyhow!(
            "Unsupported model: {}. Supported: gemini-*",
            model_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model_accepts_gemini_family() {
        let model = create_model("gemini-2.5-flash", "key", 30).unwrap();
        assert_eq!(model.name(), "gemini-2.5-flash");
    }

    #[test]
    fn test_create_model_rejects_unknown_family() {
        let err = create_model("gpt-4o", "key", 30).unwrap_err();
        assert!(err.to_string().contains("Unsupported model"));
    }
}
