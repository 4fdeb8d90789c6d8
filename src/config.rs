use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub ai: AiConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub primary_model: String,
    pub fallback_model: String,
    /// Wall-clock bound for one generation attempt (primary or fallback).
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Character budget for the assembled prompt. Title and body always fit;
    /// comments are dropped oldest-first beyond this.
    pub max_prompt_chars: usize,
    pub max_siblings: usize,
    pub label_cap: usize,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_owned(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            primary_model: "gemini-2.5-flash".to_owned(),
            fallback_model: "gemini-2.0-flash".to_owned(),
            request_timeout_secs: 45,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 24_000,
            max_siblings: 30,
            label_cap: 6,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("octotriage")
            .join("config.toml")
    }
}

/// API credentials, read from the environment (never from the config file).
#[derive(Debug, Clone)]
pub struct Secrets {
    pub gemini_api_key: String,
    pub github_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY not set (put it in the environment or a .env file)")?;
        let github_token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            gemini_api_key,
            github_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.ai.primary_model, "gemini-2.5-flash");
        assert_eq!(config.ai.fallback_model, "gemini-2.0-flash");
        assert_eq!(config.limits.label_cap, 6);
        assert_eq!(config.limits.max_siblings, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ai]
            primary_model = "gemini-2.5-pro"
            "#,
        )
        .unwrap();
        assert_eq!(config.ai.primary_model, "gemini-2.5-pro");
        // 未指定のフィールドはデフォルトのまま
        assert_eq!(config.ai.fallback_model, "gemini-2.0-flash");
        assert_eq!(config.limits.max_prompt_chars, 24_000);
    }

    #[test]
    fn test_limits_section_parses() {
        let config: Config = toml::from_str(
            r#"
            [limits]
            max_prompt_chars = 8000
            max_siblings = 10
            label_cap = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.max_prompt_chars, 8000);
        assert_eq!(config.limits.max_siblings, 10);
        assert_eq!(config.limits.label_cap, 3);
    }
}
