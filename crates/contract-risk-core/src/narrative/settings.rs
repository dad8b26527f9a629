use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Narrative settings as they appear in a configuration file (`[llm]` table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LlmFileConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    /// Request timeout, e.g. `30s` or `2m`.
    pub timeout: Option<String>,
}

/// Resolved configuration for the narrative client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: String,
    /// May be empty; requests then fail and the caller falls back.
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// `None` keeps the HTTP client's default behaviour.
    pub timeout: Option<Duration>,
}

impl LlmSettings {
    const PROVIDER_ENV: &'static str = "CONTRACT_RISK_PROVIDER";
    const API_KEY_ENV: &'static str = "CONTRACT_RISK_API_KEY";
    const ENDPOINT_ENV: &'static str = "CONTRACT_RISK_ENDPOINT";
    const MODEL_ENV: &'static str = "CONTRACT_RISK_MODEL";
    const TIMEOUT_ENV: &'static str = "CONTRACT_RISK_TIMEOUT";

    /// Load settings from environment variables only.
    ///
    /// * `CONTRACT_RISK_PROVIDER` : `openai` (default) or `noop`.
    /// * `CONTRACT_RISK_API_KEY` : API key/token.
    /// * `CONTRACT_RISK_ENDPOINT` : Optional custom base URL.
    /// * `CONTRACT_RISK_MODEL` : Optional model name.
    /// * `CONTRACT_RISK_TIMEOUT` : Optional timeout (`45s`, `2m`, or bare seconds).
    pub fn from_env() -> Result<Self> {
        Self::from_sources(&LlmFileConfig::default(), std::env::vars().collect())
    }

    /// Merge file configuration with environment variables; the environment wins.
    pub fn from_env_with(file: &LlmFileConfig) -> Result<Self> {
        Self::from_sources(file, std::env::vars().collect())
    }

    fn from_sources(file: &LlmFileConfig, vars: HashMap<String, String>) -> Result<Self> {
        let env = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let non_blank = |value: &Option<String>| {
            value
                .as_ref()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = env(Self::PROVIDER_ENV)
            .or_else(|| non_blank(&file.provider))
            .unwrap_or_else(|| "openai".to_string());
        let timeout = match env(Self::TIMEOUT_ENV).or_else(|| non_blank(&file.timeout)) {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };

        Ok(Self {
            provider,
            api_key: env(Self::API_KEY_ENV).unwrap_or_default(),
            endpoint: env(Self::ENDPOINT_ENV).or_else(|| non_blank(&file.endpoint)),
            model: env(Self::MODEL_ENV).or_else(|| non_blank(&file.model)),
            timeout,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(raw).with_context(|| format!("invalid narrative timeout `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_openai_provider() {
        let settings = LlmSettings::from_sources(
            &LlmFileConfig::default(),
            vars(&[("CONTRACT_RISK_API_KEY", "secret")]),
        )
        .expect("should load settings");
        assert_eq!(settings.provider, "openai");
        assert_eq!(settings.api_key, "secret");
        assert!(settings.endpoint.is_none());
        assert!(settings.model.is_none());
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn missing_api_key_is_not_fatal() {
        let settings =
            LlmSettings::from_sources(&LlmFileConfig::default(), HashMap::new()).unwrap();
        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn environment_overrides_file() {
        let file = LlmFileConfig {
            provider: Some("noop".into()),
            model: Some("file-model".into()),
            endpoint: Some("http://file.local".into()),
            timeout: Some("10s".into()),
        };
        let settings = LlmSettings::from_sources(
            &file,
            vars(&[
                ("CONTRACT_RISK_MODEL", "env-model"),
                ("CONTRACT_RISK_TIMEOUT", "2m"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.provider, "noop");
        assert_eq!(settings.model.as_deref(), Some("env-model"));
        assert_eq!(settings.endpoint.as_deref(), Some("http://file.local"));
        assert_eq!(settings.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn parses_bare_seconds_and_rejects_garbage() {
        assert_eq!(parse_timeout("45").unwrap(), Duration::from_secs(45));
        let err = parse_timeout("soon").unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let settings = LlmSettings::from_sources(
            &LlmFileConfig::default(),
            vars(&[("CONTRACT_RISK_PROVIDER", "  "), ("CONTRACT_RISK_ENDPOINT", "")]),
        )
        .unwrap();
        assert_eq!(settings.provider, "openai");
        assert!(settings.endpoint.is_none());
    }
}
