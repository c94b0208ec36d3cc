//! Runtime configuration for evalkit.
//!
//! Loaded from YAML or JSON. Every section is optional; the defaults point the
//! candidate at a local Ollama model and the judge at an Azure OpenAI
//! deployment whose URL and key come from `AZURE_API_URL` / `AZURE_API_KEY`.
//!
//! ```yaml
//! candidate:
//!   provider: ollama
//!   url: http://localhost:11434/api/generate
//!   model: qwen3:0.6b
//!   timeout: 30s
//! judge:
//!   provider: azure
//!   model: gpt-4o
//!   url_env: AZURE_API_URL
//!   api_key_env: AZURE_API_KEY
//! retry:
//!   backoff_base: 1s
//! concurrency: 4
//! cache:
//!   enabled: true
//!   ttl: 1h
//! ```

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::cache::ScoreCache;
use crate::providers::{
    ApiCredential, EndpointConfig, ProviderKind, DEFAULT_AZURE_API_VERSION, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT,
};
use crate::resilience::DEFAULT_BACKOFF_BASE;

/// Local Ollama generate endpoint.
pub const DEFAULT_CANDIDATE_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_CANDIDATE_MODEL: &str = "qwen3:0.6b";
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o";
pub const AZURE_URL_ENV: &str = "AZURE_API_URL";
pub const AZURE_KEY_ENV: &str = "AZURE_API_KEY";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Settings for one model endpoint.
#[derive(Debug, Deserialize)]
pub struct EndpointSettings {
    pub provider: ProviderKind,

    #[serde(default)]
    pub url: Option<String>,

    /// Environment variable holding the URL when `url` is unset
    #[serde(default)]
    pub url_env: Option<String>,

    pub model: String,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,

    /// Environment variable holding the key when `api_key` is unset
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub timeout: Duration,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub api_version: Option<String>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl EndpointSettings {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            url: None,
            url_env: None,
            model: model.into(),
            api_key: None,
            api_key_env: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: None,
            temperature: None,
            api_version: None,
        }
    }

    /// Ollama on localhost.
    pub fn default_candidate() -> Self {
        Self {
            url: Some(DEFAULT_CANDIDATE_URL.to_string()),
            ..Self::new(ProviderKind::Ollama, DEFAULT_CANDIDATE_MODEL)
        }
    }

    /// Azure OpenAI configured from the environment.
    pub fn default_judge() -> Self {
        Self {
            url_env: Some(AZURE_URL_ENV.to_string()),
            api_key_env: Some(AZURE_KEY_ENV.to_string()),
            ..Self::new(ProviderKind::Azure, DEFAULT_JUDGE_MODEL)
        }
    }

    /// Configured URL, else the `url_env` variable, else empty.
    pub fn resolved_url(&self) -> String {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.url_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .map(|u| u.trim().to_string())
            })
            .unwrap_or_default()
    }

    /// Build an [`EndpointConfig`], resolving the URL and key.
    ///
    /// A missing key is not an error here; calls that need one fail with
    /// `AuthMissing`.
    pub fn resolve(&self, credential_name: &'static str) -> EndpointConfig {
        let mut endpoint = EndpointConfig::new(self.provider, self.resolved_url(), &self.model)
            .with_max_retries(self.max_retries)
            .with_timeout(self.timeout)
            .with_api_version(
                self.api_version
                    .as_deref()
                    .unwrap_or(DEFAULT_AZURE_API_VERSION),
            );

        if let Some(n) = self.max_tokens {
            endpoint = endpoint.with_max_tokens(n);
        }
        if let Some(t) = self.temperature {
            endpoint = endpoint.with_temperature(t);
        }
        if let Some(credential) = ApiCredential::resolve(
            self.api_key.as_ref(),
            self.api_key_env.as_deref(),
            credential_name,
        ) {
            tracing::debug!(credential = %credential, "Resolved endpoint credential");
            endpoint = endpoint.with_api_key(credential);
        }
        endpoint
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.max_retries < 1 {
            return Err(ConfigError::Invalid(format!(
                "{}.max_retries must be at least 1",
                section
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid(format!(
                "{}.timeout must be positive",
                section
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{}.model is empty", section)));
        }
        if let Some(url) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{}.url must start with http:// or https://, got '{}'",
                    section, url
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    #[serde(with = "humantime_duration")]
    pub backoff_base: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: u64,
    #[serde(with = "humantime_duration")]
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheSettings {
    /// A score cache when enabled.
    pub fn build(&self) -> Option<ScoreCache> {
        self.enabled
            .then(|| ScoreCache::new(self.max_entries, self.ttl))
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub candidate: EndpointSettings,
    pub judge: EndpointSettings,
    pub retry: RetrySettings,
    /// Samples evaluated at once; 1 is strictly sequential
    pub concurrency: usize,
    pub cache: CacheSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            candidate: EndpointSettings::default_candidate(),
            judge: EndpointSettings::default_judge(),
            retry: RetrySettings::default(),
            concurrency: 1,
            cache: CacheSettings::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.candidate.validate("candidate")?;
        self.judge.validate("judge")?;
        if self.concurrency < 1 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be positive when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
