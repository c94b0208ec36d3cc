//! Model endpoint descriptions for evalkit-runtime.
//!
//! An [`EndpointConfig`] says where a model lives and how to talk to it.
//! The wire format is picked by [`ProviderKind`]:
//! - `ollama`: local generate API, `{model, prompt, stream: false}`
//! - `openai`: OpenAI-compatible chat completions with bearer auth
//! - `azure`: Azure OpenAI deployment URL with an `api-key` header
//! - `custom`: generic `{prompt, model, max_tokens}` POST
//!
//! ## Security
//!
//! Keys are held as [`ApiCredential`]s and only exposed when the request
//! headers are built. See the [`secrets`] module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod secrets;
mod wire;

pub use secrets::{ApiCredential, CredentialSource};

/// Default retry budget per call.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Azure OpenAI REST version used when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Why an endpoint call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointErrorKind {
    /// Connection failure, timeout or non-2xx status
    Network,
    /// Body was not JSON, lacked the expected field, or failed validation
    InvalidResponse,
    /// Required key or URL not configured
    AuthMissing,
}

impl fmt::Display for EndpointErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointErrorKind::Network => write!(f, "network"),
            EndpointErrorKind::InvalidResponse => write!(f, "invalid response"),
            EndpointErrorKind::AuthMissing => write!(f, "missing credentials"),
        }
    }
}

/// Terminal failure of an endpoint call.
///
/// `attempts` is the number of requests actually sent; it is 0 for
/// [`EndpointErrorKind::AuthMissing`], which never reaches the network.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} error after {attempts} attempt(s): {detail}")]
pub struct EndpointError {
    pub kind: EndpointErrorKind,
    pub detail: String,
    pub attempts: u32,
}

impl EndpointError {
    pub fn new(kind: EndpointErrorKind, detail: impl Into<String>, attempts: u32) -> Self {
        Self {
            kind,
            detail: detail.into(),
            attempts,
        }
    }

    pub fn auth_missing(detail: impl Into<String>) -> Self {
        Self::new(EndpointErrorKind::AuthMissing, detail, 0)
    }

    /// True when the retry budget was spent on transient failures.
    pub fn is_exhausted(&self) -> bool {
        self.kind != EndpointErrorKind::AuthMissing
    }
}

/// Wire protocol spoken by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    #[serde(alias = "openai_compatible")]
    OpenAi,
    Azure,
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
            ProviderKind::Custom => "custom",
        }
    }

    /// Where the reply text lives in a response body.
    pub fn response_shape(&self) -> ResponseShape {
        match self {
            ProviderKind::Ollama => ResponseShape::OllamaStyle,
            ProviderKind::OpenAi | ProviderKind::Azure => ResponseShape::ChatCompletionStyle,
            ProviderKind::Custom => ResponseShape::GenericKeyed,
        }
    }

    /// Token cap sent when neither the call nor the endpoint sets one.
    pub fn default_max_tokens(&self) -> Option<u32> {
        match self {
            ProviderKind::Ollama => None,
            ProviderKind::OpenAi | ProviderKind::Azure | ProviderKind::Custom => Some(150),
        }
    }

    pub fn default_temperature(&self) -> Option<f32> {
        match self {
            ProviderKind::OpenAi | ProviderKind::Azure => Some(0.7),
            ProviderKind::Ollama | ProviderKind::Custom => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body layouts understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"response": "..."}`
    OllamaStyle,
    /// `{"choices": [{"message": {"content": "..."}}]}`
    ChatCompletionStyle,
    /// First string among `response`, `text`, `output`
    GenericKeyed,
}

/// One prompt to send, with optional per-call generation settings.
///
/// Per-call settings win over the endpoint's, which win over the provider's
/// defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Connection details for one model endpoint.
#[derive(Debug)]
pub struct EndpointConfig {
    pub provider: ProviderKind,
    /// Full request URL, or the Azure resource base URL
    pub url: String,
    pub model: String,
    pub api_key: Option<ApiCredential>,
    /// Total attempts per call, at least 1
    pub max_retries: u32,
    pub timeout: Duration,
    pub api_version: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    credentials_required: bool,
}

impl EndpointConfig {
    pub fn new(provider: ProviderKind, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            url: url.into(),
            model: model.into(),
            api_key: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            max_tokens: None,
            temperature: None,
            credentials_required: false,
        }
    }

    pub fn with_api_key(mut self, credential: ApiCredential) -> Self {
        self.api_key = Some(credential);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Demand a key and URL before any request is sent.
    pub fn require_credentials(mut self) -> Self {
        self.credentials_required = true;
        self
    }

    /// Azure always needs a key; other providers only when flagged.
    pub fn requires_credentials(&self) -> bool {
        self.credentials_required || self.provider == ProviderKind::Azure
    }

    /// Check that a credentialed endpoint has a key and URL.
    pub fn check_credentials(&self) -> Result<(), String> {
        if !self.requires_credentials() {
            return Ok(());
        }

        if self.api_key.as_ref().map_or(true, ApiCredential::is_empty) {
            return Err(format!(
                "{} endpoint for model '{}' requires an API key",
                self.provider, self.model
            ));
        }

        if self.url.trim().is_empty() {
            return Err(format!(
                "{} endpoint for model '{}' has no URL configured",
                self.provider, self.model
            ));
        }

        Ok(())
    }

    pub fn response_shape(&self) -> ResponseShape {
        self.provider.response_shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> ApiCredential {
        ApiCredential::new(value, CredentialSource::Programmatic, "test key")
    }

    #[test]
    fn test_provider_kind_serde_names() {
        let kinds: Vec<ProviderKind> =
            serde_json::from_str(r#"["ollama", "openai", "azure", "custom", "openai_compatible"]"#)
                .unwrap();
        assert_eq!(
            kinds,
            vec![
                ProviderKind::Ollama,
                ProviderKind::OpenAi,
                ProviderKind::Azure,
                ProviderKind::Custom,
                ProviderKind::OpenAi
            ]
        );
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(ProviderKind::Ollama.response_shape(), ResponseShape::OllamaStyle);
        assert_eq!(
            ProviderKind::Azure.response_shape(),
            ResponseShape::ChatCompletionStyle
        );
        assert_eq!(ProviderKind::Custom.response_shape(), ResponseShape::GenericKeyed);
    }

    #[test]
    fn test_builder_clamps() {
        let endpoint = EndpointConfig::new(ProviderKind::Ollama, "http://localhost:11434", "m")
            .with_max_retries(0)
            .with_timeout(Duration::ZERO);
        assert_eq!(endpoint.max_retries, 1);
        assert!(endpoint.timeout > Duration::ZERO);
    }

    #[test]
    fn test_ollama_needs_no_credentials() {
        let endpoint = EndpointConfig::new(ProviderKind::Ollama, "http://localhost:11434", "m");
        assert!(endpoint.check_credentials().is_ok());
    }

    #[test]
    fn test_azure_requires_key() {
        let endpoint = EndpointConfig::new(ProviderKind::Azure, "https://x.example", "gpt-4o");
        let err = endpoint.check_credentials().unwrap_err();
        assert!(err.contains("requires an API key"));

        let endpoint = endpoint.with_api_key(key("  "));
        assert!(endpoint.check_credentials().is_err());
    }

    #[test]
    fn test_required_credentials_need_url() {
        let endpoint = EndpointConfig::new(ProviderKind::OpenAi, "", "gpt-4o-mini")
            .require_credentials()
            .with_api_key(key("sk-1"));
        assert!(endpoint.check_credentials().unwrap_err().contains("no URL"));
    }

    #[test]
    fn test_endpoint_error_display() {
        let err = EndpointError::new(EndpointErrorKind::Network, "HTTP 503", 3);
        assert_eq!(err.to_string(), "network error after 3 attempt(s): HTTP 503");
        assert!(err.is_exhausted());
        assert!(!EndpointError::auth_missing("no key").is_exhausted());
    }
}
