//! Credential handling for model endpoints.
//!
//! API keys are wrapped in [`SecretString`] the moment they are read, so they
//! cannot show up in `Debug`/`Display` output or tracing fields. The raw value
//! is only reachable through [`ApiCredential::expose`], which the transport
//! calls when it sets the auth header.
//!
//! ## Usage
//!
//! ```ignore
//! use evalkit_runtime::providers::secrets::ApiCredential;
//!
//! // Config value first, then the named environment variable
//! let cred = ApiCredential::resolve(settings.api_key.as_ref(), Some("AZURE_API_KEY"), "judge API key");
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from the runtime config file
    Config,
    /// Loaded from an environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// `Debug` and `Display` print `[REDACTED]` in place of the value.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Wrap a raw key.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Read a credential from an environment variable.
    ///
    /// Unset and blank variables both yield `None`.
    pub fn from_env(env_var: &str, name: &'static str) -> Option<Self> {
        std::env::var(env_var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|value| Self::new(value, CredentialSource::Environment, name))
    }

    /// Resolve a credential from config, falling back to an environment variable.
    ///
    /// A blank config value counts as unset.
    pub fn resolve(
        configured: Option<&SecretString>,
        env_var: Option<&str>,
        name: &'static str,
    ) -> Option<Self> {
        if let Some(secret) = configured.filter(|s| !s.expose_secret().trim().is_empty()) {
            return Some(Self::new(
                secret.expose_secret(),
                CredentialSource::Config,
                name,
            ));
        }

        env_var.and_then(|var| Self::from_env(var, name))
    }

    /// Expose the credential value at the point of use.
    ///
    /// Never store the returned slice.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty or whitespace.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "judge API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "judge API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("judge API key from config"));
    }

    #[test]
    fn test_credential_expose() {
        let cred = ApiCredential::new("sk-1", CredentialSource::Programmatic, "key");
        assert_eq!(cred.expose(), "sk-1");
        assert!(!cred.is_empty());
        assert!(ApiCredential::new("  ", CredentialSource::Programmatic, "key").is_empty());
    }

    #[test]
    fn test_resolve_prefers_config() {
        std::env::set_var("EVALKIT_TEST_KEY_PRIORITY", "env-key");
        let configured = SecretString::from("config-key".to_string());

        let cred = ApiCredential::resolve(
            Some(&configured),
            Some("EVALKIT_TEST_KEY_PRIORITY"),
            "test key",
        )
        .unwrap();
        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);

        std::env::remove_var("EVALKIT_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_resolve_falls_back_to_env() {
        std::env::set_var("EVALKIT_TEST_KEY_FALLBACK", "env-key");
        let blank = SecretString::from("   ".to_string());

        let cred =
            ApiCredential::resolve(Some(&blank), Some("EVALKIT_TEST_KEY_FALLBACK"), "test key")
                .unwrap();
        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);

        std::env::remove_var("EVALKIT_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_resolve_none_when_missing() {
        assert!(ApiCredential::resolve(None, Some("EVALKIT_TEST_KEY_UNSET_12345"), "k").is_none());
        assert!(ApiCredential::resolve(None, None, "k").is_none());
    }
}
