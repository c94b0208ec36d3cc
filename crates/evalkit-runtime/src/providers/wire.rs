//! Request bodies and reply extraction per provider.

use serde_json::{json, Map, Value as JsonValue};

use super::{CompletionRequest, EndpointConfig, ProviderKind, ResponseShape};
use crate::transport::HttpRequest;

/// Keys tried in order for [`ResponseShape::GenericKeyed`] replies.
const GENERIC_REPLY_KEYS: [&str; 3] = ["response", "text", "output"];

impl EndpointConfig {
    /// URL the request is POSTed to.
    pub fn request_url(&self) -> String {
        match self.provider {
            ProviderKind::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.url.trim_end_matches('/'),
                self.model,
                self.api_version
            ),
            _ => self.url.clone(),
        }
    }

    /// Build the provider-specific HTTP request for one prompt.
    pub fn build_request(&self, request: &CompletionRequest) -> HttpRequest {
        let max_tokens = request
            .max_tokens
            .or(self.max_tokens)
            .or_else(|| self.provider.default_max_tokens());
        let temperature = request
            .temperature
            .or(self.temperature)
            .or_else(|| self.provider.default_temperature());

        let body = match self.provider {
            ProviderKind::Ollama => {
                let mut body = json!({
                    "model": self.model,
                    "prompt": request.prompt,
                    "stream": false,
                });
                let mut options = Map::new();
                if let Some(t) = temperature {
                    options.insert("temperature".to_string(), json!(t));
                }
                if let Some(n) = max_tokens {
                    options.insert("num_predict".to_string(), json!(n));
                }
                if !options.is_empty() {
                    body["options"] = JsonValue::Object(options);
                }
                body
            }
            ProviderKind::OpenAi | ProviderKind::Azure => {
                let mut body = json!({
                    "messages": [{"role": "user", "content": request.prompt}],
                });
                // Azure names the deployment in the URL instead
                if self.provider == ProviderKind::OpenAi {
                    body["model"] = json!(self.model);
                }
                if let Some(n) = max_tokens {
                    body["max_tokens"] = json!(n);
                }
                if let Some(t) = temperature {
                    body["temperature"] = json!(t);
                }
                body
            }
            ProviderKind::Custom => {
                let mut body = json!({
                    "prompt": request.prompt,
                    "model": self.model,
                });
                if let Some(n) = max_tokens {
                    body["max_tokens"] = json!(n);
                }
                if let Some(t) = temperature {
                    body["temperature"] = json!(t);
                }
                body
            }
        };

        HttpRequest {
            url: self.request_url(),
            headers: self.auth_headers(),
            body,
            timeout: self.timeout,
        }
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) else {
            return Vec::new();
        };

        match self.provider {
            ProviderKind::Azure => vec![("api-key", key.expose().to_string())],
            ProviderKind::OpenAi | ProviderKind::Custom | ProviderKind::Ollama => {
                vec![("Authorization", format!("Bearer {}", key.expose()))]
            }
        }
    }
}

impl ResponseShape {
    /// Pull the reply text out of a parsed body.
    pub fn extract_text(&self, body: &JsonValue) -> Result<String, String> {
        let text = match self {
            ResponseShape::OllamaStyle => body
                .get("response")
                .and_then(JsonValue::as_str)
                .ok_or("missing string field 'response'")?,
            ResponseShape::ChatCompletionStyle => body
                .pointer("/choices/0/message/content")
                .and_then(JsonValue::as_str)
                .ok_or("missing string field 'choices[0].message.content'")?,
            ResponseShape::GenericKeyed => GENERIC_REPLY_KEYS
                .iter()
                .find_map(|key| body.get(*key).and_then(JsonValue::as_str))
                .ok_or("none of 'response', 'text', 'output' is a string")?,
        };

        Ok(text.trim().to_string())
    }
}
