//! Candidate model client.

use evalkit_core::clean;

use crate::providers::{CompletionRequest, EndpointConfig, EndpointError};
use crate::resilience::RetryingEndpointClient;

/// Prompt sent by [`CandidateClient::health_check`].
pub const HEALTH_CHECK_PROMPT: &str = "Hello, this is a test.";

/// Sends prompts to the model under test and returns sanitized answers.
#[derive(Debug)]
pub struct CandidateClient {
    endpoint: EndpointConfig,
    client: RetryingEndpointClient,
}

impl CandidateClient {
    pub fn new(endpoint: EndpointConfig, client: RetryingEndpointClient) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Generate an answer with reasoning traces stripped.
    ///
    /// The answer may be empty if the model replied with nothing but
    /// reasoning.
    pub async fn generate(&self, prompt: &str) -> Result<String, EndpointError> {
        let raw = self
            .client
            .send(&self.endpoint, &CompletionRequest::new(prompt))
            .await?;

        let answer = clean(&raw);
        tracing::debug!(
            model = %self.endpoint.model,
            raw_chars = raw.len(),
            answer_chars = answer.len(),
            "Sanitized candidate reply"
        );
        Ok(answer)
    }

    /// True if the endpoint answers a trivial prompt.
    pub async fn health_check(&self) -> bool {
        match self.generate(HEALTH_CHECK_PROMPT).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(model = %self.endpoint.model, error = %e, "Candidate health check failed");
                false
            }
        }
    }
}
