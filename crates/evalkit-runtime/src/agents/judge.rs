//! Judge model client.
//!
//! The judge sees the task tag, the input, the candidate answer, the
//! reference answer when there is one, and the task rubric. It replies with a bare number; the first
//! numeral in the reply is taken as the score and clamped to [0.0, 1.0].

use evalkit_core::TaskType;
use lazy_static::lazy_static;
use regex::Regex;

use crate::cache::{ScoreCache, ScoreKey};
use crate::providers::{CompletionRequest, EndpointConfig, EndpointError};
use crate::resilience::RetryingEndpointClient;

/// Token cap for judge replies; a score needs only a few.
pub const JUDGE_MAX_TOKENS: u32 = 10;

lazy_static! {
    static ref SCORE_NUMERAL: Regex = Regex::new(r"[0-9]+(?:\.[0-9]*)?|\.[0-9]+").unwrap();
}

/// Build the grading prompt.
pub fn judge_prompt(
    task_type: &TaskType,
    input: &str,
    candidate: &str,
    reference: Option<&str>,
    rubric: &str,
) -> String {
    let mut prompt = format!(
        "Task: {}\nInput: \"{}\"\nCandidate Response: \"{}\"\n",
        task_type, input, candidate
    );

    let closing = match reference {
        Some(reference) => {
            prompt.push_str(&format!("Reference Response: \"{}\"\n", reference));
            "Compare the candidate response with the reference response."
        }
        None => "Evaluate the candidate response based on the task requirements.",
    };

    prompt.push('\n');
    prompt.push_str(rubric.trim());
    prompt.push_str("\n\n");
    prompt.push_str(closing);
    prompt
}

/// Extract a score from a judge reply.
///
/// The first numeral wins: `"Score: 0.85"` is 0.85, `"8/10"` clamps to 1.0.
pub fn parse_score(reply: &str) -> Result<f64, String> {
    let numeral = SCORE_NUMERAL
        .find(reply)
        .ok_or_else(|| format!("no numeric score in judge reply {:?}", reply))?;

    numeral
        .as_str()
        .parse::<f64>()
        .map(|score| score.clamp(0.0, 1.0))
        .map_err(|e| format!("unparsable score {:?}: {}", numeral.as_str(), e))
}

/// Scores candidate answers with a judge model.
#[derive(Debug)]
pub struct JudgeClient {
    endpoint: EndpointConfig,
    client: RetryingEndpointClient,
    cache: Option<ScoreCache>,
}

impl JudgeClient {
    /// The judge endpoint always requires a key and URL.
    pub fn new(endpoint: EndpointConfig, client: RetryingEndpointClient) -> Self {
        Self {
            endpoint: endpoint.require_credentials(),
            client,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: ScoreCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Score `candidate` against the rubric.
    ///
    /// An absent or blank candidate scores 0.0 without calling the judge.
    pub async fn score(
        &self,
        task_type: &TaskType,
        input: &str,
        candidate: Option<&str>,
        reference: Option<&str>,
        rubric: &str,
    ) -> Result<f64, EndpointError> {
        let Some(candidate) = candidate.filter(|c| !c.trim().is_empty()) else {
            tracing::warn!("Candidate is empty, returning score 0.0");
            return Ok(0.0);
        };
        let reference = reference.filter(|r| !r.trim().is_empty());

        let key = ScoreKey::new(task_type.as_str(), input, candidate, reference, rubric);
        if let Some(cache) = &self.cache {
            if let Some(score) = cache.get(&key).await {
                tracing::debug!(score, "Judge score cache hit");
                return Ok(score);
            }
        }

        let prompt = judge_prompt(task_type, input, candidate, reference, rubric);
        let request = CompletionRequest::new(prompt)
            .with_max_tokens(JUDGE_MAX_TOKENS)
            .with_temperature(0.0);
        let score = self
            .client
            .send_with(&self.endpoint, &request, parse_score)
            .await?;

        if let Some(cache) = &self.cache {
            cache.insert(key, score).await;
        }
        Ok(score)
    }
}
