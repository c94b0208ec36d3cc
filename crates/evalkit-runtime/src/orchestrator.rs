//! Batch orchestrator for candidate generation and judge scoring.
//!
//! Each sample runs its own pipeline:
//! 1. Empty input fails with "missing input text" and makes no calls
//! 2. The task prompt is rendered and sent to the candidate
//! 3. The sanitized answer is scored by the judge
//!
//! A failed sample is recorded in-band and never stops the batch. Up to
//! `concurrency` pipelines run at once; results come back in input order.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use evalkit_core::{
    aggregate, EvaluationReport, EvaluationResult, Metrics, Sample, TaskContext,
    TaskPromptRouter, TaskType,
};

use crate::agents::{CandidateClient, JudgeClient};
use crate::config::RuntimeConfig;
use crate::resilience::RetryingEndpointClient;
use crate::transport::Transport;

/// Error recorded for samples with empty input.
pub const MISSING_INPUT_ERROR: &str = "missing input text";

/// Error recorded when the candidate endpoint gives up.
pub const CANDIDATE_FAILED_ERROR: &str = "Failed to get candidate response";

/// Error recorded when the judge endpoint gives up.
pub const SCORE_FAILED_ERROR: &str = "Failed to get score";

/// Errors from building the orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Candidate client not configured")]
    CandidateNotConfigured,

    #[error("Judge client not configured")]
    JudgeNotConfigured,
}

/// Results and metrics of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// One entry per evaluated sample, in input order
    pub results: Vec<EvaluationResult>,
    pub metrics: Metrics,
    /// True if cancellation skipped or abandoned at least one sample
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn into_report(self, task_type: TaskType) -> EvaluationReport {
        EvaluationReport::new(task_type, self.metrics, self.results)
    }
}

/// Runs candidate/judge pipelines over a sample set.
#[derive(Debug)]
pub struct EvaluationOrchestrator {
    candidate: CandidateClient,
    judge: JudgeClient,
    concurrency: usize,
}

impl EvaluationOrchestrator {
    /// Sequential orchestrator.
    pub fn new(candidate: CandidateClient, judge: JudgeClient) -> Self {
        Self {
            candidate,
            judge,
            concurrency: 1,
        }
    }

    pub fn builder() -> EvaluationOrchestratorBuilder {
        EvaluationOrchestratorBuilder::new()
    }

    /// Wire both clients from config over a shared transport.
    pub fn from_config(config: &RuntimeConfig, transport: Arc<dyn Transport>) -> Self {
        let client = RetryingEndpointClient::new(transport).with_backoff_base(config.retry.backoff_base);

        let candidate = CandidateClient::new(
            config.candidate.resolve("candidate API key"),
            client.clone(),
        );
        let mut judge = JudgeClient::new(config.judge.resolve("judge API key"), client);
        if let Some(cache) = config.cache.build() {
            judge = judge.with_cache(cache);
        }

        Self {
            candidate,
            judge,
            concurrency: config.concurrency.max(1),
        }
    }

    pub fn candidate(&self) -> &CandidateClient {
        &self.candidate
    }

    pub fn judge(&self) -> &JudgeClient {
        &self.judge
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Evaluate every sample.
    ///
    /// `custom_prompt` and `custom_rubric` apply only when `task_type` is not
    /// a built-in task.
    pub async fn evaluate_batch(
        &self,
        samples: &[Sample],
        task_type: impl Into<TaskType>,
        custom_prompt: Option<&str>,
        custom_rubric: Option<&str>,
    ) -> BatchOutcome {
        self.evaluate_batch_with_cancel(
            samples,
            task_type,
            custom_prompt,
            custom_rubric,
            &CancellationToken::new(),
        )
        .await
    }

    /// Evaluate samples until done or `cancel` fires.
    ///
    /// On cancellation unstarted samples are skipped and in-flight ones are
    /// dropped; the outcome holds whatever finished before that.
    pub async fn evaluate_batch_with_cancel(
        &self,
        samples: &[Sample],
        task_type: impl Into<TaskType>,
        custom_prompt: Option<&str>,
        custom_rubric: Option<&str>,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let mut router = TaskPromptRouter::new();
        if let Some(template) = custom_prompt {
            router = router.with_custom_template(template);
        }
        if let Some(rubric) = custom_rubric {
            router = router.with_custom_rubric(rubric);
        }
        let context = router.resolve(task_type);

        tracing::info!(
            task_type = %context.task_type,
            samples = samples.len(),
            concurrency = self.concurrency,
            "Starting evaluation batch"
        );

        let context = &context;
        let results: Vec<EvaluationResult> = stream::iter(samples.iter().enumerate())
            .map(|(index, sample)| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::warn!(index, "Sample abandoned on cancellation");
                        None
                    }
                    result = self.evaluate_sample(index, sample, context) => Some(result),
                }
            })
            .buffered(self.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        let metrics = aggregate(&results);
        let cancelled = cancel.is_cancelled() && results.len() < samples.len();

        tracing::info!(
            evaluated = results.len(),
            successful = metrics.successful_evaluations,
            average_score = metrics.average_score,
            cancelled,
            "Evaluation batch finished"
        );

        BatchOutcome {
            results,
            metrics,
            cancelled,
        }
    }

    /// Run one sample's pipeline. Never fails; errors are recorded on the result.
    pub async fn evaluate_sample(
        &self,
        index: usize,
        sample: &Sample,
        context: &TaskContext,
    ) -> EvaluationResult {
        let task_type = context.task_type.clone();

        if !sample.is_evaluable() {
            tracing::error!(index, error = MISSING_INPUT_ERROR, "Sample failed");
            return EvaluationResult::failed(index, sample, task_type, None, MISSING_INPUT_ERROR);
        }

        let prompt = context.render_prompt(&sample.input);
        let candidate = match self.candidate.generate(&prompt).await {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::error!(index, error = %e, "Failed to get candidate response");
                return EvaluationResult::failed(
                    index,
                    sample,
                    task_type,
                    None,
                    CANDIDATE_FAILED_ERROR,
                );
            }
        };

        let scored = self
            .judge
            .score(
                &context.task_type,
                &sample.input,
                Some(&candidate),
                sample.reference.as_deref(),
                &context.rubric,
            )
            .await;

        match scored {
            Ok(score) => {
                tracing::info!(index, score, candidate = %candidate, "Sample scored");
                EvaluationResult::scored(index, sample, task_type, candidate, score)
            }
            Err(e) => {
                tracing::error!(index, error = %e, "Failed to get score");
                EvaluationResult::failed(index, sample, task_type, Some(candidate), SCORE_FAILED_ERROR)
            }
        }
    }
}

/// Builder for [`EvaluationOrchestrator`].
pub struct EvaluationOrchestratorBuilder {
    candidate: Option<CandidateClient>,
    judge: Option<JudgeClient>,
    concurrency: usize,
}

impl EvaluationOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            candidate: None,
            judge: None,
            concurrency: 1,
        }
    }

    pub fn candidate(mut self, candidate: CandidateClient) -> Self {
        self.candidate = Some(candidate);
        self
    }

    pub fn judge(mut self, judge: JudgeClient) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Pipelines in flight at once; values below 1 mean 1.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn build(self) -> Result<EvaluationOrchestrator, RuntimeError> {
        let candidate = self.candidate.ok_or(RuntimeError::CandidateNotConfigured)?;
        let judge = self.judge.ok_or(RuntimeError::JudgeNotConfigured)?;

        Ok(EvaluationOrchestrator {
            candidate,
            judge,
            concurrency: self.concurrency,
        })
    }
}

impl Default for EvaluationOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
