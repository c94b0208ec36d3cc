//! # evalkit-runtime
//!
//! Network side of evalkit: model endpoints, retries, the candidate and judge
//! clients, and the batch orchestrator.
//!
//! The deterministic pieces (sanitizer, prompt router, metrics) live in
//! `evalkit-core`; this crate only adds what needs I/O.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use evalkit_runtime::{EvaluationOrchestrator, ReqwestTransport, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("evalkit.yaml")?;
//! let orchestrator = EvaluationOrchestrator::from_config(&config, Arc::new(ReqwestTransport::new()));
//!
//! let outcome = orchestrator
//!     .evaluate_batch(&dataset.samples, "grammar_correction", None, None)
//!     .await;
//! println!("average score {:.2}", outcome.metrics.average_score);
//! ```

pub mod agents;
pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod resilience;
pub mod transport;

#[cfg(test)]
mod testing;

pub use agents::{CandidateClient, JudgeClient};
pub use cache::{ScoreCache, ScoreKey};
pub use config::{ConfigError, EndpointSettings, RuntimeConfig};
pub use orchestrator::{
    BatchOutcome, EvaluationOrchestrator, EvaluationOrchestratorBuilder, RuntimeError,
};
pub use providers::{
    ApiCredential, CompletionRequest, CredentialSource, EndpointConfig, EndpointError,
    EndpointErrorKind, ProviderKind, ResponseShape,
};
pub use resilience::RetryingEndpointClient;
pub use transport::{HttpRequest, HttpResponse, Transport, TransportError};

#[cfg(feature = "http")]
pub use transport::ReqwestTransport;

// Re-export for callers wiring cancellation
pub use tokio_util::sync::CancellationToken;
