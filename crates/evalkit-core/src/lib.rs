//! # evalkit-core
//!
//! Deterministic building blocks for LLM-as-judge evaluation.
//!
//! This crate holds everything in the evaluation pipeline that does not touch
//! the network:
//! - The data model: samples, task types, per-sample results
//! - Response sanitization of raw model replies
//! - Task prompt templates and judging rubrics
//! - Summary statistics over a finished batch
//! - Dataset ingestion and the persisted report shape
//!
//! Model calls, retries and batch orchestration live in `evalkit-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use evalkit_core::{aggregate, clean, TaskPromptRouter};
//!
//! let ctx = TaskPromptRouter::new().resolve("grammar_correction");
//! assert_eq!(ctx.render_prompt("She have a book."), "Correct the grammar: She have a book.");
//!
//! let answer = clean("<think>subject-verb agreement</think>\nShe has a book.");
//! assert_eq!(answer, "She has a book.");
//!
//! let metrics = aggregate(&[]);
//! assert_eq!(metrics.success_rate, 0.0);
//! ```

pub mod dataset;
pub mod metrics;
pub mod report;
pub mod router;
pub mod sanitizer;
pub mod types;

// Re-export main types at crate root
pub use dataset::{load_json, load_jsonl, load_path, Dataset, DatasetError};
pub use metrics::{aggregate, percentile, Metrics, ScoreBands};
pub use report::EvaluationReport;
pub use router::TaskPromptRouter;
pub use sanitizer::clean;
pub use types::{EvaluationResult, Sample, TaskContext, TaskType};
