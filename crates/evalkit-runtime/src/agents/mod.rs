//! Model-facing agents.
//!
//! The candidate produces answers under test; the judge grades them.
//! Both share one [`RetryingEndpointClient`](crate::resilience::RetryingEndpointClient)
//! and differ only in endpoint, prompt shape and reply handling.

mod candidate;
mod judge;

pub use candidate::{CandidateClient, HEALTH_CHECK_PROMPT};
pub use judge::{judge_prompt, parse_score, JudgeClient, JUDGE_MAX_TOKENS};
