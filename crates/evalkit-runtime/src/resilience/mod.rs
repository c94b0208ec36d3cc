//! Resilience patterns for evalkit-runtime.
//!
//! Every endpoint call goes through [`RetryingEndpointClient`], which retries
//! transient failures with exponential backoff and reports a typed terminal
//! error once the attempt budget is spent.

mod retry;

pub use retry::{RetryingEndpointClient, DEFAULT_BACKOFF_BASE};
