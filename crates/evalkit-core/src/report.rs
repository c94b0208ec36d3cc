//! Serializable hand-off of a finished batch for persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{aggregate, Metrics, ScoreBands};
use crate::types::{EvaluationResult, TaskType};

/// `{ timestamp, metrics, results }` as written by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub timestamp: DateTime<Utc>,
    pub task_type: TaskType,
    pub metrics: Metrics,
    pub results: Vec<EvaluationResult>,
}

impl EvaluationReport {
    /// Build a report stamped with the current time.
    pub fn new(task_type: TaskType, metrics: Metrics, results: Vec<EvaluationResult>) -> Self {
        Self {
            timestamp: Utc::now(),
            task_type,
            metrics,
            results,
        }
    }

    /// Build a report, computing metrics from the results.
    pub fn from_results(task_type: TaskType, results: Vec<EvaluationResult>) -> Self {
        let metrics = aggregate(&results);
        Self::new(task_type, metrics, results)
    }

    pub fn score_bands(&self) -> ScoreBands {
        ScoreBands::from_results(&self.results)
    }

    /// Results that did not produce a score.
    pub fn failures(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
