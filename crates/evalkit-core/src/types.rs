//! Core data model shared by the evaluation pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single dataset record to evaluate.
///
/// Samples are immutable once loaded; the orchestrator only borrows them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// The text handed to the candidate model
    pub input: String,

    /// Known-good answer, if the dataset provides one
    #[serde(default)]
    pub reference: Option<String>,
}

impl Sample {
    /// Create a sample with a reference answer.
    pub fn new(input: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reference: Some(reference.into()),
        }
    }

    /// Create a sample without a reference answer.
    pub fn without_reference(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reference: None,
        }
    }

    /// Whether this sample carries enough data to be evaluated.
    pub fn is_evaluable(&self) -> bool {
        !self.input.trim().is_empty()
    }
}

/// Task-type tag selecting the prompt template and judging rubric.
///
/// Unknown tags are carried verbatim in [`TaskType::Other`]; they are never
/// an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    GrammarCorrection,
    Summarization,
    Translation,
    QuestionAnswering,
    TextCompletion,
    Classification,
    Other(String),
}

impl TaskType {
    /// All built-in task types.
    pub const KNOWN: [TaskType; 6] = [
        TaskType::GrammarCorrection,
        TaskType::Summarization,
        TaskType::Translation,
        TaskType::QuestionAnswering,
        TaskType::TextCompletion,
        TaskType::Classification,
    ];

    /// The wire/config tag for this task type.
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::GrammarCorrection => "grammar_correction",
            TaskType::Summarization => "summarization",
            TaskType::Translation => "translation",
            TaskType::QuestionAnswering => "question_answering",
            TaskType::TextCompletion => "text_completion",
            TaskType::Classification => "classification",
            TaskType::Other(tag) => tag,
        }
    }

    /// Whether this is one of the built-in task types.
    pub fn is_known(&self) -> bool {
        !matches!(self, TaskType::Other(_))
    }
}

impl FromStr for TaskType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Ok(match tag.to_ascii_lowercase().as_str() {
            "grammar_correction" => TaskType::GrammarCorrection,
            "summarization" => TaskType::Summarization,
            "translation" => TaskType::Translation,
            "question_answering" => TaskType::QuestionAnswering,
            "text_completion" => TaskType::TextCompletion,
            "classification" => TaskType::Classification,
            _ => TaskType::Other(tag.to_string()),
        })
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(task) => task,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for TaskType {
    fn from(value: &str) -> Self {
        TaskType::from(value.to_string())
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt template and rubric resolved for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskContext {
    pub task_type: TaskType,

    /// Candidate prompt with a single `{input_text}` substitution point
    pub prompt_template: String,

    /// Scoring instructions handed to the judge
    pub rubric: String,
}

/// Outcome of evaluating one sample. Created exactly once per sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    /// Position of the originating sample in the input sequence
    pub index: usize,

    pub input: String,

    pub reference: Option<String>,

    /// Sanitized candidate answer, when generation succeeded
    pub candidate: Option<String>,

    /// Judge score in [0.0, 1.0], present only on success
    pub score: Option<f64>,

    pub success: bool,

    /// Human-readable failure reason
    pub error: Option<String>,

    pub task_type: TaskType,
}

impl EvaluationResult {
    /// A successfully scored sample.
    pub fn scored(
        index: usize,
        sample: &Sample,
        task_type: TaskType,
        candidate: String,
        score: f64,
    ) -> Self {
        Self {
            index,
            input: sample.input.clone(),
            reference: sample.reference.clone(),
            candidate: Some(candidate),
            score: Some(score.clamp(0.0, 1.0)),
            success: true,
            error: None,
            task_type,
        }
    }

    /// A failed sample. `candidate` is kept when generation got that far.
    pub fn failed(
        index: usize,
        sample: &Sample,
        task_type: TaskType,
        candidate: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            index,
            input: sample.input.clone(),
            reference: sample.reference.clone(),
            candidate,
            score: None,
            success: false,
            error: Some(error.into()),
            task_type,
        }
    }

    /// The score if this result counts toward statistics.
    pub fn successful_score(&self) -> Option<f64> {
        if self.success {
            self.score
        } else {
            None
        }
    }
}
