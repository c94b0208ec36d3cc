//! Task prompts and judging rubrics.
//!
//! Each built-in task type has a canned candidate prompt (with a single
//! `{input_text}` substitution point) and a rubric for the judge. Every rubric
//! ends by asking the judge for a bare number so the reply can be parsed.

use crate::types::{TaskContext, TaskType};

/// Substitution point for the sample input in prompt templates.
pub const INPUT_PLACEHOLDER: &str = "{input_text}";

/// Candidate prompt used for unknown task types without a custom template.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Process this input: {input_text}";

/// Rubric used for unknown task types without a custom rubric.
pub const DEFAULT_RUBRIC: &str = r#"Evaluate the LLM response quality. Score from 0.0 to 1.0 where:
- 1.0 = Excellent response, perfectly addresses the task
- 0.8-0.9 = Good response, minor issues or improvements possible
- 0.6-0.7 = Adequate response, some issues or missing elements
- 0.4-0.5 = Poor response, significant issues or incomplete
- 0.0-0.3 = Inadequate response, fails to address the task

Consider factors like:
- Accuracy and correctness
- Completeness and thoroughness
- Clarity and coherence
- Relevance to the task
- Overall quality

Reply only with a number between 0.0 and 1.0."#;

pub const GRAMMAR_RUBRIC: &str = r#"Evaluate the candidate's grammar correction. Score from 0.0 to 1.0 where:
- 1.0 = perfectly correct and matches reference
- 0.8-0.9 = minor rewording, still grammatically perfect
- 0.6-0.7 = contains partial fixes
- 0.3-0.5 = grammatically poor or missing key changes
- 0.0-0.2 = irrelevant or completely wrong

Reply only with a number between 0.0 and 1.0."#;

pub const SUMMARIZATION_RUBRIC: &str = r#"Evaluate the candidate summary. Score from 0.0 to 1.0 where:
- 1.0 = captures every key point, concise, no invented content
- 0.8-0.9 = captures the main points with minor omissions
- 0.6-0.7 = partially faithful, misses important points or is verbose
- 0.3-0.5 = mostly incomplete or contains inaccuracies
- 0.0-0.2 = unrelated to the source or fabricated

Reply only with a number between 0.0 and 1.0."#;

pub const TRANSLATION_RUBRIC: &str = r#"Evaluate the candidate translation. Score from 0.0 to 1.0 where:
- 1.0 = accurate meaning, fluent and natural phrasing
- 0.8-0.9 = accurate meaning with minor awkwardness
- 0.6-0.7 = mostly accurate, some mistranslated words or grammar errors
- 0.3-0.5 = meaning partially lost
- 0.0-0.2 = wrong language, untranslated or meaningless

Reply only with a number between 0.0 and 1.0."#;

pub const QUESTION_ANSWERING_RUBRIC: &str = r#"Evaluate the candidate answer. Score from 0.0 to 1.0 where:
- 1.0 = correct and directly answers the question
- 0.8-0.9 = correct with unnecessary detail or slight imprecision
- 0.6-0.7 = partially correct
- 0.3-0.5 = mostly incorrect but related
- 0.0-0.2 = wrong or does not answer the question

Reply only with a number between 0.0 and 1.0."#;

pub const TEXT_COMPLETION_RUBRIC: &str = r#"Evaluate the candidate completion. Score from 0.0 to 1.0 where:
- 1.0 = coherent, consistent with the prompt's style and content
- 0.8-0.9 = coherent with minor inconsistencies
- 0.6-0.7 = plausible but drifts from the prompt
- 0.3-0.5 = weakly related or incoherent in places
- 0.0-0.2 = unrelated or nonsensical

Reply only with a number between 0.0 and 1.0."#;

pub const CLASSIFICATION_RUBRIC: &str = r#"Evaluate the candidate classification. Score from 0.0 to 1.0 where:
- 1.0 = correct label, stated clearly
- 0.7-0.9 = correct label with extra or hedging text
- 0.3-0.6 = ambiguous label or partially correct
- 0.0-0.2 = wrong label or no label

Reply only with a number between 0.0 and 1.0."#;

/// Candidate prompt template for a built-in task type.
pub fn prompt_template(task: &TaskType) -> Option<&'static str> {
    match task {
        TaskType::GrammarCorrection => Some("Correct the grammar: {input_text}"),
        TaskType::Summarization => Some("Summarize the following text: {input_text}"),
        TaskType::Translation => Some("Translate the following text: {input_text}"),
        TaskType::QuestionAnswering => Some("Answer the following question: {input_text}"),
        TaskType::TextCompletion => Some("Complete the following text: {input_text}"),
        TaskType::Classification => Some("Classify the following text: {input_text}"),
        TaskType::Other(_) => None,
    }
}

/// Judging rubric for a built-in task type.
pub fn rubric(task: &TaskType) -> Option<&'static str> {
    match task {
        TaskType::GrammarCorrection => Some(GRAMMAR_RUBRIC),
        TaskType::Summarization => Some(SUMMARIZATION_RUBRIC),
        TaskType::Translation => Some(TRANSLATION_RUBRIC),
        TaskType::QuestionAnswering => Some(QUESTION_ANSWERING_RUBRIC),
        TaskType::TextCompletion => Some(TEXT_COMPLETION_RUBRIC),
        TaskType::Classification => Some(CLASSIFICATION_RUBRIC),
        TaskType::Other(_) => None,
    }
}

/// Maps task-type tags to a [`TaskContext`].
///
/// A caller-supplied template and rubric apply only to tags outside the
/// built-in set. Resolution never fails.
#[derive(Debug, Clone, Default)]
pub struct TaskPromptRouter {
    custom_template: Option<String>,
    custom_rubric: Option<String>,
}

impl TaskPromptRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Template for unknown task types.
    pub fn with_custom_template(mut self, template: impl Into<String>) -> Self {
        self.custom_template = Some(template.into()).filter(|t: &String| !t.trim().is_empty());
        self
    }

    /// Rubric for unknown task types.
    pub fn with_custom_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.custom_rubric = Some(rubric.into()).filter(|r: &String| !r.trim().is_empty());
        self
    }

    /// Resolve a task-type tag into its prompt template and rubric.
    pub fn resolve(&self, task_type: impl Into<TaskType>) -> TaskContext {
        let task_type = task_type.into();

        let prompt_template = prompt_template(&task_type)
            .map(str::to_string)
            .or_else(|| self.custom_template.clone())
            .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

        let rubric = rubric(&task_type)
            .map(str::to_string)
            .or_else(|| self.custom_rubric.clone())
            .unwrap_or_else(|| DEFAULT_RUBRIC.to_string());

        TaskContext {
            task_type,
            prompt_template,
            rubric,
        }
    }
}

impl TaskContext {
    /// Substitute the sample input into the prompt template.
    ///
    /// Templates without a placeholder get the input appended on its own line.
    pub fn render_prompt(&self, input: &str) -> String {
        if self.prompt_template.contains(INPUT_PLACEHOLDER) {
            self.prompt_template.replace(INPUT_PLACEHOLDER, input)
        } else {
            format!("{}\n\n{}", self.prompt_template.trim_end(), input)
        }
    }
}
