//! Dataset ingestion from JSONL or JSON-array files.
//!
//! Each record needs an `input` field. The reference answer is read from
//! `ideal`, `reference` or `expected`, in that order. Records without usable
//! input are dropped with a warning and never reach the orchestrator.

use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::Sample;

/// Field names accepted for the reference answer, in priority order.
pub const REFERENCE_FIELDS: [&str; 3] = ["ideal", "reference", "expected"];

/// Errors that can occur when loading a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON dataset must be an array of objects")]
    NotAnArray,
}

/// Samples loaded from a dataset plus the count of dropped records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub samples: Vec<Sample>,
    pub skipped: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Load newline-delimited JSON records.
///
/// Blank lines are ignored; malformed lines are skipped and counted.
pub fn load_jsonl(text: &str) -> Dataset {
    let mut dataset = Dataset::default();

    for (line_no, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<JsonValue>(line) {
            Ok(record) => match sample_from_record(&record) {
                Some(sample) => dataset.samples.push(sample),
                None => {
                    tracing::warn!(line = line_no, "Skipping record without input text");
                    dataset.skipped += 1;
                }
            },
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping invalid JSON line");
                dataset.skipped += 1;
            }
        }
    }

    tracing::info!(
        loaded = dataset.samples.len(),
        skipped = dataset.skipped,
        "Loaded JSONL dataset"
    );
    dataset
}

/// Load a JSON array of records.
pub fn load_json(text: &str) -> Result<Dataset, DatasetError> {
    let document: JsonValue = serde_json::from_str(text)?;
    let records = document.as_array().ok_or(DatasetError::NotAnArray)?;

    let mut dataset = Dataset::default();
    for (index, record) in records.iter().enumerate() {
        match sample_from_record(record) {
            Some(sample) => dataset.samples.push(sample),
            None => {
                tracing::warn!(record = index + 1, "Skipping record without input text");
                dataset.skipped += 1;
            }
        }
    }

    tracing::info!(
        loaded = dataset.samples.len(),
        skipped = dataset.skipped,
        "Loaded JSON dataset"
    );
    Ok(dataset)
}

/// Load a dataset file, choosing the format by extension (`.json` is an
/// array, anything else is JSONL).
pub fn load_path(path: impl AsRef<Path>) -> Result<Dataset, DatasetError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;

    let is_json_array = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json_array {
        load_json(&text)
    } else {
        Ok(load_jsonl(&text))
    }
}

/// Build a sample from one record, or `None` if it has no usable input.
pub fn sample_from_record(record: &JsonValue) -> Option<Sample> {
    let input = record.get("input")?.as_str()?;
    if input.trim().is_empty() {
        return None;
    }

    let reference = REFERENCE_FIELDS
        .iter()
        .filter_map(|field| record.get(*field).and_then(JsonValue::as_str))
        .find(|value| !value.trim().is_empty())
        .map(str::to_string);

    Some(Sample {
        input: input.to_string(),
        reference,
    })
}
