//! Response sanitization for raw model replies.
//!
//! Small local models tend to wrap the answer in reasoning blocks and
//! narration ("Let me think about this...", "So the corrected sentence
//! would be:"). [`clean`] strips those artifacts and recovers the line that
//! most likely holds the final answer.
//!
//! The function is pure and idempotent: `clean(&clean(x)) == clean(x)`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Paired reasoning markers. The whole span, markers included, is removed.
    static ref REASONING_SPANS: Vec<Regex> = vec![
        Regex::new(r"(?is)<think>.*?</think>").unwrap(),
        Regex::new(r"(?is)<thinking>.*?</thinking>").unwrap(),
        Regex::new(r"(?is)<reasoning>.*?</reasoning>").unwrap(),
        Regex::new(r"(?is)\*\*thinking\*\*.*?\*\*end thinking\*\*").unwrap(),
        Regex::new(r"(?is)\*thinking\*.*?\*end thinking\*").unwrap(),
    ];

    /// Meta-commentary lead-ins. A line starting with one of these is dropped.
    static ref NARRATION_LINE: Regex = Regex::new(
        r"(?i)^\s*(let me think|i need to|the original sentence|looking at this|first,|first i\b|so the corrected|therefore|i can see|this sentence|the sentence|okay, let me|alright, let me|hmm\b)"
    ).unwrap();
}

/// Leading words that mark a line as commentary rather than an answer.
const NARRATION_OPENERS: [&str; 6] = ["the", "this", "so", "therefore", "looking", "first"];

/// Clean a raw model reply down to its intended answer.
///
/// Never fails; empty or whitespace-only input yields an empty string.
pub fn clean(raw: &str) -> String {
    let without_reasoning = strip_reasoning(raw);
    let without_narration = strip_narration(&without_reasoning);
    let collapsed = collapse_blank_lines(&without_narration);
    let text = collapsed.trim();

    if text.lines().count() > 1 {
        if let Some(answer) = final_answer_line(text) {
            return answer.to_string();
        }
    }

    text.to_string()
}

/// Remove reasoning spans until none remain.
///
/// Removing one span can splice two halves of a marker together, so the
/// pass repeats to a fixpoint.
fn strip_reasoning(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let mut changed = false;
        for pattern in REASONING_SPANS.iter() {
            if pattern.is_match(&text) {
                text = pattern.replace_all(&text, "").into_owned();
                changed = true;
            }
        }
        if !changed {
            return text;
        }
    }
}

/// Drop narration lines. The last non-blank line is always kept so a
/// single-line answer that happens to start with an opener survives.
fn strip_narration(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let last_content = lines.iter().rposition(|line| !line.trim().is_empty());

    lines
        .iter()
        .enumerate()
        .filter(|(i, line)| Some(*i) == last_content || !NARRATION_LINE.is_match(line))
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace every run of blank lines with a single empty line.
fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;

    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank {
            if !previous_blank {
                out.push("");
            }
        } else {
            out.push(line);
        }
        previous_blank = blank;
    }

    out.join("\n")
}

/// Scan from the bottom for the first line that reads like an answer.
fn final_answer_line(text: &str) -> Option<&str> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !starts_with_opener(line))
}

fn starts_with_opener(line: &str) -> bool {
    let first_word = line
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    NARRATION_OPENERS.contains(&first_word.as_str())
}
