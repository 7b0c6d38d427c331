//! The vibe quiz: the fixed question set served to the front-end and the
//! answer types posted back by it.

mod questions;
mod targets;

pub use questions::{question_set, Question};
pub use targets::VibeTargets;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single quiz answer. Option questions send the chosen label, scale
/// questions send a number (some clients send the number as a string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Scale(f64),
    Choice(String),
}

impl AnswerValue {
    /// Numeric view of the answer, parsing textual numbers.
    pub fn as_scale(&self) -> Option<f64> {
        match self {
            AnswerValue::Scale(value) => Some(*value),
            AnswerValue::Choice(text) => text.trim().parse().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, AnswerValue::Choice(text) if text.trim().is_empty())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Scale(value) if value.fract() == 0.0 => write!(f, "{}", *value as i64),
            AnswerValue::Scale(value) => write!(f, "{}", value),
            AnswerValue::Choice(text) => f.write_str(text.trim()),
        }
    }
}

/// Answers keyed by question id. Ordered so prompts are reproducible.
pub type QuizAnswers = BTreeMap<String, AnswerValue>;
