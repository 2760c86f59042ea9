//! Quoted string extraction.

use serde_json::Value;

use super::{validated, Extraction};
use crate::constraints::Constraint;

/// Reads a JSON string literal, escapes included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringExtractor {
    constraints: Vec<Constraint>,
}

impl StringExtractor {
    /// Creates a string extractor checking `constraints`.
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    /// Examines the text following the progress.
    ///
    /// The literal must open with a quote and ends at the next unescaped
    /// quote. Anything else at the start is a complete but invalid value.
    pub fn extract(&self, tail: &str) -> Extraction {
        let mut chars = tail.char_indices();
        match chars.next() {
            None => return Extraction::Pending,
            Some((_, '"')) => {}
            Some(_) => return Extraction::Invalid(tail.to_string()),
        }

        let mut escape_next = false;
        for (index, ch) in chars {
            if escape_next {
                escape_next = false;
                continue;
            }
            match ch {
                '\\' => escape_next = true,
                '"' => {
                    let literal = &tail[..=index];
                    return match serde_json::from_str::<String>(literal) {
                        Ok(decoded) => validated(&self.constraints, Value::String(decoded), literal),
                        Err(_) => Extraction::Invalid(literal.to_string()),
                    };
                }
                _ => {}
            }
        }

        Extraction::Pending
    }
}
