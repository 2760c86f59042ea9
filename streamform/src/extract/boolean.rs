//! Boolean literal extraction.

use serde_json::Value;

use super::{Extraction, Terminators};

/// Reads `true` or `false` up to a terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanExtractor {
    terminators: Terminators,
}

impl BooleanExtractor {
    /// Creates a boolean extractor.
    pub fn new(terminators: Terminators) -> Self {
        Self { terminators }
    }

    /// Examines the text following the progress.
    pub fn extract(&self, tail: &str, finished: bool) -> Extraction {
        match self.terminators.split_literal(tail, finished) {
            None => Extraction::Pending,
            Some(literal @ "true") => Extraction::valid(Value::Bool(true), literal),
            Some(literal @ "false") => Extraction::valid(Value::Bool(false), literal),
            Some(other) => Extraction::Invalid(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        let extractor = BooleanExtractor::new(Terminators::Object);
        assert_eq!(extractor.extract("true,", false), Extraction::valid(Value::Bool(true), "true"));
        assert_eq!(extractor.extract("false}", false), Extraction::valid(Value::Bool(false), "false"));
    }

    #[test]
    fn test_pending_and_invalid() {
        let extractor = BooleanExtractor::new(Terminators::Array);
        assert_eq!(extractor.extract("tru", false), Extraction::Pending);
        assert_eq!(extractor.extract("yes]", false), Extraction::Invalid("yes".into()));
        assert_eq!(extractor.extract("\"true\",", false), Extraction::Invalid("\"true\"".into()));
    }
}
