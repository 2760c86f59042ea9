//! Number literal extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::{validated, Extraction, Terminators};
use crate::constraints::Constraint;

static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?$")
        .expect("Invalid number regex pattern")
});

/// Reads a JSON number up to a terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberExtractor {
    constraints: Vec<Constraint>,
    terminators: Terminators,
}

impl NumberExtractor {
    /// Creates a number extractor.
    pub fn new(constraints: Vec<Constraint>, terminators: Terminators) -> Self {
        Self {
            constraints,
            terminators,
        }
    }

    /// Examines the text following the progress.
    pub fn extract(&self, tail: &str, finished: bool) -> Extraction {
        let Some(literal) = self.terminators.split_literal(tail, finished) else {
            return Extraction::Pending;
        };

        match parse_number(literal) {
            Some(number) => validated(&self.constraints, Value::Number(number), literal),
            None => Extraction::Invalid(literal.to_string()),
        }
    }
}

/// Parses a JSON number literal, preferring an integer representation.
pub fn parse_number(literal: &str) -> Option<Number> {
    if !NUMBER_REGEX.is_match(literal) {
        return None;
    }

    let is_integer = !literal.contains(['.', 'e', 'E']);
    if is_integer {
        if let Ok(n) = literal.parse::<i64>() {
            return Some(Number::from(n));
        }
        if let Ok(n) = literal.parse::<u64>() {
            return Some(Number::from(n));
        }
    }

    literal.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn year() -> NumberExtractor {
        NumberExtractor::new(
            vec![Constraint::Min(1940.0), Constraint::Max(1950.0)],
            Terminators::Object,
        )
    }

    #[test]
    fn test_year_in_range() {
        assert_eq!(year().extract("1945,", false), Extraction::valid(json!(1945), "1945"));
    }

    #[test]
    fn test_year_out_of_range() {
        assert_eq!(year().extract("1999,", false), Extraction::Invalid("1999".into()));
    }

    #[test]
    fn test_pending_without_terminator() {
        assert_eq!(year().extract("194", false), Extraction::Pending);
        assert_eq!(year().extract("1945", true), Extraction::Pending);
    }

    #[test]
    fn test_root_number_ends_with_stream() {
        let extractor = NumberExtractor::new(Vec::new(), Terminators::Root);
        assert_eq!(extractor.extract("12.5", false), Extraction::Pending);
        assert_eq!(extractor.extract("12.5", true), Extraction::valid(json!(12.5), "12.5"));
    }

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number("-7"), Some(Number::from(-7)));
        assert_eq!(parse_number("0.25"), Number::from_f64(0.25));
        assert_eq!(parse_number("1e3"), Number::from_f64(1000.0));
        assert_eq!(parse_number("18446744073709551615"), Some(Number::from(u64::MAX)));
    }

    #[test]
    fn test_parse_number_rejects_non_json() {
        for literal in ["", "-", "01", "+1", "1.", ".5", "inf", "NaN", "12abc", "\"12\""] {
            assert_eq!(parse_number(literal), None, "{literal} should not parse");
        }
    }

    #[test]
    fn test_enum_numbers() {
        let extractor = NumberExtractor::new(
            vec![Constraint::OneOf(vec![json!(2.0), json!(4.0)])],
            Terminators::Object,
        );
        assert_eq!(extractor.extract("4}", false), Extraction::valid(json!(4), "4"));
        assert_eq!(extractor.extract("3}", false), Extraction::Invalid("3".into()));
    }
}
