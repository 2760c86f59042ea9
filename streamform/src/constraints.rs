//! Constraint validation for generated scalar values.
//!
//! Schema nodes declare `enum`, `min` and `max`. Those declarations are turned
//! into [`Constraint`]s, and every candidate value an extractor pulls out of the
//! stream is checked against them before it is written into the document.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use streamform::constraints::{Constraint, ConstraintResults};
//!
//! let constraints = [Constraint::Min(1940.0), Constraint::Max(1950.0)];
//!
//! let results = ConstraintResults::evaluate(&constraints, &json!(1945));
//! assert!(results.all_passed());
//!
//! let results = ConstraintResults::evaluate(&constraints, &json!(1999));
//! assert_eq!(results.failures().len(), 1);
//! ```

use std::fmt;

use serde_json::Value;

/// A single restriction on a generated value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// The value must equal one of the listed literals (`enum`).
    OneOf(Vec<Value>),

    /// Numeric lower bound, inclusive (`min`).
    Min(f64),

    /// Numeric upper bound, inclusive (`max`).
    Max(f64),

    /// Lower bound on a string's length in characters.
    MinLength(usize),

    /// Upper bound on a string's length in characters.
    MaxLength(usize),
}

impl Constraint {
    /// Returns the schema keyword this constraint came from.
    pub const fn name(&self) -> &'static str {
        match self {
            Constraint::OneOf(_) => "enum",
            Constraint::Min(_) | Constraint::MinLength(_) => "min",
            Constraint::Max(_) | Constraint::MaxLength(_) => "max",
        }
    }

    /// Checks `value` against this constraint.
    ///
    /// A value of the wrong JSON kind (a string checked against `Min`, say)
    /// fails the check.
    pub fn validate(&self, value: &Value) -> ConstraintResult {
        let passed = match self {
            Constraint::OneOf(allowed) => allowed.iter().any(|a| literal_eq(a, value)),
            Constraint::Min(min) => value.as_f64().is_some_and(|v| v >= *min),
            Constraint::Max(max) => value.as_f64().is_some_and(|v| v <= *max),
            Constraint::MinLength(min) => value
                .as_str()
                .is_some_and(|s| s.chars().count() >= *min),
            Constraint::MaxLength(max) => value
                .as_str()
                .is_some_and(|s| s.chars().count() <= *max),
        };

        ConstraintResult {
            constraint: self.clone(),
            passed,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::OneOf(allowed) => {
                let rendered = allowed
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "one of [{}]", rendered)
            }
            Constraint::Min(min) => write!(f, ">= {}", min),
            Constraint::Max(max) => write!(f, "<= {}", max),
            Constraint::MinLength(min) => write!(f, "at least {} characters", min),
            Constraint::MaxLength(max) => write!(f, "at most {} characters", max),
        }
    }
}

/// Numbers compare by value so that `1945` matches an `enum` entry of `1945.0`.
fn literal_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => expected == actual,
    }
}

/// Result of checking one constraint.
#[derive(Debug, Clone)]
pub struct ConstraintResult {
    /// The constraint that was checked.
    pub constraint: Constraint,

    /// Whether the constraint passed.
    pub passed: bool,
}

impl ConstraintResult {
    /// Returns true if the constraint passed.
    pub const fn passed(&self) -> bool {
        self.passed
    }

    /// Returns true if the constraint failed.
    pub const fn failed(&self) -> bool {
        !self.passed
    }
}

impl fmt::Display for ConstraintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "[{}] {}: {}",
            self.constraint.name(),
            status,
            self.constraint
        )
    }
}

/// Collection of constraint results for one value.
#[derive(Debug, Clone, Default)]
pub struct ConstraintResults {
    results: Vec<ConstraintResult>,
}

impl ConstraintResults {
    /// Creates a new empty collection.
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Checks `value` against every constraint in `constraints`.
    pub fn evaluate(constraints: &[Constraint], value: &Value) -> Self {
        Self {
            results: constraints.iter().map(|c| c.validate(value)).collect(),
        }
    }

    /// Adds a constraint result.
    pub fn add(&mut self, result: ConstraintResult) {
        self.results.push(result);
    }

    /// Returns all constraint results.
    pub fn all(&self) -> &[ConstraintResult] {
        &self.results
    }

    /// Returns true if every constraint passed (vacuously true when empty).
    #[inline]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(ConstraintResult::passed)
    }

    /// Returns the failing results.
    pub fn failures(&self) -> Vec<&ConstraintResult> {
        self.results.iter().filter(|r| r.failed()).collect()
    }

    /// Returns true if there are no results.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns the number of results.
    #[inline]
    pub fn len(&self) -> usize {
        self.results.len()
    }
}

impl fmt::Display for ConstraintResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No constraints");
        }

        writeln!(f, "Constraint Results ({} total):", self.len())?;
        for result in &self.results {
            writeln!(f, "  {}", result)?;
        }
        Ok(())
    }
}
