//! Field extractors: per-type state machines over the text following the progress.
//!
//! An extractor is handed everything the model wrote after the confirmed
//! progress and decides whether a complete value is there yet. A value that is
//! complete but unusable (wrong literal, outside `min`/`max`, not in `enum`)
//! is reported as [`Extraction::Invalid`] so the generator can retry the slot.

mod boolean;
mod number;
mod string;

pub use boolean::BooleanExtractor;
pub use number::NumberExtractor;
pub use string::StringExtractor;

use serde_json::Value;

use crate::{
    constraints::{Constraint, ConstraintResults},
    schema::SchemaNode,
};

/// Outcome of looking at the trailing text.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// No terminator yet; wait for more text.
    Pending,
    /// A complete value that passed validation, with its literal as written.
    Valid {
        /// The parsed value.
        value: Value,
        /// The literal exactly as the model wrote it.
        literal: String,
    },
    /// A complete value that failed parsing or validation, as written.
    Invalid(String),
}

impl Extraction {
    /// Creates a valid extraction.
    pub fn valid(value: Value, literal: impl Into<String>) -> Self {
        Extraction::Valid {
            value,
            literal: literal.into(),
        }
    }
}

/// Characters that end an unquoted literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminators {
    /// Object member: `,` or `}`.
    Object,
    /// Array element: `,` or `]`.
    Array,
    /// The document root: `,`, `}`, `]`, or the end of the stream.
    Root,
}

impl Terminators {
    /// Returns true if `ch` ends a literal.
    #[inline]
    pub fn contains(&self, ch: char) -> bool {
        match self {
            Terminators::Object => matches!(ch, ',' | '}'),
            Terminators::Array => matches!(ch, ',' | ']'),
            Terminators::Root => matches!(ch, ',' | '}' | ']'),
        }
    }

    /// Returns true if the end of a finished stream also ends a literal.
    #[inline]
    pub const fn ends_at_eof(&self) -> bool {
        matches!(self, Terminators::Root)
    }

    /// Splits an unquoted literal off the front of `tail`.
    ///
    /// Returns `None` while no terminator has been seen.
    pub fn split_literal<'t>(&self, tail: &'t str, finished: bool) -> Option<&'t str> {
        match tail.find(|ch: char| self.contains(ch)) {
            Some(end) => Some(&tail[..end]),
            None if finished && self.ends_at_eof() && !tail.is_empty() => Some(tail),
            None => None,
        }
    }
}

/// Extractor for one primitive slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExtractor {
    /// Quoted string.
    String(StringExtractor),
    /// Number literal.
    Number(NumberExtractor),
    /// `true` / `false`.
    Boolean(BooleanExtractor),
}

impl FieldExtractor {
    /// Builds the extractor for a primitive node, or `None` for composite nodes.
    pub fn for_node(node: &SchemaNode, terminators: Terminators) -> Option<Self> {
        match node {
            SchemaNode::String(schema) => {
                Some(FieldExtractor::String(StringExtractor::new(schema.constraints())))
            }
            SchemaNode::Number(schema) => Some(FieldExtractor::Number(NumberExtractor::new(
                schema.constraints(),
                terminators,
            ))),
            SchemaNode::Boolean => Some(FieldExtractor::Boolean(BooleanExtractor::new(terminators))),
            _ => None,
        }
    }

    /// Examines the text following the progress.
    ///
    /// `finished` tells whether the stream has ended, which matters only for
    /// root literals.
    pub fn extract(&self, tail: &str, finished: bool) -> Extraction {
        match self {
            FieldExtractor::String(extractor) => extractor.extract(tail),
            FieldExtractor::Number(extractor) => extractor.extract(tail, finished),
            FieldExtractor::Boolean(extractor) => extractor.extract(tail, finished),
        }
    }

    /// Returns the schema kind this extractor reads.
    pub const fn kind(&self) -> &'static str {
        match self {
            FieldExtractor::String(_) => "string",
            FieldExtractor::Number(_) => "number",
            FieldExtractor::Boolean(_) => "boolean",
        }
    }
}

/// Runs `constraints` over a parsed value.
fn validated(constraints: &[Constraint], value: Value, raw: &str) -> Extraction {
    let results = ConstraintResults::evaluate(constraints, &value);
    if results.all_passed() {
        Extraction::valid(value, raw)
    } else {
        tracing::debug!(value = raw, "{}", results);
        Extraction::Invalid(raw.to_string())
    }
}
