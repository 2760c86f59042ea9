//! # streamform
//!
//! Schema-constrained JSON generation over streaming text-completion services.
//!
//! The generator owns the structure of the document: braces, keys, commas and
//! array boundaries come from the schema. The model only writes primitive
//! values, one slot at a time, and every value is parsed and checked against
//! its constraints before it is accepted.
//!
//! ## How it works
//!
//! - The document under construction holds a marker at the slot being
//!   generated. Its compact JSON rendering up to the marker is the *progress*.
//! - Every prompt ends with the progress, so the model's answer is forced to
//!   continue it. One completion stream usually serves many slots in a row.
//! - If the stream writes something other than the progress, a fresh prompt is
//!   submitted. Values that fail their constraints are retried a bounded
//!   number of times and end up as `null` after that.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streamform::{generate, CompletionProvider, Schema};
//!
//! # async fn run(provider: impl CompletionProvider) -> streamform::Result<()> {
//! let schema = Schema::from_json_str(r#"{
//!     "type": "object",
//!     "properties": {
//!         "car": {
//!             "type": "object",
//!             "properties": {
//!                 "make": {"type": "string"},
//!                 "year": {"type": "number", "min": 1940, "max": 1950},
//!                 "colors": {"type": "array", "items": {"type": "string"}}
//!             }
//!         }
//!     }
//! }"#)?;
//!
//! let car = generate(provider, schema, "Generate info about a car from the forties").await?;
//! println!("{}", car);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Streaming reuse**: a slot is read from the active stream whenever it
//!   still continues the progress
//! - **Constraints**: `enum`, numeric bounds and string length bounds
//! - **References and discriminated unions**: `$ref` pointers into the schema
//!   document and `discriminator` mappings
//! - **Typed results**: [`ConstrainedGenerator::generate_as`] deserializes into
//!   any `serde` type
//! - **YAML**: schemas and configuration can be loaded from YAML (`yaml` feature)

pub mod config;
pub mod constraints;
pub mod document;
pub mod error;
pub mod extract;
pub mod generator;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod stream;
pub mod transcript;

pub use config::GeneratorConfig;
pub use error::{GenerateError, ProviderError, Result, SchemaError};
pub use generator::ConstrainedGenerator;
pub use provider::{CompletionProvider, CompletionStream};
pub use schema::{Schema, SchemaNode};

use serde_json::Value;

/// Generates one document with the default configuration.
///
/// Shorthand for [`ConstrainedGenerator::new`] followed by
/// [`generate`](ConstrainedGenerator::generate).
///
/// # Errors
///
/// See [`ConstrainedGenerator::generate`].
pub async fn generate<P: CompletionProvider>(
    provider: P,
    schema: Schema,
    instruction: &str,
) -> Result<Value> {
    ConstrainedGenerator::new(provider, schema, instruction)
        .generate()
        .await
}
