//! Error types for schema-constrained generation.

use std::fmt;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Errors that abort a generation call.
///
/// Recoverable conditions (the service drifting away from the forced prefix,
/// values that fail validation) never show up here; they are handled inside
/// the generator by resubmitting the prompt.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The schema could not be interpreted.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The document tree holds no generation marker when progress is taken.
    ///
    /// This is an internal invariant violation.
    #[error("Generation marker not found in document")]
    MarkerNotFound,

    /// The completion provider failed.
    #[error("Completion provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// JSON error from serde_json.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerateError {
    /// Returns true if this error came from an unresolvable `$ref` or mapping pointer.
    #[inline]
    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, Self::Schema(SchemaError::InvalidReference { .. }))
    }

    /// Returns true if this error came from a schema node that cannot be generated.
    #[inline]
    pub fn is_unsupported_schema(&self) -> bool {
        matches!(self, Self::Schema(SchemaError::Unsupported { .. }))
    }
}

/// Errors raised while reading a schema or resolving references in it.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A node has no recognized `type`, `$ref` or `discriminator`, or is malformed.
    #[error("Unsupported schema at {location}: {reason}")]
    Unsupported {
        /// Where in the schema the node sits.
        location: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A pointer is malformed or names a segment that does not exist.
    #[error("Invalid reference '{pointer}': {reason}")]
    InvalidReference {
        /// The pointer as written in the schema.
        pointer: String,
        /// Why resolution failed.
        reason: String,
    },

    /// JSON error while loading the schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error while loading the schema.
    #[cfg(feature = "yaml")]
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    /// Creates an unsupported schema error.
    #[inline]
    pub fn unsupported(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid reference error.
    #[inline]
    pub fn invalid_reference(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }
}

/// Opaque error raised by a completion provider's transport.
///
/// The original error is kept as the source so callers can downcast it.
pub struct ProviderError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl ProviderError {
    /// Wraps a transport error.
    pub fn new(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self(error.into())
    }

    /// Creates a provider error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self(message.to_string().into())
    }

    /// Returns the wrapped transport error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Debug for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderError").field(&self.0).finish()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}
