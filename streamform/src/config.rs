//! Generator configuration.

use serde::{Deserialize, Serialize};

use crate::prompt::PromptTemplate;

/// Default bound on retries for a value that terminated but failed validation.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Default bound on resubmissions caused by the model leaving the forced prefix.
pub const DEFAULT_MAX_RESUBMISSIONS: usize = 10;

/// Configuration for [`ConstrainedGenerator`](crate::generator::ConstrainedGenerator).
///
/// # Examples
///
/// ```
/// use streamform::config::GeneratorConfig;
///
/// let config = GeneratorConfig::default().with_max_retries(2);
/// assert_eq!(config.max_retries, 2);
///
/// let config: GeneratorConfig = serde_json::from_str(r#"{"max_resubmissions": 3}"#).unwrap();
/// assert_eq!(config.max_retries, 5);
/// assert_eq!(config.max_resubmissions, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Retries per slot after the first attempt; afterwards the slot is `null`.
    pub max_retries: usize,
    /// Resubmissions per slot caused by the stream diverging from the forced
    /// prefix; afterwards the slot is `null` (an array is closed).
    pub max_resubmissions: usize,
    /// Prompt layout.
    pub prompt: PromptTemplate,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_resubmissions: DEFAULT_MAX_RESUBMISSIONS,
            prompt: PromptTemplate::default(),
        }
    }
}

impl GeneratorConfig {
    /// Sets the retry bound.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the divergence resubmission bound.
    pub fn with_max_resubmissions(mut self, max_resubmissions: usize) -> Self {
        self.max_resubmissions = max_resubmissions;
        self
    }

    /// Sets the prompt layout.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Loads a configuration from YAML text.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(input: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(input)
    }
}
