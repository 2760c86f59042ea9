//! Prompt construction.

use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;

/// Default delimiter opening the user's turn.
pub const HUMAN_PROMPT: &str = "\n\nHuman: ";

/// Default delimiter opening the model's turn.
pub const AI_PROMPT: &str = "\n\nAssistant:";

/// Default line introducing the schema.
pub const SCHEMA_INSTRUCTION: &str = "Output result in the following JSON schema format:";

/// Layout of the prompt submitted for every continuation.
///
/// The prompt ends with the assistant delimiter immediately followed by the
/// seed, so the model's answer is forced to start with the confirmed progress.
///
/// # Examples
///
/// ```
/// use streamform::prompt::PromptTemplate;
///
/// let prompt = PromptTemplate::default().render(
///     "Generate info about a car",
///     r#"{"type":"object"}"#,
///     r#"{"make":"#,
/// );
/// assert!(prompt.starts_with("\n\nHuman: Generate info about a car\n"));
/// assert!(prompt.ends_with("\n\nAssistant:{\"make\":"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    /// Delimiter opening the user's turn; also a stop marker in completions.
    pub human: String,
    /// Delimiter opening the model's turn.
    pub assistant: String,
    /// Line placed between the instruction and the rendered schema.
    pub schema_instruction: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            human: HUMAN_PROMPT.to_string(),
            assistant: AI_PROMPT.to_string(),
            schema_instruction: SCHEMA_INSTRUCTION.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Sets the role delimiters.
    pub fn with_roles(mut self, human: impl Into<String>, assistant: impl Into<String>) -> Self {
        self.human = human.into();
        self.assistant = assistant.into();
        self
    }

    /// Sets the line introducing the schema.
    pub fn with_schema_instruction(mut self, line: impl Into<String>) -> Self {
        self.schema_instruction = line.into();
        self
    }

    /// Renders the full prompt.
    pub fn render(&self, instruction: &str, schema: &str, seed: &str) -> String {
        format!(
            "{}{}\n{}\n{}{}{}",
            self.human, instruction, self.schema_instruction, schema, self.assistant, seed
        )
    }

    /// Returns the transcript used to read completions of a prompt seeded with `seed`.
    pub fn transcript(&self, seed: &str) -> Transcript {
        Transcript::new(seed, self.human.as_str(), self.assistant.as_str())
    }
}
