//! Turning raw completion text into document text.
//!
//! A completion provider streams what the model wrote after the prompt. The
//! generator needs the document as a whole: the seed that was forced into the
//! prompt followed by the model's continuation, without role delimiters and
//! without whitespace between JSON tokens, so it can be compared byte for byte
//! with the compact progress rendering.

/// Removes whitespace outside JSON string literals.
///
/// Quote tracking honours backslash escapes, so `"a \" b"` stays intact.
///
/// # Examples
///
/// ```
/// use streamform::transcript::strip_json_whitespace;
///
/// let compact = strip_json_whitespace("{ \"name\": \"Ada Lovelace\",\n  \"age\": 36 }");
/// assert_eq!(compact, r#"{"name":"Ada Lovelace","age":36}"#);
/// ```
pub fn strip_json_whitespace(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            result.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
                result.push(ch);
            }
            '"' => {
                in_string = !in_string;
                result.push(ch);
            }
            ' ' | '\t' | '\n' | '\r' if !in_string => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Rebuilds document text for one submitted prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    seed: String,
    human: String,
    assistant: String,
}

impl Transcript {
    /// Creates a transcript for a prompt that forced `seed` as the start of the answer.
    pub fn new(seed: impl Into<String>, human: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            human: human.into(),
            assistant: assistant.into(),
        }
    }

    /// Returns the forced seed.
    #[inline]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Returns the document text for a cumulative completion.
    ///
    /// Providers that echo the whole transcript are supported too: if the
    /// assistant delimiter shows up, the document starts right after its last
    /// occurrence. Anything from a human delimiter on is dropped.
    pub fn document_text(&self, completion: &str) -> String {
        let raw = match find_last(completion, &self.assistant) {
            Some(end) => completion[end..].to_string(),
            None => format!("{}{}", self.seed, completion),
        };

        let body = match find_first(&raw, &self.human) {
            Some(start) => &raw[..start],
            None => raw.as_str(),
        };

        strip_json_whitespace(body)
    }
}

fn find_last(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.rfind(needle).map(|i| i + needle.len())
}

fn find_first(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.find(needle)
}
