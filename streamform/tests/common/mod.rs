//! Simulated completion services shared by the integration tests.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use streamform::{prompt::AI_PROMPT, CompletionProvider, CompletionStream, ProviderError};

/// Returns the seed a prompt forced: everything after the last assistant delimiter.
pub fn seed_of(prompt: &str) -> &str {
    prompt.rsplit(AI_PROMPT).next().unwrap_or_default()
}

/// Splits `text` into cumulative items of `chunk` characters.
pub fn cumulative(text: &str, chunk: usize) -> Vec<Result<String, ProviderError>> {
    let chars: Vec<char> = text.chars().collect();
    let chunk = chunk.max(1);
    (1..=chars.len().div_ceil(chunk))
        .map(|i| Ok(chars[..(i * chunk).min(chars.len())].iter().collect()))
        .collect()
}

/// A model that writes one fixed document.
///
/// Each prompt is answered with the part of the target that follows the
/// prompt's seed. A seed that the target does not start with gets an empty
/// answer.
pub struct Target {
    target: String,
    chunk: usize,
    stop_after_comma: bool,
    prompts: Mutex<Vec<String>>,
}

impl Target {
    pub fn new(target: &str) -> Self {
        Self::chunked(target, 4)
    }

    pub fn chunked(target: &str, chunk: usize) -> Self {
        Self {
            target: target.to_string(),
            chunk,
            stop_after_comma: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model that stops after the first comma it writes, so most slots
    /// need a fresh prompt.
    pub fn terse(target: &str) -> Self {
        Self {
            stop_after_comma: true,
            ..Self::chunked(target, 2)
        }
    }

    /// Returns the seeds of all prompts received, in order.
    pub fn seeds(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|prompt| seed_of(prompt).to_string())
            .collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for Target {
    async fn complete(&self, prompt: &str) -> Result<CompletionStream, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut rest = self.target.strip_prefix(seed_of(prompt)).unwrap_or_default();
        if self.stop_after_comma {
            if let Some(i) = rest.find(',') {
                rest = &rest[..=i];
            }
        }
        Ok(stream::iter(cumulative(rest, self.chunk)).boxed())
    }
}

/// A model that answers prompts with a script, one completion per prompt.
///
/// The last completion is repeated once the script runs out.
pub struct Script {
    completions: Mutex<Vec<String>>,
    calls: Mutex<usize>,
}

impl Script {
    pub fn new(completions: &[&str]) -> Self {
        Self {
            completions: Mutex::new(completions.iter().rev().map(|c| c.to_string()).collect()),
            calls: Mutex::new(0),
        }
    }

    /// A model that always writes `completion`.
    pub fn always(completion: &str) -> Self {
        Self::new(&[completion])
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CompletionProvider for Script {
    async fn complete(&self, _prompt: &str) -> Result<CompletionStream, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let mut completions = self.completions.lock().unwrap();
        let completion = if completions.len() > 1 {
            completions.pop().unwrap_or_default()
        } else {
            completions.last().cloned().unwrap_or_default()
        };
        Ok(stream::iter(cumulative(&completion, 3)).boxed())
    }
}

/// A service whose streams fail after `prefix`.
pub struct Broken {
    pub prefix: &'static str,
}

#[async_trait]
impl CompletionProvider for Broken {
    async fn complete(&self, _prompt: &str) -> Result<CompletionStream, ProviderError> {
        let items = vec![
            Ok(self.prefix.to_string()),
            Err(ProviderError::msg("connection reset")),
        ];
        Ok(stream::iter(items).boxed())
    }
}

/// A service that refuses every request.
pub struct Refusing;

#[async_trait]
impl CompletionProvider for Refusing {
    async fn complete(&self, _prompt: &str) -> Result<CompletionStream, ProviderError> {
        Err(ProviderError::msg("401 unauthorized"))
    }
}

/// Sets its flag when dropped.
struct DropGuard(Arc<AtomicBool>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A service that writes `prefix` and then never finishes.
pub struct Hanging {
    pub prefix: &'static str,
    pub dropped: Arc<AtomicBool>,
}

impl Hanging {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stream_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for Hanging {
    async fn complete(&self, _prompt: &str) -> Result<CompletionStream, ProviderError> {
        let guard = DropGuard(self.dropped.clone());
        let stream = stream::iter(vec![Ok(self.prefix.to_string())])
            .chain(stream::pending())
            .map(move |item| {
                let _keep = &guard;
                item
            });
        Ok(stream.boxed())
    }
}
