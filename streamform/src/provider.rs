//! The completion service seam.
//!
//! The generator only needs "submit a prompt, get a growing text back". Every
//! item of a [`CompletionStream`] is the whole completion so far, not a delta;
//! transports that deliver deltas can wrap their stream with [`accumulate`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::{future, stream::BoxStream, Stream, StreamExt};

use crate::error::ProviderError;

/// Cumulative completion text, one item per received chunk.
pub type CompletionStream = BoxStream<'static, Result<String, ProviderError>>;

/// A text-completion service.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use futures::{stream, StreamExt};
/// use streamform::{error::ProviderError, provider::{CompletionProvider, CompletionStream}};
///
/// struct Canned(&'static str);
///
/// #[async_trait]
/// impl CompletionProvider for Canned {
///     async fn complete(&self, _prompt: &str) -> Result<CompletionStream, ProviderError> {
///         Ok(stream::iter(vec![Ok(self.0.to_string())]).boxed())
///     }
/// }
/// ```
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Submits `prompt` and returns the stream of cumulative completion text.
    ///
    /// Resolves once the service has accepted the request. Errors raised here
    /// or by the stream are passed to the caller of the generation unchanged.
    async fn complete(&self, prompt: &str) -> Result<CompletionStream, ProviderError>;
}

#[async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for Arc<P> {
    async fn complete(&self, prompt: &str) -> Result<CompletionStream, ProviderError> {
        (**self).complete(prompt).await
    }
}

#[async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for Box<P> {
    async fn complete(&self, prompt: &str) -> Result<CompletionStream, ProviderError> {
        (**self).complete(prompt).await
    }
}

#[async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for &P {
    async fn complete(&self, prompt: &str) -> Result<CompletionStream, ProviderError> {
        (**self).complete(prompt).await
    }
}

/// Turns a stream of text deltas into a [`CompletionStream`].
pub fn accumulate<S, E>(deltas: S) -> CompletionStream
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    deltas
        .scan(String::new(), |text, delta| {
            let item = delta
                .map(|delta| {
                    text.push_str(&delta);
                    text.clone()
                })
                .map_err(ProviderError::new);
            future::ready(Some(item))
        })
        .boxed()
}
