//! Stream sessions and the cursor that keeps one matched to the progress.

use futures::StreamExt;
use tracing::{debug, warn};

use crate::{
    error::ProviderError,
    prompt::PromptTemplate,
    provider::{CompletionProvider, CompletionStream},
    transcript::Transcript,
};

/// One submitted prompt and the text received for it so far.
pub struct StreamSession {
    stream: CompletionStream,
    transcript: Transcript,
    text: String,
    finished: bool,
    chunks: usize,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("transcript", &self.transcript)
            .field("text", &self.text)
            .field("finished", &self.finished)
            .field("chunks", &self.chunks)
            .finish()
    }
}

impl StreamSession {
    /// Wraps a completion stream for a prompt seeded as described by `transcript`.
    pub fn new(stream: CompletionStream, transcript: Transcript) -> Self {
        let text = transcript.document_text("");
        Self {
            stream,
            transcript,
            text,
            finished: false,
            chunks: 0,
        }
    }

    /// Returns the current document text: the seed followed by everything received.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the seed this session's prompt forced.
    #[inline]
    pub fn seed(&self) -> &str {
        self.transcript.seed()
    }

    /// Returns true once the service signalled completion.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the number of chunks received.
    #[inline]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Waits for the next chunk.
    ///
    /// Returns false if the stream is finished.
    pub async fn advance(&mut self) -> Result<bool, ProviderError> {
        if self.finished {
            return Ok(false);
        }

        match self.stream.next().await {
            Some(completion) => {
                self.text = self.transcript.document_text(&completion?);
                self.chunks += 1;
                Ok(true)
            }
            None => {
                self.finished = true;
                Ok(false)
            }
        }
    }

    /// Waits until the text is longer than `len` bytes or the stream ends.
    ///
    /// Returns true if the text is longer than `len`.
    pub async fn wait_beyond(&mut self, len: usize) -> Result<bool, ProviderError> {
        while self.text.len() <= len {
            if !self.advance().await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns true if the text gets longer than `seed` and starts with it.
    pub async fn continues(&mut self, seed: &str) -> Result<bool, ProviderError> {
        Ok(self.wait_beyond(seed.len()).await? && self.text.starts_with(seed))
    }
}

/// How [`StreamCursor::ensure`] obtained its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// The active session already continues the seed.
    Continued,
    /// There was no session; a prompt was submitted.
    Started,
    /// The active session left the seed; a prompt was resubmitted.
    Diverged,
}

/// Owns the active session and submits prompts through the provider.
pub struct StreamCursor<'a, P: ?Sized> {
    provider: &'a P,
    template: &'a PromptTemplate,
    instruction: &'a str,
    schema: String,
    session: Option<StreamSession>,
    submissions: usize,
}

impl<'a, P: CompletionProvider + ?Sized> StreamCursor<'a, P> {
    /// Creates a cursor with no active session.
    pub fn new(
        provider: &'a P,
        template: &'a PromptTemplate,
        instruction: &'a str,
        schema: String,
    ) -> Self {
        Self {
            provider,
            template,
            instruction,
            schema,
            session: None,
            submissions: 0,
        }
    }

    /// Returns the number of prompts submitted so far.
    #[inline]
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    /// Returns the active session, if any.
    #[inline]
    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    /// Returns true if there is an active session and it continues `seed`.
    pub async fn continues(&mut self, seed: &str) -> Result<bool, ProviderError> {
        match self.session.as_mut() {
            Some(session) => session.continues(seed).await,
            None => Ok(false),
        }
    }

    /// Submits a fresh prompt seeded with `seed`, replacing the active session.
    pub async fn submit(&mut self, seed: &str) -> Result<&mut StreamSession, ProviderError> {
        // The stale stream is dropped before the new one is opened.
        self.session = None;

        let prompt = self.template.render(self.instruction, &self.schema, seed);
        self.submissions += 1;
        debug!(submission = self.submissions, seed, "submitting prompt");

        let stream = self.provider.complete(&prompt).await?;
        let session = StreamSession::new(stream, self.template.transcript(seed));
        Ok(self.session.insert(session))
    }

    /// Returns a session whose text continues `seed`.
    ///
    /// An existing session is advanced until its text is longer than the seed
    /// and kept if it starts with it. Otherwise, or if there is no session, a
    /// fresh prompt is submitted. A freshly submitted session has not been
    /// checked yet; callers compare its text against the seed as it arrives.
    pub async fn ensure(&mut self, seed: &str) -> Result<(Ensured, &mut StreamSession), ProviderError> {
        let outcome = match self.session.take() {
            None => Ensured::Started,
            Some(mut session) => {
                if session.continues(seed).await? {
                    return Ok((Ensured::Continued, self.session.insert(session)));
                }
                warn!(
                    expected = seed,
                    received = session.text(),
                    finished = session.is_finished(),
                    "generation mismatch"
                );
                Ensured::Diverged
            }
        };

        let session = self.submit(seed).await?;
        Ok((outcome, session))
    }
}
