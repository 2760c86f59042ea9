//! Array collection.
//!
//! The model decides how long an array is. Before each element the generator
//! looks at the first character the model writes after the elements accepted so
//! far: `]` closes the array, anything else opens another element.

use tracing::{debug, warn};

use super::{child_path, location, Walker};
use crate::{
    document::{Node, Segment},
    error::Result,
    extract::Terminators,
    provider::CompletionProvider,
    schema::SchemaNode,
};

impl<'a, P: CompletionProvider + ?Sized> Walker<'a, P> {
    /// Generates elements of `items` into the array at `path` until the model closes it.
    pub(super) async fn collect_array(&mut self, items: &SchemaNode, path: &[Segment]) -> Result<()> {
        loop {
            let element = child_path(path, Segment::Index(self.document.array_len(path)));

            // The lookahead seed is the progress without the separator that a
            // following element would add.
            self.document.put(&element, Node::Marker)?;
            let progress = self.document.progress()?;
            let seed = progress.strip_suffix(',').unwrap_or(progress.as_str());
            let next = self.peek_after(seed).await?;
            self.document.pop(path);

            match next {
                Some(']') => {
                    debug!(location = %location(path), len = self.document.array_len(path), "array closed");
                    return Ok(());
                }
                Some(_) => {
                    self.generate_value(items, element, Terminators::Array)
                        .await?;
                }
                None => {
                    warn!(location = %location(path), "stream keeps diverging, closing array");
                    return Ok(());
                }
            }
        }
    }

    /// Returns the first character of the document text following `seed`.
    ///
    /// Returns `None` once the divergence budget is spent.
    async fn peek_after(&mut self, seed: &str) -> Result<Option<char>> {
        let mut resubmissions = 0;

        loop {
            if self.cursor.session().is_some() && !self.cursor.continues(seed).await? {
                resubmissions += 1;
                if resubmissions > self.config.max_resubmissions {
                    return Ok(None);
                }
            }

            let (_, session) = self.cursor.ensure(seed).await?;
            if session.continues(seed).await? {
                return Ok(session.text()[seed.len()..].chars().next());
            }
        }
    }
}
