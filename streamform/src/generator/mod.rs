//! The constrained generation engine.
//!
//! [`ConstrainedGenerator`] walks the schema depth first. For every primitive
//! slot it places the generation marker in the document, renders the progress,
//! makes sure the active completion stream continues exactly that progress, and
//! reads the value the model wrote after it. Composite nodes only shape the
//! document; all text comes from the model.

mod array;

use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::GeneratorConfig,
    document::{Document, Node, Segment},
    error::{Result, SchemaError},
    extract::{Extraction, FieldExtractor, Terminators},
    provider::CompletionProvider,
    schema::{Discriminator, Schema, SchemaNode},
    stream::StreamCursor,
};

/// Maximum number of `$ref` hops followed before a chain is considered cyclic.
pub const MAX_REF_HOPS: usize = 32;

/// Generates documents for one schema and instruction.
///
/// # Examples
///
/// ```no_run
/// use streamform::{ConstrainedGenerator, Schema};
/// # async fn run(provider: impl streamform::CompletionProvider) -> streamform::Result<()> {
/// let schema = Schema::from_json_str(r#"{
///     "type": "object",
///     "properties": {
///         "make": {"type": "string"},
///         "year": {"type": "number", "min": 1940, "max": 1950}
///     }
/// }"#)?;
///
/// let mut generator = ConstrainedGenerator::new(provider, schema, "Generate info about an old car");
/// let car = generator.generate().await?;
/// println!("{} after {} requests", car, generator.request_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConstrainedGenerator<P> {
    provider: P,
    schema: Schema,
    instruction: String,
    config: GeneratorConfig,
    request_count: usize,
}

impl<P: CompletionProvider> ConstrainedGenerator<P> {
    /// Creates a generator with the default configuration.
    pub fn new(provider: P, schema: Schema, instruction: impl Into<String>) -> Self {
        Self {
            provider,
            schema,
            instruction: instruction.into(),
            config: GeneratorConfig::default(),
            request_count: 0,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the provider.
    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the number of prompts submitted by the last [`generate`](Self::generate) call.
    #[inline]
    pub fn request_count(&self) -> usize {
        self.request_count
    }

    /// Generates one document.
    ///
    /// Dropping the returned future cancels the in-flight completion stream;
    /// the partial document is discarded.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::Schema` for schema nodes that cannot be
    /// generated or references that do not resolve, and
    /// `GenerateError::Provider` if the completion service fails. Values the
    /// model gets wrong are retried and, past the configured bounds, left as
    /// `null` instead of failing the call.
    pub async fn generate(&mut self) -> Result<Value> {
        self.request_count = 0;

        let mut walker = Walker {
            schema: &self.schema,
            config: &self.config,
            cursor: StreamCursor::new(
                &self.provider,
                &self.config.prompt,
                &self.instruction,
                self.schema.render(),
            ),
            document: Document::new(),
        };

        let outcome = walker
            .generate_value(self.schema.root(), Vec::new(), Terminators::Root)
            .await;
        self.request_count = walker.cursor.submissions();
        outcome?;

        info!(requests = self.request_count, "generation complete");
        Ok(walker.document.into_value())
    }

    /// Generates one document and deserializes it into `T`.
    pub async fn generate_as<T: DeserializeOwned>(&mut self) -> Result<T> {
        let value = self.generate().await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Result of reading one primitive value from the stream.
#[derive(Debug)]
enum Read {
    /// A valid value and its literal as written.
    Value { value: Value, literal: String },
    /// A complete value that failed validation, as written.
    Invalid(String),
    /// The stream kept leaving the progress; the slot is given up.
    Abandoned,
}

/// Per-call state: the document, the stream cursor and the schema being walked.
struct Walker<'a, P: ?Sized> {
    schema: &'a Schema,
    config: &'a GeneratorConfig,
    cursor: StreamCursor<'a, P>,
    document: Document,
}

impl<'a, P: CompletionProvider + ?Sized> Walker<'a, P> {
    /// Generates the value for `node` into the slot at `path`.
    fn generate_value<'s>(
        &'s mut self,
        node: &'s SchemaNode,
        path: Vec<Segment>,
        terminators: Terminators,
    ) -> BoxFuture<'s, Result<()>> {
        async move {
            match node {
                SchemaNode::String(_) | SchemaNode::Number(_) | SchemaNode::Boolean => {
                    self.generate_scalar(node, &path, terminators).await
                }
                SchemaNode::Object(object) => {
                    self.document.put(&path, Node::Object(Vec::new()))?;
                    self.generate_properties(&object.properties, &path, None)
                        .await
                }
                SchemaNode::Array(items) => {
                    self.document.put(&path, Node::Array(Vec::new()))?;
                    self.collect_array(items, &path).await
                }
                SchemaNode::Ref(pointer) => {
                    let resolved = self.follow(pointer)?;
                    self.generate_value(&resolved, path, terminators).await
                }
                SchemaNode::Discriminator(union) => self.generate_union(union, &path).await,
            }
        }
        .boxed()
    }

    async fn generate_properties(
        &mut self,
        properties: &[(String, SchemaNode)],
        path: &[Segment],
        skip: Option<&str>,
    ) -> Result<()> {
        for (name, child) in properties {
            if skip == Some(name.as_str()) {
                continue;
            }
            self.generate_value(child, child_path(path, Segment::Key(name.clone())), Terminators::Object)
                .await?;
        }
        Ok(())
    }

    /// Generates the discriminating property, then the properties of the branch it picks.
    async fn generate_union(&mut self, union: &Discriminator, path: &[Segment]) -> Result<()> {
        self.document.put(path, Node::Object(Vec::new()))?;

        let tag_path = child_path(path, Segment::Key(union.property_name.clone()));
        let selector = SchemaNode::String(union.selector());
        self.generate_scalar(&selector, &tag_path, Terminators::Object)
            .await?;

        let tag = match self.document.get(&tag_path) {
            Some(Node::Literal {
                value: Value::String(tag),
                ..
            }) => tag.clone(),
            _ => {
                warn!(
                    location = %location(&tag_path),
                    "no discriminator value, leaving branch empty"
                );
                return Ok(());
            }
        };

        let pointer = union.branch(&tag).ok_or_else(|| {
            SchemaError::invalid_reference(&tag, "no mapping for discriminator value")
        })?;
        let SchemaNode::Object(branch) = self.follow(pointer)? else {
            return Err(SchemaError::unsupported(pointer, "discriminator branch is not an object").into());
        };
        debug!(tag = %tag, pointer, "discriminator resolved");

        self.generate_properties(&branch.properties, path, Some(union.property_name.as_str()))
            .await
    }

    /// Generates a primitive value, retrying values that fail validation.
    async fn generate_scalar(
        &mut self,
        node: &SchemaNode,
        path: &[Segment],
        terminators: Terminators,
    ) -> Result<()> {
        let extractor = match FieldExtractor::for_node(node, terminators) {
            Some(extractor) if node.is_primitive() => extractor,
            _ => {
                return Err(SchemaError::unsupported(
                    location(path),
                    format!("{} is not a primitive", node.kind()),
                )
                .into())
            }
        };

        for attempt in 0..=self.config.max_retries {
            self.document.put(path, Node::Marker)?;
            let progress = self.document.progress()?;
            debug!(progress = %progress, attempt, kind = extractor.kind(), "generating value");

            if attempt > 0 {
                self.cursor.submit(&progress).await?;
            }

            match self.read_value(&extractor, &progress).await? {
                Read::Value { value, literal } => {
                    debug!(value = %value, "value accepted");
                    return self.document.put(path, Node::literal(value, literal));
                }
                Read::Invalid(raw) => {
                    debug!(raw = %raw, attempt, "value rejected");
                }
                Read::Abandoned => break,
            }
        }

        warn!(location = %location(path), "giving up on slot, leaving it null");
        self.document.put(path, Node::Null)
    }

    /// Reads the value following `progress` from the active stream.
    async fn read_value(&mut self, extractor: &FieldExtractor, progress: &str) -> Result<Read> {
        let mut resubmissions = 0;

        loop {
            if self.cursor.session().is_some() && !self.cursor.continues(progress).await? {
                resubmissions += 1;
                if resubmissions > self.config.max_resubmissions {
                    return Ok(Read::Abandoned);
                }
            }

            let (_, session) = self.cursor.ensure(progress).await?;

            let stale = loop {
                let text = session.text();
                if text.len() >= progress.len() && !text.starts_with(progress) {
                    break false;
                }

                let tail = text.get(progress.len()..).unwrap_or("");
                match extractor.extract(tail, session.is_finished()) {
                    Extraction::Valid { value, literal } => {
                        return Ok(Read::Value { value, literal })
                    }
                    Extraction::Invalid(raw) => return Ok(Read::Invalid(raw)),
                    // `extract` has already seen the end of the stream.
                    Extraction::Pending if session.is_finished() => break true,
                    Extraction::Pending => {
                        session.advance().await?;
                    }
                }
            };

            // A session that ended without a value still matches the progress,
            // so it has to be replaced here rather than by `ensure`.
            if stale {
                resubmissions += 1;
                if resubmissions > self.config.max_resubmissions {
                    return Ok(Read::Abandoned);
                }
                warn!(progress, "stream ended before the value was complete");
                self.cursor.submit(progress).await?;
            }
        }
    }

    /// Resolves `pointer`, following chains of references.
    fn follow(&self, pointer: &str) -> Result<SchemaNode> {
        let mut node = self.schema.resolve(pointer)?;
        for _ in 0..MAX_REF_HOPS {
            match node {
                SchemaNode::Ref(next) => node = self.schema.resolve(&next)?,
                other => return Ok(other),
            }
        }
        Err(SchemaError::unsupported(pointer, "reference chain does not end").into())
    }
}

fn child_path(path: &[Segment], segment: Segment) -> Vec<Segment> {
    let mut child = Vec::with_capacity(path.len() + 1);
    child.extend_from_slice(path);
    child.push(segment);
    child
}

/// Renders a document path for log and error messages.
fn location(path: &[Segment]) -> String {
    let mut out = String::from("$");
    for segment in path {
        match segment {
            Segment::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
            Segment::Index(i) => out.push_str(&format!("[{}]", i)),
        }
    }
    out
}
