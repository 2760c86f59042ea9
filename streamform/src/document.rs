//! The partially generated document and its progress rendering.
//!
//! While a document is being generated exactly one position holds
//! [`Node::Marker`]. Rendering the tree as compact JSON up to that marker gives
//! the progress text: everything the model has produced and the generator has
//! accepted so far, which is also the prefix the next completion must repeat.

use serde_json::{Map, Value};

use crate::error::{GenerateError, Result};

/// A node in the document being generated.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `null`; also what a slot becomes when generation for it gave up.
    Null,
    /// A scalar read from the stream, rendered exactly as the model wrote it.
    Literal {
        /// The parsed value.
        value: Value,
        /// The literal text, such as `"caf\u00e9"` or `1e3`.
        literal: String,
    },
    /// Object with keys in insertion order.
    Object(Vec<(String, Node)>),
    /// Array.
    Array(Vec<Node>),
    /// The slot currently being generated.
    Marker,
}

/// One step of a path from the root to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object member.
    Key(String),
    /// Array element. An index equal to the array length appends.
    Index(usize),
}

impl Node {
    /// Creates a scalar node from a parsed value and the text it was parsed from.
    pub fn literal(value: Value, literal: impl Into<String>) -> Self {
        Node::Literal {
            value,
            literal: literal.into(),
        }
    }

    /// Converts the node into a JSON value. A leftover marker becomes `null`.
    pub fn into_value(self) -> Value {
        match self {
            Node::Null | Node::Marker => Value::Null,
            Node::Literal { value, .. } => value,
            Node::Array(items) => Value::Array(items.into_iter().map(Node::into_value).collect()),
            Node::Object(members) => {
                let mut map = Map::new();
                for (k, v) in members {
                    map.insert(k, v.into_value());
                }
                Value::Object(map)
            }
        }
    }

    fn child(&self, segment: &Segment) -> Option<&Node> {
        match (self, segment) {
            (Node::Object(members), Segment::Key(key)) => {
                members.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            (Node::Array(items), Segment::Index(i)) => items.get(*i),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut Node> {
        match (self, segment) {
            (Node::Object(members), Segment::Key(key)) => {
                members.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            (Node::Array(items), Segment::Index(i)) => items.get_mut(*i),
            _ => None,
        }
    }

    /// Writes compact JSON into `out`, stopping at the marker.
    ///
    /// Returns true if the marker was reached.
    fn write_until_marker(&self, out: &mut String) -> Result<bool> {
        match self {
            Node::Marker => return Ok(true),
            Node::Null => out.push_str("null"),
            Node::Literal { literal, .. } => out.push_str(literal),
            Node::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if item.write_until_marker(out)? {
                        return Ok(true);
                    }
                }
                out.push(']');
            }
            Node::Object(members) => {
                out.push('{');
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&serde_json::to_string(key)?);
                    out.push(':');
                    if value.write_until_marker(out)? {
                        return Ok(true);
                    }
                }
                out.push('}');
            }
        }
        Ok(false)
    }

    fn count_markers(&self) -> usize {
        match self {
            Node::Marker => 1,
            Node::Array(items) => items.iter().map(Node::count_markers).sum(),
            Node::Object(members) => members.iter().map(|(_, v)| v.count_markers()).sum(),
            _ => 0,
        }
    }
}

/// The document under construction.
///
/// # Examples
///
/// ```
/// use streamform::document::{Document, Node, Segment};
///
/// let mut doc = Document::new();
/// doc.put(&[], Node::Object(Vec::new())).unwrap();
/// doc.put(&[Segment::Key("make".into())], Node::literal("Ford".into(), r#""Ford""#)).unwrap();
/// doc.put(&[Segment::Key("year".into())], Node::Marker).unwrap();
///
/// assert_eq!(doc.progress().unwrap(), r#"{"make":"Ford","year":"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document whose root slot is about to be generated.
    pub fn new() -> Self {
        Self { root: Node::Marker }
    }

    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Returns the node at `path`.
    pub fn get(&self, path: &[Segment]) -> Option<&Node> {
        path.iter().try_fold(&self.root, |node, segment| node.child(segment))
    }

    /// Places `node` at `path`, replacing what is there.
    ///
    /// The parent container must already exist. A key missing from an object
    /// is appended; an index equal to the array length appends. A missing
    /// parent or an index past the end is reported as `MarkerNotFound`.
    pub fn put(&mut self, path: &[Segment], node: Node) -> Result<()> {
        let Some((last, parent_path)) = path.split_last() else {
            self.root = node;
            return Ok(());
        };

        let parent = parent_path
            .iter()
            .try_fold(&mut self.root, |node, segment| node.child_mut(segment))
            .ok_or(GenerateError::MarkerNotFound)?;

        match (parent, last) {
            (Node::Object(members), Segment::Key(key)) => {
                match members.iter_mut().find(|(k, _)| k == key) {
                    Some((_, slot)) => *slot = node,
                    None => members.push((key.clone(), node)),
                }
                Ok(())
            }
            (Node::Array(items), Segment::Index(i)) if *i < items.len() => {
                items[*i] = node;
                Ok(())
            }
            (Node::Array(items), Segment::Index(i)) if *i == items.len() => {
                items.push(node);
                Ok(())
            }
            _ => Err(GenerateError::MarkerNotFound),
        }
    }

    /// Removes the last element of the array at `path`.
    pub fn pop(&mut self, path: &[Segment]) -> Option<Node> {
        let node = path
            .iter()
            .try_fold(&mut self.root, |node, segment| node.child_mut(segment))?;
        match node {
            Node::Array(items) => items.pop(),
            _ => None,
        }
    }

    /// Returns the length of the array at `path`, or zero if there is none.
    pub fn array_len(&self, path: &[Segment]) -> usize {
        match self.get(path) {
            Some(Node::Array(items)) => items.len(),
            _ => 0,
        }
    }

    /// Returns the number of markers in the tree. Always one mid-generation.
    pub fn marker_count(&self) -> usize {
        self.root.count_markers()
    }

    /// Renders the document up to (excluding) the marker.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::MarkerNotFound` if there is no marker.
    pub fn progress(&self) -> Result<String> {
        let mut out = String::new();
        if self.root.write_until_marker(&mut out)? {
            Ok(out)
        } else {
            Err(GenerateError::MarkerNotFound)
        }
    }

    /// Renders the whole document as compact JSON.
    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root.clone().into_value())?)
    }

    /// Consumes the document, returning its JSON value.
    pub fn into_value(self) -> Value {
        self.root.into_value()
    }
}
