//! Schema representation for constrained generation.
//!
//! A [`Schema`] keeps the raw JSON document (it is rendered verbatim into the
//! prompt and is the target of `$ref` pointers) together with the parsed
//! [`SchemaNode`] tree of its root.
//!
//! Only a subset of JSON Schema is understood: `object`, `array`, `string`,
//! `number` and `boolean` types, `properties`, `items`, `enum`, `min`/`max`,
//! `$ref` pointers into the same document, and `discriminator` unions.

use serde_json::{Map, Value};

use crate::{constraints::Constraint, error::SchemaError};

/// Prefix every reference pointer must start with.
pub const POINTER_PREFIX: &str = "#/";

/// A parsed schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// String literal, optionally restricted.
    String(StringSchema),

    /// Integer or floating point literal, optionally restricted.
    Number(NumberSchema),

    /// `true` or `false`.
    Boolean,

    /// Object with properties generated in declaration order.
    Object(ObjectSchema),

    /// Array whose elements all follow `items`.
    Array(Box<SchemaNode>),

    /// Pointer to another node in the schema document.
    Ref(String),

    /// Object whose shape is chosen by the value of one property.
    Discriminator(Discriminator),
}

/// Restrictions on a string node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    /// Admissible values (`enum`).
    pub one_of: Option<Vec<String>>,
    /// Minimum length in characters (`min`).
    pub min_length: Option<usize>,
    /// Maximum length in characters (`max`).
    pub max_length: Option<usize>,
}

impl StringSchema {
    /// Creates a string node that only admits the given values.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            one_of: Some(values.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Returns the constraints a generated value must pass.
    pub fn constraints(&self) -> Vec<Constraint> {
        let mut constraints = Vec::new();
        if let Some(values) = &self.one_of {
            constraints.push(Constraint::OneOf(
                values.iter().cloned().map(Value::String).collect(),
            ));
        }
        if let Some(min) = self.min_length {
            constraints.push(Constraint::MinLength(min));
        }
        if let Some(max) = self.max_length {
            constraints.push(Constraint::MaxLength(max));
        }
        constraints
    }
}

/// Restrictions on a number node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    /// Admissible values (`enum`).
    pub one_of: Option<Vec<f64>>,
    /// Inclusive lower bound (`min`).
    pub min: Option<f64>,
    /// Inclusive upper bound (`max`).
    pub max: Option<f64>,
}

impl NumberSchema {
    /// Creates a number node bounded on both sides.
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            one_of: None,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Returns the constraints a generated value must pass.
    pub fn constraints(&self) -> Vec<Constraint> {
        let mut constraints = Vec::new();
        if let Some(values) = &self.one_of {
            constraints.push(Constraint::OneOf(
                values.iter().map(|v| Value::from(*v)).collect(),
            ));
        }
        if let Some(min) = self.min {
            constraints.push(Constraint::Min(min));
        }
        if let Some(max) = self.max {
            constraints.push(Constraint::Max(max));
        }
        constraints
    }
}

/// Object node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    /// Properties in declaration order.
    pub properties: Vec<(String, SchemaNode)>,
}

/// Discriminated union node.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    /// Name of the property whose value picks the branch.
    pub property_name: String,
    /// Property value to branch pointer, in declaration order.
    pub mapping: Vec<(String, String)>,
}

impl Discriminator {
    /// Returns the synthetic string node used to generate the discriminating value.
    pub fn selector(&self) -> StringSchema {
        StringSchema::one_of(self.mapping.iter().map(|(value, _)| value.clone()))
    }

    /// Returns the branch pointer registered for `value`.
    pub fn branch(&self, value: &str) -> Option<&str> {
        self.mapping
            .iter()
            .find(|(candidate, _)| candidate == value)
            .map(|(_, pointer)| pointer.as_str())
    }
}

impl SchemaNode {
    /// Parses a node from its JSON form.
    ///
    /// `location` is a pointer-like path used in error messages.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Unsupported` for nodes with an unknown `type`, or
    /// with neither `type`, `$ref`, `discriminator` nor `properties`.
    pub fn from_value(value: &Value, location: &str) -> Result<Self, SchemaError> {
        let node = value
            .as_object()
            .ok_or_else(|| SchemaError::unsupported(location, "schema node is not an object"))?;

        match node.get("type") {
            Some(Value::String(kind)) => return parse_typed(kind, node, location),
            Some(other) => {
                return Err(SchemaError::unsupported(
                    location,
                    format!("type must be a string, found {}", other),
                ))
            }
            None => {}
        }

        if let Some(discriminator) = node.get("discriminator") {
            return parse_discriminator(discriminator, location);
        }

        if let Some(pointer) = node.get("$ref") {
            let pointer = pointer
                .as_str()
                .ok_or_else(|| SchemaError::unsupported(location, "$ref must be a string"))?;
            return Ok(SchemaNode::Ref(pointer.to_string()));
        }

        // Untyped nodes with `properties` are objects, as at most schema roots.
        if node.contains_key("properties") {
            return parse_object(node, location);
        }

        Err(SchemaError::unsupported(
            location,
            "node has no type, $ref or discriminator",
        ))
    }

    /// Returns a short human-readable name for the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaNode::String(_) => "string",
            SchemaNode::Number(_) => "number",
            SchemaNode::Boolean => "boolean",
            SchemaNode::Object(_) => "object",
            SchemaNode::Array(_) => "array",
            SchemaNode::Ref(_) => "$ref",
            SchemaNode::Discriminator(_) => "discriminator",
        }
    }

    /// Returns true for string, number and boolean nodes.
    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SchemaNode::String(_) | SchemaNode::Number(_) | SchemaNode::Boolean
        )
    }
}

fn parse_typed(kind: &str, node: &Map<String, Value>, location: &str) -> Result<SchemaNode, SchemaError> {
    match kind {
        "string" => {
            let one_of = match node.get("enum") {
                Some(values) => Some(parse_enum(values, location, |v| {
                    v.as_str().map(str::to_string)
                })?),
                None => None,
            };
            Ok(SchemaNode::String(StringSchema {
                one_of,
                min_length: parse_length(node, &["min", "minLength"], location)?,
                max_length: parse_length(node, &["max", "maxLength"], location)?,
            }))
        }
        "number" => {
            let one_of = match node.get("enum") {
                Some(values) => Some(parse_enum(values, location, Value::as_f64)?),
                None => None,
            };
            Ok(SchemaNode::Number(NumberSchema {
                one_of,
                min: parse_bound(node, &["min", "minimum"], location)?,
                max: parse_bound(node, &["max", "maximum"], location)?,
            }))
        }
        "boolean" => Ok(SchemaNode::Boolean),
        "object" => parse_object(node, location),
        "array" => {
            let items = node
                .get("items")
                .ok_or_else(|| SchemaError::unsupported(location, "array node has no items"))?;
            let items = SchemaNode::from_value(items, &format!("{}/items", location))?;
            Ok(SchemaNode::Array(Box::new(items)))
        }
        other => Err(SchemaError::unsupported(
            location,
            format!("unsupported type '{}'", other),
        )),
    }
}

fn parse_object(node: &Map<String, Value>, location: &str) -> Result<SchemaNode, SchemaError> {
    let properties = match node.get("properties") {
        None => Vec::new(),
        Some(Value::Object(properties)) => properties
            .iter()
            .map(|(name, value)| {
                let child = SchemaNode::from_value(
                    value,
                    &format!("{}/properties/{}", location, escape_segment(name)),
                )?;
                Ok((name.clone(), child))
            })
            .collect::<Result<Vec<_>, SchemaError>>()?,
        Some(_) => {
            return Err(SchemaError::unsupported(
                location,
                "properties must be an object",
            ))
        }
    };

    Ok(SchemaNode::Object(ObjectSchema { properties }))
}

fn parse_discriminator(value: &Value, location: &str) -> Result<SchemaNode, SchemaError> {
    let location = format!("{}/discriminator", location);
    let property_name = value
        .get("propertyName")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::unsupported(&location, "propertyName must be a string"))?;
    let mapping = value
        .get("mapping")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::unsupported(&location, "mapping must be an object"))?;

    let mapping = mapping
        .iter()
        .map(|(tag, pointer)| {
            pointer
                .as_str()
                .map(|pointer| (tag.clone(), pointer.to_string()))
                .ok_or_else(|| {
                    SchemaError::unsupported(&location, format!("mapping for '{}' is not a string", tag))
                })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    if mapping.is_empty() {
        return Err(SchemaError::unsupported(&location, "mapping is empty"));
    }

    Ok(SchemaNode::Discriminator(Discriminator {
        property_name: property_name.to_string(),
        mapping,
    }))
}

fn parse_enum<T>(
    values: &Value,
    location: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>, SchemaError> {
    let values = values
        .as_array()
        .ok_or_else(|| SchemaError::unsupported(location, "enum must be an array"))?;
    values
        .iter()
        .map(|v| {
            convert(v).ok_or_else(|| {
                SchemaError::unsupported(location, format!("enum entry {} has the wrong type", v))
            })
        })
        .collect()
}

fn parse_bound(
    node: &Map<String, Value>,
    keys: &[&str],
    location: &str,
) -> Result<Option<f64>, SchemaError> {
    match keys.iter().find_map(|key| node.get(*key).map(|v| (key, v))) {
        None => Ok(None),
        Some((key, value)) => value.as_f64().map(Some).ok_or_else(|| {
            SchemaError::unsupported(location, format!("{} must be a number", key))
        }),
    }
}

fn parse_length(
    node: &Map<String, Value>,
    keys: &[&str],
    location: &str,
) -> Result<Option<usize>, SchemaError> {
    match keys.iter().find_map(|key| node.get(*key).map(|v| (key, v))) {
        None => Ok(None),
        Some((key, value)) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                SchemaError::unsupported(location, format!("{} must be a non-negative integer", key))
            }),
    }
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// A complete schema document.
///
/// # Examples
///
/// ```
/// use streamform::schema::{Schema, SchemaNode};
///
/// let schema = Schema::from_json_str(r##"{
///     "definitions": {"year": {"type": "number", "min": 1940, "max": 1950}},
///     "properties": {"year": {"$ref": "#/definitions/year"}}
/// }"##).unwrap();
///
/// assert!(matches!(schema.root(), SchemaNode::Object(_)));
/// assert!(matches!(schema.resolve("#/definitions/year").unwrap(), SchemaNode::Number(_)));
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    document: Value,
    root: SchemaNode,
}

impl Schema {
    /// Parses a schema from its JSON value.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Unsupported` if the root or any node nested in it
    /// cannot be generated. Referenced definitions are parsed when resolved.
    pub fn from_value(document: Value) -> Result<Self, SchemaError> {
        let root = SchemaNode::from_value(&document, "#")?;
        Ok(Self { document, root })
    }

    /// Parses a schema from JSON text.
    pub fn from_json_str(input: &str) -> Result<Self, SchemaError> {
        Self::from_value(serde_json::from_str(input)?)
    }

    /// Parses a schema from YAML text.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(input: &str) -> Result<Self, SchemaError> {
        Self::from_value(serde_yaml::from_str(input)?)
    }

    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Returns the raw schema document.
    #[inline]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Renders the schema document as compact JSON, as shown to the model.
    pub fn render(&self) -> String {
        self.document.to_string()
    }

    /// Returns the raw JSON addressed by `pointer`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidReference` if the pointer does not start
    /// with `#/` or if any segment is absent.
    pub fn lookup(&self, pointer: &str) -> Result<&Value, SchemaError> {
        let path = pointer.strip_prefix(POINTER_PREFIX).ok_or_else(|| {
            SchemaError::invalid_reference(pointer, format!("must start with {}", POINTER_PREFIX))
        })?;

        let mut current = &self.document;
        for raw in path.split('/') {
            let segment = unescape_segment(raw);
            let next = match current {
                Value::Object(map) => map.get(&segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| {
                SchemaError::invalid_reference(pointer, format!("segment '{}' not found", segment))
            })?;
        }

        Ok(current)
    }

    /// Resolves `pointer` and parses the node it addresses.
    pub fn resolve(&self, pointer: &str) -> Result<SchemaNode, SchemaError> {
        let value = self.lookup(pointer)?;
        SchemaNode::from_value(value, pointer)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn person_schema() -> Schema {
        Schema::from_value(json!({
            "definitions": {
                "user": {
                    "type": "object",
                    "properties": {
                        "first_name": {"type": "string"},
                        "age": {"type": "number", "min": 0, "max": 130}
                    }
                }
            },
            "properties": {
                "owner": {"$ref": "#/definitions/user"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_untyped_root_with_properties_is_object() {
        let schema = person_schema();
        let SchemaNode::Object(root) = schema.root() else {
            panic!("root should be an object");
        };
        assert_eq!(root.properties.len(), 1);
        assert_eq!(root.properties[0].1, SchemaNode::Ref("#/definitions/user".into()));
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let schema = Schema::from_json_str(
            r#"{"type": "object", "properties": {"zeta": {"type": "boolean"}, "alpha": {"type": "boolean"}, "mid": {"type": "boolean"}}}"#,
        )
        .unwrap();
        let SchemaNode::Object(root) = schema.root() else {
            panic!("root should be an object");
        };
        let names: Vec<_> = root.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_resolve_nested_pointer() {
        let schema = person_schema();
        let node = schema
            .resolve("#/definitions/user/properties/first_name")
            .unwrap();
        assert_eq!(node, SchemaNode::String(StringSchema::default()));

        let node = schema.resolve("#/definitions/user/properties/age").unwrap();
        assert_eq!(node, SchemaNode::Number(NumberSchema::between(0.0, 130.0)));
    }

    #[test]
    fn test_resolve_absent_segment() {
        let schema = person_schema();
        let err = schema.resolve("#/definitions/admin").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { .. }));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn test_resolve_requires_prefix() {
        let schema = person_schema();
        let err = schema.resolve("definitions/user").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { .. }));
    }

    #[test]
    fn test_pointer_segments_are_unescaped() {
        let schema = Schema::from_value(json!({
            "definitions": {"a/b": {"type": "boolean"}},
            "properties": {}
        }))
        .unwrap();
        assert_eq!(schema.resolve("#/definitions/a~1b").unwrap(), SchemaNode::Boolean);
    }

    #[test]
    fn test_discriminator_parsing() {
        let node = SchemaNode::from_value(
            &json!({
                "discriminator": {
                    "propertyName": "person_type",
                    "mapping": {
                        "DRIVER": "#/definitions/driver",
                        "PASSENGER": "#/definitions/passenger"
                    }
                }
            }),
            "#",
        )
        .unwrap();

        let SchemaNode::Discriminator(discriminator) = node else {
            panic!("expected discriminator");
        };
        assert_eq!(discriminator.property_name, "person_type");
        assert_eq!(discriminator.branch("DRIVER"), Some("#/definitions/driver"));
        assert_eq!(discriminator.branch("PILOT"), None);
        assert_eq!(
            discriminator.selector().one_of,
            Some(vec!["DRIVER".to_string(), "PASSENGER".to_string()])
        );
    }

    #[test]
    fn test_enum_and_bounds() {
        let node = SchemaNode::from_value(
            &json!({"type": "string", "enum": ["convertible", "electric"]}),
            "#",
        )
        .unwrap();
        assert_eq!(
            node,
            SchemaNode::String(StringSchema::one_of(["convertible", "electric"]))
        );

        let node = SchemaNode::from_value(&json!({"type": "number", "minimum": 1}), "#").unwrap();
        assert_eq!(
            node,
            SchemaNode::Number(NumberSchema {
                one_of: None,
                min: Some(1.0),
                max: None
            })
        );
    }

    #[test]
    fn test_unsupported_nodes() {
        let err = SchemaNode::from_value(&json!({"type": "integer"}), "#/properties/x").unwrap_err();
        assert!(matches!(err, SchemaError::Unsupported { .. }));
        assert!(err.to_string().contains("#/properties/x"));

        let err = SchemaNode::from_value(&json!({"format": "date"}), "#").unwrap_err();
        assert!(matches!(err, SchemaError::Unsupported { .. }));

        let err = SchemaNode::from_value(&json!({"type": "array"}), "#").unwrap_err();
        assert!(err.to_string().contains("items"));

        let err = SchemaNode::from_value(&json!({"type": "string", "enum": [1, 2]}), "#").unwrap_err();
        assert!(err.to_string().contains("enum"));
    }

    #[test]
    fn test_nested_error_location() {
        let err = Schema::from_value(json!({
            "type": "object",
            "properties": {"tags": {"type": "array", "items": {"type": "date"}}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("#/properties/tags/items"));
    }

    #[test]
    fn test_render_is_compact() {
        let schema = Schema::from_value(json!({"type": "boolean"})).unwrap();
        assert_eq!(schema.render(), r#"{"type":"boolean"}"#);
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_from_yaml() {
        let schema = Schema::from_yaml_str(
            "type: object\nproperties:\n  name:\n    type: string\n  year:\n    type: number\n",
        )
        .unwrap();
        let SchemaNode::Object(root) = schema.root() else {
            panic!("root should be an object");
        };
        assert_eq!(root.properties[0].0, "name");
        assert_eq!(root.properties[1].0, "year");
    }
}
