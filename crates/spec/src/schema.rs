//! Schema node data model (spec.md §3 "Schemas", §4.3 modifier fields).

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SpecError;

/// Fields every schema node may carry regardless of its kind.
#[derive(Debug, Clone, Default)]
pub struct NodeModifiers {
    /// Probability in `[0, 1]` that this field emits `null` instead of a
    /// generated value.
    pub nullable_probability: Option<f64>,
    /// Entity kind this field is sourced from, if late-bound.
    pub from_entity: Option<String>,
    /// Field path on the bound entity to copy, paired with `from_entity`.
    pub field: Option<String>,
    /// Human-readable note, not interpreted by the engine.
    pub description: Option<String>,
}

/// A single schema node: primitive, object, array, or `$ref`.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// A scalar value produced by a named generator.
    Primitive(PrimitiveNode),
    /// An ordered mapping from field name to nested schema node.
    Object(ObjectNode),
    /// A homogeneous array of a nested schema node.
    Array(ArrayNode),
    /// A reference to another named schema, with optional local overrides.
    Ref(RefNode),
}

impl SchemaNode {
    /// Modifiers common to all node kinds.
    pub fn modifiers(&self) -> &NodeModifiers {
        match self {
            SchemaNode::Primitive(n) => &n.modifiers,
            SchemaNode::Object(n) => &n.modifiers,
            SchemaNode::Array(n) => &n.modifiers,
            SchemaNode::Ref(n) => &n.modifiers,
        }
    }
}

/// `string` / `number` / `integer` / `boolean` primitive node.
#[derive(Debug, Clone)]
pub struct PrimitiveNode {
    /// The primitive's declared type, informational for generators that care.
    pub kind: PrimitiveKind,
    /// Generator name, e.g. `uuid_v4`, `random_int`, `faker.person.full_name`.
    pub generator: Option<String>,
    /// Parameters passed to the generator.
    pub params: Map<String, Value>,
    /// Output formatting hint, e.g. for `current_timestamp`.
    pub format: Option<String>,
    /// Rounding precision for numeric generators.
    pub precision: Option<u32>,
    /// Shared node modifiers.
    pub modifiers: NodeModifiers,
}

/// Declared primitive type of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// UTF-8 string value.
    String,
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// True/false value.
    Boolean,
}

/// Ordered object node; fields are emitted in the order declared here.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    /// Field name to nested schema node, in spec-declared order.
    pub properties: IndexMap<String, SchemaNode>,
    /// Shared node modifiers.
    pub modifiers: NodeModifiers,
}

/// Array node: item schema plus inclusive item-count bounds.
#[derive(Debug, Clone)]
pub struct ArrayNode {
    /// Schema applied to every item.
    pub items: Box<SchemaNode>,
    /// Minimum number of items, inclusive.
    pub min_items: usize,
    /// Maximum number of items, inclusive.
    pub max_items: usize,
    /// Shared node modifiers.
    pub modifiers: NodeModifiers,
}

/// `$ref` node pointing at another top-level schema, with optional
/// locally-specified `from_entity`/`field` overrides merged in at resolve
/// time (spec.md §4.3 modifier 2).
#[derive(Debug, Clone)]
pub struct RefNode {
    /// Name of the referenced top-level schema.
    pub reference: String,
    /// Shared node modifiers (only `from_entity`/`field` are meaningful here).
    pub modifiers: NodeModifiers,
}

/// Intermediate representation mirroring the raw YAML shape, used only to
/// discriminate which [`SchemaNode`] variant a node deserializes to.
#[derive(Debug, Clone, Deserialize)]
struct RawSchemaNode {
    #[serde(rename = "type")]
    type_: Option<String>,
    #[serde(rename = "$ref")]
    ref_: Option<String>,
    #[serde(default)]
    properties: IndexMap<String, SchemaNode>,
    items: Option<Box<SchemaNode>>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    generator: Option<String>,
    #[serde(default)]
    params: Map<String, Value>,
    format: Option<String>,
    precision: Option<u32>,
    nullable_probability: Option<f64>,
    from_entity: Option<String>,
    field: Option<String>,
    description: Option<String>,
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawSchemaNode::deserialize(deserializer)?;
        SchemaNode::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<RawSchemaNode> for SchemaNode {
    type Error = SpecError;

    fn try_from(raw: RawSchemaNode) -> Result<Self, SpecError> {
        let modifiers = NodeModifiers {
            nullable_probability: raw.nullable_probability,
            from_entity: raw.from_entity.clone(),
            field: raw.field.clone(),
            description: raw.description.clone(),
        };

        if let Some(reference) = raw.ref_ {
            if !raw.properties.is_empty() || raw.items.is_some() || raw.generator.is_some() {
                return Err(SpecError::InvalidSchemaNode(
                    reference,
                    "$ref must not be combined with properties/items/generator".to_string(),
                ));
            }
            return Ok(SchemaNode::Ref(RefNode { reference, modifiers }));
        }

        match raw.type_.as_deref() {
            Some("object") => Ok(SchemaNode::Object(ObjectNode {
                properties: raw.properties,
                modifiers,
            })),
            Some("array") => {
                let items = raw.items.ok_or_else(|| {
                    SpecError::InvalidSchemaNode(
                        "array".to_string(),
                        "array node missing `items`".to_string(),
                    )
                })?;
                Ok(SchemaNode::Array(ArrayNode {
                    items,
                    min_items: raw.min_items.unwrap_or(0),
                    max_items: raw.max_items.unwrap_or(raw.min_items.unwrap_or(0)),
                    modifiers,
                }))
            }
            Some("string") | Some("number") | Some("integer") | Some("boolean") => {
                let kind = match raw.type_.as_deref() {
                    Some("string") => PrimitiveKind::String,
                    Some("number") => PrimitiveKind::Number,
                    Some("integer") => PrimitiveKind::Integer,
                    _ => PrimitiveKind::Boolean,
                };
                Ok(SchemaNode::Primitive(PrimitiveNode {
                    kind,
                    generator: raw.generator,
                    params: raw.params,
                    format: raw.format,
                    precision: raw.precision,
                    modifiers,
                }))
            }
            Some(other) => Err(SpecError::InvalidSchemaNode(
                other.to_string(),
                "unknown schema `type`".to_string(),
            )),
            None => Err(SpecError::InvalidSchemaNode(
                "<unnamed>".to_string(),
                "schema node has neither `type` nor `$ref`".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_primitive_node() {
        let yaml = "type: string\ngenerator: uuid_v4\n";
        let node: SchemaNode = serde_yaml::from_str(yaml).unwrap();
        match node {
            SchemaNode::Primitive(p) => {
                assert_eq!(p.kind, PrimitiveKind::String);
                assert_eq!(p.generator.as_deref(), Some("uuid_v4"));
            }
            _ => panic!("expected primitive node"),
        }
    }

    #[test]
    fn test_parses_object_node_preserving_field_order() {
        let yaml = "type: object\nproperties:\n  b:\n    type: string\n    generator: uuid_v4\n  a:\n    type: integer\n    generator: random_int\n";
        let node: SchemaNode = serde_yaml::from_str(yaml).unwrap();
        match node {
            SchemaNode::Object(o) => {
                let keys: Vec<&str> = o.properties.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["b", "a"]);
            }
            _ => panic!("expected object node"),
        }
    }

    #[test]
    fn test_ref_node_rejects_extra_fields() {
        let yaml = "$ref: User\nproperties:\n  x:\n    type: string\n";
        let result: Result<SchemaNode, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_array_node_requires_items() {
        let yaml = "type: array\nmin_items: 1\nmax_items: 3\n";
        let result: Result<SchemaNode, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
