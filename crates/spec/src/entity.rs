//! Entity kind declarations (spec.md §3 "Entities").

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Declaration of one entity kind: which schema its payload follows, which
/// field of that schema is its primary key, and what engine-managed state
/// attributes it carries outside the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDef {
    /// Name of the schema (in `schemas`) this entity's payload conforms to.
    pub schema: String,
    /// Field path within that schema holding the primary key value.
    pub primary_key: String,
    /// State attributes, in declared order.
    #[serde(default)]
    pub state_attributes: IndexMap<String, StateAttributeDef>,
}

/// One engine-managed state attribute.
#[derive(Debug, Clone, Deserialize)]
pub struct StateAttributeDef {
    /// Declared value type.
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    /// Default value assigned at entity creation, if no `from_field`.
    pub default: Value,
    /// Whether the attribute may legally hold `null`.
    #[serde(default)]
    pub nullable: bool,
    /// Payload field to copy the initial value from, instead of `default`.
    pub from_field: Option<String>,
}

/// Type of a state attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// UTF-8 string value.
    String,
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// True/false value.
    Boolean,
}
