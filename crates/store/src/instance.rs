//! Runtime entity instances (spec.md §3 "Entity instance").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record of an entity kind.
///
/// Invariant: `primary_key_value` is unique within its kind (enforced by
/// [`crate::EntityStore::insert`]); `state` keys exactly match the entity's
/// declared `state_attributes` (established at construction and preserved
/// by every mutation path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInstance {
    /// Entity kind this instance belongs to.
    pub kind: String,
    /// This instance's primary-key value, rendered as JSON for uniform
    /// comparison regardless of the declared key's underlying type.
    pub primary_key_value: Value,
    /// Generated payload fields, in schema-declared order.
    pub payload: Map<String, Value>,
    /// Engine-managed state attributes, in entity-declared order.
    pub state: Map<String, Value>,
    /// Simulation timestamp this instance was created at.
    pub created_at: DateTime<Utc>,
    /// Simulation timestamp of the most recent mutation.
    pub last_updated_at: DateTime<Utc>,
}

impl EntityInstance {
    /// Construct a fresh instance at creation time.
    pub fn new(
        kind: impl Into<String>,
        primary_key_value: Value,
        payload: Map<String, Value>,
        state: Map<String, Value>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: kind.into(),
            primary_key_value,
            payload,
            state,
            created_at,
            last_updated_at: created_at,
        }
    }

    /// Read a field by dotted path, checking `payload` first, then `state`.
    /// Used for `from_entity` resolution, which does not distinguish the
    /// two namespaces in its `field` key.
    pub fn read_field(&self, path: &str) -> Option<Value> {
        read_path(&Value::Object(self.payload.clone()), path)
            .or_else(|| read_path(&Value::Object(self.state.clone()), path))
    }

    /// Read a field explicitly from `payload` by dotted path.
    pub fn read_payload_field(&self, path: &str) -> Option<Value> {
        read_path(&Value::Object(self.payload.clone()), path)
    }

    /// Read a field explicitly from `state` by name.
    pub fn read_state_field(&self, name: &str) -> Option<Value> {
        self.state.get(name).cloned()
    }
}

/// Resolve a dotted path (`a.b.c`) against a JSON value.
pub fn read_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_read_field_prefers_payload_then_state() {
        let mut payload = Map::new();
        payload.insert("user_id".to_string(), Value::String("u1".to_string()));
        let mut state = Map::new();
        state.insert("is_logged_in".to_string(), Value::Bool(false));

        let instance = EntityInstance::new("User", Value::String("u1".to_string()), payload, state, epoch());

        assert_eq!(instance.read_field("user_id"), Some(Value::String("u1".to_string())));
        assert_eq!(instance.read_field("is_logged_in"), Some(Value::Bool(false)));
        assert_eq!(instance.read_field("missing"), None);
    }

    #[test]
    fn test_read_nested_path() {
        let mut address = Map::new();
        address.insert("city".to_string(), Value::String("Paris".to_string()));
        let mut payload = Map::new();
        payload.insert("address".to_string(), Value::Object(address));

        let instance = EntityInstance::new("User", Value::Null, payload, Map::new(), epoch());
        assert_eq!(instance.read_payload_field("address.city"), Some(Value::String("Paris".to_string())));
    }
}
