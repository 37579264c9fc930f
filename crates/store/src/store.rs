//! The entity store (spec.md §4.4): per-kind, insertion-ordered instance
//! maps supporting filtered selection and count queries.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use resinker_spec::SelectionFilter;

use crate::error::StoreError;
use crate::filter_eval;
use crate::instance::EntityInstance;

/// Owns every entity instance for the duration of one simulation run.
///
/// Per spec.md §5, the store is exclusively mutated by the scheduler; it
/// performs no locking because it is never shared across threads.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    kinds: IndexMap<String, IndexMap<JsonKey, EntityInstance>>,
}

/// A primary-key value, made hashable/orderable via its canonical JSON
/// string so any JSON scalar (string, integer, float, bool) can serve as a
/// key without the store needing to know the declared key type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JsonKey(String);

impl JsonKey {
    fn from_value(value: &Value) -> Self {
        JsonKey(value.to_string())
    }
}

impl EntityStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new instance, failing if its primary-key value already
    /// exists within its kind.
    pub fn insert(&mut self, instance: EntityInstance) -> Result<(), StoreError> {
        let kind = instance.kind.clone();
        let key = JsonKey::from_value(&instance.primary_key_value);
        let bucket = self.kinds.entry(kind.clone()).or_default();
        if bucket.contains_key(&key) {
            return Err(StoreError::DuplicatePrimaryKey {
                kind,
                primary_key: instance.primary_key_value.to_string(),
            });
        }
        trace!(kind = %kind, primary_key = %instance.primary_key_value, "entity inserted");
        bucket.insert(key, instance);
        Ok(())
    }

    /// Apply `mutator` to the instance identified by `(kind, primary_key)`,
    /// failing if no such instance exists.
    pub fn update(
        &mut self,
        kind: &str,
        primary_key: &Value,
        mutator: impl FnOnce(&mut EntityInstance),
    ) -> Result<(), StoreError> {
        let key = JsonKey::from_value(primary_key);
        let bucket = self.kinds.get_mut(kind).ok_or_else(|| StoreError::InstanceNotFound {
            kind: kind.to_string(),
            primary_key: primary_key.to_string(),
        })?;
        let instance = bucket.get_mut(&key).ok_or_else(|| StoreError::InstanceNotFound {
            kind: kind.to_string(),
            primary_key: primary_key.to_string(),
        })?;
        mutator(instance);
        Ok(())
    }

    /// All instances of `kind` satisfying `filter`, in insertion order (the
    /// order candidates are offered to the `selection` PRNG sub-stream, per
    /// spec.md §4.5 step 4 and §9's tie-break rule).
    pub fn select(&self, kind: &str, filter: &SelectionFilter) -> Vec<&EntityInstance> {
        self.kinds
            .get(kind)
            .map(|bucket| {
                bucket
                    .values()
                    .filter(|instance| filter_eval::matches(instance, filter))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of instances of `kind` whose `attribute` currently equals `value`.
    pub fn count_where(&self, kind: &str, attribute: &str, value: &Value) -> usize {
        self.kinds
            .get(kind)
            .map(|bucket| {
                bucket
                    .values()
                    .filter(|instance| instance.state.get(attribute) == Some(value))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Total number of instances of `kind`.
    pub fn len(&self, kind: &str) -> usize {
        self.kinds.get(kind).map(IndexMap::len).unwrap_or(0)
    }

    /// Whether any instance of `kind` exists.
    pub fn is_empty(&self, kind: &str) -> bool {
        self.len(kind) == 0
    }

    /// Look up a single instance by kind and primary-key value.
    pub fn get(&self, kind: &str, primary_key: &Value) -> Option<&EntityInstance> {
        self.kinds.get(kind)?.get(&JsonKey::from_value(primary_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Map};

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn user(id: &str) -> EntityInstance {
        let mut payload = Map::new();
        payload.insert("user_id".to_string(), json!(id));
        let mut state = Map::new();
        state.insert("is_logged_in".to_string(), json!(false));
        EntityInstance::new("User", json!(id), payload, state, epoch())
    }

    #[test]
    fn test_insert_and_select() {
        let mut store = EntityStore::new();
        store.insert(user("u1")).unwrap();
        store.insert(user("u2")).unwrap();

        let all = store.select("User", &SelectionFilter::always());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let mut store = EntityStore::new();
        store.insert(user("u1")).unwrap();
        let err = store.insert(user("u1")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePrimaryKey { .. }));
    }

    #[test]
    fn test_update_mutates_in_place() {
        let mut store = EntityStore::new();
        store.insert(user("u1")).unwrap();

        store
            .update("User", &json!("u1"), |instance| {
                instance.state.insert("is_logged_in".to_string(), json!(true));
            })
            .unwrap();

        let instance = store.get("User", &json!("u1")).unwrap();
        assert_eq!(instance.state.get("is_logged_in"), Some(&json!(true)));
    }

    #[test]
    fn test_update_missing_instance_errors() {
        let mut store = EntityStore::new();
        let err = store.update("User", &json!("missing"), |_| {}).unwrap_err();
        assert!(matches!(err, StoreError::InstanceNotFound { .. }));
    }

    #[test]
    fn test_count_where() {
        let mut store = EntityStore::new();
        store.insert(user("u1")).unwrap();
        store.insert(user("u2")).unwrap();
        store
            .update("User", &json!("u1"), |i| {
                i.state.insert("is_logged_in".to_string(), json!(true));
            })
            .unwrap();

        assert_eq!(store.count_where("User", "is_logged_in", &json!(true)), 1);
        assert_eq!(store.count_where("User", "is_logged_in", &json!(false)), 1);
    }

    #[test]
    fn test_insertion_order_preserved_for_tie_breaking() {
        let mut store = EntityStore::new();
        store.insert(user("u3")).unwrap();
        store.insert(user("u1")).unwrap();
        store.insert(user("u2")).unwrap();

        let all = store.select("User", &SelectionFilter::always());
        let ids: Vec<&str> = all.iter().map(|i| i.primary_key_value.as_str().unwrap()).collect();
        assert_eq!(ids, vec!["u3", "u1", "u2"]);
    }
}
