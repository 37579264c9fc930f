//! Mutation applier (spec.md §4.7): commits a generated event's
//! `produces*`/`updates_entity_state` effects atomically. Every mutation is
//! computed against a read-only snapshot before any write touches the
//! store; if any step fails, nothing has been written and the caller simply
//! treats the event as infeasible (spec.md §4.7, §7's "Feasibility lapses").

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use resinker_rng::{RngSubstream, SimRng};
use resinker_spec::{
    AttributeValueSource, EntityDef, EventTypeDef, IncrementAmount, ProducesSpec, UpdateEntityState,
};
use resinker_store::{read_path, EntityInstance, EntityStore, StoreError};
use resinker_values::Binding;

/// A mutation that could not be applied. Treated by the scheduler exactly
/// like a feasibility lapse: the event is skipped, nothing is committed.
#[derive(Debug, Error)]
pub enum MutationError {
    /// `updates_entity_state` named an alias with no bound or producible entity.
    #[error("no entity bound for alias `{0}`")]
    UnresolvedAlias(String),

    /// An `increment_attributes` target was not a number, or the source
    /// payload field was not a number.
    #[error("attribute `{0}` is not numeric")]
    NotNumeric(String),

    /// A `from_payload_field` source path was absent from the generated payload.
    #[error("payload field `{0}` is missing")]
    MissingPayloadField(String),

    /// The produced/updated entity had no declaration in `entities`.
    #[error("unknown entity kind `{0}`")]
    UnknownEntity(String),

    /// The primary-key field was absent from the generated payload.
    #[error("primary key field `{0}` missing from payload")]
    MissingPrimaryKey(String),

    /// The store rejected a write the planning phase believed would succeed.
    #[error("store error while applying commit: {0}")]
    Store(#[from] StoreError),
}

/// Result of committing one event: the entity it created, if any, plus the
/// kinds/keys of every entity it updated — used by the caller to refresh
/// any scenario binding that pointed at one of them.
pub struct CommitOutcome {
    /// Primary-key value of the entity this event produced, if it produced one.
    pub produced: Option<(String, Value)>,
}

/// Plan and apply `event`'s commit against `store`.
///
/// `binding` holds the consumed-entity aliases resolved by
/// `crate::resolver::resolve`; `entities` is the full entity registry, used
/// to build a freshly produced instance's initial state and to resolve the
/// produced entity's implicit alias (its own kind name).
pub fn commit(
    event: &EventTypeDef,
    payload: &Value,
    binding: &Binding,
    entities: &IndexMap<String, EntityDef>,
    store: &mut EntityStore,
    rng: &mut SimRng,
    now: DateTime<Utc>,
) -> Result<CommitOutcome, MutationError> {
    let produced_kind = event.produces.as_ref().map(|p| match p {
        ProducesSpec::Produces { entity } => entity.clone(),
        ProducesSpec::ProducesOrUpdates { entity, .. } => entity.clone(),
    });

    let mut new_instance: Option<EntityInstance> = None;
    let mut update_existing: Option<(String, Value)> = None;

    if let Some(produces) = &event.produces {
        match produces {
            ProducesSpec::Produces { entity } => {
                new_instance = Some(build_instance(entity, payload, entities, now)?);
            }
            ProducesSpec::ProducesOrUpdates { entity, update_existing_probability } => {
                let existing_count = store.len(entity);
                let should_update = existing_count > 0
                    && rng.stream(RngSubstream::Schedule, 0).next_f64("mutation::update_existing_probability")
                        < *update_existing_probability;
                if should_update {
                    let index = rng
                        .stream(RngSubstream::Selection, 0)
                        .next_in_range(0, existing_count as u64, "mutation::pick_existing")
                        .unwrap_or(0) as usize;
                    let pk = store
                        .select(entity, &resinker_spec::SelectionFilter::always())
                        .get(index)
                        .map(|i| i.primary_key_value.clone())
                        .ok_or_else(|| MutationError::UnknownEntity(entity.clone()))?;
                    update_existing = Some((entity.clone(), pk));
                } else {
                    new_instance = Some(build_instance(entity, payload, entities, now)?);
                }
            }
        }
    }

    // Plan every `updates_entity_state` entry against a read-only snapshot.
    let mut planned_updates: Vec<(String, Value, Map<String, Value>)> = Vec::new();
    for update in &event.updates_entity_state {
        let target_is_produced = produced_kind.as_deref() == Some(update.entity_alias.as_str());

        if target_is_produced {
            if let Some(instance) = new_instance.as_mut() {
                let new_state = compute_new_state(&instance.state, update, payload)?;
                instance.state = new_state;
                continue;
            }
            if let Some((kind, pk)) = &update_existing {
                let current = store
                    .get(kind, pk)
                    .ok_or_else(|| MutationError::UnresolvedAlias(update.entity_alias.clone()))?;
                let new_state = compute_new_state(&current.state, update, payload)?;
                planned_updates.push((kind.clone(), pk.clone(), new_state));
                continue;
            }
        }

        let bound = binding
            .get(&update.entity_alias)
            .ok_or_else(|| MutationError::UnresolvedAlias(update.entity_alias.clone()))?;
        let current = store
            .get(&bound.kind, &bound.primary_key_value)
            .ok_or_else(|| MutationError::UnresolvedAlias(update.entity_alias.clone()))?;
        let new_state = compute_new_state(&current.state, update, payload)?;
        planned_updates.push((bound.kind.clone(), bound.primary_key_value.clone(), new_state));
    }

    // Nothing has touched the store yet. Apply.
    let produced_key = if let Some(instance) = new_instance {
        let key = (instance.kind.clone(), instance.primary_key_value.clone());
        store.insert(instance)?;
        Some(key)
    } else {
        None
    };

    for (kind, pk, new_state) in planned_updates {
        store.update(&kind, &pk, move |instance| {
            instance.state = new_state;
            instance.last_updated_at = now;
        })?;
    }

    Ok(CommitOutcome { produced: produced_key })
}

pub(crate) fn build_instance(
    entity_kind: &str,
    payload: &Value,
    entities: &IndexMap<String, EntityDef>,
    now: DateTime<Utc>,
) -> Result<EntityInstance, MutationError> {
    let def = entities
        .get(entity_kind)
        .ok_or_else(|| MutationError::UnknownEntity(entity_kind.to_string()))?;

    let primary_key_value = read_path(payload, &def.primary_key)
        .ok_or_else(|| MutationError::MissingPrimaryKey(def.primary_key.clone()))?;

    let payload_map = payload.as_object().cloned().unwrap_or_default();

    let mut state = Map::new();
    for (name, attr) in &def.state_attributes {
        let value = match &attr.from_field {
            Some(path) => read_path(payload, path).unwrap_or_else(|| attr.default.clone()),
            None => attr.default.clone(),
        };
        state.insert(name.clone(), value);
    }

    Ok(EntityInstance::new(entity_kind, primary_key_value, payload_map, state, now))
}

fn compute_new_state(
    current: &Map<String, Value>,
    update: &UpdateEntityState,
    payload: &Value,
) -> Result<Map<String, Value>, MutationError> {
    let mut state = current.clone();

    for set in &update.set_attributes {
        let value = match &set.source {
            AttributeValueSource::Literal { value } => value.clone(),
            AttributeValueSource::FromPayloadField { from_payload_field } => {
                read_path(payload, from_payload_field)
                    .ok_or_else(|| MutationError::MissingPayloadField(from_payload_field.clone()))?
            }
        };
        state.insert(set.attribute.clone(), value);
    }

    for increment in &update.increment_attributes {
        let amount = match &increment.amount {
            IncrementAmount::Literal { amount } => *amount,
            IncrementAmount::FromPayloadField { from_payload_field } => read_path(payload, from_payload_field)
                .and_then(|v| v.as_f64())
                .ok_or_else(|| MutationError::MissingPayloadField(from_payload_field.clone()))?,
        };
        let signed = if increment.negate { -amount } else { amount };
        let current_value = state
            .get(&increment.attribute)
            .and_then(Value::as_f64)
            .ok_or_else(|| MutationError::NotNumeric(increment.attribute.clone()))?;
        let updated = current_value + signed;
        state.insert(increment.attribute.clone(), serde_json::Number::from_f64(updated).map(Value::Number).unwrap_or(Value::Null));
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resinker_spec::{IncrementAttribute, SetAttribute};
    use serde_json::json;

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_increment_with_negate_reverses_magnitude() {
        let mut state = Map::new();
        state.insert("total_purchase_value".to_string(), json!(10.0));
        let update = UpdateEntityState {
            entity_alias: "user".to_string(),
            set_attributes: Vec::new(),
            increment_attributes: vec![IncrementAttribute {
                attribute: "total_purchase_value".to_string(),
                amount: IncrementAmount::Literal { amount: 5.0 },
                negate: true,
            }],
        };
        let payload = json!({});
        let new_state = compute_new_state(&state, &update, &payload).unwrap();
        assert_eq!(new_state.get("total_purchase_value").unwrap().as_f64().unwrap(), 5.0);
    }

    #[test]
    fn test_increment_on_non_numeric_is_fatal() {
        let mut state = Map::new();
        state.insert("tier".to_string(), json!("gold"));
        let update = UpdateEntityState {
            entity_alias: "user".to_string(),
            set_attributes: Vec::new(),
            increment_attributes: vec![IncrementAttribute {
                attribute: "tier".to_string(),
                amount: IncrementAmount::Literal { amount: 1.0 },
                negate: false,
            }],
        };
        let payload = json!({});
        assert!(compute_new_state(&state, &update, &payload).is_err());
    }

    #[test]
    fn test_set_attribute_from_payload_field() {
        let state = Map::new();
        let update = UpdateEntityState {
            entity_alias: "user".to_string(),
            set_attributes: vec![SetAttribute {
                attribute: "is_logged_in".to_string(),
                source: AttributeValueSource::FromPayloadField { from_payload_field: "success".to_string() },
            }],
            increment_attributes: Vec::new(),
        };
        let payload = json!({"success": true});
        let new_state = compute_new_state(&state, &update, &payload).unwrap();
        assert_eq!(new_state.get("is_logged_in"), Some(&json!(true)));
    }

    #[test]
    fn test_build_instance_reads_primary_key_and_defaults() {
        let mut entities = IndexMap::new();
        entities.insert(
            "User".to_string(),
            EntityDef {
                schema: "User".to_string(),
                primary_key: "user_id".to_string(),
                state_attributes: {
                    let mut m = IndexMap::new();
                    m.insert(
                        "is_logged_in".to_string(),
                        resinker_spec::StateAttributeDef {
                            attribute_type: resinker_spec::AttributeType::Boolean,
                            default: json!(false),
                            nullable: false,
                            from_field: None,
                        },
                    );
                    m
                },
            },
        );
        let payload = json!({"user_id": "u1"});
        let instance = build_instance("User", &payload, &entities, epoch()).unwrap();
        assert_eq!(instance.primary_key_value, json!("u1"));
        assert_eq!(instance.state.get("is_logged_in"), Some(&json!(false)));
    }
}
