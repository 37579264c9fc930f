//! Dependency resolver (spec.md §4.5): decides whether an event type is
//! feasible this tick and, if so, builds the binding it will be generated
//! and committed against.

use resinker_rng::{RngSubstream, SimRng};
use resinker_spec::EventTypeDef;
use resinker_store::EntityStore;
use resinker_values::Binding;

/// Attempt to resolve `event`'s `consumes_entities` against `store`, reusing
/// any alias already present in `scenario_binding` (spec.md §4.6 step 6:
/// "reusing scenario-captured bindings where alias names match").
///
/// Returns `None` if the event type is infeasible this tick: a consumed
/// entity has fewer than `min_required` matching candidates, or committing
/// would exceed a declared `max_active_instances_of_state` budget.
pub fn resolve(
    event: &EventTypeDef,
    store: &EntityStore,
    scenario_binding: Option<&Binding>,
    rng: &mut SimRng,
) -> Option<Binding> {
    if let Some(cap) = &event.max_active_instances_of_state {
        let current = store.count_where(&cap.entity, &cap.attribute, &cap.value);
        if current as u32 >= cap.max_count {
            return None;
        }
    }

    let mut binding = Binding::new();
    for consumes in &event.consumes_entities {
        if let Some(reused) = scenario_binding.and_then(|b| b.get(&consumes.alias)) {
            binding.insert(consumes.alias.clone(), reused.clone());
            continue;
        }

        let candidates = store.select(&consumes.name, &consumes.selection_filter);
        if (candidates.len() as u32) < consumes.min_required {
            return None;
        }

        let mut stream = rng.stream(RngSubstream::Selection, 0);
        let index = stream
            .next_in_range(0, candidates.len() as u64, "resolver::select_candidate")
            .unwrap_or(0) as usize;
        binding.insert(consumes.alias.clone(), candidates[index].clone());
    }

    Some(binding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use resinker_spec::{ConsumesEntity, FilterClause, FilterField, FilterOperator, SelectionFilter};
    use resinker_store::EntityInstance;
    use serde_json::{json, Map};

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn event_consuming_user() -> EventTypeDef {
        EventTypeDef {
            payload_schema: "UserLoggedInPayload".to_string(),
            produces: None,
            consumes_entities: vec![ConsumesEntity {
                name: "User".to_string(),
                alias: "user".to_string(),
                selection_filter: SelectionFilter {
                    clauses: vec![FilterClause {
                        field: FilterField::State("is_logged_in".to_string()),
                        operator: FilterOperator::Equals,
                        value: json!(false),
                    }],
                },
                min_required: 1,
            }],
            updates_entity_state: Vec::new(),
            frequency_weight: 1.0,
            max_active_instances_of_state: None,
        }
    }

    fn user(id: &str, logged_in: bool) -> EntityInstance {
        let mut payload = Map::new();
        payload.insert("user_id".to_string(), json!(id));
        let mut state = Map::new();
        state.insert("is_logged_in".to_string(), json!(logged_in));
        EntityInstance::new("User", json!(id), payload, state, epoch())
    }

    #[test]
    fn test_infeasible_when_no_candidates_match_filter() {
        let mut store = EntityStore::new();
        store.insert(user("u1", true)).unwrap();
        let mut rng = SimRng::new(1);
        let event = event_consuming_user();
        assert!(resolve(&event, &store, None, &mut rng).is_none());
    }

    #[test]
    fn test_feasible_binds_matching_candidate() {
        let mut store = EntityStore::new();
        store.insert(user("u1", false)).unwrap();
        let mut rng = SimRng::new(1);
        let event = event_consuming_user();
        let binding = resolve(&event, &store, None, &mut rng).unwrap();
        assert_eq!(binding.get("user").unwrap().primary_key_value, json!("u1"));
    }

    #[test]
    fn test_reuses_scenario_binding_by_alias() {
        let mut store = EntityStore::new();
        store.insert(user("u1", true)).unwrap();
        let mut scenario_binding = Binding::new();
        scenario_binding.insert("user", user("u1", true));
        let mut rng = SimRng::new(1);
        let event = event_consuming_user();
        let binding = resolve(&event, &store, Some(&scenario_binding), &mut rng).unwrap();
        assert_eq!(binding.get("user").unwrap().primary_key_value, json!("u1"));
    }

    #[test]
    fn test_max_active_instances_cap_blocks_feasibility() {
        let mut store = EntityStore::new();
        store.insert(user("u1", true)).unwrap();
        store.insert(user("u2", true)).unwrap();
        let mut rng = SimRng::new(1);
        let mut event = event_consuming_user();
        event.max_active_instances_of_state = Some(resinker_spec::MaxActiveInstancesOfState {
            entity: "User".to_string(),
            attribute: "is_logged_in".to_string(),
            value: json!(true),
            max_count: 2,
        });
        event.consumes_entities[0].selection_filter = SelectionFilter::always();
        assert!(resolve(&event, &store, None, &mut rng).is_none());
    }
}
