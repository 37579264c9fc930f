//! The fully-merged, fully-resolved top-level document the engine consumes
//! (spec.md §6 "Specification input" — the engine's half of that contract;
//! import resolution and deep-merging of multiple user files is the
//! external loader's job).

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::entity::EntityDef;
use crate::error::SpecError;
use crate::event_type::{ConsumesEntity, EventTypeDef, ProducesSpec};
use crate::filter::FilterField;
use crate::output::SinkConfig;
use crate::scenario::ScenarioDef;
use crate::schema::SchemaNode;
use crate::simulation_settings::SimulationSettings;

/// A single already-merged, already-validated specification document.
///
/// `version` and `imports` are accepted (so a demo binary can read a raw
/// single-file spec directly) but carry no engine behavior: import
/// resolution is the external loader's responsibility per spec.md §6.
#[derive(Debug, Clone, Deserialize)]
pub struct Specification {
    /// Spec schema version, informational.
    #[serde(default)]
    pub version: Option<String>,
    /// Other files this document imports; unused by the engine directly.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Run configuration.
    pub simulation_settings: SimulationSettings,
    /// Named schema nodes, in spec-declared order.
    pub schemas: IndexMap<String, SchemaNode>,
    /// Named entity kinds, in spec-declared order.
    pub entities: IndexMap<String, EntityDef>,
    /// Named event types, in spec-declared order.
    pub event_types: IndexMap<String, EventTypeDef>,
    /// Named scenarios, in spec-declared order.
    #[serde(default)]
    pub scenarios: IndexMap<String, ScenarioDef>,
    /// Sink configurations, in declared order.
    #[serde(default)]
    pub outputs: Vec<SinkConfig>,
}

impl Specification {
    /// Parse a merged specification document from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SpecError> {
        let spec: Specification = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Defensive cross-reference validation.
    ///
    /// The external validator is expected to have already rejected a
    /// malformed document before the engine ever sees it (spec.md §7); this
    /// exists so the engine fails loudly with a structured [`SpecError`]
    /// rather than panicking deep inside the scheduler if that contract is
    /// ever violated.
    pub fn validate(&self) -> Result<(), SpecError> {
        for (_, entity) in &self.entities {
            if !self.schemas.contains_key(&entity.schema) {
                return Err(SpecError::UnknownSchemaReference(entity.schema.clone()));
            }
        }

        for name in self.schemas.keys() {
            self.check_ref_acyclic(name, &mut HashSet::new())?;
        }

        for (event_name, event) in &self.event_types {
            if !self.schemas.contains_key(&event.payload_schema) {
                return Err(SpecError::UnknownSchemaReference(event.payload_schema.clone()));
            }
            if let Some(produces) = &event.produces {
                let entity_name = match produces {
                    ProducesSpec::Produces { entity } => entity,
                    ProducesSpec::ProducesOrUpdates { entity, .. } => entity,
                };
                if !self.entities.contains_key(entity_name) {
                    return Err(SpecError::UnknownEntityReference(entity_name.clone()));
                }
            }
            for consumes in &event.consumes_entities {
                self.check_consumes_entity(consumes)?;
            }
            for update in &event.updates_entity_state {
                self.check_state_attribute_exists_for_alias(event_name, event, &update.entity_alias, &update.set_attributes_names(), &update.increment_attributes_names())?;
            }
            if let Some(cap) = &event.max_active_instances_of_state {
                self.check_state_attribute(&cap.entity, &cap.attribute)?;
            }
        }

        for (scenario_name, scenario) in &self.scenarios {
            for required in &scenario.requires_initial_entities {
                if !self.entities.contains_key(&required.entity) {
                    return Err(SpecError::UnknownEntityReference(required.entity.clone()));
                }
            }
            for step in &scenario.steps {
                if !self.event_types.contains_key(&step.event_type) {
                    return Err(SpecError::UnknownEventType(format!(
                        "{scenario_name}::{}",
                        step.event_type
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_consumes_entity(&self, consumes: &ConsumesEntity) -> Result<(), SpecError> {
        if !self.entities.contains_key(&consumes.name) {
            return Err(SpecError::UnknownEntityReference(consumes.name.clone()));
        }
        for clause in &consumes.selection_filter.clauses {
            if let FilterField::State(attribute) = &clause.field {
                self.check_state_attribute(&consumes.name, attribute)?;
            }
        }
        Ok(())
    }

    fn check_state_attribute(&self, entity: &str, attribute: &str) -> Result<(), SpecError> {
        let def = self
            .entities
            .get(entity)
            .ok_or_else(|| SpecError::UnknownEntityReference(entity.to_string()))?;
        if !def.state_attributes.contains_key(attribute) {
            return Err(SpecError::UndefinedStateAttribute {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
            });
        }
        Ok(())
    }

    fn check_state_attribute_exists_for_alias(
        &self,
        event_name: &str,
        event: &EventTypeDef,
        alias: &str,
        set_attrs: &[String],
        increment_attrs: &[String],
    ) -> Result<(), SpecError> {
        let entity_kind = self
            .entity_kind_for_alias(event, alias)
            .ok_or_else(|| SpecError::UnknownEntityReference(format!("{event_name}::{alias}")))?;
        for attribute in set_attrs.iter().chain(increment_attrs.iter()) {
            self.check_state_attribute(&entity_kind, attribute)?;
        }
        Ok(())
    }

    /// Resolve an `entity_alias` used by `updates_entity_state` to the
    /// entity kind it denotes: either the produced entity's implicit alias
    /// (the entity kind name itself) or a `consumes_entities` alias.
    fn entity_kind_for_alias(&self, event: &EventTypeDef, alias: &str) -> Option<String> {
        if let Some(produces) = &event.produces {
            let produced = match produces {
                ProducesSpec::Produces { entity } => entity,
                ProducesSpec::ProducesOrUpdates { entity, .. } => entity,
            };
            if produced == alias {
                return Some(produced.clone());
            }
        }
        event
            .consumes_entities
            .iter()
            .find(|c| c.alias == alias)
            .map(|c| c.name.clone())
    }

    fn check_ref_acyclic(&self, name: &str, visiting: &mut HashSet<String>) -> Result<(), SpecError> {
        let node = match self.schemas.get(name) {
            Some(n) => n,
            None => return Err(SpecError::UnknownSchemaReference(name.to_string())),
        };
        self.check_node_acyclic(node, visiting)
    }

    fn check_node_acyclic(&self, node: &SchemaNode, visiting: &mut HashSet<String>) -> Result<(), SpecError> {
        match node {
            SchemaNode::Ref(r) => {
                if !visiting.insert(r.reference.clone()) {
                    return Err(SpecError::CyclicSchemaReference(r.reference.clone()));
                }
                let result = self.check_ref_acyclic(&r.reference, visiting);
                visiting.remove(&r.reference);
                result
            }
            SchemaNode::Object(o) => {
                for child in o.properties.values() {
                    self.check_node_acyclic(child, visiting)?;
                }
                Ok(())
            }
            SchemaNode::Array(a) => self.check_node_acyclic(&a.items, visiting),
            SchemaNode::Primitive(_) => Ok(()),
        }
    }

    /// Entity kinds declared with an initial population in
    /// `simulation_settings.initial_entity_counts`, for seeding the store.
    pub fn initial_entity_counts(&self) -> &IndexMap<String, u32> {
        &self.simulation_settings.initial_entity_counts
    }

    /// Value of `simulation_settings.random_seed`, convenience accessor.
    pub fn random_seed(&self) -> u64 {
        self.simulation_settings.random_seed
    }
}

/// A literal JSON value, re-exported for callers who only need
/// `serde_json::Value` without pulling in the whole crate path.
pub type JsonValue = Value;

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        "\
simulation_settings:
  total_events: 5
  time_progression:
    start_time: now
  random_seed: 1
schemas:
  User:
    type: object
    properties:
      user_id:
        type: string
        generator: uuid_v4
entities:
  User:
    schema: User
    primary_key: user_id
event_types:
  UserRegistered:
    payload_schema: User
    produces_entity: User
"
    }

    #[test]
    fn test_valid_spec_parses_and_validates() {
        let spec = Specification::from_yaml_str(minimal_yaml()).unwrap();
        assert_eq!(spec.event_types.len(), 1);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_unknown_entity_reference_rejected() {
        let yaml = "\
simulation_settings:
  total_events: 5
  time_progression:
    start_time: now
  random_seed: 1
schemas:
  User:
    type: object
    properties:
      user_id:
        type: string
        generator: uuid_v4
entities: {}
event_types:
  UserRegistered:
    payload_schema: User
    produces_entity: User
";
        let result = Specification::from_yaml_str(yaml);
        assert!(matches!(result, Err(SpecError::UnknownEntityReference(_))));
    }

    #[test]
    fn test_cyclic_ref_rejected() {
        let yaml = "\
simulation_settings:
  total_events: 5
  time_progression:
    start_time: now
  random_seed: 1
schemas:
  A:
    $ref: B
  B:
    $ref: A
entities: {}
event_types: {}
";
        let result = Specification::from_yaml_str(yaml);
        assert!(matches!(result, Err(SpecError::CyclicSchemaReference(_))));
    }
}
