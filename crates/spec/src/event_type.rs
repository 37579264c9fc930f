//! Event type declarations (spec.md §3 "Event types", §4.6/§4.7 consumption
//! and mutation semantics).

use serde::Deserialize;
use serde_json::Value;

use crate::error::SpecError;
use crate::filter::SelectionFilter;

/// Declaration of one event type.
#[derive(Debug, Clone)]
pub struct EventTypeDef {
    /// Name of the schema this event's payload conforms to.
    pub payload_schema: String,
    /// Entity this event creates, or creates-or-updates. `None` for events
    /// that only consume entities without producing or mutating one.
    pub produces: Option<ProducesSpec>,
    /// Entities this event must bind before it can be generated, in
    /// spec-declared order.
    pub consumes_entities: Vec<ConsumesEntity>,
    /// State mutations committed alongside this event, in declared order.
    pub updates_entity_state: Vec<UpdateEntityState>,
    /// Relative weight used by the scheduler's stand-alone candidate pool.
    pub frequency_weight: f64,
    /// Optional cap on concurrently-active instances of a given state value.
    pub max_active_instances_of_state: Option<MaxActiveInstancesOfState>,
}

/// What this event type produces or updates.
#[derive(Debug, Clone)]
pub enum ProducesSpec {
    /// Always creates a new instance of `entity`.
    Produces {
        /// Entity kind created.
        entity: String,
    },
    /// Creates a new instance, or updates an existing one, of `entity`.
    ProducesOrUpdates {
        /// Entity kind created or updated.
        entity: String,
        /// Probability of updating an existing instance rather than
        /// creating a new one. Ignored (treated as "always create") when
        /// no instance of `entity` currently exists.
        update_existing_probability: f64,
    },
}

/// One element of `consumes_entities`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumesEntity {
    /// Entity kind to select candidates from.
    pub name: String,
    /// Alias this binding is known by within this event's generation and
    /// any `updates_entity_state` entries.
    pub alias: String,
    /// Filter candidates must satisfy.
    #[serde(default = "SelectionFilter::always")]
    pub selection_filter: SelectionFilter,
    /// Minimum number of matching candidates required for feasibility.
    #[serde(default = "default_min_required")]
    pub min_required: u32,
}

fn default_min_required() -> u32 {
    1
}

/// One element of `updates_entity_state`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateEntityState {
    /// Alias (from `consumes_entities`, or the produced entity's implicit
    /// alias) of the entity instance to mutate.
    pub entity_alias: String,
    /// Attributes to overwrite with a literal or payload-derived value.
    #[serde(default)]
    pub set_attributes: Vec<SetAttribute>,
    /// Attributes to increment (or decrement) by a numeric delta.
    #[serde(default)]
    pub increment_attributes: Vec<IncrementAttribute>,
}

impl UpdateEntityState {
    /// Names of the state attributes targeted by `set_attributes`, for
    /// cross-reference validation.
    pub fn set_attributes_names(&self) -> Vec<String> {
        self.set_attributes.iter().map(|s| s.attribute.clone()).collect()
    }

    /// Names of the state attributes targeted by `increment_attributes`, for
    /// cross-reference validation.
    pub fn increment_attributes_names(&self) -> Vec<String> {
        self.increment_attributes.iter().map(|i| i.attribute.clone()).collect()
    }
}

/// One `set_attributes` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SetAttribute {
    /// Name of the state attribute to set.
    pub attribute: String,
    /// Source of the value to assign.
    #[serde(flatten)]
    pub source: AttributeValueSource,
}

/// Where a `set_attributes` value comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttributeValueSource {
    /// Copy the value from a field of the event's generated payload.
    FromPayloadField {
        /// Payload field path to copy.
        from_payload_field: String,
    },
    /// Assign a literal value.
    Literal {
        /// The literal value.
        value: Value,
    },
}

/// One `increment_attributes` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct IncrementAttribute {
    /// Name of the numeric state attribute to increment.
    pub attribute: String,
    /// Source of the increment amount.
    #[serde(flatten)]
    pub amount: IncrementAmount,
    /// If true, the amount is subtracted rather than added.
    #[serde(default)]
    pub negate: bool,
}

/// Source of an increment's magnitude.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncrementAmount {
    /// Copy the increment amount from a payload field.
    FromPayloadField {
        /// Payload field path holding the numeric amount.
        from_payload_field: String,
    },
    /// A fixed literal increment.
    Literal {
        /// The literal amount.
        amount: f64,
    },
}

/// Caps the number of entity instances concurrently holding a given state
/// value (spec.md §4.5 step 3, §8 Scenario S6).
#[derive(Debug, Clone, Deserialize)]
pub struct MaxActiveInstancesOfState {
    /// Entity kind the cap applies to.
    pub entity: String,
    /// State attribute whose value is being counted.
    pub attribute: String,
    /// The value instances are counted against.
    pub value: Value,
    /// Maximum number of instances allowed to hold `value` simultaneously.
    pub max_count: u32,
}

#[derive(Deserialize)]
struct RawEventType {
    payload_schema: String,
    produces_entity: Option<String>,
    produces_or_updates_entity: Option<RawProducesOrUpdates>,
    #[serde(default)]
    consumes_entities: Vec<ConsumesEntity>,
    #[serde(default)]
    updates_entity_state: Vec<UpdateEntityState>,
    #[serde(default = "default_frequency_weight")]
    frequency_weight: f64,
    max_active_instances_of_state: Option<MaxActiveInstancesOfState>,
}

fn default_frequency_weight() -> f64 {
    1.0
}

#[derive(Deserialize)]
struct RawProducesOrUpdates {
    entity: String,
    update_existing_probability: f64,
}

impl<'de> Deserialize<'de> for EventTypeDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEventType::deserialize(deserializer)?;

        let produces = match (raw.produces_entity, raw.produces_or_updates_entity) {
            (Some(_), Some(_)) => {
                return Err(serde::de::Error::custom(
                    SpecError::ConflictingProduces(raw.payload_schema.clone()),
                ));
            }
            (Some(entity), None) => Some(ProducesSpec::Produces { entity }),
            (None, Some(spec)) => Some(ProducesSpec::ProducesOrUpdates {
                entity: spec.entity,
                update_existing_probability: spec.update_existing_probability,
            }),
            (None, None) => None,
        };

        Ok(EventTypeDef {
            payload_schema: raw.payload_schema,
            produces,
            consumes_entities: raw.consumes_entities,
            updates_entity_state: raw.updates_entity_state,
            frequency_weight: raw.frequency_weight,
            max_active_instances_of_state: raw.max_active_instances_of_state,
        })
    }
}
