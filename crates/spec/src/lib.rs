//! Typed data model for a fully-merged Resinker specification document.
//!
//! This crate is the boundary the external spec loader/importer and
//! validator hand off to the simulation engine (spec.md §1, §6): it knows
//! how to deserialize an already-merged YAML document and defensively
//! re-check cross-references, but it performs no import resolution or deep
//! merging of multiple user files — that remains external.

/// Entity kind declarations.
pub mod entity;
/// Specification-level error type.
pub mod error;
/// Event type declarations.
pub mod event_type;
/// Selection filter clauses and field-path parsing.
pub mod filter;
/// Sink configurations.
pub mod output;
/// Scenario declarations.
pub mod scenario;
/// Schema node data model.
pub mod schema;
/// The top-level merged document and its cross-reference validation.
pub mod specification;
/// Simulation settings (clock seeding, budgets, initial population).
pub mod simulation_settings;

pub use entity::{AttributeType, EntityDef, StateAttributeDef};
pub use error::SpecError;
pub use event_type::{
    ConsumesEntity, EventTypeDef, IncrementAmount, IncrementAttribute, MaxActiveInstancesOfState,
    ProducesSpec, SetAttribute, AttributeValueSource, UpdateEntityState,
};
pub use filter::{FilterClause, FilterField, FilterOperator, SelectionFilter};
pub use output::{RecordFormat, SinkConfig};
pub use scenario::{DelayRange, LoopSpec, RequiredInitialEntity, ScenarioDef, ScenarioStep};
pub use schema::{ArrayNode, NodeModifiers, ObjectNode, PrimitiveKind, PrimitiveNode, RefNode, SchemaNode};
pub use simulation_settings::{DurationSeconds, SimulationSettings, StartTime, TimeProgression};
pub use specification::Specification;
