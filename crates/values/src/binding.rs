//! Bindings: alias → entity instance for one event's generation and commit
//! (spec.md §3 "Binding", §9 "Entity references").
//!
//! Bindings are borrow-only for the scope of a single generate-and-commit:
//! nothing here outlives the event that created it, and the entity store
//! never holds a pointer back into a binding.

use indexmap::IndexMap;
use resinker_store::EntityInstance;

use crate::error::ValuesError;

/// The alias→instance map active while generating one event's payload.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    entries: IndexMap<String, EntityInstance>,
}

impl Binding {
    /// An empty binding, for event types with no `consumes_entities`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an alias to a concrete instance.
    pub fn insert(&mut self, alias: impl Into<String>, instance: EntityInstance) {
        self.entries.insert(alias.into(), instance);
    }

    /// Look up by alias.
    pub fn get(&self, alias: &str) -> Option<&EntityInstance> {
        self.entries.get(alias)
    }

    /// Every bound alias, in binding order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve a `from_entity` reference, which may name either a binding's
    /// alias directly, or an entity kind unambiguous among current bindings
    /// (spec.md §4.3 modifier 1, §4.5: "resolved by alias if ambiguous; by
    /// kind if unique").
    pub fn resolve(&self, from_entity: &str) -> Result<&EntityInstance, ValuesError> {
        if let Some(instance) = self.entries.get(from_entity) {
            return Ok(instance);
        }
        let mut matches_by_kind = self.entries.values().filter(|i| i.kind == from_entity);
        let first = matches_by_kind.next();
        if matches_by_kind.next().is_some() {
            // Ambiguous: more than one bound entity of this kind and no
            // alias matched `from_entity` directly.
            return Err(ValuesError::NoBindingForEntity(from_entity.to_string()));
        }
        first.ok_or_else(|| ValuesError::NoBindingForEntity(from_entity.to_string()))
    }
}
