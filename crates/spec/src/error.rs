use thiserror::Error;

/// Errors produced while loading or defensively validating a specification.
///
/// The engine's external collaborator (the spec loader/validator) is
/// expected to have already rejected malformed documents before the engine
/// ever sees them; this type exists so the engine fails loudly rather than
/// panicking if that contract is ever violated, and so the demo binary has
/// something structured to report.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The spec file could not be read from disk.
    #[error("failed to read spec file {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document failed to parse as YAML.
    #[error("failed to parse spec as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A schema node referenced by `$ref` does not exist in `schemas`.
    #[error("schema `{0}` referenced via $ref is not declared")]
    UnknownSchemaReference(String),

    /// An entity referenced by name does not exist in `entities`.
    #[error("entity `{0}` is referenced but not declared")]
    UnknownEntityReference(String),

    /// An event type referenced by name does not exist in `event_types`.
    #[error("event type `{0}` is referenced but not declared")]
    UnknownEventType(String),

    /// A selection filter or state update references an undeclared state attribute.
    #[error("entity `{entity}` has no state attribute `{attribute}`")]
    UndefinedStateAttribute {
        /// Entity kind.
        entity: String,
        /// Attribute name that was referenced.
        attribute: String,
    },

    /// A schema node mixed incompatible fields (e.g. both `$ref` and `properties`).
    #[error("invalid schema node `{0}`: {1}")]
    InvalidSchemaNode(String, String),

    /// An event type declared both `produces_entity` and `produces_or_updates_entity`.
    #[error("event type `{0}` declares both produces_entity and produces_or_updates_entity")]
    ConflictingProduces(String),

    /// A `$ref` chain forms a cycle.
    #[error("cyclic $ref detected starting at `{0}`")]
    CyclicSchemaReference(String),

    /// A weighted choice had no positive weights.
    #[error("{0}: weights must sum to a positive value")]
    NonPositiveWeights(String),
}
