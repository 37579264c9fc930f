use thiserror::Error;

/// Generator faults (spec.md §4.3, §7 "Generator faults").
///
/// Fatal for the event being built: the caller (the mutation applier in
/// `resinker-engine`) rolls the commit back and logs `(event_type, field
/// path, cause)`; these faults must never corrupt entity state.
#[derive(Debug, Error)]
pub enum ValuesError {
    /// `from_entity` named a kind/alias with no matching binding.
    #[error("no binding available for from_entity `{0}`")]
    NoBindingForEntity(String),

    /// A `$ref` points at an undeclared schema.
    #[error("$ref `{0}` does not resolve to a declared schema")]
    UnknownSchemaReference(String),

    /// An unrecognized generator name was used.
    #[error("unknown generator `{0}`")]
    UnknownGenerator(String),

    /// A required generator parameter was missing or the wrong type.
    #[error("generator `{generator}` is missing or has an invalid parameter `{param}`")]
    InvalidParam {
        /// Generator name.
        generator: String,
        /// Parameter name.
        param: String,
    },

    /// `choice`'s weights did not sum to a positive value.
    #[error("choice weights must sum to a positive value")]
    NonPositiveWeights,

    /// `static_hashed` named an unsupported hash algorithm.
    #[error("unsupported hash algorithm `{0}`")]
    UnsupportedHashAlgorithm(String),

    /// Hashing the raw value failed (e.g. bcrypt internal error).
    #[error("hashing failed: {0}")]
    HashingFailed(String),

    /// A `derived` expression referenced a field not present in the
    /// partially-built payload.
    #[error("derived expression references unknown field `{0}`")]
    UnknownDerivedField(String),

    /// A `derived` expression failed to parse under the restricted grammar.
    #[error("invalid derived expression `{0}`: {1}")]
    InvalidExpression(String, String),

    /// `precision` was applied to a non-numeric generator output.
    #[error("precision applied to a non-numeric value")]
    PrecisionOnNonNumber,

    /// `conditional_choice`'s `condition_field` was missing from the
    /// partially-built payload.
    #[error("conditional_choice condition_field `{0}` not found in payload")]
    UnknownConditionField(String),

    /// The realistic-value provider has no generator for the requested path.
    #[error("unknown faker path `{0}`")]
    UnknownFakerPath(String),

    /// The realistic-value provider rejected its parameters.
    #[error("faker path `{path}` rejected params: {reason}")]
    FakerParamsRejected {
        /// Faker path requested.
        path: String,
        /// Reason given by the provider.
        reason: String,
    },
}
