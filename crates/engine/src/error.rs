use thiserror::Error;

use resinker_sinks::SinkError;
use resinker_spec::SpecError;
use resinker_store::StoreError;
use resinker_values::ValuesError;

/// Top-level engine error (spec.md §7).
///
/// Specification errors are not expected at this layer — the external
/// validator is assumed to have already rejected a malformed document — but
/// the engine re-checks on load so it fails with a structured diagnostic
/// instead of panicking deep inside the scheduler. Generator, feasibility,
/// and sink faults are handled locally by the scheduler and surfaced as
/// [`crate::diagnostics::Diagnostic`] entries, never as an `EngineError`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The specification failed to load or defensively re-validate.
    #[error("specification error: {0}")]
    Spec(#[from] SpecError),

    /// The entity store rejected an operation the scheduler assumed would
    /// succeed (should not occur given a validated spec and the mutation
    /// applier's own pre-checks).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Sink construction failed before the run could start (e.g. a file
    /// sink's path could not be created, or the Kafka producer could not be
    /// built). Per-event sink faults during the run are non-fatal and never
    /// reach this type.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// A spec-declared reference that should have been caught by
    /// [`resinker_spec::Specification::validate`] was nonetheless missing at
    /// runtime.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl From<ValuesError> for EngineError {
    fn from(err: ValuesError) -> Self {
        EngineError::Internal(format!("unexpected fatal generator fault: {err}"))
    }
}
