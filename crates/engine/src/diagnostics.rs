//! Run-level diagnostics (spec.md §6 "an iterator over diagnostics", §7).

use serde::Serialize;

/// One noteworthy event during a run, surfaced to the caller of [`crate::run`]
/// without aborting the simulation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An event type was skipped this tick because it was infeasible
    /// (missing consumed entities, exhausted `max_active_instances_of_state`).
    FeasibilityLapse {
        /// Event type that could not be scheduled.
        event_type: String,
        /// Short human-readable reason.
        reason: String,
    },
    /// A generator fault rolled back an in-progress commit (spec.md §7
    /// "Generator faults"). Entity state is guaranteed unaffected.
    GeneratorFault {
        /// Event type being built when the fault occurred.
        event_type: String,
        /// Field path under construction, if known.
        field_path: Option<String>,
        /// Underlying cause.
        cause: String,
    },
    /// A sink failed to accept or flush a record. Logged, not fatal; the
    /// sink continues to receive subsequent records unless it fails
    /// repeatedly (policy is the sink's own).
    SinkFault {
        /// Name of the sink that faulted.
        sink: String,
        /// Underlying cause.
        cause: String,
    },
    /// The scheduler found no feasible candidate for a run of ticks that
    /// reached, but did not yet exceed, the starvation bound.
    StarvationWarning {
        /// Number of consecutive starved ticks observed so far.
        consecutive_ticks: u32,
    },
    /// The run terminated because it exceeded the starvation bound.
    Starved {
        /// Number of consecutive starved ticks that triggered termination.
        consecutive_ticks: u32,
    },
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// `total_events` was reached.
    TotalEventsReached,
    /// `duration` elapsed on the simulation clock.
    DurationElapsed,
    /// No feasible event for longer than the configured starvation bound.
    Starved,
    /// A termination signal was received (demo binary only).
    Signal,
}

/// Summary returned by [`crate::run`] (spec.md §6 "CLI contract").
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Total events committed and emitted.
    pub events_emitted: u64,
    /// Simulation-clock seconds elapsed between run start and termination.
    pub duration_observed: f64,
    /// Why the run stopped.
    pub termination_reason: TerminationReason,
}
