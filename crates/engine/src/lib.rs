//! The Resinker simulation engine (spec.md §1): the scheduler, dependency
//! resolver, scenario state machine, mutation applier, simulation clock,
//! and run controller, tied together into a single [`run`] entry point.
//!
//! This crate is the boundary the CLI front-end (external, per spec.md §1)
//! calls into: it accepts a fully resolved [`resinker_spec::Specification`]
//! and drives it to completion, dispatching every committed event to its
//! configured sinks and returning a [`RunSummary`] plus the run's
//! [`Diagnostic`] stream.

/// Run-level diagnostics and termination reporting.
pub mod diagnostics;
/// Top-level engine error type.
pub mod error;
/// Mutation applier: commits `produces*`/`updates_entity_state` effects.
pub mod mutation;
/// Implementer-default run options.
pub mod options;
/// Dependency resolver / candidate feasibility and binding.
pub mod resolver;
/// In-flight scenario run state.
pub mod scenario_runtime;
/// The scheduler: the event loop itself.
pub mod scheduler;

pub use diagnostics::{Diagnostic, RunSummary, TerminationReason};
pub use error::EngineError;
pub use options::RunOptions;
pub use scheduler::{EmittedEvent, Scheduler, SchedulerOutcome};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use resinker_sinks::{build_sinks, EmittedRecord, SinkFanout};
use resinker_spec::Specification;
use resinker_values::RealisticValueProvider;

/// Result of driving a specification to completion (spec.md §6 "CLI
/// contract": `run(spec, options)` returning a summary plus a diagnostics
/// stream).
pub struct RunOutcome {
    /// Termination summary.
    pub summary: RunSummary,
    /// Every non-fatal diagnostic accumulated during the run, in order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Drive `spec` to completion: seed the entity store, run the scheduler
/// until a termination condition trips, then fan every committed event out
/// to its configured sinks and flush them before returning.
///
/// `should_stop` is polled once per tick boundary so a caller (the demo
/// binary's signal handler, spec.md §5) can request a cooperative stop;
/// a fresh `AtomicBool` that is never set means "run to natural
/// completion."
pub async fn run(
    spec: &Specification,
    options: RunOptions,
    provider: &dyn RealisticValueProvider,
    should_stop: Arc<AtomicBool>,
) -> Result<RunOutcome, EngineError> {
    let scheduler = Scheduler::new(spec, provider, options)?;
    let outcome = scheduler.run_to_completion(|| should_stop.load(Ordering::Relaxed));

    let sinks = build_sinks(&spec.outputs).await?;
    let fanout = SinkFanout::spawn(sinks);
    for event in &outcome.events {
        let record = EmittedRecord::new(event.event_type.clone(), event.timestamp, event.payload.clone());
        fanout.dispatch(record).await;
    }
    fanout.shutdown().await?;

    Ok(RunOutcome {
        summary: RunSummary {
            events_emitted: outcome.events.len() as u64,
            duration_observed: outcome.duration_observed,
            termination_reason: outcome.termination_reason,
        },
        diagnostics: outcome.diagnostics,
    })
}

/// Drive `spec` to completion without touching any sink, for callers (the
/// test suite, `resinker validate`-style dry runs) that only need the
/// emitted-event sequence and diagnostics.
pub fn run_without_sinks(
    spec: &Specification,
    options: RunOptions,
    provider: &dyn RealisticValueProvider,
) -> Result<SchedulerOutcome, EngineError> {
    let scheduler = Scheduler::new(spec, provider, options)?;
    Ok(scheduler.run_to_completion(|| false))
}
