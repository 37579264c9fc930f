//! Runtime state for in-progress scenario runs (spec.md §4.6, §9 "Scenario
//! state machine", §8 invariant 7 "Scenario ordering").

use chrono::{DateTime, Utc};

use resinker_values::Binding;

/// One in-progress run of a declared scenario.
#[derive(Debug, Clone)]
pub struct ActiveScenarioRun {
    /// Name of the scenario being run (key into `Specification::scenarios`).
    pub scenario_name: String,
    /// Index of the step about to be attempted.
    pub step_index: usize,
    /// Remaining repetitions of the current step, if it declares a `loop`.
    /// `None` once a non-looping step is pending, or the loop is exhausted.
    pub loop_remaining: Option<u32>,
    /// Bindings captured at initiation and threaded unchanged across every
    /// step (spec.md §8 invariant 7: "binding context is threaded
    /// unchanged"). Steps add their own consumed/produced aliases on top.
    pub binding: Binding,
    /// Earliest simulation time at which the pending step becomes eligible.
    /// `None` means eligible immediately.
    pub pending_wakeup_time: Option<DateTime<Utc>>,
}

impl ActiveScenarioRun {
    /// Start a fresh run of `scenario_name` with bindings captured at
    /// initiation, eligible immediately.
    pub fn start(scenario_name: impl Into<String>, binding: Binding) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            step_index: 0,
            loop_remaining: None,
            binding,
            pending_wakeup_time: None,
        }
    }

    /// Whether this run is eligible to attempt its pending step at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.pending_wakeup_time.map(|wakeup| wakeup <= now).unwrap_or(true)
    }
}
