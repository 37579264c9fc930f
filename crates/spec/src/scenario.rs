//! Scenario declarations (spec.md §3 "Scenarios").

use serde::Deserialize;
use serde_json::{Map, Value};

/// Declaration of one multi-step user journey.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioDef {
    /// Human-readable note, not interpreted by the engine.
    pub description: Option<String>,
    /// Relative weight used when the scheduler decides whether to start a
    /// new run of this scenario on a given tick.
    pub initiation_weight: f64,
    /// Entity kinds (with a minimum instance count each) that must already
    /// exist before this scenario can be initiated.
    #[serde(default)]
    pub requires_initial_entities: Vec<RequiredInitialEntity>,
    /// Ordered steps making up one run of this scenario.
    pub steps: Vec<ScenarioStep>,
}

/// One entry of `requires_initial_entities`.
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredInitialEntity {
    /// Entity kind that must have existing instances.
    pub entity: String,
    /// Minimum number of existing instances required.
    #[serde(default = "default_min_count")]
    pub min_count: u32,
}

fn default_min_count() -> u32 {
    1
}

/// One step of a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStep {
    /// Event type generated when this step runs.
    pub event_type: String,
    /// Literal field overrides applied on top of the generated payload;
    /// overrides win over generator output (spec.md §4.6 step 6).
    #[serde(default)]
    pub payload_overrides: Map<String, Value>,
    /// Delay sampled before this step becomes eligible, relative to the
    /// previous step's commit.
    pub delay_after_previous_step: Option<DelayRange>,
    /// Loop this step in place before advancing to the next one.
    #[serde(rename = "loop")]
    pub loop_spec: Option<LoopSpec>,
}

/// An inclusive `[min_seconds, max_seconds]` delay range sampled uniformly.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DelayRange {
    /// Minimum delay, inclusive.
    pub min_seconds: f64,
    /// Maximum delay, inclusive.
    pub max_seconds: f64,
}

impl DelayRange {
    /// Midpoint of the range, used only as a degenerate fallback when
    /// `min_seconds == max_seconds`.
    pub fn is_degenerate(&self) -> bool {
        self.max_seconds <= self.min_seconds
    }
}

/// Repeats the step `[min_count, max_count]` times, with a delay between
/// each repetition.
#[derive(Debug, Clone, Deserialize)]
pub struct LoopSpec {
    /// Minimum number of repetitions, inclusive.
    pub min_count: u32,
    /// Maximum number of repetitions, inclusive.
    pub max_count: u32,
    /// Delay sampled between consecutive loop iterations.
    pub delay_between_loops: DelayRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_initial_entities_defaults_min_count() {
        let yaml = "entity: Product\n";
        let req: RequiredInitialEntity = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(req.min_count, 1);
    }

    #[test]
    fn test_scenario_step_parses_loop_and_delay() {
        let yaml = "\
event_type: UserLoggedIn
delay_after_previous_step:
  min_seconds: 1.0
  max_seconds: 5.0
loop:
  min_count: 1
  max_count: 3
  delay_between_loops:
    min_seconds: 0.5
    max_seconds: 1.5
";
        let step: ScenarioStep = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(step.event_type, "UserLoggedIn");
        let delay = step.delay_after_previous_step.unwrap();
        assert_eq!(delay.min_seconds, 1.0);
        let loop_spec = step.loop_spec.unwrap();
        assert_eq!(loop_spec.max_count, 3);
    }
}
