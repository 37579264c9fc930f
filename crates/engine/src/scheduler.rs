//! The scheduler (spec.md §4.6): the heart of the event loop. Each tick
//! checks termination, maybe initiates a scenario, assembles the candidate
//! pool, filters it for feasibility, picks one candidate by weight,
//! generates and commits its payload, then advances scenario/clock state
//! and emits the record.

use chrono::{DateTime, Utc};
use serde_json::Value;

use resinker_deterministic::SimClock;
use resinker_rng::{RngSubstream, SimRng};
use resinker_spec::{EventTypeDef, Specification, StartTime};
use resinker_store::EntityStore;
use resinker_values::{Binding, RealisticValueProvider, RenderContext};

use crate::diagnostics::{Diagnostic, TerminationReason};
use crate::error::EngineError;
use crate::mutation;
use crate::options::RunOptions;
use crate::resolver;
use crate::scenario_runtime::ActiveScenarioRun;

/// Drives one simulation run to completion.
pub struct Scheduler<'a> {
    spec: &'a Specification,
    provider: &'a dyn RealisticValueProvider,
    options: RunOptions,
    store: EntityStore,
    rng: SimRng,
    clock: SimClock,
    active_scenarios: Vec<ActiveScenarioRun>,
    emitted_count: u64,
    consecutive_starved_ticks: u32,
    diagnostics: Vec<Diagnostic>,
}

/// One committed event, ready for sink fan-out.
pub struct EmittedEvent {
    /// Name of the event type that produced this record.
    pub event_type: String,
    /// Simulation timestamp at commit time.
    pub timestamp: DateTime<Utc>,
    /// Generated payload, after `payload_overrides` have been applied.
    pub payload: serde_json::Map<String, Value>,
}

/// Outcome of driving a [`Scheduler`] to completion.
pub struct SchedulerOutcome {
    /// Every event committed and emitted, in emission order.
    pub events: Vec<EmittedEvent>,
    /// Why the run stopped.
    pub termination_reason: TerminationReason,
    /// Non-fatal diagnostics accumulated during the run.
    pub diagnostics: Vec<Diagnostic>,
    /// Simulation-clock seconds elapsed between run start and termination.
    pub duration_observed: f64,
}

impl<'a> Scheduler<'a> {
    /// Build a scheduler for `spec`, seeding the entity store with
    /// `initial_entity_counts` before the first tick.
    pub fn new(
        spec: &'a Specification,
        provider: &'a dyn RealisticValueProvider,
        options: RunOptions,
    ) -> Result<Self, EngineError> {
        let settings = &spec.simulation_settings;
        let start = match settings.time_progression.start_time {
            StartTime::Now => Utc::now(),
            StartTime::At(at) => at,
        };
        let clock = SimClock::new(start, settings.time_progression.time_multiplier);
        let mut rng = SimRng::new(settings.random_seed);
        let mut store = EntityStore::new();

        for (kind, count) in spec.initial_entity_counts() {
            for _ in 0..*count {
                let instance = generate_seed_instance(spec, provider, kind, &clock, &mut rng)?;
                store.insert(instance)?;
            }
        }

        Ok(Self {
            spec,
            provider,
            options,
            store,
            rng,
            clock,
            active_scenarios: Vec::new(),
            emitted_count: 0,
            consecutive_starved_ticks: 0,
            diagnostics: Vec::new(),
        })
    }

    /// Run until a termination condition trips (spec.md §4.6 step 1) or a
    /// cooperative stop is requested.
    pub fn run_to_completion(mut self, mut should_stop: impl FnMut() -> bool) -> SchedulerOutcome {
        let run_start = self.clock.now();
        let mut events = Vec::new();

        let termination_reason = loop {
            if should_stop() {
                break TerminationReason::Signal;
            }
            if let Some(total_events) = self.spec.simulation_settings.total_events {
                if self.emitted_count >= total_events {
                    break TerminationReason::TotalEventsReached;
                }
            }
            if let Some(duration) = self.spec.simulation_settings.duration {
                let elapsed = (self.clock.now() - run_start).num_milliseconds() as f64 / 1000.0;
                if elapsed >= duration.0 {
                    break TerminationReason::DurationElapsed;
                }
            }

            self.maybe_initiate_scenario();

            match self.pick_candidate() {
                Some((candidate_kind, event_type_name, event)) => {
                    self.consecutive_starved_ticks = 0;
                    self.attempt_candidate(candidate_kind, &event_type_name, event, &mut events);
                }
                None => {
                    self.consecutive_starved_ticks += 1;
                    self.clock.advance(self.options.default_inter_event_delta_seconds);
                    if self.consecutive_starved_ticks >= self.options.starvation_tick_bound {
                        self.diagnostics.push(Diagnostic::Starved {
                            consecutive_ticks: self.consecutive_starved_ticks,
                        });
                        break TerminationReason::Starved;
                    }
                    if self.consecutive_starved_ticks % 50 == 0 {
                        self.diagnostics.push(Diagnostic::StarvationWarning {
                            consecutive_ticks: self.consecutive_starved_ticks,
                        });
                    }
                }
            }
        };

        let duration_observed = (self.clock.now() - run_start).num_milliseconds() as f64 / 1000.0;

        SchedulerOutcome {
            events,
            termination_reason,
            diagnostics: self.diagnostics,
            duration_observed,
        }
    }

    /// Spec.md §4.6 step 2: with probability proportional to each
    /// scenario's `initiation_weight` against the sum of weights (including
    /// the configured "do nothing" slot), start a feasible scenario.
    fn maybe_initiate_scenario(&mut self) {
        if self.spec.scenarios.is_empty() {
            return;
        }

        let total_weight: f64 = self.spec.scenarios.values().map(|s| s.initiation_weight).sum::<f64>()
            + self.options.do_nothing_weight;
        if total_weight <= 0.0 {
            return;
        }

        let draw = self.rng.stream(RngSubstream::Schedule, 0).next_f64("scheduler::scenario_initiation") * total_weight;
        let mut cumulative = 0.0;
        let mut chosen: Option<&str> = None;
        for (name, scenario) in &self.spec.scenarios {
            cumulative += scenario.initiation_weight;
            if draw < cumulative {
                chosen = Some(name.as_str());
                break;
            }
        }
        let Some(scenario_name) = chosen else {
            return; // landed in the "do nothing" slot.
        };
        let scenario = &self.spec.scenarios[scenario_name];

        for required in &scenario.requires_initial_entities {
            if self.store.len(&required.entity) < required.min_count as usize {
                return; // not yet feasible this tick.
            }
        }

        let mut binding = Binding::new();
        for required in &scenario.requires_initial_entities {
            let candidates = self.store.select(&required.entity, &resinker_spec::SelectionFilter::always());
            if candidates.is_empty() {
                continue;
            }
            let index = self
                .rng
                .stream(RngSubstream::ScenarioInit, 0)
                .next_in_range(0, candidates.len() as u64, "scheduler::scenario_init_binding")
                .unwrap_or(0) as usize;
            binding.insert(required.entity.clone(), candidates[index].clone());
        }

        self.active_scenarios.push(ActiveScenarioRun::start(scenario_name.to_string(), binding));
    }

    /// Spec.md §4.6 steps 3-4: assemble the candidate pool and retain only
    /// feasible entries, then step 5's weighted pick.
    fn pick_candidate(&mut self) -> Option<(PickedFrom, String, &'a EventTypeDef)> {
        let now = self.clock.now();
        let mut feasible: Vec<(PickedFrom, f64)> = Vec::new();

        // Event types that belong to any currently active scenario run are
        // reserved to that run for as long as it is in flight: they are not
        // also offered to the stand-alone pool this tick. Without this, an
        // event type shared between a scenario step and the stand-alone pool
        // could fire out of turn and strand the scenario mid-run (spec.md
        // §4.6 step 3 describes the union of the two pools but not this
        // overlap).
        let mut reserved: Vec<&str> = Vec::new();
        for run in &self.active_scenarios {
            let scenario = &self.spec.scenarios[&run.scenario_name];
            for step in &scenario.steps {
                reserved.push(step.event_type.as_str());
            }
        }

        for (index, run) in self.active_scenarios.iter().enumerate() {
            if !run.is_eligible(now) {
                continue;
            }
            let scenario = &self.spec.scenarios[&run.scenario_name];
            let step = &scenario.steps[run.step_index];
            let Some(event) = self.spec.event_types.get(&step.event_type) else {
                continue;
            };
            if resolver::resolve(event, &self.store, Some(&run.binding), &mut self.rng).is_some() {
                // A weight of zero would make an in-flight scenario's own
                // step permanently unpickable even with no competing
                // candidate; a zero frequency_weight means "never initiate
                // this standalone," not "never continue a run already
                // committed to it."
                let weight = if event.frequency_weight > 0.0 { event.frequency_weight } else { 1.0 };
                feasible.push((PickedFrom::Scenario(index), weight));
            } else {
                self.diagnostics.push(Diagnostic::FeasibilityLapse {
                    event_type: step.event_type.clone(),
                    reason: "consumed entity filter unsatisfied or max_active_instances_of_state exhausted".to_string(),
                });
            }
        }

        for (name, event) in &self.spec.event_types {
            if reserved.iter().any(|r| *r == name.as_str()) {
                continue;
            }
            if resolver::resolve(event, &self.store, None, &mut self.rng).is_some() {
                feasible.push((PickedFrom::StandAlone(name.clone()), event.frequency_weight.max(0.0)));
            }
        }

        let total_weight: f64 = feasible.iter().map(|(_, w)| w).sum();
        if feasible.is_empty() || total_weight <= 0.0 {
            return None;
        }

        let draw = self.rng.stream(RngSubstream::Schedule, 0).next_f64("scheduler::weighted_pick") * total_weight;
        let mut cumulative = 0.0;
        let mut chosen = feasible.len() - 1;
        for (i, (_, weight)) in feasible.iter().enumerate() {
            cumulative += weight;
            if draw < cumulative {
                chosen = i;
                break;
            }
        }

        let picked = feasible.into_iter().nth(chosen).map(|(p, _)| p)?;
        let event_type_name = match &picked {
            PickedFrom::Scenario(index) => {
                let run = &self.active_scenarios[*index];
                let scenario = &self.spec.scenarios[&run.scenario_name];
                scenario.steps[run.step_index].event_type.clone()
            }
            PickedFrom::StandAlone(name) => name.clone(),
        };
        let event = self.spec.event_types.get(&event_type_name)?;
        Some((picked, event_type_name, event))
    }

    fn attempt_candidate(
        &mut self,
        from: PickedFrom,
        event_type_name: &str,
        event: &'a EventTypeDef,
        events: &mut Vec<EmittedEvent>,
    ) {
        let scenario_binding = match &from {
            PickedFrom::Scenario(index) => Some(self.active_scenarios[*index].binding.clone()),
            PickedFrom::StandAlone(_) => None,
        };

        let Some(binding) = resolver::resolve(event, &self.store, scenario_binding.as_ref(), &mut self.rng) else {
            // Feasibility lapsed between the pool check and now (e.g. a
            // max_active_instances_of_state budget consumed by an earlier
            // candidate this same tick). Treat as an ordinary skip.
            self.clock.advance(self.options.default_inter_event_delta_seconds);
            return;
        };

        let schema_name = &event.payload_schema;
        let Some(schema) = self.spec.schemas.get(schema_name) else {
            self.diagnostics.push(Diagnostic::GeneratorFault {
                event_type: event_type_name.to_string(),
                field_path: None,
                cause: format!("payload_schema `{schema_name}` not found"),
            });
            self.clock.advance(self.options.default_inter_event_delta_seconds);
            return;
        };

        let mut ctx = RenderContext {
            clock: &self.clock,
            rng: &mut self.rng,
            binding: &binding,
            provider: self.provider,
            schemas: &self.spec.schemas,
        };
        let payload = match resinker_values::generate(schema, &mut ctx) {
            Ok(value) => value,
            Err(err) => {
                self.diagnostics.push(Diagnostic::GeneratorFault {
                    event_type: event_type_name.to_string(),
                    field_path: None,
                    cause: err.to_string(),
                });
                self.clock.advance(self.options.default_inter_event_delta_seconds);
                return;
            }
        };

        let mut payload = payload;
        if let PickedFrom::Scenario(index) = &from {
            let run = &self.active_scenarios[*index];
            let scenario = &self.spec.scenarios[&run.scenario_name];
            let step = &scenario.steps[run.step_index];
            if !step.payload_overrides.is_empty() {
                if let Some(object) = payload.as_object_mut() {
                    for (key, value) in &step.payload_overrides {
                        object.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        let now = self.clock.now();
        let commit = mutation::commit(event, &payload, &binding, &self.spec.entities, &mut self.store, &mut self.rng, now);

        let commit = match commit {
            Ok(outcome) => outcome,
            Err(err) => {
                self.diagnostics.push(Diagnostic::GeneratorFault {
                    event_type: event_type_name.to_string(),
                    field_path: None,
                    cause: err.to_string(),
                });
                self.clock.advance(self.options.default_inter_event_delta_seconds);
                return;
            }
        };

        if let PickedFrom::Scenario(index) = &from {
            self.advance_scenario(*index, &binding, &commit);
        }

        self.emitted_count += 1;
        self.clock.advance(self.options.default_inter_event_delta_seconds);
        events.push(EmittedEvent {
            event_type: event_type_name.to_string(),
            timestamp: now,
            payload: payload.as_object().cloned().unwrap_or_default(),
        });
    }

    /// Spec.md §4.6 step 8: thread the binding forward, advance the step
    /// index (honoring `loop`), and schedule the next wakeup delay.
    fn advance_scenario(&mut self, index: usize, step_binding: &Binding, commit: &mutation::CommitOutcome) {
        for alias in step_binding.aliases() {
            if let Some(instance) = step_binding.get(alias) {
                self.active_scenarios[index].binding.insert(alias.to_string(), instance.clone());
            }
        }
        if let Some((kind, pk)) = &commit.produced {
            if let Some(instance) = self.store.get(kind, pk) {
                self.active_scenarios[index].binding.insert(kind.clone(), instance.clone());
            }
        }

        let scenario_name = self.active_scenarios[index].scenario_name.clone();
        let scenario = &self.spec.scenarios[&scenario_name];
        let step_index = self.active_scenarios[index].step_index;
        let step = &scenario.steps[step_index];

        if let Some(loop_spec) = &step.loop_spec {
            let remaining = match self.active_scenarios[index].loop_remaining {
                Some(remaining) => remaining,
                None => {
                    let total = self
                        .rng
                        .stream(RngSubstream::ScenarioInit, 0)
                        .next_in_range(loop_spec.min_count as u64, loop_spec.max_count as u64 + 1, "scheduler::loop_count")
                        .unwrap_or(loop_spec.min_count as u64) as u32;
                    total.saturating_sub(1)
                }
            };

            if remaining > 0 {
                self.active_scenarios[index].loop_remaining = Some(remaining - 1);
                let delay = sample_delay(&loop_spec.delay_between_loops, &mut self.rng);
                self.active_scenarios[index].pending_wakeup_time = Some(self.clock.now() + chrono_duration(delay));
                return;
            }
            self.active_scenarios[index].loop_remaining = None;
        }

        self.active_scenarios[index].step_index += 1;
        let next_index = self.active_scenarios[index].step_index;
        if next_index >= scenario.steps.len() {
            self.active_scenarios.remove(index);
            return;
        }

        let next_step = &scenario.steps[next_index];
        self.active_scenarios[index].pending_wakeup_time = next_step
            .delay_after_previous_step
            .map(|range| self.clock.now() + chrono_duration(sample_delay(&range, &mut self.rng)));
    }
}

enum PickedFrom {
    Scenario(usize),
    StandAlone(String),
}

fn sample_delay(range: &resinker_spec::DelayRange, rng: &mut SimRng) -> f64 {
    if range.is_degenerate() {
        return range.min_seconds;
    }
    let draw = rng.stream(RngSubstream::Schedule, 0).next_f64("scheduler::delay");
    range.min_seconds + draw * (range.max_seconds - range.min_seconds)
}

fn chrono_duration(seconds: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((seconds.max(0.0) * 1000.0).round() as i64)
}

fn generate_seed_instance(
    spec: &Specification,
    provider: &dyn RealisticValueProvider,
    kind: &str,
    clock: &SimClock,
    rng: &mut SimRng,
) -> Result<resinker_store::EntityInstance, EngineError> {
    let def = spec
        .entities
        .get(kind)
        .ok_or_else(|| EngineError::Internal(format!("initial_entity_counts names unknown entity `{kind}`")))?;
    let schema = spec
        .schemas
        .get(&def.schema)
        .ok_or_else(|| EngineError::Internal(format!("entity `{kind}` references unknown schema `{}`", def.schema)))?;

    let binding = Binding::new();
    let mut ctx = RenderContext {
        clock,
        rng,
        binding: &binding,
        provider,
        schemas: &spec.schemas,
    };
    let payload = resinker_values::generate(schema, &mut ctx)?;
    mutation::build_instance(kind, &payload, &spec.entities, clock.now()).map_err(|err| EngineError::Internal(err.to_string()))
}
