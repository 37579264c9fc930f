/// Implementer-default knobs spec.md leaves open (§4.6, §5).
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Bounded channel capacity for each sink's worker queue.
    pub event_channel_capacity: usize,
    /// Consecutive starved ticks tolerated before the run terminates with
    /// `termination_reason = "starved"` (spec.md §4.6, §7).
    pub starvation_tick_bound: u32,
    /// Clock advance, in seconds, applied between stand-alone events and
    /// after a starved tick's retry (spec.md §4.1, §4.6).
    pub default_inter_event_delta_seconds: f64,
    /// Relative weight of the scheduler's "do nothing this tick" slot when
    /// sampling whether to initiate a new scenario run (spec.md §4.6 step 2).
    pub do_nothing_weight: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            event_channel_capacity: 256,
            starvation_tick_bound: 300,
            default_inter_event_delta_seconds: 1.0,
            do_nothing_weight: 1.0,
        }
    }
}
