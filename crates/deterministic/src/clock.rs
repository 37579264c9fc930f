//! Simulation clock: the engine's only source of "now".
//!
//! `SimClock` replaces wall-clock reads with an explicitly advanced,
//! monotonic synthetic timestamp, seeded once at run start. It never reads
//! `std::time::SystemTime` or `Instant::now()` after that seed — every
//! subsequent tick is a logged, explicit delta, so the same spec and seed
//! replay to the same sequence of timestamps regardless of wall-clock
//! conditions on the machine running it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonic synthetic simulation time.
///
/// Seeded once from `time_progression.start_time` (an absolute timestamp,
/// or wall-clock-at-start captured once when the spec says `"now"`), then
/// advanced only through [`SimClock::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    now: DateTime<Utc>,
    time_multiplier: f64,
}

impl SimClock {
    /// Seed the clock at `start`, scaling reported deltas by `time_multiplier`.
    pub fn new(start: DateTime<Utc>, time_multiplier: f64) -> Self {
        Self { now: start, time_multiplier }
    }

    /// Seed the clock at the current wall-clock instant, captured once.
    pub fn starting_now(time_multiplier: f64) -> Self {
        Self::new(Utc::now(), time_multiplier)
    }

    /// The current synthetic timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Advance the clock by `delta_seconds` of simulation time, scaled by
    /// `time_multiplier`. Never moves backward: a negative or NaN delta is
    /// treated as zero.
    pub fn advance(&mut self, delta_seconds: f64) {
        let scaled = (delta_seconds * self.time_multiplier).max(0.0);
        if scaled.is_finite() {
            let millis = (scaled * 1000.0).round() as i64;
            if let Some(duration) = chrono::Duration::try_milliseconds(millis) {
                self.now += duration;
            }
        }
    }

    /// The configured time multiplier.
    pub fn time_multiplier(&self) -> f64 {
        self.time_multiplier
    }

    /// Render the current timestamp as ISO 8601 with second precision,
    /// matching the `current_timestamp` generator's default format.
    pub fn now_iso8601(&self) -> String {
        self.now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}
