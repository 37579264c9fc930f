//! Simulation settings (spec.md §3 "Simulation settings").

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

/// Top-level run configuration: termination budgets, starting entity
/// population, clock seeding, and the PRNG seed.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    /// Wall-elapsed budget; the run stops once either this or
    /// `total_events` trips, whichever comes first (spec.md §9).
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub duration: Option<DurationSeconds>,
    /// Emitted-event budget.
    pub total_events: Option<u64>,
    /// Entity instances pre-populated before the first tick.
    #[serde(default)]
    pub initial_entity_counts: IndexMap<String, u32>,
    /// Clock seeding.
    pub time_progression: TimeProgression,
    /// Seed for the root PRNG (spec.md §4.2).
    pub random_seed: u64,
}

/// A duration expressed in seconds, accepting either a bare number or a
/// suffixed string (`"30s"`, `"5m"`, `"2h"`, `"1d"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationSeconds(pub f64);

fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<DurationSeconds>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    match raw {
        None | Some(Raw::Null) => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(DurationSeconds(n))),
        Some(Raw::Text(s)) => parse_duration_string(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn parse_duration_string(raw: &str) -> Result<DurationSeconds, String> {
    let trimmed = raw.trim();
    let (number_part, unit) = match trimmed.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&trimmed[..trimmed.len() - 1], c),
        _ => (trimmed, 's'),
    };
    let value: f64 = number_part
        .parse()
        .map_err(|_| format!("invalid duration `{raw}`"))?;
    let multiplier = match unit {
        's' => 1.0,
        'm' => 60.0,
        'h' => 3600.0,
        'd' => 86400.0,
        other => return Err(format!("unknown duration unit `{other}` in `{raw}`")),
    };
    Ok(DurationSeconds(value * multiplier))
}

/// Clock seeding: where synthetic time starts, and how fast it reports
/// elapsing relative to real seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeProgression {
    /// `"now"` (resolved once at run start) or an absolute ISO 8601 timestamp.
    pub start_time: StartTime,
    /// Scales the *reported* delta between events; does not gate throughput
    /// (spec.md §4.1).
    #[serde(default = "default_time_multiplier")]
    pub time_multiplier: f64,
}

fn default_time_multiplier() -> f64 {
    1.0
}

/// Where the simulation clock begins.
#[derive(Debug, Clone)]
pub enum StartTime {
    /// Wall-clock at run start, captured once.
    Now,
    /// A fixed absolute instant.
    At(chrono::DateTime<chrono::Utc>),
}

impl<'de> Deserialize<'de> for StartTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.eq_ignore_ascii_case("now") {
            Ok(StartTime::Now)
        } else {
            chrono::DateTime::parse_from_rfc3339(&raw)
                .map(|dt| StartTime::At(dt.with_timezone(&chrono::Utc)))
                .map_err(|e| serde::de::Error::custom(format!("invalid start_time `{raw}`: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_plain_number() {
        let yaml = "\
total_events: 10
time_progression:
  start_time: now
random_seed: 1
duration: 30
";
        let settings: SimulationSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.duration.unwrap().0, 30.0);
    }

    #[test]
    fn test_duration_suffixed_string() {
        let yaml = "\
total_events: 10
time_progression:
  start_time: now
random_seed: 1
duration: \"5m\"
";
        let settings: SimulationSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.duration.unwrap().0, 300.0);
    }

    #[test]
    fn test_start_time_now() {
        let yaml = "start_time: now\n";
        let tp: TimeProgression = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(tp.start_time, StartTime::Now));
        assert_eq!(tp.time_multiplier, 1.0);
    }

    #[test]
    fn test_start_time_absolute() {
        let yaml = "start_time: \"2026-01-01T00:00:00Z\"\ntime_multiplier: 2.0\n";
        let tp: TimeProgression = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(tp.start_time, StartTime::At(_)));
        assert_eq!(tp.time_multiplier, 2.0);
    }
}
