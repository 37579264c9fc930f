//! Command-line front end for the Resinker simulation engine.
//!
//! This crate is deliberately thin: it resolves CLI flags onto a loaded
//! [`resinker_spec::Specification`], wires up logging and a cooperative
//! cancellation handler, and hands everything to
//! [`resinker_engine::run`]. All simulation semantics live in
//! `resinker-engine` and its collaborator crates.

use std::path::Path;

use resinker_spec::{DurationSeconds, SpecError, Specification};

/// CLI flags that override fields of a loaded specification's
/// `simulation_settings` without editing the spec file on disk.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    /// Overrides `simulation_settings.total_events`.
    pub total_events: Option<u64>,
    /// Overrides `simulation_settings.duration`, in seconds.
    pub duration_seconds: Option<f64>,
    /// Overrides `simulation_settings.random_seed`.
    pub random_seed: Option<u64>,
}

/// Read `path` from disk and parse it as a specification document.
pub fn load_spec(path: &Path) -> Result<Specification, SpecError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Specification::from_yaml_str(&raw)
}

/// Apply CLI overrides in place. The caller is expected to have loaded
/// (and thus already validated) `spec`; overrides are not re-validated.
pub fn apply_overrides(spec: &mut Specification, overrides: &SettingsOverrides) {
    if let Some(total_events) = overrides.total_events {
        spec.simulation_settings.total_events = Some(total_events);
    }
    if let Some(duration_seconds) = overrides.duration_seconds {
        spec.simulation_settings.duration = Some(DurationSeconds(duration_seconds));
    }
    if let Some(random_seed) = overrides.random_seed {
        spec.simulation_settings.random_seed = random_seed;
    }
}
