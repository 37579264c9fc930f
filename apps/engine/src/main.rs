//! Resinker: a configuration-driven, deterministic event-stream simulator.
//!
//! Loads a specification document, drives the scheduler to completion, and
//! fans every committed event out to its configured sinks (stdout, file,
//! Kafka). Time progression inside a run is entirely synthetic — this
//! binary's only contact with wall-clock time is resolving `start_time:
//! now` once at startup and polling for a Ctrl-C shutdown request.
//!
//! Three subcommands, matching the CLI contract in spec.md §6: `run` drives
//! a simulation to completion, `validate` loads and cross-reference-checks
//! a specification without running it, and `info` prints a summary of a
//! specification's shape (entity/event/scenario/sink counts) for quick
//! inspection.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use resinker::{apply_overrides, load_spec, SettingsOverrides};
use resinker_engine::{Diagnostic, RunOptions, TerminationReason};
use resinker_values::BuiltinProvider;

#[derive(Debug, Parser)]
#[command(name = "resinker", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drive a specification to completion, dispatching emitted records
    /// to its configured sinks.
    Run {
        /// Path to the specification YAML document.
        #[arg(short = 'c', long = "config")]
        spec_path: PathBuf,

        /// Override `simulation_settings.total_events`.
        #[arg(long)]
        max_events: Option<u64>,

        /// Override `simulation_settings.duration`, in seconds.
        #[arg(long)]
        duration_seconds: Option<f64>,

        /// Override `simulation_settings.random_seed`.
        #[arg(long)]
        seed: Option<u64>,

        /// Consecutive starved ticks tolerated before the run is declared
        /// terminally infeasible.
        #[arg(long, default_value_t = 300)]
        starvation_tick_bound: u32,
    },
    /// Load and cross-reference-check a specification without running it.
    Validate {
        /// Path to the specification YAML document.
        #[arg(short = 'c', long = "config")]
        spec_path: PathBuf,
    },
    /// Print a summary of a specification's shape.
    Info {
        /// Path to the specification YAML document.
        #[arg(short = 'c', long = "config")]
        spec_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            spec_path,
            max_events,
            duration_seconds,
            seed,
            starvation_tick_bound,
        } => run_command(spec_path, max_events, duration_seconds, seed, starvation_tick_bound).await,
        Command::Validate { spec_path } => validate_command(spec_path),
        Command::Info { spec_path } => info_command(spec_path),
    }
}

/// `resinker validate -c <path>`: load the spec and run its cross-reference
/// checks, reporting success/failure without driving the scheduler. This is
/// a thin wrapper over [`resinker_spec::Specification::validate`] — the
/// engine otherwise assumes a pre-validated document (spec.md §7).
fn validate_command(spec_path: PathBuf) -> ExitCode {
    match load_spec(&spec_path) {
        Ok(spec) => {
            info!(
                path = %spec_path.display(),
                entities = spec.entities.len(),
                event_types = spec.event_types.len(),
                scenarios = spec.scenarios.len(),
                outputs = spec.outputs.len(),
                "specification is valid"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(path = %spec_path.display(), %err, "specification is invalid");
            ExitCode::FAILURE
        }
    }
}

/// `resinker info -c <path>`: load the spec and print a shape summary
/// (counts plus the names the scheduler will actually see) without running.
fn info_command(spec_path: PathBuf) -> ExitCode {
    let spec = match load_spec(&spec_path) {
        Ok(spec) => spec,
        Err(err) => {
            error!(path = %spec_path.display(), %err, "failed to load specification");
            return ExitCode::FAILURE;
        }
    };

    println!("spec: {}", spec_path.display());
    println!("random_seed: {}", spec.simulation_settings.random_seed);
    println!(
        "duration: {}",
        spec.simulation_settings
            .duration
            .map(|d| d.0.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!(
        "total_events: {}",
        spec.simulation_settings
            .total_events
            .map(|n| n.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );

    println!("entities ({}):", spec.entities.len());
    for name in spec.entities.keys() {
        println!("  - {name}");
    }

    println!("event_types ({}):", spec.event_types.len());
    for (name, event) in &spec.event_types {
        println!("  - {name} (weight={})", event.frequency_weight);
    }

    println!("scenarios ({}):", spec.scenarios.len());
    for (name, scenario) in &spec.scenarios {
        println!("  - {name} ({} steps)", scenario.steps.len());
    }

    println!("outputs ({}):", spec.outputs.len());
    for sink in &spec.outputs {
        println!("  - {} (enabled={})", sink.kind_label(), sink.is_enabled());
    }

    ExitCode::SUCCESS
}

/// `resinker run -c <path>`: the original single-shot entry point, now
/// reached via the `run` subcommand.
async fn run_command(
    spec_path: PathBuf,
    max_events: Option<u64>,
    duration_seconds: Option<f64>,
    seed: Option<u64>,
    starvation_tick_bound: u32,
) -> ExitCode {
    let mut spec = match load_spec(&spec_path) {
        Ok(spec) => spec,
        Err(err) => {
            error!(path = %spec_path.display(), %err, "failed to load specification");
            return ExitCode::FAILURE;
        }
    };

    apply_overrides(
        &mut spec,
        &SettingsOverrides {
            total_events: max_events,
            duration_seconds,
            random_seed: seed,
        },
    );

    info!(
        path = %spec_path.display(),
        entities = spec.entities.len(),
        event_types = spec.event_types.len(),
        scenarios = spec.scenarios.len(),
        outputs = spec.outputs.len(),
        random_seed = spec.simulation_settings.random_seed,
        "specification loaded"
    );

    let options = RunOptions {
        starvation_tick_bound,
        ..RunOptions::default()
    };

    let should_stop = Arc::new(AtomicBool::new(false));
    spawn_shutdown_listener(should_stop.clone());

    let provider = BuiltinProvider;
    let outcome = resinker_engine::run(&spec, options, &provider, should_stop).await;

    match outcome {
        Ok(outcome) => {
            for diagnostic in &outcome.diagnostics {
                log_diagnostic(diagnostic);
            }
            info!(
                events_emitted = outcome.summary.events_emitted,
                duration_observed = outcome.summary.duration_observed,
                termination_reason = ?outcome.summary.termination_reason,
                "run complete"
            );
            match outcome.summary.termination_reason {
                TerminationReason::Starved => ExitCode::from(2),
                _ => ExitCode::SUCCESS,
            }
        }
        Err(err) => {
            error!(%err, "run failed");
            ExitCode::FAILURE
        }
    }
}

/// Log a non-fatal run diagnostic at the severity matching its kind.
fn log_diagnostic(diagnostic: &Diagnostic) {
    match diagnostic {
        Diagnostic::FeasibilityLapse { event_type, reason } => {
            info!(event_type, reason, "feasibility lapse");
        }
        Diagnostic::GeneratorFault { event_type, field_path, cause } => {
            warn!(event_type, field_path = field_path.as_deref(), cause, "generator fault");
        }
        Diagnostic::SinkFault { sink, cause } => {
            warn!(sink, cause, "sink fault");
        }
        Diagnostic::StarvationWarning { consecutive_ticks } => {
            warn!(consecutive_ticks, "no feasible candidate for a stretch of ticks");
        }
        Diagnostic::Starved { consecutive_ticks } => {
            error!(consecutive_ticks, "run terminated: starved");
        }
    }
}

/// Install a cooperative Ctrl-C handler: the first signal requests a
/// graceful stop at the next tick boundary; a second signal aborts the
/// process immediately, in case the scheduler is wedged.
fn spawn_shutdown_listener(should_stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("shutdown requested, stopping at next tick boundary (press Ctrl-C again to force)");
        should_stop.store(true, Ordering::Relaxed);

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        error!("second shutdown signal received, aborting immediately");
        std::process::exit(130);
    });
}
