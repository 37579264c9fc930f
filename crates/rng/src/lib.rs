//! Deterministic random number generation for the Resinker simulation engine.
//!
//! This crate provides a ChaCha20-based, cryptographically seeded RNG that
//! splits into four named sub-streams (`schedule`, `generator`, `selection`,
//! `scenario_init`) so that components reading from unrelated streams can be
//! reordered without perturbing each other's draw sequence. Every draw made
//! through [`SimRng`] is recorded to an audit log for debugging and replay
//! verification.
//!
//! # Usage
//!
//! ```rust
//! use resinker_rng::{SimRng, RngSubstream};
//!
//! let mut rng = SimRng::new(42);
//! let mut stream = rng.stream(RngSubstream::Generator, 0);
//! let random_value = stream.next_u64("values::random_int");
//! ```

/// RFC 7539 ChaCha20 implementation.
pub mod chacha20;

/// Named sub-stream management.
pub mod rng_stream;

/// Root-seed management and lazy stream derivation.
pub mod root_seed;

/// Audit log for all RNG draws.
pub mod audit_log;

/// The central RNG authority used by the rest of the engine.
pub mod sim_rng;

pub use chacha20::ChaCha20Rng;
pub use rng_stream::{RngStream, RngSubstream};
pub use root_seed::RootSeed;
pub use audit_log::{RngAuditLog, RngDrawRecord};
pub use sim_rng::{SimRng, RngStreamHandle, SimRngStatistics};
