//! Ordered-iteration and simulation-time primitives shared across the
//! engine crates.
//!
//! Two invariants hold for every run of the simulation engine:
//!
//! - **No unordered iteration.** `HashMap`/`HashSet` are never used for
//!   anything that affects emitted output; [`collections::DeterministicMap`]
//!   and [`collections::DeterministicSet`] (`BTreeMap`/`BTreeSet`-backed)
//!   stand in wherever key-sorted iteration is an acceptable order
//!   contract. Where *spec-declared* order rather than key-sorted order is
//!   required (object field emission, map iteration per the PRNG
//!   determinism contract), callers reach for `indexmap::IndexMap` instead
//!   — see `resinker-spec` and `resinker-store`.
//! - **No wall-clock reads inside the simulation loop.** [`SimClock`] is the
//!   only source of "now" the scheduler consults; it is seeded once from
//!   `time_progression.start_time` and every subsequent advance is an
//!   explicit, logged delta.

pub mod collections;
pub mod clock;

pub use collections::{DeterministicMap, DeterministicSet, DeterministicVec};
pub use clock::SimClock;
