//! The generator interpreter (spec.md §4.3): evaluates schema nodes into
//! JSON payload values, with late-bound entity references, a restricted
//! `derived`-expression grammar, and a pluggable realistic-value provider.

/// Alias→instance bindings for one event's generation.
pub mod binding;
/// Generator-fault error type.
pub mod error;
/// The `derived` expression grammar, parser, and evaluator.
pub mod expression;
/// The schema-node interpreter itself.
pub mod generator;
/// Small `params` map accessors.
pub mod params;
/// The `RealisticValueProvider` trait boundary and a built-in implementation.
pub mod provider;

pub use binding::Binding;
pub use error::ValuesError;
pub use expression::{Expr, ItemExpr};
pub use generator::{generate, RenderContext};
pub use provider::{BuiltinProvider, RealisticValueProvider};
