//! The realistic-value provider boundary (spec.md §4.3).
//!
//! The engine defines this trait but does not implement locale-aware
//! realistic-value generation itself; [`BuiltinProvider`] is a minimal,
//! dependency-free implementation covering a handful of common paths so the
//! engine is runnable and testable standalone. Real deployments are
//! expected to supply a richer provider.

use resinker_rng::RngStreamHandle;
use serde_json::{Map, Value};

use crate::error::ValuesError;

/// External collaborator supplying realistic string/number values.
pub trait RealisticValueProvider {
    /// Generate a value for `method_path` (e.g. `"person.full_name"`),
    /// drawing randomness only from `rng` so callers stay deterministic.
    /// Unknown paths are a fatal generator error (spec.md §4.3).
    fn generate(
        &self,
        method_path: &str,
        params: &Map<String, Value>,
        rng: &mut RngStreamHandle<'_>,
    ) -> Result<Value, ValuesError>;
}

/// Minimal built-in provider covering `person.*`, `internet.*`, and
/// `company.*` paths using small curated word lists.
#[derive(Debug, Clone, Default)]
pub struct BuiltinProvider;

const FIRST_NAMES: &[&str] = &[
    "Alex", "Brooke", "Casey", "Dana", "Elliot", "Frankie", "Gray", "Harper",
    "Indigo", "Jules", "Kai", "Logan", "Morgan", "Nico", "Oakley", "Parker",
];

const LAST_NAMES: &[&str] = &[
    "Walker", "Chen", "Nguyen", "Patel", "Osei", "Garcia", "Kowalski", "Novak",
    "Silva", "Haddad", "Lindgren", "Abara", "Petrov", "Suzuki", "Brandt", "Okafor",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "mailbox.test", "inbox.example", "mail.test"];

const COMPANY_SUFFIXES: &[&str] = &["Group", "Labs", "Partners", "Collective", "Works", "Studio"];

impl RealisticValueProvider for BuiltinProvider {
    fn generate(
        &self,
        method_path: &str,
        _params: &Map<String, Value>,
        rng: &mut RngStreamHandle<'_>,
    ) -> Result<Value, ValuesError> {
        match method_path {
            "person.first_name" => Ok(Value::String(pick(FIRST_NAMES, rng, "values::faker.person.first_name").to_string())),
            "person.last_name" => Ok(Value::String(pick(LAST_NAMES, rng, "values::faker.person.last_name").to_string())),
            "person.full_name" => {
                let first = pick(FIRST_NAMES, rng, "values::faker.person.full_name.first");
                let last = pick(LAST_NAMES, rng, "values::faker.person.full_name.last");
                Ok(Value::String(format!("{first} {last}")))
            }
            "internet.email" => {
                let first = pick(FIRST_NAMES, rng, "values::faker.internet.email.first");
                let last = pick(LAST_NAMES, rng, "values::faker.internet.email.last");
                let domain = pick(EMAIL_DOMAINS, rng, "values::faker.internet.email.domain");
                let suffix = rng.next_in_range(0, 10_000, "values::faker.internet.email.suffix").unwrap_or(0);
                Ok(Value::String(format!("{}.{}{}@{}", first.to_lowercase(), last.to_lowercase(), suffix, domain)))
            }
            "internet.username" => {
                let first = pick(FIRST_NAMES, rng, "values::faker.internet.username.first");
                let suffix = rng.next_in_range(0, 10_000, "values::faker.internet.username.suffix").unwrap_or(0);
                Ok(Value::String(format!("{}{}", first.to_lowercase(), suffix)))
            }
            "company.name" => {
                let last = pick(LAST_NAMES, rng, "values::faker.company.name.last");
                let suffix = pick(COMPANY_SUFFIXES, rng, "values::faker.company.name.suffix");
                Ok(Value::String(format!("{last} {suffix}")))
            }
            other => Err(ValuesError::UnknownFakerPath(other.to_string())),
        }
    }
}

fn pick<'a>(choices: &'a [&'a str], rng: &mut RngStreamHandle<'_>, callsite: &str) -> &'a str {
    let index = rng.next_in_range(0, choices.len() as u64, callsite).unwrap_or(0);
    choices[index as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use resinker_rng::{RngSubstream, SimRng};

    #[test]
    fn test_known_path_is_deterministic() {
        let provider = BuiltinProvider;
        let params = Map::new();

        let mut rng1 = SimRng::new(7);
        let mut handle1 = rng1.stream(RngSubstream::Generator, 0);
        let a = provider.generate("person.full_name", &params, &mut handle1).unwrap();

        let mut rng2 = SimRng::new(7);
        let mut handle2 = rng2.stream(RngSubstream::Generator, 0);
        let b = provider.generate("person.full_name", &params, &mut handle2).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_path_is_fatal() {
        let provider = BuiltinProvider;
        let params = Map::new();
        let mut rng = SimRng::new(1);
        let mut handle = rng.stream(RngSubstream::Generator, 0);
        let result = provider.generate("geo.latitude", &params, &mut handle);
        assert!(matches!(result, Err(ValuesError::UnknownFakerPath(_))));
    }
}
