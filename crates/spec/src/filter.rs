//! Selection filters (spec.md §3 "Selection filter", §4.4 evaluation semantics).

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Which half of an entity instance a filter clause's field path resolves
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterField {
    /// `payload.<path>` or a bare field name (payload is the default).
    Payload(String),
    /// `state.<name>`.
    State(String),
}

impl FilterField {
    /// Parse a raw field path per spec.md §3: `payload.<path>` or a bare
    /// name resolves against the payload; `state.<name>` resolves against
    /// state attributes.
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("state.") {
            FilterField::State(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("payload.") {
            FilterField::Payload(rest.to_string())
        } else {
            FilterField::Payload(raw.to_string())
        }
    }
}

/// Comparison operator for a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Deep equality.
    Equals,
    /// Deep inequality.
    NotEquals,
    /// Numeric greater-than.
    GreaterThan,
    /// Numeric less-than.
    LessThan,
    /// Numeric greater-than-or-equal.
    GreaterOrEqual,
    /// Numeric less-than-or-equal.
    LessOrEqual,
    /// Membership in an array-valued right-hand side.
    In,
    /// Non-membership in an array-valued right-hand side.
    NotIn,
}

/// A single `{field, operator, value}` clause.
#[derive(Debug, Clone)]
pub struct FilterClause {
    /// Which field to compare.
    pub field: FilterField,
    /// How to compare it.
    pub operator: FilterOperator,
    /// The right-hand side of the comparison.
    pub value: Value,
}

/// A conjunction of filter clauses; an instance satisfies the filter iff it
/// satisfies every clause.
#[derive(Debug, Clone, Default)]
pub struct SelectionFilter {
    /// Clauses, all of which must hold (logical AND).
    pub clauses: Vec<FilterClause>,
}

impl SelectionFilter {
    /// A filter with no clauses, satisfied by every instance.
    pub fn always() -> Self {
        Self { clauses: Vec::new() }
    }
}

#[derive(Deserialize)]
struct RawClause {
    field: String,
    operator: FilterOperator,
    value: Value,
}

impl<'de> Deserialize<'de> for FilterClause {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawClause::deserialize(deserializer)?;
        Ok(FilterClause {
            field: FilterField::parse(&raw.field),
            operator: raw.operator,
            value: raw.value,
        })
    }
}

impl<'de> Deserialize<'de> for SelectionFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let clauses = Vec::<FilterClause>::deserialize(deserializer)?;
        Ok(SelectionFilter { clauses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parsing() {
        assert_eq!(FilterField::parse("state.is_logged_in"), FilterField::State("is_logged_in".to_string()));
        assert_eq!(FilterField::parse("payload.user_id"), FilterField::Payload("user_id".to_string()));
        assert_eq!(FilterField::parse("user_id"), FilterField::Payload("user_id".to_string()));
    }

    #[test]
    fn test_deserialize_filter() {
        let yaml = "- field: state.is_logged_in\n  operator: equals\n  value: false\n";
        let filter: SelectionFilter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(filter.clauses.len(), 1);
        assert_eq!(filter.clauses[0].operator, FilterOperator::Equals);
    }
}
