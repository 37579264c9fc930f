//! Selection-filter evaluation against an [`EntityInstance`] (spec.md §4.4).

use resinker_spec::{FilterClause, FilterField, FilterOperator, SelectionFilter};
use serde_json::Value;

use crate::instance::read_path;
use crate::EntityInstance;

/// Whether `instance` satisfies every clause of `filter` (logical AND).
///
/// Type mismatches during a single clause's evaluation are not fatal: the
/// clause simply fails, per spec.md §4.4.
pub fn matches(instance: &EntityInstance, filter: &SelectionFilter) -> bool {
    filter.clauses.iter().all(|clause| matches_clause(instance, clause))
}

fn matches_clause(instance: &EntityInstance, clause: &FilterClause) -> bool {
    let lhs = match &clause.field {
        FilterField::Payload(path) => read_path(&Value::Object(instance.payload.clone()), path),
        FilterField::State(name) => instance.state.get(name).cloned(),
    };

    let Some(lhs) = lhs else { return false };
    evaluate_operator(&lhs, clause.operator, &clause.value)
}

fn evaluate_operator(lhs: &Value, operator: FilterOperator, rhs: &Value) -> bool {
    match operator {
        FilterOperator::Equals => lhs == rhs,
        FilterOperator::NotEquals => lhs != rhs,
        FilterOperator::GreaterThan => numeric_cmp(lhs, rhs).map(|o| o.is_gt()).unwrap_or(false),
        FilterOperator::LessThan => numeric_cmp(lhs, rhs).map(|o| o.is_lt()).unwrap_or(false),
        FilterOperator::GreaterOrEqual => numeric_cmp(lhs, rhs).map(|o| o.is_ge()).unwrap_or(false),
        FilterOperator::LessOrEqual => numeric_cmp(lhs, rhs).map(|o| o.is_le()).unwrap_or(false),
        FilterOperator::In => rhs.as_array().map(|arr| arr.contains(lhs)).unwrap_or(false),
        FilterOperator::NotIn => rhs.as_array().map(|arr| !arr.contains(lhs)).unwrap_or(false),
    }
}

fn numeric_cmp(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    let l = lhs.as_f64()?;
    let r = rhs.as_f64()?;
    l.partial_cmp(&r)
}
