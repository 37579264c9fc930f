//! The generator interpreter (spec.md §4.3): evaluates a [`SchemaNode`]
//! against a [`RenderContext`] to produce a JSON value.

use indexmap::IndexMap;
use resinker_deterministic::SimClock;
use resinker_rng::{RngSubstream, SimRng};
use resinker_spec::{ArrayNode, ObjectNode, PrimitiveKind, PrimitiveNode, SchemaNode};
use serde_json::{Map, Number, Value};
use uuid::{Builder, Uuid};

use crate::binding::Binding;
use crate::error::ValuesError;
use crate::expression::Expr;
use crate::params;
use crate::provider::RealisticValueProvider;

const ALPHANUMERIC_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Everything the interpreter needs to evaluate one schema node: the clock
/// (read-only, for `current_timestamp`), the PRNG (mutable, every draw is
/// audit-logged), the active binding (for `from_entity`), the realistic
/// -value provider, and the full schema registry (for resolving `$ref`).
pub struct RenderContext<'a> {
    /// Synthetic simulation clock.
    pub clock: &'a SimClock,
    /// Central PRNG authority; every draw is routed through its
    /// `generator` sub-stream and audit-logged.
    pub rng: &'a mut SimRng,
    /// Entities bound for this event's generation.
    pub binding: &'a Binding,
    /// External realistic-value provider for `faker.*` generators.
    pub provider: &'a dyn RealisticValueProvider,
    /// Full named-schema registry, for `$ref` resolution.
    pub schemas: &'a IndexMap<String, SchemaNode>,
}

/// Evaluate a top-level schema node (normally an [`SchemaNode::Object`]
/// naming an event's `payload_schema`) into a JSON value.
pub fn generate(node: &SchemaNode, ctx: &mut RenderContext<'_>) -> Result<Value, ValuesError> {
    let empty = Map::new();
    generate_field(node, ctx, &empty)
}

fn generate_field(node: &SchemaNode, ctx: &mut RenderContext<'_>, partial: &Map<String, Value>) -> Result<Value, ValuesError> {
    let modifiers = node.modifiers();

    // Modifier 1: from_entity + field, late-bound against the active binding.
    if let (Some(entity_ref), Some(field)) = (&modifiers.from_entity, &modifiers.field) {
        let instance = ctx.binding.resolve(entity_ref)?;
        return Ok(instance.read_field(field).unwrap_or(Value::Null));
    }

    // Modifier 2: $ref, resolved against the schema registry. The
    // referenced node's own modifiers (including its own from_entity) are
    // then evaluated as if it were written in place.
    if let SchemaNode::Ref(r) = node {
        let target = ctx
            .schemas
            .get(&r.reference)
            .ok_or_else(|| ValuesError::UnknownSchemaReference(r.reference.clone()))?;
        return generate_field(target, ctx, partial);
    }

    // Modifier 3: nullable_probability coin flip.
    if let Some(p) = modifiers.nullable_probability {
        if p > 0.0 {
            let draw = ctx.rng.stream(RngSubstream::Generator, 0).next_f64("values::nullable");
            if draw < p {
                return Ok(Value::Null);
            }
        }
    }

    // Modifier 4/5: invoke the node's generator, then round per precision.
    match node {
        SchemaNode::Primitive(p) => generate_primitive(p, ctx, partial),
        SchemaNode::Object(o) => Ok(Value::Object(generate_object(o, ctx, partial)?)),
        SchemaNode::Array(a) => generate_array(a, ctx, partial),
        SchemaNode::Ref(_) => unreachable!("refs are resolved above"),
    }
}

fn generate_object(node: &ObjectNode, ctx: &mut RenderContext<'_>, outer: &Map<String, Value>) -> Result<Map<String, Value>, ValuesError> {
    let mut partial = Map::new();
    // Nested objects can still see the enclosing object's fields (e.g. a
    // derived field one level down referencing a sibling of its parent)
    // alongside their own siblings, by starting from the outer partial.
    for (key, value) in outer {
        partial.insert(key.clone(), value.clone());
    }
    for (name, child) in &node.properties {
        let value = generate_field(child, ctx, &partial)?;
        partial.insert(name.clone(), value);
    }
    // Strip inherited outer keys before returning this object's own shape.
    let mut result = Map::new();
    for name in node.properties.keys() {
        if let Some(value) = partial.get(name) {
            result.insert(name.clone(), value.clone());
        }
    }
    Ok(result)
}

fn generate_array(node: &ArrayNode, ctx: &mut RenderContext<'_>, partial: &Map<String, Value>) -> Result<Value, ValuesError> {
    let count = if node.max_items <= node.min_items {
        node.min_items
    } else {
        let span = (node.max_items - node.min_items + 1) as u64;
        let draw = ctx
            .rng
            .stream(RngSubstream::Generator, 0)
            .next_in_range(0, span, "values::array_count")
            .unwrap_or(0);
        node.min_items + draw as usize
    };

    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(generate_field(&node.items, ctx, partial)?);
    }
    Ok(Value::Array(items))
}

fn generate_primitive(node: &PrimitiveNode, ctx: &mut RenderContext<'_>, partial: &Map<String, Value>) -> Result<Value, ValuesError> {
    let Some(generator_name) = node.generator.as_deref() else {
        return Ok(default_for_kind(node.kind));
    };

    let value = invoke_generator(generator_name, &node.params, ctx, partial)?;
    apply_precision(value, node.precision.or_else(|| params::opt_f64_param(&node.params, "precision").map(|p| p as u32)))
}

fn default_for_kind(kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::String => Value::String(String::new()),
        PrimitiveKind::Number => Value::Number(Number::from_f64(0.0).unwrap()),
        PrimitiveKind::Integer => Value::Number(Number::from(0)),
        PrimitiveKind::Boolean => Value::Bool(false),
    }
}

fn invoke_generator(
    name: &str,
    node_params: &Map<String, Value>,
    ctx: &mut RenderContext<'_>,
    partial: &Map<String, Value>,
) -> Result<Value, ValuesError> {
    if let Some(method_path) = name.strip_prefix("faker.") {
        let mut handle = ctx.rng.stream(RngSubstream::Generator, 0);
        return ctx.provider.generate(method_path, node_params, &mut handle);
    }

    match name {
        "uuid_v4" => Ok(Value::String(generate_uuid_v4(ctx))),
        "random_int" => generate_random_int(node_params, ctx),
        "random_float" => generate_random_float(node_params, ctx),
        "random_alphanumeric" => generate_random_alphanumeric(node_params, ctx),
        "choice" => generate_choice(node_params, ctx),
        "current_timestamp" => Ok(Value::String(ctx.clock.now_iso8601())),
        "static" => Ok(node_params.get("value").cloned().unwrap_or(Value::Null)),
        "static_hashed" => generate_static_hashed(node_params, ctx, partial),
        "derived" => generate_derived(node_params, partial),
        "conditional_choice" => generate_conditional_choice(node_params, ctx, partial),
        other => Err(ValuesError::UnknownGenerator(other.to_string())),
    }
}

fn generate_uuid_v4(ctx: &mut RenderContext<'_>) -> String {
    let mut stream = ctx.rng.stream(RngSubstream::Generator, 0);
    let hi = stream.next_u64("values::uuid_v4.hi");
    let lo = stream.next_u64("values::uuid_v4.lo");
    let mut bytes = [0u8; 16];
    bytes[0..8].copy_from_slice(&hi.to_le_bytes());
    bytes[8..16].copy_from_slice(&lo.to_le_bytes());
    let uuid: Uuid = Builder::from_random_bytes(bytes).into_uuid();
    uuid.to_string()
}

fn generate_random_int(node_params: &Map<String, Value>, ctx: &mut RenderContext<'_>) -> Result<Value, ValuesError> {
    let min = params::f64_param(node_params, "random_int", "min")? as i64;
    let max = params::f64_param(node_params, "random_int", "max")? as i64;
    if max < min {
        return Err(ValuesError::InvalidParam { generator: "random_int".to_string(), param: "max".to_string() });
    }
    let span = (max - min + 1) as u64;
    let draw = ctx
        .rng
        .stream(RngSubstream::Generator, 0)
        .next_in_range(0, span, "values::random_int")
        .unwrap_or(0) as i64;
    Ok(Value::Number(Number::from(min + draw)))
}

fn generate_random_float(node_params: &Map<String, Value>, ctx: &mut RenderContext<'_>) -> Result<Value, ValuesError> {
    let min = params::f64_param(node_params, "random_float", "min")?;
    let max = params::f64_param(node_params, "random_float", "max")?;
    let draw = ctx.rng.stream(RngSubstream::Generator, 0).next_f64("values::random_float");
    let value = min + draw * (max - min);
    Ok(Value::Number(Number::from_f64(value).unwrap_or(Number::from(0))))
}

fn generate_random_alphanumeric(node_params: &Map<String, Value>, ctx: &mut RenderContext<'_>) -> Result<Value, ValuesError> {
    let length = params::u64_param(node_params, "random_alphanumeric", "length")? as usize;
    let mut stream = ctx.rng.stream(RngSubstream::Generator, 0);
    let mut out = String::with_capacity(length);
    for _ in 0..length {
        let idx = stream.next_in_range(0, ALPHANUMERIC_CHARSET.len() as u64, "values::random_alphanumeric").unwrap_or(0);
        out.push(ALPHANUMERIC_CHARSET[idx as usize] as char);
    }
    Ok(Value::String(out))
}

fn generate_choice(node_params: &Map<String, Value>, ctx: &mut RenderContext<'_>) -> Result<Value, ValuesError> {
    let choices = params::array_param(node_params, "choice", "choices")?;
    if choices.is_empty() {
        return Err(ValuesError::InvalidParam { generator: "choice".to_string(), param: "choices".to_string() });
    }
    let weights: Option<Vec<f64>> = node_params
        .get("weights")
        .and_then(Value::as_array)
        .map(|w| w.iter().filter_map(Value::as_f64).collect());

    let index = match weights {
        Some(ref weights) if weights.len() == choices.len() => {
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                return Err(ValuesError::NonPositiveWeights);
            }
            let draw = ctx.rng.stream(RngSubstream::Generator, 0).next_f64("values::choice.weighted") * total;
            let mut cumulative = 0.0;
            let mut chosen = choices.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                cumulative += w;
                if draw < cumulative {
                    chosen = i;
                    break;
                }
            }
            chosen
        }
        _ => ctx
            .rng
            .stream(RngSubstream::Generator, 0)
            .next_in_range(0, choices.len() as u64, "values::choice.uniform")
            .unwrap_or(0) as usize,
    };

    Ok(choices[index].clone())
}

fn generate_static_hashed(node_params: &Map<String, Value>, ctx: &mut RenderContext<'_>, partial: &Map<String, Value>) -> Result<Value, ValuesError> {
    let algorithm = params::str_param(node_params, "static_hashed", "algorithm")?;
    let raw_source = node_params
        .get("raw_value_source")
        .ok_or_else(|| ValuesError::InvalidParam { generator: "static_hashed".to_string(), param: "raw_value_source".to_string() })?;
    let nested: SchemaNode = serde_json::from_value(raw_source.clone())
        .map_err(|_| ValuesError::InvalidParam { generator: "static_hashed".to_string(), param: "raw_value_source".to_string() })?;
    let raw_value = generate_field(&nested, ctx, partial)?;
    let raw_string = match &raw_value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    match algorithm {
        "bcrypt" => {
            let hashed = bcrypt::hash(&raw_string, bcrypt::DEFAULT_COST)
                .map_err(|e| ValuesError::HashingFailed(e.to_string()))?;
            Ok(Value::String(hashed))
        }
        "sha256" => {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(raw_string.as_bytes());
            Ok(Value::String(hex::encode(hasher.finalize())))
        }
        other => Err(ValuesError::UnsupportedHashAlgorithm(other.to_string())),
    }
}

fn generate_derived(node_params: &Map<String, Value>, partial: &Map<String, Value>) -> Result<Value, ValuesError> {
    let expression = params::str_param(node_params, "derived", "expression")?;
    let expr = Expr::parse(expression)?;
    let value = expr.eval(partial)?;
    Ok(Value::Number(Number::from_f64(value).unwrap_or(Number::from(0))))
}

fn generate_conditional_choice(node_params: &Map<String, Value>, ctx: &mut RenderContext<'_>, partial: &Map<String, Value>) -> Result<Value, ValuesError> {
    let condition_field = params::str_param(node_params, "conditional_choice", "condition_field")?;
    let condition_value = partial
        .get(condition_field)
        .ok_or_else(|| ValuesError::UnknownConditionField(condition_field.to_string()))?;
    let cases = params::array_param(node_params, "conditional_choice", "cases")?;

    let mut default_case: Option<&Map<String, Value>> = None;
    for case in cases {
        let case_obj = case.as_object().ok_or_else(|| ValuesError::InvalidParam {
            generator: "conditional_choice".to_string(),
            param: "cases".to_string(),
        })?;
        if case_obj.get("default").and_then(Value::as_bool).unwrap_or(false) {
            default_case = Some(case_obj);
            continue;
        }
        if case_matches(case_obj, condition_value) {
            return generate_choice(case_obj, ctx);
        }
    }
    match default_case {
        Some(case_obj) => generate_choice(case_obj, ctx),
        None => Err(ValuesError::InvalidParam {
            generator: "conditional_choice".to_string(),
            param: "cases".to_string(),
        }),
    }
}

fn case_matches(case: &Map<String, Value>, condition_value: &Value) -> bool {
    let lhs = condition_value.as_f64();
    if let Some(threshold) = case.get("condition_value_greater_than").and_then(Value::as_f64) {
        return lhs.map(|l| l > threshold).unwrap_or(false);
    }
    if let Some(threshold) = case.get("condition_value_less_than").and_then(Value::as_f64) {
        return lhs.map(|l| l < threshold).unwrap_or(false);
    }
    if let Some(threshold) = case.get("condition_value_greater_or_equal").and_then(Value::as_f64) {
        return lhs.map(|l| l >= threshold).unwrap_or(false);
    }
    if let Some(threshold) = case.get("condition_value_less_or_equal").and_then(Value::as_f64) {
        return lhs.map(|l| l <= threshold).unwrap_or(false);
    }
    if let Some(expected) = case.get("equals") {
        return condition_value == expected;
    }
    false
}

fn apply_precision(value: Value, precision: Option<u32>) -> Result<Value, ValuesError> {
    let Some(precision) = precision else { return Ok(value) };
    match value {
        Value::Number(n) => {
            let f = n.as_f64().ok_or(ValuesError::PrecisionOnNonNumber)?;
            let factor = 10f64.powi(precision as i32);
            let rounded = (f * factor).round() / factor;
            Ok(Value::Number(Number::from_f64(rounded).unwrap_or(n)))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BuiltinProvider;
    use resinker_deterministic::SimClock;
    use resinker_rng::SimRng;

    fn epoch_clock() -> SimClock {
        let start = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc);
        SimClock::new(start, 1.0)
    }

    fn ctx<'a>(rng: &'a mut SimRng, clock: &'a SimClock, binding: &'a Binding, provider: &'a BuiltinProvider, schemas: &'a IndexMap<String, SchemaNode>) -> RenderContext<'a> {
        RenderContext { clock, rng, binding, provider, schemas }
    }

    #[test]
    fn test_static_generator() {
        let node: SchemaNode = serde_yaml::from_str("type: string\ngenerator: static\nparams:\n  value: hello\n").unwrap();
        let mut rng = SimRng::new(1);
        let clock = epoch_clock();
        let binding = Binding::new();
        let provider = BuiltinProvider;
        let schemas = IndexMap::new();
        let mut c = ctx(&mut rng, &clock, &binding, &provider, &schemas);
        let value = generate(&node, &mut c).unwrap();
        assert_eq!(value, Value::String("hello".to_string()));
    }

    #[test]
    fn test_derived_total_amount_matches_s4() {
        // A single array-item schema applies one shared item shape to every
        // element (generator.rs::generate_array), so a heterogeneous
        // two-item cart — quantity 2 @ $10.00 and quantity 1 @ $5.50 — is
        // expressed as four scalar sibling fields instead, summed by a
        // plain arithmetic `derived` expression rather than the
        // sum(item[...] for item in ...) aggregate form.
        let yaml = "\
type: object
properties:
  quantity_1:
    type: integer
    generator: static
    params:
      value: 2
  unit_price_1:
    type: number
    generator: static
    params:
      value: 10.00
  quantity_2:
    type: integer
    generator: static
    params:
      value: 1
  unit_price_2:
    type: number
    generator: static
    params:
      value: 5.50
  total_amount:
    type: number
    generator: derived
    precision: 2
    params:
      expression: \"quantity_1 * unit_price_1 + quantity_2 * unit_price_2\"
";
        let node: SchemaNode = serde_yaml::from_str(yaml).unwrap();
        let mut rng = SimRng::new(42);
        let clock = epoch_clock();
        let binding = Binding::new();
        let provider = BuiltinProvider;
        let schemas = IndexMap::new();
        let mut c = ctx(&mut rng, &clock, &binding, &provider, &schemas);
        let value = generate(&node, &mut c).unwrap();
        let total = value.get("total_amount").unwrap().as_f64().unwrap();
        assert!((total - 25.50).abs() < 1e-9);
    }

    #[test]
    fn test_nullable_probability_one_always_null() {
        let node: SchemaNode = serde_yaml::from_str("type: string\ngenerator: uuid_v4\nnullable_probability: 1.0\n").unwrap();
        let mut rng = SimRng::new(9);
        let clock = epoch_clock();
        let binding = Binding::new();
        let provider = BuiltinProvider;
        let schemas = IndexMap::new();
        let mut c = ctx(&mut rng, &clock, &binding, &provider, &schemas);
        let value = generate(&node, &mut c).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_determinism_same_seed_same_output() {
        let node: SchemaNode = serde_yaml::from_str("type: integer\ngenerator: random_int\nparams:\n  min: 1\n  max: 1000000\n").unwrap();
        let clock = epoch_clock();
        let binding = Binding::new();
        let provider = BuiltinProvider;
        let schemas = IndexMap::new();

        let mut rng1 = SimRng::new(77);
        let mut c1 = ctx(&mut rng1, &clock, &binding, &provider, &schemas);
        let a = generate(&node, &mut c1).unwrap();

        let mut rng2 = SimRng::new(77);
        let mut c2 = ctx(&mut rng2, &clock, &binding, &provider, &schemas);
        let b = generate(&node, &mut c2).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_generator_is_fatal() {
        let node: SchemaNode = serde_yaml::from_str("type: string\ngenerator: not_a_real_generator\n").unwrap();
        let mut rng = SimRng::new(1);
        let clock = epoch_clock();
        let binding = Binding::new();
        let provider = BuiltinProvider;
        let schemas = IndexMap::new();
        let mut c = ctx(&mut rng, &clock, &binding, &provider, &schemas);
        let result = generate(&node, &mut c);
        assert!(matches!(result, Err(ValuesError::UnknownGenerator(_))));
    }
}
