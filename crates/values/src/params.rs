//! Small accessors over a generator's `params` map, all erroring with a
//! uniform [`ValuesError::InvalidParam`] on absence or type mismatch.

use serde_json::{Map, Value};

use crate::error::ValuesError;

pub fn f64_param(params: &Map<String, Value>, generator: &str, name: &str) -> Result<f64, ValuesError> {
    params
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid(generator, name))
}

pub fn opt_f64_param(params: &Map<String, Value>, name: &str) -> Option<f64> {
    params.get(name).and_then(Value::as_f64)
}

pub fn u64_param(params: &Map<String, Value>, generator: &str, name: &str) -> Result<u64, ValuesError> {
    params
        .get(name)
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid(generator, name))
}

pub fn str_param<'a>(params: &'a Map<String, Value>, generator: &str, name: &str) -> Result<&'a str, ValuesError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(generator, name))
}

pub fn array_param<'a>(params: &'a Map<String, Value>, generator: &str, name: &str) -> Result<&'a Vec<Value>, ValuesError> {
    params
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(generator, name))
}

fn invalid(generator: &str, param: &str) -> ValuesError {
    ValuesError::InvalidParam {
        generator: generator.to_string(),
        param: param.to_string(),
    }
}
