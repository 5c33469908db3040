//! Reference interpreter for the round-trip law used in integration tests:
//! for a fixed record, `interpret(filter, record) == (compiled_sql_matches_row)`.
//!
//! Not part of the public API. Evaluates a filter tree directly against an
//! in-memory field map instead of compiling SQL, so tests can assert the
//! compiler's output selects the same rows the interpreter would accept
//! without standing up a backend for every case.

#![cfg(test)]

use crate::error::{DssError, Result};
use crate::filter::fields;
use serde_json::Value;
use std::collections::HashMap;

/// A single row, keyed by internal column name (post-[`fields::resolve`]).
pub type Record<'a> = HashMap<&'a str, Value>;

pub fn interpret(filter: &Value, record: &Record) -> Result<bool> {
    eval_object(
        filter
            .as_object()
            .ok_or_else(|| DssError::invalid_filter("filter root must be a JSON object"))?,
        record,
    )
}

fn eval_object(obj: &serde_json::Map<String, Value>, record: &Record) -> Result<bool> {
    for (key, value) in obj {
        let matched = if let Some(op) = key.strip_prefix('$') {
            eval_operator(&format!("${op}"), value, record)?
        } else {
            eval_field(key, value, record)?
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_operator(op: &str, value: &Value, record: &Record) -> Result<bool> {
    match op {
        "$AND" => eval_array(value, record, |results| results.iter().all(|b| *b)),
        "$OR" => eval_array(value, record, |results| results.iter().any(|b| *b)),
        "$NOR" => eval_array(value, record, |results| !results.iter().any(|b| *b)),
        "$NOT" => {
            let inner = value
                .as_object()
                .ok_or_else(|| DssError::invalid_filter("$NOT expects an object"))?;
            Ok(!eval_object(inner, record)?)
        }
        _ => {
            let inner = value
                .as_object()
                .ok_or_else(|| DssError::invalid_filter("comparator expects a field object"))?;
            for (field, operand) in inner {
                if !eval_comparator(op, field, operand, record)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

fn eval_array(value: &Value, record: &Record, combine: impl Fn(&[bool]) -> bool) -> Result<bool> {
    let items = value
        .as_array()
        .ok_or_else(|| DssError::invalid_filter("operator expects an array"))?;
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let obj = item
            .as_object()
            .ok_or_else(|| DssError::invalid_filter("array clause must be a JSON object"))?;
        results.push(eval_object(obj, record)?);
    }
    Ok(combine(&results))
}

fn eval_field(key: &str, value: &Value, record: &Record) -> Result<bool> {
    let internal = fields::resolve(key)
        .ok_or_else(|| DssError::invalid_field(format!("unknown field {key}")))?;
    Ok(record.get(internal) == Some(value))
}

fn eval_comparator(op: &str, key: &str, operand: &Value, record: &Record) -> Result<bool> {
    let internal = fields::resolve(key)
        .ok_or_else(|| DssError::invalid_field(format!("unknown field {key}")))?;
    let actual = record.get(internal);
    let ordering = actual.and_then(|a| compare(a, operand));
    match op {
        "$NE" => Ok(actual != Some(operand)),
        "$GT" => Ok(ordering == Some(std::cmp::Ordering::Greater)),
        "$GTE" => Ok(matches!(
            ordering,
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        )),
        "$LT" => Ok(ordering == Some(std::cmp::Ordering::Less)),
        "$LTE" => Ok(matches!(
            ordering,
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        )),
        "$LIKE" => {
            let pattern = operand.as_str().unwrap_or_default();
            let actual_str = actual.and_then(Value::as_str).unwrap_or_default();
            Ok(sql_like(actual_str, pattern))
        }
        _ => Err(DssError::invalid_filter(format!(
            "interpreter does not support {op}"
        ))),
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Minimal `%`/`_` matcher, enough for the round-trip tests.
fn sql_like(text: &str, pattern: &str) -> bool {
    let regex_src = pattern
        .replace('.', "\\.")
        .replace('%', ".*")
        .replace('_', ".");
    regex::Regex::new(&format!("^{regex_src}$"))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record<'static> {
        HashMap::from([("oid", json!("x")), ("version", json!(2))])
    }

    #[test]
    fn equality_and_and_combine() {
        let filter = json!({"$AND": [{"DSS::OBJ::oid": "x"}, {"$GT": {"DSS::OBJ::version": 1}}]});
        assert!(interpret(&filter, &record()).unwrap());
    }

    #[test]
    fn not_negates() {
        let filter = json!({"$NOT": {"DSS::OBJ::oid": "x"}});
        assert!(!interpret(&filter, &record()).unwrap());
    }

    #[test]
    fn mismatched_value_fails() {
        let filter = json!({"DSS::OBJ::oid": "y"});
        assert!(!interpret(&filter, &record()).unwrap());
    }
}
