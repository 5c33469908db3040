//! Compile a JSON filter tree into a backend predicate string (§4.B).

use crate::error::{DssError, Result};
use crate::filter::fields;
use crate::filter::visitor::{self, FilterVisitor};
use crate::store::{escape_identifier, escape_literal};
use serde_json::Value;

const COMPARATOR_OPERATORS: &[&str] = &[
    "$NE", "$GT", "$GTE", "$LT", "$LTE", "$LIKE", "$REGEXP", "$INJSON", "$KVINJSON", "$XJSON",
];

/// Compile `filter` into a predicate string safe to splice into a `WHERE`
/// clause. Field names are resolved through [`fields::resolve`] and
/// scalar values are escaped through the Store's literal escaping.
pub fn compile(filter: &Value) -> Result<String> {
    let mut compiler = Compiler::default();
    visitor::walk(filter, &mut compiler)?;
    compiler
        .result
        .ok_or_else(|| DssError::invalid_filter("empty filter tree"))
}

#[derive(Default)]
struct Compiler {
    frames: Vec<Vec<String>>,
    result: Option<String>,
}

impl Compiler {
    /// Push `fragment` onto the frame that was active before the one we
    /// just finished, or store it as the final result if none remain.
    fn bubble_up(&mut self, fragment: String) {
        match self.frames.last_mut() {
            Some(frame) => frame.push(fragment),
            None => self.result = Some(fragment),
        }
    }
}

impl FilterVisitor for Compiler {
    fn object_begin(&mut self, _ctx: &[String]) -> Result<()> {
        self.frames.push(Vec::new());
        Ok(())
    }

    fn object_end(&mut self, ctx: &[String]) -> Result<()> {
        let frame = self.frames.pop().expect("object_begin/object_end balanced");
        let joined = match ctx.last().map(String::as_str) {
            Some("$NOT") => format!("NOT ({})", join(&frame, "AND")),
            _ if frame.len() > 1 => format!("({})", join(&frame, "AND")),
            _ => frame.into_iter().next().unwrap_or_default(),
        };
        self.bubble_up(joined);
        Ok(())
    }

    fn array_begin(&mut self, _ctx: &[String]) -> Result<()> {
        self.frames.push(Vec::new());
        Ok(())
    }

    fn array_end(&mut self, ctx: &[String]) -> Result<()> {
        let frame = self.frames.pop().expect("array_begin/array_end balanced");
        let joined = match ctx.last().map(String::as_str) {
            Some("$AND") => format!("({})", join(&frame, "AND")),
            Some("$OR") => format!("({})", join(&frame, "OR")),
            Some("$NOR") => format!("NOT ({})", join(&frame, "OR")),
            other => {
                return Err(DssError::invalid_filter(format!(
                    "operator {other:?} does not take an array"
                )))
            }
        };
        self.bubble_up(joined);
        Ok(())
    }

    fn field(&mut self, ctx: &[String], key: &str, value: &Value) -> Result<()> {
        let internal = fields::resolve(key)
            .ok_or_else(|| DssError::invalid_field(format!("unknown field {key}")))?;
        let snippet = match ctx.last().map(String::as_str) {
            Some(op) if COMPARATOR_OPERATORS.contains(&op) => emit_comparator(op, internal, value)?,
            _ => format!("{} = {}", escape_identifier(internal), escape_scalar(value)?),
        };
        self.frames
            .last_mut()
            .expect("field always called within an open object frame")
            .push(snippet);
        Ok(())
    }
}

fn join(fragments: &[String], sep: &str) -> String {
    fragments.join(&format!(" {sep} "))
}

fn emit_comparator(op: &str, field: &str, value: &Value) -> Result<String> {
    let f = escape_identifier(field);
    match op {
        "$NE" => Ok(format!("{f} <> {}", escape_scalar(value)?)),
        "$GT" => Ok(format!("{f} > {}", escape_scalar(value)?)),
        "$GTE" => Ok(format!("{f} >= {}", escape_scalar(value)?)),
        "$LT" => Ok(format!("{f} < {}", escape_scalar(value)?)),
        "$LTE" => Ok(format!("{f} <= {}", escape_scalar(value)?)),
        "$LIKE" => Ok(format!("{f} LIKE {}", escape_scalar(value)?)),
        "$REGEXP" => Ok(format!("{f} ~ {}", escape_scalar(value)?)),
        "$INJSON" => Ok(format!("{f} @> array[{}]", escape_scalar(value)?)),
        "$KVINJSON" => {
            let kv = value
                .as_str()
                .ok_or_else(|| DssError::invalid_data("$KVINJSON value must be a \"k=v\" string"))?;
            let (k, v) = kv
                .split_once('=')
                .ok_or_else(|| DssError::invalid_data("$KVINJSON value must contain '='"))?;
            let json_literal = format!("{{\"{k}\":\"{v}\"}}");
            Ok(format!("{f} @> {}", escape_literal(Some(&json_literal))))
        }
        "$XJSON" => Ok(format!("{f} ? {}", escape_scalar(value)?)),
        other => Err(DssError::invalid_filter(format!("unsupported comparator {other}"))),
    }
}

fn escape_scalar(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(escape_literal(Some(s))),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("NULL".to_string()),
        other => Err(DssError::invalid_data(format!(
            "unsupported filter value {other}"
        ))),
    }
}
