//! The stream visitor that drives filter compilation (§4.B).
//!
//! A depth-first walk over the JSON expression tree emits callbacks on
//! object-begin, object-end, array-begin, array-element (with index), and
//! array-end, while maintaining a stack of contextual operator keys
//! (`$`-prefixed keys). Non-`$` keys are field identifiers, handled by the
//! visitor's [`FilterVisitor::field`] hook rather than further descent — a
//! field's value is always a leaf (scalar) or, for `$INJSON`/`$KVINJSON`,
//! a scalar carrying an encoded composite. A non-`Ok` return from any
//! callback aborts the walk and is propagated to the caller, per the
//! specification's callback-abort contract.
//!
//! Grounded on §9's redesign note: "Recursive JSON traversal via callbacks
//! with per-visit allocation — implement as an explicit visitor with an
//! operator stack; emit to a string builder owned by the caller." The
//! teacher has no direct precedent for a JSON tree visitor (its JSON use
//! is mostly flat `serde_json::Value` construction/inspection, e.g.
//! `core/broker.rs`'s envelope building); this module is new, built to
//! the specification's own description of the required shape.

use crate::error::{DssError, Result};
use serde_json::{Map, Value};

/// Callbacks fired while walking a filter expression tree. `ctx` is the
/// current stack of active `$`-operator keys, outermost first; the
/// operator whose value is currently being visited is always `ctx.last()`
/// inside that value's callbacks.
pub trait FilterVisitor {
    fn object_begin(&mut self, _ctx: &[String]) -> Result<()> {
        Ok(())
    }
    fn object_end(&mut self, _ctx: &[String]) -> Result<()> {
        Ok(())
    }
    fn array_begin(&mut self, _ctx: &[String]) -> Result<()> {
        Ok(())
    }
    fn array_element(&mut self, _ctx: &[String], _index: usize) -> Result<()> {
        Ok(())
    }
    fn array_end(&mut self, _ctx: &[String]) -> Result<()> {
        Ok(())
    }
    /// A non-`$` key: `key` is a field identifier, `value` its operand.
    fn field(&mut self, ctx: &[String], key: &str, value: &Value) -> Result<()>;
}

const KNOWN_OPERATORS: &[&str] = &[
    "$AND", "$OR", "$NOR", "$NOT", "$NE", "$GT", "$GTE", "$LT", "$LTE", "$LIKE", "$REGEXP",
    "$INJSON", "$KVINJSON", "$XJSON",
];

/// Entry point: walk `root`, which must be a JSON object, firing callbacks
/// on `visitor`.
pub fn walk(root: &Value, visitor: &mut dyn FilterVisitor) -> Result<()> {
    let obj = root
        .as_object()
        .ok_or_else(|| DssError::invalid_filter("filter root must be a JSON object"))?;
    let mut stack: Vec<String> = Vec::new();
    walk_object(obj, visitor, &mut stack)
}

fn walk_object(obj: &Map<String, Value>, visitor: &mut dyn FilterVisitor, stack: &mut Vec<String>) -> Result<()> {
    visitor.object_begin(stack)?;
    for (key, value) in obj {
        if let Some(op) = key.strip_prefix('$') {
            let op_key = format!("${op}");
            if !KNOWN_OPERATORS.contains(&op_key.as_str()) {
                return Err(DssError::invalid_filter(format!("unrecognized operator {op_key}")));
            }
            stack.push(op_key);
            walk_operator_value(value, visitor, stack)?;
            stack.pop();
        } else {
            visitor.field(stack, key, value)?;
        }
    }
    visitor.object_end(stack)?;
    Ok(())
}

fn walk_operator_value(value: &Value, visitor: &mut dyn FilterVisitor, stack: &mut Vec<String>) -> Result<()> {
    match value {
        Value::Array(items) => {
            visitor.array_begin(stack)?;
            for (index, item) in items.iter().enumerate() {
                visitor.array_element(stack, index)?;
                let inner = item
                    .as_object()
                    .ok_or_else(|| DssError::invalid_filter("array clause must be a JSON object"))?;
                walk_object(inner, visitor, stack)?;
            }
            visitor.array_end(stack)?;
            Ok(())
        }
        Value::Object(inner) => walk_object(inner, visitor, stack),
        _ => Err(DssError::invalid_filter(
            "operator value must be a JSON object or array",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Recorder(Vec<String>);
    impl FilterVisitor for Recorder {
        fn object_begin(&mut self, ctx: &[String]) -> Result<()> {
            self.0.push(format!("obj-begin{ctx:?}"));
            Ok(())
        }
        fn object_end(&mut self, ctx: &[String]) -> Result<()> {
            self.0.push(format!("obj-end{ctx:?}"));
            Ok(())
        }
        fn array_begin(&mut self, ctx: &[String]) -> Result<()> {
            self.0.push(format!("arr-begin{ctx:?}"));
            Ok(())
        }
        fn array_element(&mut self, ctx: &[String], index: usize) -> Result<()> {
            self.0.push(format!("arr-elem{ctx:?}#{index}"));
            Ok(())
        }
        fn array_end(&mut self, ctx: &[String]) -> Result<()> {
            self.0.push(format!("arr-end{ctx:?}"));
            Ok(())
        }
        fn field(&mut self, ctx: &[String], key: &str, _value: &Value) -> Result<()> {
            self.0.push(format!("field{ctx:?}:{key}"));
            Ok(())
        }
    }

    #[test]
    fn abort_propagates_from_any_callback() {
        struct Aborts;
        impl FilterVisitor for Aborts {
            fn object_begin(&mut self, _ctx: &[String]) -> Result<()> {
                Err(DssError::invalid_filter("nope"))
            }
            fn field(&mut self, _ctx: &[String], _key: &str, _value: &Value) -> Result<()> {
                Ok(())
            }
        }
        let mut v = Aborts;
        assert!(walk(&json!({"DSS::OBJ::oid": "x"}), &mut v).is_err());
    }

    #[test]
    fn unknown_operator_fails_invalid_filter() {
        let mut v = Recorder(Vec::new());
        let err = walk(&json!({"$BOGUS": []}), &mut v).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidFilter);
    }

    #[test]
    fn stack_pushes_and_pops_operator_keys() {
        let mut v = Recorder(Vec::new());
        walk(
            &json!({"$AND": [{"DSS::OBJ::oid": "x"}, {"$GT": {"DSS::OBJ::version": 1}}]}),
            &mut v,
        )
        .unwrap();
        assert!(v.0.contains(&"field[\"$AND\"]:DSS::OBJ::oid".to_string()));
        assert!(v.0.contains(&"field[\"$AND\", \"$GT\"]:DSS::OBJ::version".to_string()));
        // stack is empty again once we're back at the root
        assert_eq!(v.0.last(), Some(&"obj-end[]".to_string()));
    }
}
