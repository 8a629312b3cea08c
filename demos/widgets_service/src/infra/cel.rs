//! CEL evaluator for in-process filtering.

use std::collections::HashMap;
use std::panic;
use std::sync::Arc;

use cazi_claims::Claims;
use cazi_sdk::languages;
use cazi_sdk::repository::{EvaluationError, ExpressionEvaluator, Predicate};
use cel_interpreter::{Context, Program, Value, objects::Map};

/// Compiles CEL filters into predicates over record bindings.
///
/// Each top-level binding becomes a CEL variable; nested JSON objects
/// become CEL maps, so `widget.owner_id` resolves through the `widget`
/// binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct CelEvaluator;

impl ExpressionEvaluator for CelEvaluator {
    fn language(&self) -> &str {
        languages::CEL
    }

    fn compile(&self, source: &str) -> Result<Box<dyn Predicate>, EvaluationError> {
        // The ANTLR-based parser panics on some truncated inputs instead of
        // returning an error.
        let program = panic::catch_unwind(|| Program::compile(source))
            .map_err(|_| EvaluationError::Compile(format!("malformed expression `{source}`")))?
            .map_err(|e| EvaluationError::Compile(e.to_string()))?;

        Ok(Box::new(CelPredicate { program }))
    }
}

/// A compiled CEL program.
struct CelPredicate {
    program: Program,
}

impl Predicate for CelPredicate {
    fn matches(&self, bindings: &Claims) -> Result<bool, EvaluationError> {
        let mut context = Context::default();
        for (name, value) in bindings {
            context.add_variable_from_value(name.as_str(), convert_json_value(value));
        }

        match self
            .program
            .execute(&context)
            .map_err(|e| EvaluationError::Execution(e.to_string()))?
        {
            Value::Bool(b) => Ok(b),
            other => Err(EvaluationError::NotBoolean(value_kind(&other).to_owned())),
        }
    }
}

/// Convert a JSON value to a CEL Value
fn convert_json_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                n.as_f64().map_or(Value::Null, Value::Float)
            }
        }
        serde_json::Value::String(s) => Value::String(Arc::new(s.clone())),
        serde_json::Value::Array(items) => {
            Value::List(Arc::new(items.iter().map(convert_json_value).collect()))
        }
        serde_json::Value::Object(fields) => {
            let entries: HashMap<Arc<String>, Value> = fields
                .iter()
                .map(|(k, v)| (Arc::new(k.clone()), convert_json_value(v)))
                .collect();
            Value::Map(Map::from(entries))
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Int(_) | Value::UInt(_) | Value::Float(_) => "number",
        Value::String(_) => "string",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        _ => "value",
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings() -> Claims {
        let mut widget = Claims::new();
        widget.insert("owner_id".to_owned(), json!("alice"));
        widget.insert("name".to_owned(), json!("gear"));

        let mut bindings = widget.clone();
        bindings.insert("widget".to_owned(), serde_json::Value::Object(widget));
        bindings.insert("size".to_owned(), json!(3));
        bindings
    }

    fn eval(source: &str, bindings: &Claims) -> Result<bool, EvaluationError> {
        CelEvaluator.compile(source)?.matches(bindings)
    }

    #[test]
    fn flat_equality() {
        assert!(eval("owner_id == 'alice'", &bindings()).unwrap());
        assert!(!eval("owner_id == 'bob'", &bindings()).unwrap());
    }

    #[test]
    fn nested_binding_equality() {
        assert!(eval("widget.owner_id == 'alice'", &bindings()).unwrap());
    }

    #[test]
    fn conjunction_and_numbers() {
        assert!(eval("(owner_id == 'alice') && (size > 2)", &bindings()).unwrap());
    }

    #[test]
    fn escaped_literal_matches_verbatim() {
        let mut claims = Claims::new();
        claims.insert("owner_id".to_owned(), json!("o'brien"));

        assert!(eval(r"owner_id == 'o\'brien'", &claims).unwrap());
    }

    #[test]
    fn compiled_predicate_is_reusable() {
        let predicate = CelEvaluator.compile("owner_id == 'alice'").unwrap();

        let mut bob = bindings();
        bob.insert("owner_id".to_owned(), json!("bob"));

        assert!(predicate.matches(&bindings()).unwrap());
        assert!(!predicate.matches(&bob).unwrap());
        assert!(predicate.matches(&bindings()).unwrap());
    }

    #[test]
    fn truncated_expression_is_compile_error() {
        for source in ["name ==", "owner_id ==", "(", "true) || (true"] {
            let err = CelEvaluator.compile(source).err();
            assert!(
                matches!(err, Some(EvaluationError::Compile(_))),
                "{source} should not compile"
            );
        }
    }

    #[test]
    fn unknown_variable_is_execution_error() {
        let err = eval("tenant_id == 'x'", &bindings()).unwrap_err();
        assert!(matches!(err, EvaluationError::Execution(_)));
    }

    #[test]
    fn non_boolean_result_is_rejected() {
        let err = eval("owner_id", &bindings()).unwrap_err();
        assert_eq!(err, EvaluationError::NotBoolean("string".to_owned()));
    }
}
