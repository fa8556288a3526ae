//! Parser for the engine's JSON program format.
//!
//! Leaves are `{"type": "var", "value": "<index>"}` and
//! `{"type": "const", "value": "<float>"}`. Any other `type` is an
//! operator node: its name is taken from `value` (older documents put the
//! name in `type` itself and omit `value`), and its children from
//! `operands`. Values may be JSON strings or JSON numbers. Operators may
//! nest at most [`MAX_DEPTH`] levels deep.

use crate::error::{Result, XgpError};
use crate::program::{MAX_DEPTH, Node, Op};
use serde_json::{Map, Value, json};

/// Parse a JSON program document into a tree.
///
/// # Errors
///
/// Returns [`XgpError::Schema`] for missing or ill-typed fields or
/// nesting deeper than [`MAX_DEPTH`], [`XgpError::UnknownOperator`] for
/// unregistered names and [`XgpError::ArityMismatch`] for wrong operand
/// counts.
pub fn parse_json(doc: &Value) -> Result<Node> {
    parse_value(doc, 0)
}

fn parse_value(doc: &Value, depth: usize) -> Result<Node> {
    if depth > MAX_DEPTH {
        return Err(XgpError::Schema(format!(
            "program nested deeper than {MAX_DEPTH} levels"
        )));
    }
    let obj = doc
        .as_object()
        .ok_or_else(|| XgpError::Schema(format!("expected an object, got {doc}")))?;
    let kind = obj
        .get("type")
        .ok_or_else(|| XgpError::Schema("missing `type` field".into()))?
        .as_str()
        .ok_or_else(|| XgpError::Schema("`type` must be a string".into()))?;

    match kind {
        "var" => {
            let raw = value_text(obj, kind)?;
            raw.parse::<usize>()
                .map(Node::Variable)
                .map_err(|e| XgpError::Schema(format!("invalid variable index `{raw}`: {e}")))
        }
        "const" => {
            let raw = value_text(obj, kind)?;
            raw.parse::<f64>()
                .map(Node::Constant)
                .map_err(|e| XgpError::Schema(format!("invalid constant `{raw}`: {e}")))
        }
        _ => {
            let name = match obj.get("value") {
                Some(Value::String(name)) => name.as_str(),
                Some(other) => {
                    return Err(XgpError::Schema(format!(
                        "operator name must be a string, got {other}"
                    )));
                }
                None => kind,
            };
            let op = Op::from_name(name)?;
            let operands = obj
                .get("operands")
                .ok_or_else(|| XgpError::Schema(format!("operator `{name}` has no `operands`")))?
                .as_array()
                .ok_or_else(|| {
                    XgpError::Schema(format!("`operands` of `{name}` must be an array"))
                })?
                .iter()
                .map(|operand| parse_value(operand, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            Node::operator(op, operands)
        }
    }
}

/// Read `value` as text whether it was written as a string or a number.
fn value_text(obj: &Map<String, Value>, kind: &str) -> Result<String> {
    match obj.get("value") {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(XgpError::Schema(format!(
            "`value` of a `{kind}` node must be a string or number, got {other}"
        ))),
        None => Err(XgpError::Schema(format!("`{kind}` node has no `value`"))),
    }
}

impl Node {
    /// Serialize to the JSON program schema accepted by [`parse_json`].
    ///
    /// Values are written as strings, the way the engine writes them.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Variable(i) => json!({ "type": "var", "value": i.to_string() }),
            Self::Constant(v) => json!({ "type": "const", "value": v.to_string() }),
            Self::Operator { op, operands } => json!({
                "type": "func",
                "value": op.name(),
                "operands": operands.iter().map(Node::to_json).collect::<Vec<_>>(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_and_const() {
        let var = parse_json(&json!({"type": "var", "value": "0"})).unwrap();
        assert_eq!(var, Node::Variable(0));
        let var = parse_json(&json!({"type": "var", "value": 7})).unwrap();
        assert_eq!(var, Node::Variable(7));
        let c = parse_json(&json!({"type": "const", "value": "-2.5"})).unwrap();
        assert_eq!(c, Node::Constant(-2.5));
        let c = parse_json(&json!({"type": "const", "value": 0.5})).unwrap();
        assert_eq!(c, Node::Constant(0.5));
    }

    #[test]
    fn test_parse_operator_with_value_name() {
        let doc = json!({
            "type": "func",
            "value": "add",
            "operands": [
                {"type": "var", "value": "1"},
                {"type": "const", "value": "3"}
            ]
        });
        let node = parse_json(&doc).unwrap();
        assert_eq!(node.to_string(), "add(X[1], 3)");
    }

    #[test]
    fn test_parse_operator_with_implicit_name() {
        let doc = json!({
            "type": "cos",
            "operands": [{"type": "var", "value": "0"}]
        });
        let node = parse_json(&doc).unwrap();
        assert_eq!(node.to_string(), "cos(X[0])");
    }

    #[test]
    fn test_schema_errors() {
        let cases = [
            json!({"value": "0"}),
            json!({"type": 3, "value": "0"}),
            json!({"type": "var"}),
            json!({"type": "var", "value": "x"}),
            json!({"type": "var", "value": "-1"}),
            json!({"type": "const", "value": "abc"}),
            json!({"type": "const", "value": [1]}),
            json!({"type": "func", "value": "add"}),
            json!({"type": "func", "value": "add", "operands": {}}),
            json!({"type": "func", "value": 1, "operands": []}),
            json!([1, 2]),
        ];
        for doc in cases {
            assert!(
                matches!(parse_json(&doc), Err(XgpError::Schema(_))),
                "{doc} should be a schema error"
            );
        }
    }

    #[test]
    fn test_operator_errors() {
        let unknown = json!({"type": "func", "value": "tan", "operands": []});
        assert!(matches!(parse_json(&unknown), Err(XgpError::UnknownOperator(_))));
        let arity = json!({
            "type": "func",
            "value": "sub",
            "operands": [{"type": "const", "value": "1"}]
        });
        assert!(matches!(parse_json(&arity), Err(XgpError::ArityMismatch { .. })));
    }

    fn nested_cos(levels: usize) -> Value {
        let mut doc = json!({"type": "var", "value": "0"});
        for _ in 0..levels {
            doc = json!({"type": "func", "value": "cos", "operands": [doc]});
        }
        doc
    }

    #[test]
    fn test_nesting_limit() {
        assert_eq!(parse_json(&nested_cos(MAX_DEPTH)).unwrap().height(), MAX_DEPTH);
        assert!(matches!(
            parse_json(&nested_cos(MAX_DEPTH + 1)),
            Err(XgpError::Schema(_))
        ));
    }

    #[test]
    fn test_to_json_reparses() {
        let node = crate::program::parse_text("div(pow(X[0], 2), exp(-1.5))").unwrap();
        assert_eq!(parse_json(&node.to_json()).unwrap(), node);
    }
}
