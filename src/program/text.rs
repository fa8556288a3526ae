//! Parser for the engine's text program format.
//!
//! ```text
//! <node> ::= <var> | <const> | <op> "(" <node> ("," <node>)* ")"
//! <var>  ::= "X[" <index> "]"
//! ```
//!
//! The kind of a node is decided by its last character: `]` is a
//! variable, anything but `)` is a literal, `)` is an operator
//! application. Whitespace is ignored everywhere. Operators may nest at
//! most [`MAX_DEPTH`] levels deep.

use crate::error::{Result, XgpError};
use crate::program::{MAX_DEPTH, Node, Op};

/// Prefix of a variable reference; the column index follows it.
const VAR_PREFIX: &str = "X[";

/// Parse a text program into a tree.
///
/// # Errors
///
/// Returns [`XgpError::MalformedExpression`] for unbalanced parentheses,
/// empty operands, bad literals or nesting deeper than [`MAX_DEPTH`],
/// [`XgpError::UnknownOperator`] for
/// unregistered names and [`XgpError::ArityMismatch`] for wrong operand
/// counts.
pub fn parse_text(source: &str) -> Result<Node> {
    let compact: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    parse_node(&compact, 0)
}

fn parse_node(s: &str, depth: usize) -> Result<Node> {
    if depth > MAX_DEPTH {
        return Err(XgpError::malformed(
            s,
            format!("nested deeper than {MAX_DEPTH} levels"),
        ));
    }
    if s.is_empty() {
        return Err(XgpError::malformed(s, "empty expression"));
    }
    if s.ends_with(']') {
        return parse_variable(s);
    }
    if !s.ends_with(')') {
        return s
            .parse::<f64>()
            .map(Node::Constant)
            .map_err(|e| XgpError::malformed(s, format!("invalid literal: {e}")));
    }

    let body = &s[..s.len() - 1];
    let Some(open) = body.find('(') else {
        return Err(XgpError::malformed(s, "unbalanced parentheses"));
    };
    let name = &body[..open];
    if name.is_empty() {
        return Err(XgpError::malformed(s, "missing operator name"));
    }
    let op = Op::from_name(name)?;

    let operands = split_operands(s, &body[open + 1..])?
        .into_iter()
        .map(|operand| parse_node(operand, depth + 1))
        .collect::<Result<Vec<_>>>()?;

    Node::operator(op, operands)
}

fn parse_variable(s: &str) -> Result<Node> {
    let digits = s
        .strip_prefix(VAR_PREFIX)
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| XgpError::malformed(s, "expected a variable of the form X[<index>]"))?;
    digits
        .parse::<usize>()
        .map(Node::Variable)
        .map_err(|e| XgpError::malformed(s, format!("invalid column index: {e}")))
}

/// Split an argument list on the commas at parenthesis depth zero.
fn split_operands<'a>(whole: &str, args: &'a str) -> Result<Vec<&'a str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| XgpError::malformed(whole, "unbalanced parentheses"))?;
            }
            ',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(XgpError::malformed(whole, "unbalanced parentheses"));
    }
    parts.push(&args[start..]);

    if parts.iter().any(|p| p.is_empty()) {
        return Err(XgpError::malformed(whole, "empty operand"));
    }
    Ok(parts)
}
