#![allow(dead_code)]

use galaxy_frontend::{Ast, NodeId, NodeKind, Parsed, parse_source};

/// Parse `input`, asserting it produced no diagnostics.
pub fn parse_clean(input: &str) -> Parsed {
    let parsed = parse_source(input, "test.gx");
    assert!(
        !parsed.has_errors(),
        "unexpected diagnostics:\n{:#?}\n--- source ---\n{input}",
        parsed.diagnostics
    );
    parsed
}

/// Compact s-expression for a subtree: operators as heads, leaves as text.
pub fn sexpr(ast: &Ast, id: NodeId) -> String {
    let node = ast.node(id);
    let head = match &node.kind {
        NodeKind::Number(text) | NodeKind::Identifier(text) => return text.clone(),
        NodeKind::StringLiteral(text) => return format!("{text:?}"),
        NodeKind::Boolean(value) => return value.to_string(),
        NodeKind::Binary(op) => op.to_string(),
        NodeKind::Unary(op) => op.to_string(),
        other => other.to_string(),
    };
    let children: Vec<String> = node.children.iter().map(|&c| sexpr(ast, c)).collect();
    if children.is_empty() {
        format!("({head})")
    } else {
        format!("({head} {})", children.join(" "))
    }
}

/// S-expressions of every top-level statement.
pub fn statements(input: &str) -> Vec<String> {
    let parsed = parse_clean(input);
    parsed
        .ast
        .statements()
        .iter()
        .map(|&id| sexpr(&parsed.ast, id))
        .collect()
}

/// S-expression of a single expression statement.
pub fn expr(input: &str) -> String {
    let mut all = statements(input);
    assert_eq!(all.len(), 1, "expected one statement in {input:?}");
    all.remove(0)
}
