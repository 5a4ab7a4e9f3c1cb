//! Indented text dump of a syntax tree for diagnostics.
//!
//! Output is one line per node: the node kind with its data and the
//! `@line:column` where it starts, indented two spaces per level. The
//! walk keeps a visited set, so a node reachable along more than one path
//! (including through a cycle) is expanded once and marked on every later
//! visit.

use std::collections::HashSet;
use std::fmt;

use crate::ast::{Ast, NodeId};

/// Render `node` and everything below it into `out`.
///
/// `depth` is the indentation level of `node` itself. Ids already in
/// `visited` print as `<cycle> Kind #id` and are not expanded; ids with no
/// node in `ast` print as `<missing node #id>`.
pub fn print_program<W: fmt::Write>(
    ast: &Ast,
    node: NodeId,
    depth: usize,
    visited: &mut HashSet<NodeId>,
    out: &mut W,
) -> fmt::Result {
    let mut stack = vec![(node, depth)];

    while let Some((id, depth)) = stack.pop() {
        for _ in 0..depth {
            out.write_str("  ")?;
        }

        let Some(current) = ast.get(id) else {
            writeln!(out, "<missing node {id}>")?;
            continue;
        };

        if !visited.insert(id) {
            writeln!(out, "<cycle> {} {id}", current.kind)?;
            continue;
        }

        writeln!(
            out,
            "{} @{}:{}",
            current.kind, current.span.line, current.span.column
        )?;
        // Reversed so the first child is popped first.
        stack.extend(current.children.iter().rev().map(|&child| (child, depth + 1)));
    }

    Ok(())
}

/// Render the whole tree from its root. Empty if the tree has no root.
#[must_use]
pub fn print_tree(ast: &Ast) -> String {
    let mut out = String::new();
    let Some(root) = ast.root() else {
        return out;
    };
    match print_program(ast, root, 0, &mut HashSet::new(), &mut out) {
        Ok(()) => out,
        Err(fmt::Error) => String::new(),
    }
}
