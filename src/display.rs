//! Tree dump / `print` (§6).
//!
//! Produces a compact, indented, line-per-node dump of a compiled tree:
//! `%f` for constants, `bound <address>` for variables (the address is an
//! opaque per-process identifier, not meant to be stable across runs), and
//! `fN <child-count>` for calls, tagged with the operator or function name
//! where one is known.

use std::fmt::Write as _;

use crate::ast::{Node, OpTag};

fn node_label(node: &Node<'_>) -> String {
    match node {
        Node::Constant(v) => format!("{v:.6}"),
        Node::Variable(cell) => format!("bound {:p}", std::ptr::from_ref(*cell)),
        Node::Function(f) => {
            let arity = f.args.len();
            match &f.tag {
                OpTag::Builtin(func) => format!("f{arity} builtin({:p})", func as *const _),
                OpTag::Host(func) => format!("f{arity} host({:p})", func as *const _),
                OpTag::HostClosure(c) => format!("f{arity} closure({:p})", c as *const _),
                OpTag::Infix(op) => format!("f{arity} '{}'", op.symbol()),
                OpTag::Unary(op) => format!("f{arity} '{}'", op.symbol()),
            }
        }
    }
}

fn print_rec(node: &Node<'_>, depth: usize, out: &mut String) {
    let _ = writeln!(out, "{}{}", "  ".repeat(depth), node_label(node));
    if let Node::Function(f) = node {
        for child in &f.args {
            print_rec(child, depth + 1, out);
        }
    }
}

/// Render a compiled tree as a human-readable, indented dump.
///
/// This returns a `String` rather than writing to stdout directly, so a
/// host embedding this crate controls where (or whether) the dump is
/// displayed. Use [`print_to_stdout`] for the common case of just wanting
/// to see it.
#[must_use]
pub fn print(node: &Node<'_>) -> String {
    let mut out = String::new();
    print_rec(node, 0, &mut out);
    out
}

/// Convenience wrapper that writes [`print`]'s output straight to stdout.
///
/// This is the one place in the crate allowed to touch stdout; everywhere
/// else, side effects are left to the caller.
#[allow(clippy::print_stdout)]
pub fn print_to_stdout(node: &Node<'_>) {
    print!("{}", print(node));
}
