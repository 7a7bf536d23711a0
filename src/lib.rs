#![forbid(unsafe_code)]
//! Compact compiler and evaluator for infix mathematical expressions.
//!
//! `exprcalc` parses a formula string against a host-provided table of
//! variables, functions, and closures, optionally folds constant
//! subexpressions, and either evaluates the result immediately ([`eval`])
//! or hands back a reusable compiled tree ([`compile`]) for repeated
//! evaluation as bound variables change. It also performs symbolic
//! differentiation over a fixed subset of elementary operators
//! ([`differentiate`]).
//!
//! # Quick evaluation
//!
//! ```
//! use exprcalc::{interp, Bindings};
//!
//! let bindings = Bindings::new();
//! let result = interp("2 + 3 * 4", &bindings).unwrap();
//! assert_eq!(result, 14.0);
//! ```
//!
//! # Compiling once, evaluating repeatedly with a rebindable variable
//!
//! ```
//! use std::cell::Cell;
//! use exprcalc::{compile, eval, Bindings};
//!
//! let x = Cell::new(2.0);
//! let bindings = Bindings::new().variable("x", &x);
//! let compiled = compile("x^2 + 1", &bindings).unwrap();
//!
//! assert_eq!(eval(&compiled), 5.0);
//! x.set(3.0);
//! assert_eq!(eval(&compiled), 10.0);
//! ```
//!
//! # Symbolic differentiation
//!
//! ```
//! use std::cell::Cell;
//! use exprcalc::{compile, differentiate, eval, print, Bindings};
//!
//! let x = Cell::new(2.0);
//! let bindings = Bindings::new().variable("x", &x);
//! let f = compile("x^2", &bindings).unwrap();
//! let df = differentiate(&f, &x).unwrap();
//!
//! assert_eq!(eval(&df), 4.0);
//! let _tree_dump = print(&df);
//! ```
//!
//! # Custom compilation options
//!
//! ```
//! use exprcalc::{compile_with_options, eval, Bindings, CompileOptions};
//!
//! let bindings = Bindings::new();
//! let opts = CompileOptions::new().exponent_left_assoc();
//! let left_assoc = compile_with_options("2^3^2", &bindings, opts).unwrap();
//! assert_eq!(eval(&left_assoc), 64.0); // (2^3)^2
//! ```

/// The compiled expression tree and its node types.
pub mod ast;
/// Host-provided variable, function, and closure bindings.
pub mod bindings;
/// Symbolic differentiation.
pub mod diff;
/// Tree-dump rendering (`print`).
pub mod display;
/// Error and source-span types.
pub mod error;
/// The tree-walking evaluator.
pub mod eval;
/// The tokenizer.
pub mod lexer;
/// Numeric primitives backing the builtin registry.
pub mod math;
/// Constant folding.
pub mod optimize;
/// Compile-time configuration (`CompileOptions`).
pub mod options;
/// The recursive-descent parser.
pub mod parser;
/// The static builtin function table.
pub mod registry;

#[cfg(test)]
mod tests;

/// The compiled-tree node type.
pub use ast::Node;
/// Binding table types for host variables, functions, and closures.
pub use bindings::{Binding, Bindings, HostClosure, HostFunction, Purity};
/// Error and source-span types.
pub use error::{CalcError, Span};
/// Compile-time configuration types and defaults.
pub use options::{CompileOptions, ExponentAssociativity, LogBase, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};

/// Compile `input` against `bindings` using default [`CompileOptions`],
/// returning an optimized, reusable expression tree.
///
/// This is the "compile once" half of the library's two usage patterns:
/// hold onto the returned [`Node`] and call [`interp`] against it as many
/// times as needed, re-reading whatever variable cells `bindings` bound in
/// between calls.
///
/// # Errors
///
/// See [`compile_with_options`].
pub fn compile<'h>(input: &str, bindings: &bindings::Bindings<'h>) -> Result<Node<'h>, CalcError> {
    compile_with_options(input, bindings, CompileOptions::default())
}

/// Compile `input` against `bindings` under explicit `options`.
///
/// # Errors
///
/// Returns [`CalcError::EmptyFormula`] for blank input; lex and parse
/// errors for malformed syntax; [`CalcError::UnknownName`] for an
/// identifier that resolves to neither a host binding nor a builtin; and
/// [`CalcError::MaxDepthExceeded`] / [`CalcError::MaxNodesExceeded`] if the
/// compiled tree would exceed the configured resource limits.
pub fn compile_with_options<'h>(
    input: &str,
    bindings: &bindings::Bindings<'h>,
    options: CompileOptions,
) -> Result<Node<'h>, CalcError> {
    let tree = parser::parse(input, bindings, options)?;
    Ok(optimize::optimize(tree))
}

/// Evaluate a previously compiled tree.
///
/// Reads the current value behind every bound [`Node::Variable`] at the
/// moment of the call, so the same compiled tree can be reused across
/// calls that each see different variable values.
#[must_use]
pub fn eval(node: &Node<'_>) -> f64 {
    eval::eval(node)
}

/// Compile `input` and immediately evaluate it in one step, using default
/// [`CompileOptions`].
///
/// Equivalent to `eval(&compile(input, bindings)?)`, for the common case
/// where the expression is evaluated exactly once.
///
/// # Errors
///
/// See [`compile`].
pub fn interp(input: &str, bindings: &bindings::Bindings<'_>) -> Result<f64, CalcError> {
    let tree = compile(input, bindings)?;
    Ok(eval(&tree))
}

/// Symbolically differentiate a compiled tree with respect to the variable
/// bound to `target`.
///
/// # Errors
///
/// Returns [`CalcError::Unsupported`] if `node` uses an operator or
/// function outside the differentiable subset (see [`diff`] for the exact
/// list).
pub fn differentiate<'h>(node: &Node<'h>, target: &std::cell::Cell<f64>) -> Result<Node<'h>, CalcError> {
    let raw = diff::differentiate(node, target)?;
    Ok(optimize::optimize(raw))
}

/// Render a compiled tree as a human-readable, indented dump (§6).
#[must_use]
pub fn print(node: &Node<'_>) -> String {
    display::print(node)
}

/// Deep-copy a compiled tree.
///
/// The returned tree owns its own call/argument structure independently of
/// `node` (though both still borrow the same host-owned variable cells and
/// host function/closure references, per the `'h` lifetime).
#[must_use]
pub fn deep_copy<'h>(node: &Node<'h>) -> Node<'h> {
    node.deep_copy()
}

/// Release a compiled tree.
///
/// `exprcalc` trees are ordinary owned Rust values freed by `Drop` like any
/// other; this function exists to make the "exactly one free per compiled
/// root" lifecycle explicit at call sites that are porting code from an API
/// where `free` is a distinct, required step, rather than relying on scope
/// exit alone to communicate ownership.
pub fn free(node: Node<'_>) {
    drop(node);
}
