//! Symbolic differentiation (§4.8).
//!
//! Differentiation is defined over a fixed subset of operators: `+`, `-`,
//! `*`, `/`, `pow`, `sin`, `cos`, `ln`, `exp`, plus the two unary forms that
//! pass straight through (`Identity`) or negate (`Negate`). Anything
//! outside that subset — comparisons, bitwise and logical operators,
//! `min`/`max`, `fac`, host functions and closures, and other builtins —
//! has no defined derivative here and returns
//! [`CalcError::Unsupported`]. A warning is logged through the `log` facade
//! before the error is returned, so a host that only checks the `Result`
//! still has a diagnostic available if it enables logging.

use crate::ast::{FunctionNode, InfixOp, Node, OpTag, UnaryOp};
use crate::bindings::Purity;
use crate::error::CalcError;
use crate::registry::BuiltinFn;

fn fn_eq(a: fn(f64) -> f64, b: fn(f64) -> f64) -> bool {
    a == b
}

/// Which elementary function a resolved builtin call represents, if any of
/// the ones differentiation supports.
enum Elementary {
    Sin,
    Cos,
    Ln,
    Exp,
}

fn elementary_of(tag: &OpTag<'_>) -> Option<Elementary> {
    let OpTag::Builtin(BuiltinFn::Fn1(f)) = tag else {
        return None;
    };
    if fn_eq(*f, f64::sin) {
        Some(Elementary::Sin)
    } else if fn_eq(*f, f64::cos) {
        Some(Elementary::Cos)
    } else if fn_eq(*f, f64::ln) {
        Some(Elementary::Ln)
    } else if fn_eq(*f, f64::exp) {
        Some(Elementary::Exp)
    } else {
        None
    }
}

fn constant(v: f64) -> Node<'static> {
    Node::Constant(v)
}

fn infix<'h>(op: InfixOp, lhs: Node<'h>, rhs: Node<'h>) -> Node<'h> {
    Node::Function(FunctionNode { tag: OpTag::Infix(op), args: vec![lhs, rhs], purity: Purity::Pure })
}

fn unary(op: UnaryOp, x: Node<'_>) -> Node<'_> {
    Node::Function(FunctionNode { tag: OpTag::Unary(op), args: vec![x], purity: Purity::Pure })
}

fn call1<'h>(f: fn(f64) -> f64, x: Node<'h>) -> Node<'h> {
    Node::Function(FunctionNode { tag: OpTag::Builtin(BuiltinFn::Fn1(f)), args: vec![x], purity: Purity::Pure })
}

fn unsupported(op: &str) -> CalcError {
    log::warn!("differentiate: unsupported operator '{op}'");
    CalcError::Unsupported { op: op.to_string() }
}

/// Differentiate `node` symbolically with respect to the variable bound to
/// `target`.
///
/// `target` identifies the variable by reference identity: any
/// [`Node::Variable`] pointing at the same cell differentiates to `1`,
/// every other variable (and every constant) differentiates to `0`.
///
/// # Errors
///
/// Returns [`CalcError::Unsupported`] if `node` contains an operator or
/// function outside the supported elementary subset.
pub fn differentiate<'h>(node: &Node<'h>, target: &std::cell::Cell<f64>) -> Result<Node<'h>, CalcError> {
    match node {
        Node::Constant(_) => Ok(constant(0.0)),
        Node::Variable(cell) => {
            let same = std::ptr::eq(*cell, target);
            Ok(constant(if same { 1.0 } else { 0.0 }))
        }
        Node::Function(f) => differentiate_call(f, target),
    }
}

fn differentiate_call<'h>(f: &FunctionNode<'h>, target: &std::cell::Cell<f64>) -> Result<Node<'h>, CalcError> {
    match f.tag {
        OpTag::Infix(InfixOp::Add) => {
            let da = differentiate(&f.args[0], target)?;
            let db = differentiate(&f.args[1], target)?;
            Ok(infix(InfixOp::Add, da, db))
        }
        OpTag::Infix(InfixOp::Sub) => {
            let da = differentiate(&f.args[0], target)?;
            let db = differentiate(&f.args[1], target)?;
            Ok(infix(InfixOp::Sub, da, db))
        }
        OpTag::Infix(InfixOp::Mul) => {
            let a = &f.args[0];
            let b = &f.args[1];
            let da = differentiate(a, target)?;
            let db = differentiate(b, target)?;
            // (a*b)' = a'*b + a*b'
            Ok(infix(InfixOp::Add, infix(InfixOp::Mul, da, b.deep_copy()), infix(InfixOp::Mul, a.deep_copy(), db)))
        }
        OpTag::Infix(InfixOp::Div) => {
            let a = &f.args[0];
            let b = &f.args[1];
            let da = differentiate(a, target)?;
            let db = differentiate(b, target)?;
            // (a/b)' = (a'*b - a*b') / b^2
            let numerator =
                infix(InfixOp::Sub, infix(InfixOp::Mul, da, b.deep_copy()), infix(InfixOp::Mul, a.deep_copy(), db));
            let denominator = infix(InfixOp::Mul, b.deep_copy(), b.deep_copy());
            Ok(infix(InfixOp::Div, numerator, denominator))
        }
        OpTag::Infix(InfixOp::Pow) => differentiate_pow(&f.args[0], &f.args[1], target),
        OpTag::Infix(op) => Err(unsupported(op.symbol())),
        OpTag::Unary(UnaryOp::Identity) => differentiate(&f.args[0], target),
        OpTag::Unary(UnaryOp::Negate) => Ok(unary(UnaryOp::Negate, differentiate(&f.args[0], target)?)),
        OpTag::Unary(op) => Err(unsupported(op.symbol())),
        OpTag::Builtin(_) => differentiate_elementary(f, target),
        OpTag::Host(_) => Err(unsupported("host function")),
        OpTag::HostClosure(_) => Err(unsupported("host closure")),
    }
}

fn differentiate_pow<'h>(
    a: &Node<'h>,
    b: &Node<'h>,
    target: &std::cell::Cell<f64>,
) -> Result<Node<'h>, CalcError> {
    let da = differentiate(a, target)?;
    let db = differentiate(b, target)?;
    // d(a^b) = b * a^(b-1) * da  +  a^b * ln(a) * db
    let term1 = infix(
        InfixOp::Mul,
        infix(InfixOp::Mul, b.deep_copy(), infix(InfixOp::Pow, a.deep_copy(), infix(InfixOp::Sub, b.deep_copy(), constant(1.0)))),
        da,
    );
    let term2 = infix(
        InfixOp::Mul,
        infix(InfixOp::Mul, infix(InfixOp::Pow, a.deep_copy(), b.deep_copy()), call1(f64::ln, a.deep_copy())),
        db,
    );
    Ok(infix(InfixOp::Add, term1, term2))
}

fn differentiate_elementary<'h>(
    f: &FunctionNode<'h>,
    target: &std::cell::Cell<f64>,
) -> Result<Node<'h>, CalcError> {
    let Some(kind) = elementary_of(&f.tag) else {
        return Err(unsupported("non-elementary builtin"));
    };
    let u = &f.args[0];
    let du = differentiate(u, target)?;
    let inner = match kind {
        // (sin u)' = cos(u) * u'
        Elementary::Sin => call1(f64::cos, u.deep_copy()),
        // (cos u)' = -sin(u) * u'
        Elementary::Cos => unary(UnaryOp::Negate, call1(f64::sin, u.deep_copy())),
        // (ln u)' = u' / u
        Elementary::Ln => return Ok(infix(InfixOp::Div, du, u.deep_copy())),
        // (exp u)' = exp(u) * u'
        Elementary::Exp => call1(f64::exp, u.deep_copy()),
    };
    Ok(infix(InfixOp::Mul, inner, du))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval;
    use crate::optimize::optimize;
    use std::cell::Cell;

    fn var(cell: &Cell<f64>) -> Node<'_> {
        Node::Variable(cell)
    }

    #[test]
    fn derivative_of_x_is_one() {
        let x = Cell::new(3.0);
        let d = differentiate(&var(&x), &x).expect("should differentiate");
        assert_eq!(eval(&d), 1.0);
    }

    #[test]
    fn derivative_of_unrelated_variable_is_zero() {
        let x = Cell::new(3.0);
        let y = Cell::new(1.0);
        let d = differentiate(&var(&y), &x).expect("should differentiate");
        assert_eq!(eval(&d), 0.0);
    }

    #[test]
    fn derivative_of_x_squared_is_two_x() {
        let x = Cell::new(4.0);
        let tree = infix(InfixOp::Pow, var(&x), Node::Constant(2.0));
        let d = differentiate(&tree, &x).expect("should differentiate");
        let folded = optimize(d);
        assert!((eval(&folded) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn derivative_of_sin_is_cos() {
        let x = Cell::new(0.0);
        let tree = call1(f64::sin, var(&x));
        let d = differentiate(&tree, &x).expect("should differentiate");
        assert!((eval(&d) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn derivative_of_product_rule() {
        let x = Cell::new(2.0);
        // d/dx(x * x) = 2x
        let tree = infix(InfixOp::Mul, var(&x), var(&x));
        let d = differentiate(&tree, &x).expect("should differentiate");
        assert!((eval(&d) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn bitwise_operator_is_unsupported() {
        let x = Cell::new(1.0);
        let tree = infix(InfixOp::BitAnd, var(&x), Node::Constant(1.0));
        let err = differentiate(&tree, &x).unwrap_err();
        assert!(matches!(err, CalcError::Unsupported { .. }));
    }

    #[test]
    fn comparison_operator_is_unsupported() {
        let x = Cell::new(1.0);
        let tree = infix(InfixOp::Lt, var(&x), Node::Constant(1.0));
        let err = differentiate(&tree, &x).unwrap_err();
        assert!(matches!(err, CalcError::Unsupported { .. }));
    }
}
