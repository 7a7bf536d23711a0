//! Tree-walking evaluator (§4.5, §4.7).
//!
//! Evaluation is a pure function of the tree and the current values behind
//! any [`crate::ast::Node::Variable`] references: no state is threaded
//! through beyond the call stack, and arguments to every N-ary call are
//! evaluated strictly left to right before the call itself runs (so `&&`,
//! `||`, and `^^` never short-circuit — both sides are always evaluated).

use crate::ast::{InfixOp, Node, OpTag, UnaryOp};
use crate::math::{from_bitwise_int, to_bitwise_int, BITWISE_MASK_53};

/// Evaluate a compiled tree to a single `f64`.
///
/// Malformed or out-of-domain results (e.g. `ln(-1)`) propagate as `NaN`
/// rather than erroring, matching ordinary `f64` arithmetic.
#[must_use]
pub fn eval(node: &Node<'_>) -> f64 {
    match node {
        Node::Constant(v) => *v,
        Node::Variable(cell) => cell.get(),
        Node::Function(f) => {
            let values: Vec<f64> = f.args.iter().map(eval).collect();
            apply(&f.tag, &values)
        }
    }
}

/// Truthiness for the logical operators: anything other than exactly
/// `0.0` is true.
#[inline]
fn truthy(x: f64) -> bool {
    x != 0.0
}

#[inline]
fn from_bool(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn apply_infix(op: InfixOp, values: &[f64]) -> f64 {
    let a = values[0];
    match op {
        InfixOp::Comma => return values[1],
        _ => {}
    }
    let b = values[1];
    match op {
        InfixOp::Add => a + b,
        InfixOp::Sub => a - b,
        InfixOp::Mul => a * b,
        InfixOp::Div => a / b,
        InfixOp::Mod => a % b,
        InfixOp::Pow => a.powf(b),
        InfixOp::Lt => from_bool(a < b),
        InfixOp::Le => from_bool(a <= b),
        InfixOp::Gt => from_bool(a > b),
        InfixOp::Ge => from_bool(a >= b),
        InfixOp::Eq => from_bool(a == b),
        InfixOp::Ne => from_bool(a != b),
        InfixOp::And => from_bool(truthy(a) && truthy(b)),
        InfixOp::Or => from_bool(truthy(a) || truthy(b)),
        InfixOp::Xor => from_bool(truthy(a) ^ truthy(b)),
        InfixOp::BitAnd => from_bitwise_int(to_bitwise_int(a) & to_bitwise_int(b)),
        InfixOp::BitOr => from_bitwise_int(to_bitwise_int(a) | to_bitwise_int(b)),
        InfixOp::BitXor => from_bitwise_int(to_bitwise_int(a) ^ to_bitwise_int(b)),
        InfixOp::Shl => from_bitwise_int(to_bitwise_int(a) << (to_bitwise_int(b) & 63)),
        InfixOp::Shr => from_bitwise_int(to_bitwise_int(a) >> (to_bitwise_int(b) & 63)),
        InfixOp::Comma => unreachable!("handled above"),
    }
}

fn apply_unary(op: UnaryOp, x: f64) -> f64 {
    match op {
        UnaryOp::Identity => x,
        UnaryOp::Negate => -x,
        UnaryOp::LogicalNot => from_bool(!truthy(x)),
        UnaryOp::LogicalNotNot => from_bool(truthy(x)),
        UnaryOp::NegateLogicalNot => -from_bool(!truthy(x)),
        UnaryOp::NegateLogicalNotNot => -from_bool(truthy(x)),
        UnaryOp::BitwiseNot => from_bitwise_int(!to_bitwise_int(x) & BITWISE_MASK_53),
        UnaryOp::BitwiseNotNot => from_bitwise_int(!(!to_bitwise_int(x) & BITWISE_MASK_53) & BITWISE_MASK_53),
    }
}

/// Apply a resolved call (builtin, host function/closure, or lowered
/// operator) to already-evaluated argument values.
///
/// Shared by [`eval`] and [`crate::optimize::optimize`], so constant
/// folding and ordinary evaluation can never disagree about what a call
/// computes.
#[must_use]
pub fn apply(tag: &OpTag<'_>, values: &[f64]) -> f64 {
    match tag {
        OpTag::Builtin(f) => f.call(values),
        OpTag::Host(f) => f.call(values),
        OpTag::HostClosure(c) => c.call(values),
        OpTag::Infix(op) => apply_infix(*op, values),
        OpTag::Unary(op) => apply_unary(*op, values[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FunctionNode;
    use crate::bindings::Purity;
    use std::cell::Cell;

    fn infix(op: InfixOp, lhs: Node<'static>, rhs: Node<'static>) -> Node<'static> {
        Node::Function(FunctionNode { tag: OpTag::Infix(op), args: vec![lhs, rhs], purity: Purity::Pure })
    }

    #[test]
    fn evaluates_basic_arithmetic() {
        let tree = infix(InfixOp::Add, Node::Constant(2.0), Node::Constant(3.0));
        assert_eq!(eval(&tree), 5.0);
    }

    #[test]
    fn reads_current_variable_value() {
        let cell = Cell::new(10.0);
        let tree = Node::Variable(&cell);
        assert_eq!(eval(&tree), 10.0);
        cell.set(20.0);
        assert_eq!(eval(&tree), 20.0);
    }

    #[test]
    fn comparisons_yield_zero_or_one() {
        let tree = infix(InfixOp::Lt, Node::Constant(1.0), Node::Constant(2.0));
        assert_eq!(eval(&tree), 1.0);
        let tree = infix(InfixOp::Lt, Node::Constant(2.0), Node::Constant(1.0));
        assert_eq!(eval(&tree), 0.0);
    }

    #[test]
    fn logical_and_does_not_short_circuit_evaluation_of_rhs() {
        // Both sides are always evaluated; with two constants this just
        // checks the truth table, since side effects aren't observable
        // through pure Node values.
        let tree = infix(InfixOp::And, Node::Constant(0.0), Node::Constant(5.0));
        assert_eq!(eval(&tree), 0.0);
    }

    #[test]
    fn bitwise_not_masks_to_53_bits() {
        let tree = Node::Function(FunctionNode {
            tag: OpTag::Unary(UnaryOp::BitwiseNot),
            args: vec![Node::Constant(0.0)],
            purity: Purity::Pure,
        });
        assert_eq!(eval(&tree), f64::from(u32::MAX) + (BITWISE_MASK_53 - u32::MAX as i64) as f64);
    }

    #[test]
    fn comma_evaluates_both_sides_and_keeps_the_last() {
        let tree = infix(InfixOp::Comma, Node::Constant(1.0), Node::Constant(2.0));
        assert_eq!(eval(&tree), 2.0);
    }

    #[test]
    fn division_by_zero_is_infinity_not_nan() {
        let tree = infix(InfixOp::Div, Node::Constant(1.0), Node::Constant(0.0));
        assert!(eval(&tree).is_infinite());
    }
}
