//! Constant folding (§4.6).
//!
//! A post-order pass: each child is optimized first, then a node whose
//! children are all [`Node::Constant`] and whose own call is
//! [`Purity::Pure`] is replaced by its evaluated value. Variables and
//! impure calls are never folded, and folding never changes the result an
//! unoptimized tree would produce — it only does some of the arithmetic
//! ahead of time.

use crate::ast::{FunctionNode, Node, OpTag};
use crate::bindings::Purity;
use crate::eval;

/// Fold constant subexpressions in `node`, returning the optimized tree.
#[must_use]
pub fn optimize(node: Node<'_>) -> Node<'_> {
    match node {
        Node::Constant(_) | Node::Variable(_) => node,
        Node::Function(f) => {
            let FunctionNode { tag, args, purity } = f;
            let args: Vec<Node<'_>> = args.into_iter().map(optimize).collect();

            if purity == Purity::Pure && args.iter().all(|a| a.as_constant().is_some()) {
                let values: Vec<f64> = args.iter().map(|a| a.as_constant().expect("checked above")).collect();
                return Node::Constant(eval::apply(&tag, &values));
            }

            Node::Function(FunctionNode { tag, args, purity })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{InfixOp, UnaryOp};
    use std::cell::Cell;

    fn infix(op: InfixOp, lhs: Node<'static>, rhs: Node<'static>) -> Node<'static> {
        Node::Function(FunctionNode { tag: OpTag::Infix(op), args: vec![lhs, rhs], purity: Purity::Pure })
    }

    #[test]
    fn folds_pure_constant_arithmetic() {
        let tree = infix(InfixOp::Add, Node::Constant(1.0), Node::Constant(2.0));
        let folded = optimize(tree);
        assert_eq!(folded.as_constant(), Some(3.0));
    }

    #[test]
    fn does_not_fold_across_a_variable() {
        let cell = Cell::new(1.0);
        let tree = infix(InfixOp::Add, Node::Variable(&cell), Node::Constant(2.0));
        let folded = optimize(tree);
        assert!(folded.as_constant().is_none());
    }

    #[test]
    fn folds_nested_subtrees_bottom_up() {
        let inner = infix(InfixOp::Mul, Node::Constant(2.0), Node::Constant(3.0));
        let outer = infix(InfixOp::Add, inner, Node::Constant(4.0));
        let folded = optimize(outer);
        assert_eq!(folded.as_constant(), Some(10.0));
    }

    #[test]
    fn folds_unary_over_constant() {
        let tree = Node::Function(FunctionNode {
            tag: OpTag::Unary(UnaryOp::Negate),
            args: vec![Node::Constant(5.0)],
            purity: Purity::Pure,
        });
        let folded = optimize(tree);
        assert_eq!(folded.as_constant(), Some(-5.0));
    }

    #[test]
    fn optimizing_twice_is_idempotent() {
        let tree = infix(InfixOp::Add, Node::Constant(1.0), Node::Constant(2.0));
        let once = optimize(tree);
        let value_once = once.as_constant();
        let twice = optimize(once);
        assert_eq!(twice.as_constant(), value_once);
    }
}
