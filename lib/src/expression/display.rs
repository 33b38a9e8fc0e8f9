//! Canonical textual rendering of an expression tree.
use super::types::{Associativity, BinaryNode, BinaryOp, Node};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Fixed(value) => write!(f, "{}", value),
            Node::Constant(constant) => write!(f, "{}", constant.name),
            Node::Variable(variable) => write!(f, "{}", variable.name),
            Node::Unary(unary) => write!(f, "{}({})", unary.op.name(), unary.arg),
            Node::Binary(binary) => write!(
                f,
                "{} {} {}",
                child_string(&binary.left, binary.op, Side::Left),
                binary.op.symbol(),
                child_string(&binary.right, binary.op, Side::Right)
            ),
        }
    }
}

fn child_string(child: &Node, parent_op: BinaryOp, side: Side) -> String {
    if let Node::Binary(BinaryNode { op: child_op, .. }) = child {
        if needs_parens(*child_op, parent_op, side) {
            return format!("({})", child);
        }
    }
    child.to_string()
}

/// Whether `child_op`, appearing on `side` of `parent_op`, needs
/// parenthesizing to preserve meaning: lower precedence always does,
/// equal precedence does whenever re-associating would change the
/// grouping (right child of a left-associative operator, or vice versa).
fn needs_parens(child_op: BinaryOp, parent_op: BinaryOp, side: Side) -> bool {
    let (child_prec, parent_prec) = (child_op.precedence(), parent_op.precedence());
    if child_prec < parent_prec {
        return true;
    }
    if child_prec > parent_prec {
        return false;
    }
    match parent_op.associativity() {
        Associativity::Left => side == Side::Right,
        Associativity::Right => side == Side::Left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::types::UnaryOp;

    #[test]
    fn test_display_fixed_and_variable() {
        assert_eq!("1", Node::fixed(1.0).to_string());
        assert_eq!("x", Node::variable("x").to_string());
    }

    #[test]
    fn test_display_constant_shows_name() {
        assert_eq!(
            "pi",
            Node::constant("pi", std::f64::consts::PI).to_string()
        );
    }

    #[test]
    fn test_display_unary_is_call_syntax() {
        let node = Node::unary(UnaryOp::Sin, Node::variable("x"));
        assert_eq!("sin(x)", node.to_string());
    }

    #[test]
    fn test_display_binary_no_parens_needed() {
        let node = Node::binary(BinaryOp::Add, Node::variable("x"), Node::fixed(2.0));
        assert_eq!("x + 2", node.to_string());
    }

    #[test]
    fn test_display_lower_precedence_child_is_parenthesized() {
        let node = Node::binary(
            BinaryOp::Mul,
            Node::binary(BinaryOp::Add, Node::variable("x"), Node::fixed(1.0)),
            Node::fixed(2.0),
        );
        assert_eq!("(x + 1) * 2", node.to_string());
    }

    #[test]
    fn test_display_right_child_of_left_assoc_same_precedence_is_parenthesized() {
        let node = Node::binary(
            BinaryOp::Sub,
            Node::variable("x"),
            Node::binary(BinaryOp::Sub, Node::variable("y"), Node::variable("z")),
        );
        assert_eq!("x - (y - z)", node.to_string());
    }

    #[test]
    fn test_display_pow_is_right_associative_without_parens() {
        let node = Node::binary(
            BinaryOp::Pow,
            Node::variable("x"),
            Node::binary(BinaryOp::Pow, Node::variable("y"), Node::variable("z")),
        );
        assert_eq!("x ^ y ^ z", node.to_string());
    }

    #[test]
    fn test_display_left_child_of_pow_is_parenthesized() {
        let node = Node::binary(
            BinaryOp::Pow,
            Node::binary(BinaryOp::Pow, Node::variable("x"), Node::variable("y")),
            Node::variable("z"),
        );
        assert_eq!("(x ^ y) ^ z", node.to_string());
    }
}
