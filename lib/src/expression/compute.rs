//! Forward evaluation and inverse assignment over an expression tree.
use super::types::{BinaryNode, BinaryOp, ConstantNode, Node, UnaryNode, UnaryOp, VariableNode};
use crate::context::Context;
use std::error::Error;
use std::fmt;

/// Tolerance used when comparing a computed value against a target,
/// matching the distilled-from source's `10 * machine epsilon`.
pub const EQUALITY_TOLERANCE: f64 = 10.0 * f64::EPSILON;

fn close_enough(a: f64, b: f64) -> bool {
    (a - b).abs() <= EQUALITY_TOLERANCE
}

/// Errors that can occur while pushing a target value down into a node
/// that does not yet hold it.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignError {
    /// The node already has a value and it disagrees with the target.
    Overconstrained {
        node: String,
        expected: f64,
        actual: f64,
    },
    /// Inverting the node for this target would require leaving the reals
    /// (e.g. `asin` outside `[-1, 1]`, `ln` of a non-positive number).
    DomainError {
        node: String,
        function: &'static str,
        value: f64,
    },
    /// Neither side of a binary node is defined yet, so there is nothing
    /// to invert here; this is not user-facing failure, it tells the
    /// caller to try a different path.
    NoProgress { node: String },
}

impl fmt::Display for AssignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignError::Overconstrained {
                node,
                expected,
                actual,
            } => write!(
                f,
                "node `{}` is already {} but the constraint requires {}",
                node, actual, expected
            ),
            AssignError::DomainError {
                node,
                function,
                value,
            } => write!(
                f,
                "inverting `{}` through {} at {} leaves the reals",
                node, function, value
            ),
            AssignError::NoProgress { node } => {
                write!(f, "node `{}` has no defined side to invert from", node)
            }
        }
    }
}

impl Error for AssignError {}

/// Forward value and inverse assignment over a node, the two operations
/// constraint propagation is built from.
pub trait Evaluate {
    /// Evaluate bottom-up using the bindings in `ctx`, or `None` if some
    /// variable along the way is undefined, or if the result would leave
    /// the reals (e.g. `0f64.powf(-1.0)` producing infinity).
    fn value(&self, ctx: &Context) -> Option<f64>;
    /// Push `target` down into this node, binding whichever descendant
    /// variable is still free. Requires that at most one input is
    /// undefined; use `undefined_variables` to check first.
    fn assign(&self, target: f64, ctx: &mut Context) -> Result<(), AssignError>;
}

impl Evaluate for Node {
    fn value(&self, ctx: &Context) -> Option<f64> {
        match self {
            Node::Fixed(v) => Some(*v),
            Node::Constant(c) => c.value(ctx),
            Node::Variable(v) => v.value(ctx),
            Node::Unary(u) => u.value(ctx),
            Node::Binary(b) => b.value(ctx),
        }
    }

    fn assign(&self, target: f64, ctx: &mut Context) -> Result<(), AssignError> {
        match self {
            Node::Fixed(v) => {
                if close_enough(*v, target) {
                    Ok(())
                } else {
                    Err(AssignError::Overconstrained {
                        node: self.to_string(),
                        expected: target,
                        actual: *v,
                    })
                }
            }
            Node::Constant(c) => c.assign(target, ctx),
            Node::Variable(v) => v.assign(target, ctx),
            Node::Unary(u) => u.assign(target, ctx),
            Node::Binary(b) => b.assign(target, ctx),
        }
    }
}

impl Evaluate for ConstantNode {
    fn value(&self, _ctx: &Context) -> Option<f64> {
        Some(self.value)
    }

    fn assign(&self, target: f64, _ctx: &mut Context) -> Result<(), AssignError> {
        if close_enough(self.value, target) {
            Ok(())
        } else {
            Err(AssignError::Overconstrained {
                node: self.name.clone(),
                expected: target,
                actual: self.value,
            })
        }
    }
}

impl Evaluate for VariableNode {
    fn value(&self, ctx: &Context) -> Option<f64> {
        ctx.get(&self.name)
    }

    fn assign(&self, target: f64, ctx: &mut Context) -> Result<(), AssignError> {
        match ctx.get(&self.name) {
            Some(current) if !close_enough(current, target) => Err(AssignError::Overconstrained {
                node: self.name.clone(),
                expected: target,
                actual: current,
            }),
            _ => {
                ctx.set(&self.name, target);
                Ok(())
            }
        }
    }
}

impl Evaluate for UnaryNode {
    fn value(&self, ctx: &Context) -> Option<f64> {
        let arg = self.arg.value(ctx)?;
        let result = apply_unary(self.op, arg);
        if result.is_finite() {
            Some(result)
        } else {
            None
        }
    }

    fn assign(&self, target: f64, ctx: &mut Context) -> Result<(), AssignError> {
        if let Some(arg) = self.arg.value(ctx) {
            let computed = apply_unary(self.op, arg);
            return if close_enough(computed, target) {
                Ok(())
            } else {
                Err(AssignError::Overconstrained {
                    node: Node::Unary(self.clone()).to_string(),
                    expected: target,
                    actual: computed,
                })
            };
        }
        let inverse = match self.op {
            UnaryOp::Sin => {
                if !(-1.0..=1.0).contains(&target) {
                    return Err(AssignError::DomainError {
                        node: Node::Unary(self.clone()).to_string(),
                        function: "asin",
                        value: target,
                    });
                }
                target.asin()
            }
            UnaryOp::Cos => {
                if !(-1.0..=1.0).contains(&target) {
                    return Err(AssignError::DomainError {
                        node: Node::Unary(self.clone()).to_string(),
                        function: "acos",
                        value: target,
                    });
                }
                target.acos()
            }
            UnaryOp::Tan => target.atan(),
        };
        self.arg.assign(inverse, ctx)
    }
}

impl Evaluate for BinaryNode {
    fn value(&self, ctx: &Context) -> Option<f64> {
        let left = self.left.value(ctx)?;
        let right = self.right.value(ctx)?;
        let result = apply_binary(self.op, left, right);
        if result.is_finite() {
            Some(result)
        } else {
            None
        }
    }

    fn assign(&self, target: f64, ctx: &mut Context) -> Result<(), AssignError> {
        let left = self.left.value(ctx);
        let right = self.right.value(ctx);
        match (left, right) {
            (Some(l), Some(r)) => {
                let computed = apply_binary(self.op, l, r);
                if close_enough(computed, target) {
                    Ok(())
                } else {
                    Err(AssignError::Overconstrained {
                        node: Node::Binary(self.clone()).to_string(),
                        expected: target,
                        actual: computed,
                    })
                }
            }
            (Some(l), None) => {
                let r = self.invert_right(l, target)?;
                self.right.assign(r, ctx)
            }
            (None, Some(r)) => {
                let l = self.invert_left(r, target)?;
                self.left.assign(l, ctx)
            }
            (None, None) => Err(AssignError::NoProgress {
                node: Node::Binary(self.clone()).to_string(),
            }),
        }
    }
}

impl BinaryNode {
    /// Solve `self.op(left, r) == target` for `r`, given `left`.
    fn invert_right(&self, left: f64, target: f64) -> Result<f64, AssignError> {
        let value = match self.op {
            BinaryOp::Add => target - left,
            BinaryOp::Sub => left - target,
            BinaryOp::Mul => target / left,
            BinaryOp::Div => left / target,
            BinaryOp::Pow => target.ln() / left.ln(),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(AssignError::DomainError {
                node: Node::Binary(self.clone()).to_string(),
                function: "ln",
                value: target,
            })
        }
    }

    /// Solve `self.op(l, right) == target` for `l`, given `right`.
    fn invert_left(&self, right: f64, target: f64) -> Result<f64, AssignError> {
        let value = match self.op {
            BinaryOp::Add => target - right,
            BinaryOp::Sub => target + right,
            BinaryOp::Mul => target / right,
            BinaryOp::Div => target * right,
            BinaryOp::Pow => target.powf(1.0 / right),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(AssignError::DomainError {
                node: Node::Binary(self.clone()).to_string(),
                function: "powf",
                value: target,
            })
        }
    }
}

fn apply_unary(op: UnaryOp, arg: f64) -> f64 {
    match op {
        UnaryOp::Sin => arg.sin(),
        UnaryOp::Cos => arg.cos(),
        UnaryOp::Tan => arg.tan(),
    }
}

fn apply_binary(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Pow => left.powf(right),
    }
}
