//! Equality constraints between two expression subtrees.
use crate::context::Context;
use crate::expression::compute::{AssignError, Evaluate, EQUALITY_TOLERANCE};
use crate::expression::types::Node;
use std::error::Error;
use std::fmt;

/// `lhs == rhs`, the only constraint kind this solver currently supports.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    name: String,
    lhs: Node,
    rhs: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintError {
    Overconstrained {
        name: String,
        expected: f64,
        actual: f64,
    },
    DomainError {
        name: String,
        function: &'static str,
        value: f64,
    },
    /// Propagation was attempted with more than one undefined variable
    /// left in the constraint; the problem-level solve loop is expected
    /// to never call `propagate` in that state.
    Stuck {
        name: String,
    },
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintError::Overconstrained {
                name,
                expected,
                actual,
            } => write!(
                f,
                "constraint `{}` is overconstrained: left side is {} but right side is {}",
                name, expected, actual
            ),
            ConstraintError::DomainError {
                name,
                function,
                value,
            } => write!(
                f,
                "constraint `{}` requires {} at {}, which leaves the reals",
                name, function, value
            ),
            ConstraintError::Stuck { name } => {
                write!(f, "constraint `{}` has no single unknown to solve for", name)
            }
        }
    }
}

impl Error for ConstraintError {}

impl Constraint {
    pub fn new(name: impl Into<String>, lhs: Node, rhs: Node) -> Constraint {
        Constraint {
            name: name.into(),
            lhs,
            rhs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lhs(&self) -> &Node {
        &self.lhs
    }

    pub fn rhs(&self) -> &Node {
        &self.rhs
    }

    /// Canonical `lhs = rhs` textual form, independent of the name.
    pub fn text_formula(&self) -> String {
        format!("{} = {}", self.lhs, self.rhs)
    }

    /// Undefined variables across both sides, left to right, duplicates
    /// kept (the solver uses the count and the duplicate shape to decide
    /// between symbolic propagation and numerical solving).
    pub fn undefined_variables(&self, ctx: &Context) -> Vec<String> {
        let mut names = self.lhs.undefined_variables(ctx);
        names.extend(self.rhs.undefined_variables(ctx));
        names
    }

    /// Whether both sides currently evaluate and agree within tolerance.
    pub fn is_satisfied(&self, ctx: &Context) -> Option<bool> {
        let lv = self.lhs.value(ctx)?;
        let rv = self.rhs.value(ctx)?;
        Some((lv - rv).abs() <= EQUALITY_TOLERANCE)
    }

    /// Resolve this constraint's single remaining unknown against `ctx`,
    /// mutating it in place. Mirrors the four-way branch of the
    /// distilled-from source's `EqualityConstraint.propagate`: both sides
    /// known is a pass/fail check, exactly one side known assigns into
    /// the other, and neither known is a no-op left for the caller.
    pub fn propagate(&self, ctx: &mut Context) -> Result<(), ConstraintError> {
        let lv = self.lhs.value(ctx);
        let rv = self.rhs.value(ctx);
        match (lv, rv) {
            (None, None) => Ok(()),
            (Some(lv), None) => self.rhs.assign(lv, ctx).map_err(|err| self.wrap(err)),
            (None, Some(rv)) => self.lhs.assign(rv, ctx).map_err(|err| self.wrap(err)),
            (Some(lv), Some(rv)) => {
                if (lv - rv).abs() <= EQUALITY_TOLERANCE {
                    Ok(())
                } else {
                    Err(ConstraintError::Overconstrained {
                        name: self.name.clone(),
                        expected: lv,
                        actual: rv,
                    })
                }
            }
        }
    }

    fn wrap(&self, err: AssignError) -> ConstraintError {
        match err {
            AssignError::Overconstrained {
                expected, actual, ..
            } => ConstraintError::Overconstrained {
                name: self.name.clone(),
                expected,
                actual,
            },
            AssignError::DomainError {
                function, value, ..
            } => ConstraintError::DomainError {
                name: self.name.clone(),
                function,
                value,
            },
            AssignError::NoProgress { .. } => ConstraintError::Stuck {
                name: self.name.clone(),
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.text_formula())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::types::BinaryOp;

    fn newtons_second_law() -> Constraint {
        // F = m * a
        Constraint::new(
            "newton2",
            Node::variable("F"),
            Node::binary(BinaryOp::Mul, Node::variable("m"), Node::variable("a")),
        )
    }

    #[test]
    fn test_propagate_assigns_into_rhs() {
        let constraint = newtons_second_law();
        let mut ctx = Context::new();
        ctx.set("F", 10.0);
        ctx.set("m", 2.0);
        constraint.propagate(&mut ctx).unwrap();
        assert_eq!(Some(5.0), ctx.get("a"));
    }

    #[test]
    fn test_propagate_assigns_into_lhs() {
        let constraint = newtons_second_law();
        let mut ctx = Context::new();
        ctx.set("m", 2.0);
        ctx.set("a", 3.0);
        constraint.propagate(&mut ctx).unwrap();
        assert_eq!(Some(6.0), ctx.get("F"));
    }

    #[test]
    fn test_propagate_both_known_and_equal_is_ok() {
        let constraint = newtons_second_law();
        let mut ctx = Context::new();
        ctx.set("F", 6.0);
        ctx.set("m", 2.0);
        ctx.set("a", 3.0);
        assert!(constraint.propagate(&mut ctx).is_ok());
    }

    #[test]
    fn test_propagate_both_known_and_unequal_is_overconstrained() {
        let constraint = newtons_second_law();
        let mut ctx = Context::new();
        ctx.set("F", 7.0);
        ctx.set("m", 2.0);
        ctx.set("a", 3.0);
        let err = constraint.propagate(&mut ctx).unwrap_err();
        assert!(matches!(err, ConstraintError::Overconstrained { .. }));
    }

    #[test]
    fn test_propagate_both_unknown_is_a_no_op() {
        let constraint = newtons_second_law();
        let mut ctx = Context::new();
        ctx.set("m", 2.0);
        assert!(constraint.propagate(&mut ctx).is_ok());
        assert_eq!(None, ctx.get("F"));
        assert_eq!(None, ctx.get("a"));
    }

    #[test]
    fn test_undefined_variables_counts_across_both_sides() {
        let constraint = newtons_second_law();
        let ctx = Context::new();
        let mut names = constraint.undefined_variables(&ctx);
        names.sort();
        assert_eq!(vec!["F", "a", "m"], names);
    }

    #[test]
    fn test_text_formula() {
        let constraint = newtons_second_law();
        assert_eq!("F = m * a", constraint.text_formula());
    }
}
