//! The solver: a bundle of variables and equality constraints, solved by
//! repeated classification of each pending constraint (design note 4.4).
use crate::constraint::{Constraint, ConstraintError};
use crate::context::Context;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::expression::types::Node;
use crate::numeric::{self, NumericError};
use crate::template::Instance;
use std::collections::HashSet;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    Overconstrained {
        constraint: String,
    },
    DomainError {
        constraint: String,
        function: &'static str,
        value: f64,
    },
    Underconstrained {
        variables: Vec<String>,
    },
    NumericalFailure {
        variables: Vec<String>,
        reason: String,
    },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Overconstrained { constraint } => {
                write!(f, "constraint `{}` is overconstrained", constraint)
            }
            SolveError::DomainError {
                constraint,
                function,
                value,
            } => write!(
                f,
                "constraint `{}` requires {} at {}, which leaves the reals",
                constraint, function, value
            ),
            SolveError::Underconstrained { variables } => {
                write!(f, "underconstrained: {} have no binding", variables.join(", "))
            }
            SolveError::NumericalFailure { variables, reason } => write!(
                f,
                "numerical solve for {} failed: {}",
                variables.join(", "),
                reason
            ),
        }
    }
}

impl Error for SolveError {}

impl From<ConstraintError> for SolveError {
    fn from(err: ConstraintError) -> Self {
        match err {
            ConstraintError::Overconstrained { name, .. } => SolveError::Overconstrained { constraint: name },
            ConstraintError::DomainError {
                name,
                function,
                value,
            } => SolveError::DomainError {
                constraint: name,
                function,
                value,
            },
            ConstraintError::Stuck { name } => SolveError::Overconstrained { constraint: name },
        }
    }
}

impl From<NumericError> for SolveError {
    fn from(err: NumericError) -> Self {
        SolveError::NumericalFailure {
            variables: err.variables,
            reason: err.reason,
        }
    }
}

/// A complete problem: the variables it declares and the equality
/// constraints between them, plus whatever initial bindings the problem
/// text supplied via `:=`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Problem {
    variables: Vec<String>,
    constraints: Vec<Constraint>,
    initial_context: Context,
}

impl Problem {
    pub fn new(variables: Vec<String>, constraints: Vec<Constraint>, initial_context: Context) -> Problem {
        Problem {
            variables,
            constraints,
            initial_context,
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Merge an object/class template `Instance` into this problem: its
    /// already-renamed variables are declared alongside this problem's own
    /// (skipping any that happen to already be declared) and its
    /// constraints are appended. The instance's variables are namespaced
    /// by construction (`instance_name.local_name`), so two instances of
    /// the same template never collide.
    pub fn add_instance(&mut self, instance: &Instance) {
        for name in instance.variables() {
            if !self.variables.iter().any(|v| v == name) {
                self.variables.push(name.clone());
            }
        }
        self.constraints.extend(instance.constraints().iter().cloned());
    }

    /// A fresh copy of the bindings declared with `:=` in the problem
    /// text. Mutating the result never affects this `Problem`.
    pub fn default_context(&self) -> Context {
        self.initial_context.copy()
    }

    /// Solve starting from `ctx`'s current bindings, with no reference
    /// context to seed the numerical fallback.
    pub fn solve(&self, ctx: &mut Context, sink: &mut dyn DiagnosticSink) -> Result<(), SolveError> {
        self.solve_with_reference(ctx, None, sink)
    }

    /// Solve starting from `ctx`, using `reference` (when given) to seed
    /// the initial guess for any numerical fallback — typically the
    /// solution of a nearby problem instance.
    pub fn solve_with_reference(
        &self,
        ctx: &mut Context,
        reference: Option<&Context>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), SolveError> {
        let mut pending: Vec<&Constraint> = self.constraints.iter().collect();

        loop {
            let mut progressed = false;
            let mut still_pending = Vec::new();

            for constraint in pending {
                let undefined = constraint.undefined_variables(ctx);
                let distinct: HashSet<&String> = undefined.iter().collect();

                if undefined.is_empty() {
                    constraint.propagate(ctx)?;
                    progressed = true;
                    continue;
                }

                if distinct.len() == 1 && undefined.len() == 1 {
                    constraint.propagate(ctx)?;
                    sink.emit(DiagnosticEvent::SolvedAnalytically {
                        constraint: constraint.name().to_string(),
                    });
                    progressed = true;
                    continue;
                }

                if distinct.len() == 1 {
                    let name = undefined[0].clone();
                    let seed = reference.and_then(|r| r.get(&name)).unwrap_or(0.0);
                    sink.emit(DiagnosticEvent::SolvingNumerically {
                        constraints: vec![constraint.name().to_string()],
                    });
                    numeric::solve(
                        ctx,
                        std::slice::from_ref(&name),
                        &[(constraint.lhs(), constraint.rhs())],
                        &[seed],
                    )?;
                    progressed = true;
                    continue;
                }

                still_pending.push(constraint);
            }

            pending = still_pending;
            if pending.is_empty() || !progressed {
                break;
            }
        }

        if !pending.is_empty() {
            self.solve_coupled(&pending, ctx, reference, sink)?;
        }

        let unresolved: Vec<String> = self
            .variables
            .iter()
            .filter(|name| ctx.get(name).is_none())
            .cloned()
            .collect();
        if !unresolved.is_empty() {
            sink.emit(DiagnosticEvent::Underconstrained {
                variables: unresolved.clone(),
            });
            return Err(SolveError::Underconstrained {
                variables: unresolved,
            });
        }

        Ok(())
    }

    /// Jointly solve the constraints that symbolic propagation could not
    /// pick apart: more than one distinct unknown remains among them.
    fn solve_coupled(
        &self,
        pending: &[&Constraint],
        ctx: &mut Context,
        reference: Option<&Context>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), SolveError> {
        let mut variable_names: Vec<String> = Vec::new();
        for constraint in pending {
            for name in constraint.undefined_variables(ctx) {
                if !variable_names.contains(&name) {
                    variable_names.push(name);
                }
            }
        }

        if variable_names.len() > pending.len() {
            sink.emit(DiagnosticEvent::Underconstrained {
                variables: variable_names.clone(),
            });
            return Err(SolveError::Underconstrained {
                variables: variable_names,
            });
        }

        let equations: Vec<(&Node, &Node)> = pending.iter().map(|c| (c.lhs(), c.rhs())).collect();
        let initial: Vec<f64> = variable_names
            .iter()
            .map(|name| reference.and_then(|r| r.get(name)).unwrap_or(0.0))
            .collect();

        sink.emit(DiagnosticEvent::SolvingNumerically {
            constraints: pending.iter().map(|c| c.name().to_string()).collect(),
        });

        numeric::solve(ctx, &variable_names, &equations, &initial)?;
        Ok(())
    }

    /// Solve the same problem across a sequence of contexts, warm-
    /// starting each numerical fallback from the previous context's
    /// solution. Returns one result per input context, in order.
    pub fn solve_sequence<'a>(
        &self,
        contexts: impl IntoIterator<Item = &'a mut Context>,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<Result<(), SolveError>> {
        let mut results = Vec::new();
        let mut reference: Option<Context> = None;
        for ctx in contexts {
            let result = self.solve_with_reference(ctx, reference.as_ref(), sink);
            if result.is_ok() {
                reference = Some(ctx.copy());
            }
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::expression::types::BinaryOp;

    fn newton_problem() -> Problem {
        let constraint = Constraint::new(
            "newton2",
            Node::variable("F"),
            Node::binary(BinaryOp::Mul, Node::variable("m"), Node::variable("a")),
        );
        Problem::new(
            vec!["F".to_string(), "m".to_string(), "a".to_string()],
            vec![constraint],
            Context::new(),
        )
    }

    #[test]
    fn test_solve_propagates_single_unknown() {
        let problem = newton_problem();
        let mut ctx = problem.default_context();
        ctx.set("F", 10.0);
        ctx.set("m", 2.0);
        problem.solve(&mut ctx, &mut NullSink).unwrap();
        assert_eq!(Some(5.0), ctx.get("a"));
    }

    #[test]
    fn test_solve_underconstrained() {
        let problem = newton_problem();
        let mut ctx = problem.default_context();
        ctx.set("F", 10.0);
        let err = problem.solve(&mut ctx, &mut NullSink).unwrap_err();
        assert!(matches!(err, SolveError::Underconstrained { .. }));
    }

    #[test]
    fn test_solve_overconstrained() {
        let problem = newton_problem();
        let mut ctx = problem.default_context();
        ctx.set("F", 7.0);
        ctx.set("m", 2.0);
        ctx.set("a", 3.0);
        let err = problem.solve(&mut ctx, &mut NullSink).unwrap_err();
        assert!(matches!(err, SolveError::Overconstrained { .. }));
    }

    #[test]
    fn test_solve_coupled_underconstrained_fails_without_attempting_numeric() {
        let c1 = Constraint::new(
            "sum",
            Node::binary(BinaryOp::Add, Node::variable("x"), Node::variable("y")),
            Node::variable("z"),
        );
        let problem = Problem::new(
            vec!["x".to_string(), "y".to_string(), "z".to_string()],
            vec![c1],
            Context::new(),
        );
        let mut ctx = problem.default_context();
        let err = problem.solve(&mut ctx, &mut NullSink).unwrap_err();
        assert!(matches!(err, SolveError::Underconstrained { .. }));
    }

    #[test]
    fn test_solve_coupled_system_falls_back_to_numeric() {
        let c1 = Constraint::new(
            "sum",
            Node::binary(BinaryOp::Add, Node::variable("x"), Node::variable("y")),
            Node::fixed(10.0),
        );
        let c2 = Constraint::new(
            "difference",
            Node::binary(BinaryOp::Sub, Node::variable("x"), Node::variable("y")),
            Node::fixed(2.0),
        );
        let problem = Problem::new(
            vec!["x".to_string(), "y".to_string()],
            vec![c1, c2],
            Context::new(),
        );
        let mut ctx = problem.default_context();
        problem.solve(&mut ctx, &mut NullSink).unwrap();
        assert!((ctx.get("x").unwrap() - 6.0).abs() < 1e-5);
        assert!((ctx.get("y").unwrap() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_solve_emits_analytic_diagnostic() {
        let problem = newton_problem();
        let mut ctx = problem.default_context();
        ctx.set("F", 10.0);
        ctx.set("m", 2.0);
        let mut events = Vec::new();
        problem.solve(&mut ctx, &mut events).unwrap();
        assert!(events
            .iter()
            .any(|event| matches!(event, DiagnosticEvent::SolvedAnalytically { .. })));
    }

    #[test]
    fn test_solve_sequence_warm_starts_from_previous_solution() {
        let c1 = Constraint::new(
            "square",
            Node::binary(BinaryOp::Pow, Node::variable("x"), Node::fixed(2.0)),
            Node::variable("target"),
        );
        let problem = Problem::new(vec!["x".to_string()], vec![c1], Context::new());
        let mut first = problem.default_context();
        first.set("target", 9.0);
        let mut second = problem.default_context();
        second.set("target", 16.0);
        let results = problem.solve_sequence(vec![&mut first, &mut second], &mut NullSink);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!((first.get("x").unwrap() - 3.0).abs() < 1e-5);
        assert!((second.get("x").unwrap() - 4.0).abs() < 1e-5);
    }
}
