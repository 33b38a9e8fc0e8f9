//! Numerical root finding, used when symbolic propagation cannot resolve
//! a constraint on its own (design note 4.5).
use crate::context::Context;
use crate::expression::compute::Evaluate;
use crate::expression::types::Node;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::{DMatrix, DVector, Dyn, Owned};
use std::error::Error;
use std::fmt;

/// Iteration cap for the root finder, named and checked explicitly rather
/// than left implicit in the crate's defaults, so "must not block
/// indefinitely" is a property this module's tests can exercise.
pub const MAX_ITERATIONS: u32 = 200;

const FINITE_DIFFERENCE_STEP: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct NumericError {
    pub variables: Vec<String>,
    pub reason: String,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "numerical solve for {:?} did not converge: {}",
            self.variables, self.reason
        )
    }
}

impl Error for NumericError {}

/// A least-squares problem over `equations`: residual `i` is
/// `lhsᵢ(ctx ⊕ x) - rhsᵢ(ctx ⊕ x)` for the current trial point `x`. The
/// Jacobian is built by central-ish forward finite differences since the
/// expression tree has no symbolic derivative.
struct Residuals<'a> {
    base: Context,
    variables: Vec<String>,
    equations: Vec<(&'a Node, &'a Node)>,
    params: DVector<f64>,
}

impl<'a> Residuals<'a> {
    fn context_at(&self, params: &DVector<f64>) -> Context {
        let mut ctx = self.base.clone();
        for (name, value) in self.variables.iter().zip(params.iter()) {
            ctx.set(name.clone(), *value);
        }
        ctx
    }

    fn residuals_at(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        let ctx = self.context_at(params);
        let mut values = Vec::with_capacity(self.equations.len());
        for (lhs, rhs) in &self.equations {
            let l = lhs.value(&ctx)?;
            let r = rhs.value(&ctx)?;
            values.push(l - r);
        }
        Some(DVector::from_vec(values))
    }
}

impl<'a> LeastSquaresProblem<f64, Dyn, Dyn> for Residuals<'a> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, params: &DVector<f64>) {
        self.params = params.clone();
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.residuals_at(&self.params)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let n = self.params.len();
        let m = self.equations.len();
        let base_residuals = self.residuals_at(&self.params)?;
        let mut jacobian = DMatrix::zeros(m, n);
        for j in 0..n {
            let mut perturbed = self.params.clone();
            perturbed[j] += FINITE_DIFFERENCE_STEP;
            let perturbed_residuals = self.residuals_at(&perturbed)?;
            for i in 0..m {
                jacobian[(i, j)] =
                    (perturbed_residuals[i] - base_residuals[i]) / FINITE_DIFFERENCE_STEP;
            }
        }
        Some(jacobian)
    }
}

/// Solve `equations` (pairs of left/right subtrees) for `variables`,
/// seeding the search at `initial` (same order as `variables`) and
/// leaving every other binding in `ctx` untouched. On success, binds each
/// solved variable into `ctx`; on failure or a non-finite result, `ctx` is
/// left unmodified.
pub fn solve(
    ctx: &mut Context,
    variables: &[String],
    equations: &[(&Node, &Node)],
    initial: &[f64],
) -> Result<(), NumericError> {
    let problem = Residuals {
        base: ctx.clone(),
        variables: variables.to_vec(),
        equations: equations.to_vec(),
        params: DVector::from_row_slice(initial),
    };
    let (solved, report) = LevenbergMarquardt::new().minimize(problem);

    let converged = matches!(report.termination, TerminationReason::Converged { .. });
    if !converged {
        return Err(NumericError {
            variables: variables.to_vec(),
            reason: format!("{:?}", report.termination),
        });
    }
    if report.number_of_evaluations as u32 > MAX_ITERATIONS {
        return Err(NumericError {
            variables: variables.to_vec(),
            reason: format!(
                "exceeded {} evaluations without a bounded convergence",
                MAX_ITERATIONS
            ),
        });
    }

    let params = solved.params();
    if !params.iter().all(|value| value.is_finite()) {
        return Err(NumericError {
            variables: variables.to_vec(),
            reason: "solver converged to a non-finite value".to_string(),
        });
    }

    for (name, value) in variables.iter().zip(params.iter()) {
        ctx.set(name.clone(), *value);
    }
    Ok(())
}
