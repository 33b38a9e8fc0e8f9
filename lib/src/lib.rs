//! Constraint-propagation solver for small multivariate algebraic
//! problems: a text-file DSL declares variables and equality constraints,
//! which this crate resolves by symbolic inverse-assignment where
//! possible and numerical root-finding where it isn't.

pub mod constraint;
pub mod context;
pub mod diagnostics;
pub mod expression;
pub mod numeric;
pub mod parser;
pub mod problem;
pub mod template;

pub use constraint::{Constraint, ConstraintError};
pub use context::Context;
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, LineSink, NullSink};
pub use expression::{BinaryOp, Node, UnaryOp};
pub use numeric::NumericError;
pub use parser::{load_problem, load_problem_str, ImportError, ParseError};
pub use problem::{Problem, SolveError};
pub use template::{Instance, Template};
