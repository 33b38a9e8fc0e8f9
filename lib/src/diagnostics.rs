//! Explicit diagnostic sink, replacing a global process-wide print.
use std::fmt;
use std::io::{self, Write};

/// One observable event in the life of a solve. Carries the same
/// information a caller would otherwise have had to scrape from stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    SolvedAnalytically { constraint: String },
    SolvingNumerically { constraints: Vec<String> },
    Overconstrained { constraint: String },
    Underconstrained { variables: Vec<String> },
    NumericalFailure { variables: Vec<String>, reason: String },
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::SolvedAnalytically { constraint } => {
                write!(f, "solved `{}` analytically", constraint)
            }
            DiagnosticEvent::SolvingNumerically { constraints } => {
                write!(f, "solving {} numerically", constraints.join(", "))
            }
            DiagnosticEvent::Overconstrained { constraint } => {
                write!(f, "`{}` is overconstrained", constraint)
            }
            DiagnosticEvent::Underconstrained { variables } => {
                write!(f, "underconstrained: {} has no binding", variables.join(", "))
            }
            DiagnosticEvent::NumericalFailure { variables, reason } => {
                write!(
                    f,
                    "numerical solve for {} failed: {}",
                    variables.join(", "),
                    reason
                )
            }
        }
    }
}

/// Receives diagnostic events as a solve progresses. Implementations
/// choose whether to print, collect, or discard them; the solver itself
/// never writes to stdout.
pub trait DiagnosticSink {
    fn emit(&mut self, event: DiagnosticEvent);
}

/// A no-op sink, for callers that only care about the final `Result`.
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _event: DiagnosticEvent) {}
}

impl DiagnosticSink for Vec<DiagnosticEvent> {
    fn emit(&mut self, event: DiagnosticEvent) {
        self.push(event);
    }
}

/// Writes each event's `Display` form as a line to any `io::Write`,
/// used by the command-line host.
pub struct LineSink<W: Write> {
    writer: W,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W) -> LineSink<W> {
        LineSink { writer }
    }
}

impl LineSink<io::Stdout> {
    pub fn stdout() -> LineSink<io::Stdout> {
        LineSink::new(io::stdout())
    }
}

impl<W: Write> DiagnosticSink for LineSink<W> {
    fn emit(&mut self, event: DiagnosticEvent) {
        let _ = writeln!(self.writer, "{}", event);
    }
}
