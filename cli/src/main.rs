use clap::Parser;
use equate::{load_problem, Context, DiagnosticSink, LineSink, Problem, SolveError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Path to a problem file.
    problem_path: PathBuf,
    /// Assign `name=value` before solving, e.g. `-s F=10`.
    #[clap(long, short, value_parser = parse_assignment)]
    set: Vec<(String, f64)>,
    /// Suppress the "solved analytically" / "solving numerically" trace.
    #[clap(long, short)]
    quiet: bool,
    /// Print the final bindings as a JSON object instead of plain text.
    #[clap(long)]
    json: bool,
}

fn parse_assignment(text: &str) -> Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!(r#"expected "name=value", got "{}""#, text))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!(r#"not a number: "{}""#, value))?;
    Ok((name.trim().to_string(), value))
}

fn main() {
    let cli = Cli::parse();

    let problem = match load_problem(&cli.problem_path) {
        Ok(problem) => problem,
        Err(errors) => {
            let message = errors.iter().map(|err| err.to_string()).collect::<Vec<_>>().join("\n");
            exit_with_error(1, &message)
        }
    };

    let mut ctx = problem.default_context();
    for (name, value) in &cli.set {
        ctx.set(name.clone(), *value);
    }

    let mut sink: Box<dyn DiagnosticSink> = if cli.quiet {
        Box::new(equate::NullSink)
    } else {
        Box::new(LineSink::stdout())
    };

    match problem.solve(&mut ctx, sink.as_mut()) {
        Ok(()) => {
            if cli.json {
                print_solution_json(&problem, &ctx);
            } else {
                print_solution(&problem, &ctx);
            }
            process::exit(0);
        }
        Err(err) => report_solve_error(err),
    }
}

fn print_solution(problem: &Problem, ctx: &Context) {
    for name in problem.variables() {
        match ctx.get(name) {
            Some(value) => println!("{} = {}", name, value),
            None => println!("{} = ?", name),
        }
    }
}

fn print_solution_json(problem: &Problem, ctx: &Context) {
    let bindings: BTreeMap<&str, Option<f64>> = problem
        .variables()
        .iter()
        .map(|name| (name.as_str(), ctx.get(name)))
        .collect();
    match serde_json::to_string_pretty(&bindings) {
        Ok(text) => println!("{}", text),
        Err(err) => exit_with_error(3, &format!("could not serialize result: {}", err)),
    }
}

fn report_solve_error(err: SolveError) -> ! {
    match err {
        SolveError::Overconstrained { .. } | SolveError::Underconstrained { .. } => {
            exit_with_error(2, &format!("{}", err))
        }
        SolveError::DomainError { .. } => exit_with_error(2, &format!("{}", err)),
        SolveError::NumericalFailure { .. } => exit_with_error(3, &format!("{}", err)),
    }
}

fn exit_with_error(code: i32, message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(code)
}
