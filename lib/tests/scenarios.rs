//! End-to-end scenarios against the public API only, parsing inline
//! problem text via `load_problem_str` rather than exercising internals
//! directly.
use equate::{load_problem_str, BinaryOp, Constraint, DiagnosticEvent, Node, NullSink, Problem, Template};

#[test]
fn test_trivial_equality() {
    let problem = load_problem_str("a := 10\na = b").unwrap();
    let mut ctx = problem.default_context();
    problem.solve(&mut ctx, &mut NullSink).unwrap();
    assert_eq!(Some(10.0), ctx.get("a"));
    assert_eq!(Some(10.0), ctx.get("b"));
    assert_eq!(1, problem.constraints().len());
}

#[test]
fn test_newtons_second_law() {
    let problem = load_problem_str("m := 68\na := 9.81\nF = m * a").unwrap();
    let mut ctx = problem.default_context();
    problem.solve(&mut ctx, &mut NullSink).unwrap();
    assert!((ctx.get("F").unwrap() - 667.08).abs() < 1e-9);
}

#[test]
fn test_ph_definition() {
    let problem = load_problem_str("ph := 7\nh = 10 ^ (-1 * ph)").unwrap();
    let mut ctx = problem.default_context();
    problem.solve(&mut ctx, &mut NullSink).unwrap();
    assert!((ctx.get("h").unwrap() - 1e-7).abs() < 1e-12);
}

#[test]
fn test_numerical_fallback_single_variable_repeat() {
    let problem = load_problem_str("sin(x) + x = 1").unwrap();
    let mut ctx = problem.default_context();
    problem.solve(&mut ctx, &mut NullSink).unwrap();
    assert!((ctx.get("x").unwrap() - 0.510_973_4).abs() < 1e-5);
}

#[test]
fn test_coupled_2x2() {
    let problem = load_problem_str("x + y = 3\nx * y = 2").unwrap();
    let mut ctx = problem.default_context();
    problem.solve(&mut ctx, &mut NullSink).unwrap();
    let x = ctx.get("x").unwrap();
    let y = ctx.get("y").unwrap();
    let matches_either = ((x - 1.0).abs() < 1e-5 && (y - 2.0).abs() < 1e-5)
        || ((x - 2.0).abs() < 1e-5 && (y - 1.0).abs() < 1e-5);
    assert!(matches_either, "got x={x}, y={y}");
}

#[test]
fn test_overconstrained() {
    let problem = load_problem_str("a := 1\nb := 2\na = b").unwrap();
    let mut ctx = problem.default_context();
    let err = problem.solve(&mut ctx, &mut NullSink).unwrap_err();
    assert!(matches!(err, equate::SolveError::Overconstrained { .. }));
}

#[test]
fn test_underconstrained() {
    let problem = load_problem_str("x + y = z").unwrap();
    let mut ctx = problem.default_context();
    let err = problem.solve(&mut ctx, &mut NullSink).unwrap_err();
    assert!(matches!(err, equate::SolveError::Underconstrained { .. }));
}

#[test]
fn test_import_cycle_is_reported() {
    use std::fs;

    let dir = std::env::temp_dir().join(format!("equate-import-cycle-{:?}", std::thread::current().id()));
    fs::create_dir_all(&dir).unwrap();
    let a_path = dir.join("a.prob");
    let b_path = dir.join("b.prob");
    fs::write(&a_path, "import(\"b.prob\")\na := 1\n").unwrap();
    fs::write(&b_path, "import(\"a.prob\")\nb := 2\n").unwrap();

    let errors = equate::load_problem(&a_path).unwrap_err();
    assert!(errors.iter().any(|err| matches!(err, equate::ImportError::Cycle { .. })));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_determinism() {
    let problem = load_problem_str("m := 68\na := 9.81\nF = m * a").unwrap();
    let mut first = problem.default_context();
    let mut second = problem.default_context();
    problem.solve(&mut first, &mut NullSink).unwrap();
    problem.solve(&mut second, &mut NullSink).unwrap();
    assert_eq!(first.get("F"), second.get("F"));
}

#[test]
fn test_context_isolation_after_extension() {
    use equate::Context;
    let mut base = Context::new();
    base.set("x", 1.0);
    let mut overrides = Context::new();
    overrides.set("x", 2.0);
    let _merged = base.extended_with(&overrides);
    assert_eq!(Some(1.0), base.get("x"));
}

#[test]
fn test_solve_sequence_keeps_every_constraint_consistent() {
    let problem = load_problem_str("F = m * a").unwrap();
    let mut first = problem.default_context();
    first.set("m", 2.0);
    first.set("a", 3.0);
    let mut second = problem.default_context();
    second.set("m", 4.0);
    second.set("a", 5.0);
    let results = problem.solve_sequence(vec![&mut first, &mut second], &mut NullSink);
    assert!(results.iter().all(|r| r.is_ok()));
    for ctx in [&first, &second] {
        for constraint in problem.constraints() {
            assert_eq!(Some(true), constraint.is_satisfied(ctx));
        }
    }
}

#[test]
fn test_parser_round_trip_every_mentioned_variable_is_declared() {
    let problem = load_problem_str("F = m * a").unwrap();
    let mut names = problem.variables().to_vec();
    names.sort();
    assert_eq!(vec!["F", "a", "m"], names);
}

#[test]
fn test_solve_emits_diagnostic_events_for_analytic_and_numeric_steps() {
    let problem = load_problem_str("sin(x) + x = 1").unwrap();
    let mut ctx = problem.default_context();
    let mut events = Vec::new();
    problem.solve(&mut ctx, &mut events).unwrap();
    assert!(events
        .iter()
        .any(|event| matches!(event, DiagnosticEvent::SolvingNumerically { .. })));
}

#[test]
fn test_two_template_instances_compose_into_one_problem_without_colliding() {
    let ohm = Constraint::new(
        "ohm",
        Node::variable("v"),
        Node::binary(BinaryOp::Mul, Node::variable("i"), Node::variable("r")),
    );
    let resistor = Template::new(
        "resistor",
        vec!["v".to_string(), "i".to_string(), "r".to_string()],
        vec![ohm],
    );
    let r1 = resistor.instantiate("r1");
    let r2 = resistor.instantiate("r2");

    let mut problem = Problem::new(Vec::new(), Vec::new(), equate::Context::new());
    problem.add_instance(&r1);
    problem.add_instance(&r2);
    assert_eq!(6, problem.variables().len());
    assert_eq!(2, problem.constraints().len());

    let mut ctx = problem.default_context();
    ctx.set("r1.v", 10.0);
    ctx.set("r1.i", 2.0);
    ctx.set("r2.v", 9.0);
    ctx.set("r2.i", 3.0);
    problem.solve(&mut ctx, &mut NullSink).unwrap();
    assert_eq!(Some(5.0), ctx.get("r1.r"));
    assert_eq!(Some(3.0), ctx.get("r2.r"));
}
