//! Behavioural coverage for the propagation pass and the engine façade.

use hashbrown::HashMap;

use crate::engine::{Engine, SolveReport};
use crate::solve::context::{run_pass, ExprMode, PassInput};
use crate::types::{ConnectorId, ConstraintId, ConstraintKind};

/// Create a fully wired three-port constraint and its connectors.
fn wire(engine: &mut Engine, kind: ConstraintKind) -> (ConstraintId, [ConnectorId; 3]) {
    let connectors = [
        engine.create_connector(),
        engine.create_connector(),
        engine.create_connector(),
    ];
    let constraint = engine.create_constraint(kind);
    for (port, connector) in connectors.iter().enumerate() {
        engine.connect(constraint, port, *connector).expect("connect");
    }
    (constraint, connectors)
}

fn value_of(report: &SolveReport, connector: ConnectorId) -> f64 {
    report
        .resolved
        .get(&connector)
        .unwrap_or_else(|| panic!("{connector:?} should be resolved"))
        .value
}

// --- Seeding & propagation ----------------------------------------------

#[test]
fn adder_resolves_the_missing_port() {
    let mut engine = Engine::new();
    let (add, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(c, 10.0).expect("set c");

    let report = engine.solve();
    assert_eq!(value_of(&report, b), 7.0);
    let resolved = report.resolved.get(&b).expect("b resolved");
    assert_eq!(resolved.informant, Some(add));
    assert!(resolved.was_dependent);
    assert!(report.conflicts.is_empty());
}

#[test]
fn unresolved_connectors_stay_absent() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 3.0).expect("set a");

    let report = engine.solve();
    assert!(report.resolved.contains_key(&a));
    assert!(!report.resolved.contains_key(&b));
    assert!(!report.resolved.contains_key(&c));
}

#[test]
fn values_chain_through_constraints() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    let d = engine.create_connector();
    let e = engine.create_connector();
    let mul = engine.create_constraint(ConstraintKind::Multiplier);
    engine.connect(mul, 0, c).expect("connect c");
    engine.connect(mul, 1, d).expect("connect d");
    engine.connect(mul, 2, e).expect("connect e");

    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(b, 4.0).expect("set b");
    engine.set_explicit_value(d, 2.0).expect("set d");

    let report = engine.solve();
    assert_eq!(value_of(&report, c), 7.0);
    assert_eq!(value_of(&report, e), 14.0);
    let e_resolved = report.resolved.get(&e).expect("e resolved");
    assert_eq!(e_resolved.expression.to_string(), "(3 + 4) × 2");
}

#[test]
fn dependent_connectors_seed_before_the_priority_walk() {
    let mut engine = Engine::new();
    let (add, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 1.0).expect("set a");
    engine.set_explicit_value(b, 2.0).expect("set b");
    engine.solve();

    // Hold the displayed sum steady and move one operand: the other operand
    // gives way instead of the sum.
    engine.set_dependents(vec![c]);
    engine.set_explicit_value(a, 5.0).expect("set a");
    let report = engine.solve();

    assert_eq!(value_of(&report, c), 3.0);
    assert_eq!(value_of(&report, b), -2.0);
    assert_eq!(
        report.resolved.get(&b).expect("b resolved").informant,
        Some(add)
    );
    assert!(report.conflicts.is_empty());
}

#[test]
fn priority_order_decides_which_connector_gives_way() {
    let mut engine = Engine::new();
    let (add, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 1.0).expect("set a");
    engine.set_explicit_value(b, 2.0).expect("set b");
    let first = engine.solve();
    assert_eq!(
        first.resolved.get(&c).expect("c resolved").informant,
        Some(add)
    );

    // Fronting c then a seeds them first next pass, so b becomes the
    // computed port.
    engine.move_to_front(c);
    engine.move_to_front(a);
    let report = engine.solve();
    assert_eq!(value_of(&report, b), 2.0);
    assert_eq!(
        report.resolved.get(&b).expect("b resolved").informant,
        Some(add)
    );
    assert_eq!(report.resolved.get(&c).expect("c resolved").informant, None);
}

// --- Determinism ---------------------------------------------------------

#[test]
fn identical_inputs_solve_identically() {
    let mut engine = Engine::new();
    let (_, [a, _, c]) = wire(&mut engine, ConstraintKind::Adder);
    let overrides: HashMap<ConnectorId, f64> = [(a, 3.0), (c, 10.0)].into_iter().collect();
    let bindings = HashMap::new();

    let run = || {
        run_pass(PassInput {
            graph: engine.graph(),
            priority: engine.priority(),
            overrides: &overrides,
            bindings: &bindings,
            dependents: &[],
            previous: None,
            mode: ExprMode::Rewrite,
        })
    };
    assert_eq!(run(), run());
}

// --- Conflicts & domains -------------------------------------------------

#[test]
fn disagreeing_informants_flag_a_conflict_and_keep_the_first_value() {
    let mut engine = Engine::new();
    let a = engine.create_connector();
    let b = engine.create_connector();
    let x = engine.create_connector();
    let add = engine.create_constraint(ConstraintKind::Adder);
    let mul = engine.create_constraint(ConstraintKind::Multiplier);
    for (port, connector) in [(0, a), (1, b), (2, x)] {
        engine.connect(add, port, connector).expect("wire adder");
        engine.connect(mul, port, connector).expect("wire multiplier");
    }
    engine.set_explicit_value(a, 1.0).expect("set a");
    engine.set_explicit_value(b, 2.0).expect("set b");

    let report = engine.solve();
    // The adder was wired first, so it informs x before the multiplier
    // recomputes it as 2.
    assert_eq!(value_of(&report, x), 3.0);
    assert_eq!(
        report.resolved.get(&x).expect("x resolved").informant,
        Some(add)
    );
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.conflicts.contains(&x));
}

#[test]
fn division_by_zero_is_a_conflict_not_a_crash() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Multiplier);
    engine.set_explicit_value(b, 0.0).expect("set b");
    engine.set_explicit_value(c, 5.0).expect("set c");

    let report = engine.solve();
    assert!(!report.resolved.contains_key(&a));
    assert!(report.conflicts.contains(&a));
}

#[test]
fn zero_times_anything_is_indeterminate_not_conflicting() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Multiplier);
    engine.set_explicit_value(b, 0.0).expect("set b");
    engine.set_explicit_value(c, 0.0).expect("set c");

    let report = engine.solve();
    assert!(!report.resolved.contains_key(&a));
    assert!(report.conflicts.is_empty());
}

#[test]
fn overflowing_arithmetic_reports_a_conflict() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Multiplier);
    engine.set_explicit_value(a, f64::MAX).expect("set a");
    engine.set_explicit_value(b, f64::MAX).expect("set b");

    let report = engine.solve();
    assert!(!report.resolved.contains_key(&c));
    assert!(report.conflicts.contains(&c));
}

#[test]
fn exponent_solves_each_port_on_its_real_branch() {
    // Forward power.
    let mut engine = Engine::new();
    let (_, [base, exponent, result]) = wire(&mut engine, ConstraintKind::Exponent);
    engine.set_explicit_value(base, 2.0).expect("set base");
    engine.set_explicit_value(exponent, 3.0).expect("set exponent");
    let report = engine.solve();
    assert!((value_of(&report, result) - 8.0).abs() < 1e-9);

    // Even root of a known result: the non-negative branch, no conflict.
    let mut engine = Engine::new();
    let (pow, [base, exponent, result]) = wire(&mut engine, ConstraintKind::Exponent);
    engine.set_explicit_value(exponent, 2.0).expect("set exponent");
    engine.set_explicit_value(result, 9.0).expect("set result");
    let report = engine.solve();
    assert!((value_of(&report, base) - 3.0).abs() < 1e-9);
    assert_eq!(
        report.resolved.get(&base).expect("base resolved").informant,
        Some(pow)
    );
    assert!(report.conflicts.is_empty());

    // Solving the exponent goes through the logarithm.
    let mut engine = Engine::new();
    let (_, [base, exponent, result]) = wire(&mut engine, ConstraintKind::Exponent);
    engine.set_explicit_value(base, 2.0).expect("set base");
    engine.set_explicit_value(result, 8.0).expect("set result");
    let report = engine.solve();
    assert!((value_of(&report, exponent) - 3.0).abs() < 1e-9);
}

// --- Auto-materialization ------------------------------------------------

#[test]
fn unbacked_result_ports_materialize_a_connector() {
    let mut engine = Engine::new();
    let a = engine.create_connector();
    let b = engine.create_connector();
    let mul = engine.create_constraint(ConstraintKind::Multiplier);
    engine.connect(mul, 0, a).expect("connect a");
    engine.connect(mul, 1, b).expect("connect b");
    engine.set_explicit_value(a, 6.0).expect("set a");
    engine.set_explicit_value(b, 7.0).expect("set b");

    let report = engine.solve();
    assert_eq!(report.materialized.len(), 1);
    let created = report.materialized[0];
    assert_eq!(value_of(&report, created), 42.0);
    assert_eq!(
        report
            .resolved
            .get(&created)
            .expect("created resolved")
            .informant,
        Some(mul)
    );
    // Wired to the port that produced it, and seeded like any other
    // connector on the next pass.
    assert_eq!(
        engine.graph().constraint(mul).expect("constraint").ports[2].connector,
        Some(created)
    );
    assert!(engine.priority().contains(created));
    let next = engine.solve();
    assert_eq!(value_of(&next, created), 42.0);
    assert!(next.materialized.is_empty());
}

#[test]
fn removing_a_connector_detaches_it_from_solving() {
    let mut engine = Engine::new();
    let (add, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(b, 4.0).expect("set b");
    engine.solve();

    let detached = engine.remove_connector(b).expect("remove b");
    assert_eq!(detached, vec![(add, 1)]);
    assert!(!engine.graph().connector_ids().contains(&b));

    // The now-unbacked operand port re-materializes from the survivors.
    let report = engine.solve();
    assert!(!report.resolved.contains_key(&b));
    assert_eq!(report.materialized.len(), 1);
    let replacement = report.materialized[0];
    assert_ne!(replacement, b);
    assert_eq!(value_of(&report, replacement), 4.0);
    assert_eq!(value_of(&report, c), 7.0);
}

// --- Ghost evaluation ----------------------------------------------------

#[test]
fn ghost_evaluation_is_side_effect_free() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(c, 10.0).expect("set c");
    engine.solve();
    let baseline = engine.solve();

    let mut overrides = HashMap::new();
    let bindings = HashMap::new();
    for sample in 0..100 {
        overrides.insert(a, f64::from(sample));
        let ghost = engine.ghost_evaluate(&overrides, &bindings);
        assert!(ghost.contains_key(&b));
    }

    assert_eq!(engine.solve(), baseline);
}

#[test]
fn ghost_samples_see_their_override() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(b, 4.0).expect("set b");
    engine.solve();

    let overrides: HashMap<ConnectorId, f64> = [(a, 100.0)].into_iter().collect();
    let bindings = HashMap::new();
    let ghost = engine.ghost_evaluate(&overrides, &bindings);
    assert_eq!(ghost.get(&c).expect("c resolved").value, 104.0);
    // Shortcut mode: computed values carry constant leaves only.
    assert!(ghost.get(&c).expect("c resolved").expression.is_leaf());
}

#[test]
fn ghost_variable_bindings_keep_expressions_symbolic() {
    let mut engine = Engine::new();
    let (_, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(b, 4.0).expect("set b");
    engine.solve();

    let overrides: HashMap<ConnectorId, f64> = [(a, 2.0)].into_iter().collect();
    let bindings: HashMap<ConnectorId, String> = [(a, "x".to_string())].into_iter().collect();
    let ghost = engine.ghost_evaluate(&overrides, &bindings);

    let c_resolved = ghost.get(&c).expect("c resolved");
    assert_eq!(c_resolved.value, 6.0);
    assert_eq!(c_resolved.expression.to_string(), "x + 4");
}

// --- Reporting -----------------------------------------------------------

#[test]
fn solve_report_roundtrips_through_json() {
    let mut engine = Engine::new();
    let (_, [a, _, c]) = wire(&mut engine, ConstraintKind::Adder);
    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(c, 10.0).expect("set c");

    let report = engine.solve();
    let json = serde_json::to_string(&report).expect("serialize report");
    let parsed: SolveReport = serde_json::from_str(&json).expect("parse report");
    assert_eq!(report, parsed);
}

#[test]
fn display_queries_reflect_the_last_pass() {
    let mut engine = Engine::new();
    let (add, [a, b, c]) = wire(&mut engine, ConstraintKind::Adder);
    assert_eq!(engine.last_value(a), None);

    engine.set_explicit_value(a, 3.0).expect("set a");
    engine.set_explicit_value(b, 4.0).expect("set b");
    engine.solve();

    assert_eq!(engine.last_value(c), Some(7.0));
    assert_eq!(engine.last_informant(c), Some((true, Some(add))));
    assert_eq!(engine.last_informant(a), Some((false, None)));
    assert_eq!(
        engine.graph().connector(c).expect("connector").last_value,
        Some(7.0)
    );
}
