//! Integration tests for parsing, evaluation and simplification together.

use sfg_expr::{ExprError, SimplifyConfig, SubsTable, collect_common_terms, parse, simplify};

fn subs(pairs: &[(&str, f64)]) -> SubsTable {
    pairs.iter().map(|&(k, v)| (k, v)).collect()
}

#[test]
fn literal_round_trip() {
    let e = parse("(2+3*4)^2 + 4").unwrap();
    assert_eq!(e.evaluate(&SubsTable::new()).unwrap(), 200.0);
}

#[test]
fn exp_calls_are_rewritten() {
    let e = parse("a*exp(b)exp(c)").unwrap();
    assert!(e.find_variable("exp").is_none());
    e.check_parent_consistency().unwrap();

    let mut table = SubsTable::with_builtins();
    table.insert("a", 2.0);
    table.insert("b", 0.5);
    table.insert("c", 1.5);
    let expected = 2.0 * (0.5f64).exp() * (1.5f64).exp();
    assert!((e.evaluate(&table).unwrap() - expected).abs() < 1e-12);
}

#[test]
fn implicit_multiplication_matches_explicit() {
    let implicit = parse("2a b 5(((x)))").unwrap();
    let explicit = parse("2*a*b*5*x").unwrap();
    assert_eq!(implicit, explicit);

    let table = subs(&[("a", 1.5), ("b", -2.0), ("x", 0.25)]);
    assert_eq!(
        implicit.evaluate(&table).unwrap(),
        explicit.evaluate(&table).unwrap()
    );
}

#[test]
fn display_reparses_to_same_tree() {
    for text in [
        "a*b + 3",
        "(a + b)*c^d",
        "a^b^c",
        "-(a + b)",
        "a - (b - c)",
        "x^(-1)*y",
        "a/(b*c)",
    ] {
        let e = parse(text).unwrap();
        let again = parse(&e.to_string()).unwrap();
        assert_eq!(e, again, "{text} -> {e}");
    }
}

#[test]
fn long_sums_are_walked_without_recursion() {
    // Build: a + a + ... + a, 100k terms, left-leaning out of the parser
    let n = 100_000;
    let text = vec!["a"; n].join("+");
    let e = parse(&text).unwrap();
    assert_eq!(e.len(), 2 * n - 1);
    e.check_parent_consistency().unwrap();
    assert_eq!(e.evaluate(&subs(&[("a", 0.5)])).unwrap(), 50_000.0);

    let copy = e.subtree(e.root());
    assert_eq!(copy, e);
    assert_eq!(parse(&e.to_string()).unwrap(), e);

    let mut collected = e.clone();
    assert_eq!(collect_common_terms(&mut collected), 1);
    assert_eq!(collected.to_string(), "100000*a");
    collected.check_parent_consistency().unwrap();
}

#[test]
fn collection_idempotent_and_preserves_value() {
    let mut once = parse("2*a + b + c + 3*a").unwrap();
    collect_common_terms(&mut once);
    let mut twice = once.clone();
    collect_common_terms(&mut twice);
    assert_eq!(once, twice);

    let original = parse("2*a + b + c + 3*a").unwrap();
    for (a, b, c) in [(1.0, 2.0, 3.0), (-4.0, 0.5, 8.0), (0.0, 0.0, 0.0)] {
        let table = subs(&[("a", a), ("b", b), ("c", c)]);
        assert_eq!(
            original.evaluate(&table).unwrap(),
            once.evaluate(&table).unwrap()
        );
    }
}

#[test]
fn simplify_then_evaluate() {
    let mut e = parse("x*(1+1) - x - x + 4/2").unwrap();
    let report = simplify(&mut e, &SimplifyConfig::default());
    assert!(report.converged);
    assert_eq!(e.as_literal(), Some(2.0));
}

#[test]
fn parse_errors_leave_nothing_behind() {
    assert!(matches!(parse("(a+b"), Err(ExprError::Parse(_))));
    assert!(matches!(parse("a b +"), Err(ExprError::Parse(_))));
    assert!(matches!(
        parse("exp(1,2)"),
        Err(ExprError::MalformedFunctionCall { .. })
    ));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Literal-only arithmetic as text together with its value.
    fn arb_arith() -> impl Strategy<Value = (String, f64)> {
        let leaf = (1u32..20).prop_map(|n| (n.to_string(), f64::from(n)));
        leaf.prop_recursive(4, 32, 2, |inner| {
            (inner.clone(), 0usize..3, inner).prop_map(|((l, lv), op, (r, rv))| match op {
                0 => (format!("({l})+({r})"), lv + rv),
                1 => (format!("({l})-({r})"), lv - rv),
                _ => (format!("({l})*({r})"), lv * rv),
            })
        })
    }

    proptest! {
        #[test]
        fn parse_evaluate_matches_arithmetic((text, value) in arb_arith()) {
            let e = parse(&text).unwrap();
            prop_assert!(e.check_parent_consistency().is_ok());
            prop_assert_eq!(e.evaluate(&SubsTable::new()).unwrap(), value);
        }

        #[test]
        fn display_round_trips((text, value) in arb_arith()) {
            let e = parse(&text).unwrap();
            let again = parse(&e.to_string()).unwrap();
            prop_assert_eq!(again.evaluate(&SubsTable::new()).unwrap(), value);
        }
    }
}
