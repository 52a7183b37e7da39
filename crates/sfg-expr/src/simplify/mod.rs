//! Rewriting passes that keep expressions small and comparable.
//!
//! Each pass mutates the tree in place and returns how many rewrites it made,
//! so callers can iterate to a fixpoint. [`simplify`] does exactly that.

mod chains;
mod collect;
mod fold;

pub use chains::normalize_chains;
pub use collect::{collect_common_terms, eliminate_divisions_and_subtractions};
pub use fold::{eliminate_identities, fold_constants};

use tracing::debug;

use crate::tree::Expr;

/// Which passes [`simplify`] runs and for how long.
#[derive(Debug, Clone)]
pub struct SimplifyConfig {
    /// Maximum rounds over all enabled passes
    pub max_passes: usize,
    /// Evaluate all-literal subtrees
    pub fold_constants: bool,
    /// Drop `x+0`, `x*1`, `x^1` and friends
    pub eliminate_identities: bool,
    /// Rotate chains into left-leaning canonical form
    pub normalize_chains: bool,
    /// Merge like terms in sums
    pub collect_terms: bool,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            max_passes: 16,
            fold_constants: true,
            eliminate_identities: true,
            normalize_chains: true,
            collect_terms: true,
        }
    }
}

/// Outcome of a [`simplify`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplifyReport {
    /// Rounds executed
    pub passes: usize,
    /// Total rewrites across all rounds
    pub rewrites: usize,
    /// Whether the last round changed nothing
    pub converged: bool,
}

/// Run the enabled passes until a round makes no change or `max_passes` is hit.
pub fn simplify(expr: &mut Expr, config: &SimplifyConfig) -> SimplifyReport {
    let mut report = SimplifyReport {
        passes: 0,
        rewrites: 0,
        converged: false,
    };

    while report.passes < config.max_passes {
        report.passes += 1;
        let mut round = 0;
        if config.fold_constants {
            round += fold_constants(expr);
        }
        if config.eliminate_identities {
            round += eliminate_identities(expr);
        }
        if config.normalize_chains {
            round += normalize_chains(expr);
        }
        if config.collect_terms {
            round += collect_common_terms(expr);
        }
        report.rewrites += round;
        if round == 0 {
            report.converged = true;
            break;
        }
    }

    debug!(
        passes = report.passes,
        rewrites = report.rewrites,
        converged = report.converged,
        nodes = expr.len(),
        "simplified expression"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn simplified(text: &str) -> Expr {
        let mut e = parse(text).unwrap();
        let report = simplify(&mut e, &SimplifyConfig::default());
        assert!(report.converged, "{text} did not converge");
        e.check_parent_consistency().unwrap();
        e
    }

    #[test]
    fn optimiser_cases() {
        assert_eq!(simplified("4+2*3").as_literal(), Some(10.0));
        assert_eq!(simplified("a*(3+2)"), parse("a*5").unwrap());
        assert_eq!(simplified("a+0"), parse("a").unwrap());
        assert_eq!(simplified("0+a-0"), parse("a").unwrap());
        assert_eq!(simplified("1+a+1"), parse("2+a").unwrap());
    }

    #[test]
    fn nested_sums() {
        assert_eq!(simplified("a+(b+(a+b))"), parse("2*a + 2*b").unwrap());
        assert_eq!(simplified("x - (x - y)"), parse("y").unwrap());
    }

    #[test]
    fn division_by_one_disappears() {
        assert_eq!(simplified("(a*b)/1"), parse("a*b").unwrap());
    }

    #[test]
    fn disabled_passes_do_nothing() {
        let config = SimplifyConfig {
            fold_constants: false,
            eliminate_identities: false,
            normalize_chains: false,
            collect_terms: false,
            ..SimplifyConfig::default()
        };
        let mut e = parse("1+2").unwrap();
        let report = simplify(&mut e, &config);
        assert_eq!(report.rewrites, 0);
        assert!(report.converged);
        assert_eq!(e, parse("1+2").unwrap());
    }

    mod proptests {
        use super::*;
        use crate::SubsTable;
        use proptest::prelude::*;
        use sfg_core::{Tolerances, nearly_equal};

        fn arb_expr() -> impl Strategy<Value = String> {
            let leaf = prop_oneof![
                (1u8..10).prop_map(|n| n.to_string()),
                prop::sample::select(vec!["a", "b", "c"]).prop_map(str::to_string),
            ];
            leaf.prop_recursive(4, 24, 2, |inner| {
                (
                    inner.clone(),
                    prop::sample::select(vec!["+", "-", "*"]),
                    inner,
                )
                    .prop_map(|(l, op, r)| format!("({l}){op}({r})"))
            })
        }

        proptest! {
            #[test]
            fn simplify_preserves_value(
                text in arb_expr(),
                a in -3i32..=3,
                b in -3i32..=3,
                c in -3i32..=3,
            ) {
                // integer values keep every intermediate exact
                let subs: SubsTable = [("a", a), ("b", b), ("c", c)]
                    .into_iter()
                    .map(|(k, v)| (k, f64::from(v)))
                    .collect();
                let mut e = parse(&text).unwrap();
                let before = e.evaluate(&subs).unwrap();
                simplify(&mut e, &SimplifyConfig::default());
                prop_assert!(e.check_parent_consistency().is_ok());
                let after = e.evaluate(&subs).unwrap();
                let tol = Tolerances { abs: 1e-6, rel: 1e-9 };
                prop_assert!(nearly_equal(before, after, tol), "{text}: {before} vs {after}");
            }

            #[test]
            fn collection_is_idempotent(text in arb_expr()) {
                let mut once = parse(&text).unwrap();
                collect_common_terms(&mut once);
                let mut twice = once.clone();
                prop_assert_eq!(collect_common_terms(&mut twice), 0);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
