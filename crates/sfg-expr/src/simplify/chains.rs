//! Canonical associativity for sum and product chains.
//!
//! Right-nested chains are rotated until every `+`/`-` chain and every
//! `*`/`/` chain leans left. Where the left operand is not itself part of the
//! chain the two operands are swapped instead, so `a + (b + c)` becomes
//! `(b + c) + a` and `a - (b - c)` becomes `(c - b) + a`.

use sfg_core::ExprNodeId;
use tracing::trace;

use crate::tree::{BinaryOp, Expr, Node};

/// Upper bound on whole-tree sweeps; every rotation shrinks a right operand,
/// so real inputs settle in a handful.
const MAX_SWEEPS: usize = 256;

pub fn normalize_chains(expr: &mut Expr) -> usize {
    let mut total = 0;
    for sweep in 0..MAX_SWEEPS {
        let mut rotations = 0;
        for id in expr.preorder() {
            while rotate(expr, id) {
                rotations += 1;
            }
        }
        if rotations == 0 {
            trace!(sweep, total, "chains normalized");
            break;
        }
        total += rotations;
    }
    total
}

fn same_family(a: BinaryOp, b: BinaryOp) -> bool {
    (a.is_additive() && b.is_additive()) || (a.is_multiplicative() && b.is_multiplicative())
}

/// One rotation at `n`, if its right operand continues the chain.
fn rotate(expr: &mut Expr, n: ExprNodeId) -> bool {
    use BinaryOp::{Add, Div, Mul, Sub};

    let Node::Binary {
        op: outer,
        args: [a, r],
    } = expr[n]
    else {
        return false;
    };
    let Node::Binary {
        op: inner,
        args: [b, c],
    } = expr[r]
    else {
        return false;
    };
    if !same_family(outer, inner) {
        return false;
    }
    let lhs_in_chain = expr[a]
        .binary_op()
        .is_some_and(|op| same_family(op, outer));

    // (outer op, inner op, inner operands, outer right operand)
    let (new_outer, new_inner, inner_args, outer_rhs) = match (outer, inner, lhs_in_chain) {
        (Add, Add, false) => (Add, Add, [b, c], a),
        (Add, Add, true) => (Add, Add, [a, b], c),
        (Sub, Sub, false) => (Add, Sub, [c, b], a),
        (Sub, Sub, true) => (Add, Sub, [a, b], c),
        (Add, Sub, false) => (Add, Sub, [b, c], a),
        (Add, Sub, true) => (Sub, Add, [a, b], c),
        (Sub, Add, _) => (Sub, Sub, [a, b], c),
        (Mul, Mul, false) => (Mul, Mul, [b, c], a),
        (Mul, Mul, true) => (Mul, Mul, [a, b], c),
        (Mul, Div, false) => (Mul, Div, [b, c], a),
        (Mul, Div, true) => (Div, Mul, [a, b], c),
        (Div, Mul, _) => (Div, Div, [a, b], c),
        (Div, Div, _) => (Div, Mul, [a, c], b),
        _ => return false,
    };

    expr.rewire(
        r,
        Node::Binary {
            op: new_inner,
            args: inner_args,
        },
    );
    expr.rewire(
        n,
        Node::Binary {
            op: new_outer,
            args: [r, outer_rhs],
        },
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SubsTable, parse};

    fn normalized(text: &str) -> Expr {
        let mut e = parse(text).unwrap();
        normalize_chains(&mut e);
        e.check_parent_consistency().unwrap();
        e
    }

    #[test]
    fn swaps_when_lhs_is_not_a_chain() {
        assert_eq!(normalized("a+(b+c)"), parse("(b+c)+a").unwrap());
        assert_eq!(normalized("a-(b-c)"), parse("(c-b)+a").unwrap());
        assert_eq!(normalized("a*(b*c)"), parse("(b*c)*a").unwrap());
    }

    #[test]
    fn associates_left_when_lhs_is_a_chain() {
        assert_eq!(normalized("(x+y)+(b+c)"), parse("x+y+b+c").unwrap());
        assert_eq!(normalized("(x*y)*(b/c)"), parse("x*y*b/c").unwrap());
    }

    #[test]
    fn left_leaning_chains_are_untouched() {
        let mut e = parse("a+b-c+d").unwrap();
        assert_eq!(normalize_chains(&mut e), 0);
        let mut e = parse("a*b/c*d").unwrap();
        assert_eq!(normalize_chains(&mut e), 0);
    }

    #[test]
    fn rotations_preserve_value() {
        let subs: SubsTable = [("a", 1.5), ("b", -2.0), ("c", 3.0), ("d", 0.5)]
            .into_iter()
            .collect();
        for text in [
            "a-(b-(c-d))",
            "a+(b-(c+d))",
            "a-(b+(c-d))",
            "a/(b/(c*d))",
            "a*(b/(c/d))",
            "a/(b*(c*d))",
        ] {
            let before = parse(text).unwrap().evaluate(&subs).unwrap();
            let after = normalized(text).evaluate(&subs).unwrap();
            assert!((before - after).abs() < 1e-12, "{text}: {before} vs {after}");
        }
    }

    #[test]
    fn idempotent() {
        let mut e = normalized("a-(b-(c-(d+e)))");
        assert_eq!(normalize_chains(&mut e), 0);
    }
}
