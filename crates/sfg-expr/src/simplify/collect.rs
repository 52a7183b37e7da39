//! Common-term collection over sum chains.
//!
//! A sum chain is read as a list of signed terms, each term a numeric
//! coefficient times a product of non-numeric factors. Division by `s^c` is
//! read as the factor `s^(-c)` and subtraction as a negative coefficient, so
//! only sums of products of powers are left to compare. Terms whose factor
//! lists match are merged and the chain is rebuilt left-leaning with the
//! constant term first.

use sfg_core::{ExprNodeId, Real};

use crate::tree::{BinaryOp, Expr, Node, UnaryOp};

#[derive(Debug, Clone)]
struct Term {
    coeff: Real,
    factors: Vec<Expr>,
}

/// Merge like terms in every sum chain. Returns the number of chains that
/// changed; a second call on the result returns 0.
pub fn collect_common_terms(expr: &mut Expr) -> usize {
    let mut changed = 0;
    for id in expr.postorder() {
        if !is_chain_root(expr, id) {
            continue;
        }
        let rebuilt = rebuild(&read_chain(expr, id));
        if !expr.structurally_equal(id, &rebuilt, rebuilt.root()) && expr.replace(id, rebuilt).is_ok()
        {
            changed += 1;
        }
    }
    changed
}

fn is_additive(expr: &Expr, id: ExprNodeId) -> bool {
    expr[id].binary_op().is_some_and(BinaryOp::is_additive)
}

fn is_chain_root(expr: &Expr, id: ExprNodeId) -> bool {
    expr.node(id).is_some()
        && is_additive(expr, id)
        && !expr.parent(id).is_some_and(|p| is_additive(expr, p))
}

fn read_chain(expr: &Expr, root: ExprNodeId) -> Vec<Term> {
    let terms = read_terms(expr, root);

    let mut merged: Vec<Term> = Vec::with_capacity(terms.len());
    for mut term in terms {
        term.factors.sort_by_cached_key(|f| f.to_string());
        match merged.iter_mut().find(|m| m.factors == term.factors) {
            Some(existing) => existing.coeff += term.coeff,
            None => merged.push(term),
        }
    }
    // 0*oo is not zero
    merged.retain(|t| t.coeff != 0.0 || t.factors.iter().any(has_infinity));
    // constant term first, everything else in order of appearance
    merged.sort_by_key(|t| !t.factors.is_empty());
    merged
}

fn has_infinity(expr: &Expr) -> bool {
    expr.preorder()
        .into_iter()
        .any(|id| matches!(expr[id], Node::Infinity))
}

/// Signed terms of the sum chain at `root`, left to right.
fn read_terms(expr: &Expr, root: ExprNodeId) -> Vec<Term> {
    let mut out = Vec::new();
    let mut pending = vec![(root, 1.0)];
    while let Some((id, sign)) = pending.pop() {
        match &expr[id] {
            Node::Binary {
                op: BinaryOp::Add,
                args,
            } => {
                pending.push((args[1], sign));
                pending.push((args[0], sign));
            }
            Node::Binary {
                op: BinaryOp::Sub,
                args,
            } => {
                pending.push((args[1], -sign));
                pending.push((args[0], sign));
            }
            _ => {
                let (coeff, factors) = read_factors(expr, id, sign);
                // k*(a + b) with nothing else in the product joins the outer sum
                if let [(single, false)] = factors.as_slice()
                    && is_additive(expr, *single)
                {
                    pending.push((*single, coeff));
                } else {
                    let factors = factors
                        .into_iter()
                        .map(|(f, inverted)| {
                            let factor = expr.subtree(f);
                            if inverted { reciprocal(factor) } else { factor }
                        })
                        .collect();
                    out.push(Term { coeff, factors });
                }
            }
        }
    }
    out
}

/// Coefficient and non-numeric factors of the product at `id`. Each factor
/// is flagged when it sits in a denominator.
fn read_factors(expr: &Expr, id: ExprNodeId, sign: Real) -> (Real, Vec<(ExprNodeId, bool)>) {
    let mut coeff = sign;
    let mut factors = Vec::new();
    let mut pending = vec![(id, false)];
    while let Some((id, inverted)) = pending.pop() {
        match &expr[id] {
            Node::Literal(v) if !inverted => coeff *= v,
            Node::Literal(v) if *v != 0.0 => coeff /= v,
            Node::Binary {
                op: BinaryOp::Mul,
                args,
            } => {
                pending.push((args[1], inverted));
                pending.push((args[0], inverted));
            }
            Node::Binary {
                op: BinaryOp::Div,
                args,
            } => {
                pending.push((args[1], !inverted));
                pending.push((args[0], inverted));
            }
            Node::Unary {
                op: UnaryOp::Negate,
                operand,
            } => {
                coeff = -coeff;
                pending.push((*operand, inverted));
            }
            _ => factors.push((id, inverted)),
        }
    }
    (coeff, factors)
}

/// `s^c` becomes `s^(-c)` for a literal `c`, anything else `x^(-1)`.
fn reciprocal(factor: Expr) -> Expr {
    if let Node::Binary {
        op: BinaryOp::Pow,
        args: [base, exponent],
    } = factor.root_node()
        && let Some(c) = factor[*exponent].as_literal()
    {
        return factor.subtree(*base).pow(Expr::literal(-c));
    }
    factor.pow(Expr::literal(-1.0))
}

/// `coeff * f1 * f2 * ...` as a left-leaning product; a unit coefficient is
/// left out.
fn term_expr(coeff: Real, factors: &[Expr]) -> Expr {
    let mut iter = factors.iter().cloned();
    let start = if coeff == 1.0 {
        match iter.next() {
            Some(first) => first,
            None => return Expr::literal(1.0),
        }
    } else {
        Expr::literal(coeff)
    };
    iter.fold(start, |acc, f| acc * f)
}

fn rebuild(terms: &[Term]) -> Expr {
    let mut iter = terms.iter();
    let Some(first) = iter.next() else {
        return Expr::literal(0.0);
    };
    let mut acc = term_expr(first.coeff, &first.factors);
    for term in iter {
        let body = term_expr(term.coeff.abs(), &term.factors);
        acc = if term.coeff < 0.0 { acc - body } else { acc + body };
    }
    acc
}

/// Rewrite `a/s^c` as `a*s^(-c)`, `a/s` as `a*s^(-1)`, `a - k*s` as
/// `a + (-k)*s` and `a - s` as `a + s*(-1)`.
pub fn eliminate_divisions_and_subtractions(expr: &mut Expr) -> usize {
    let mut rewritten = 0;
    for id in expr.postorder() {
        let Node::Binary { op, args: [a, s] } = expr[id] else {
            continue;
        };
        match op {
            BinaryOp::Div => {
                let inverse = match expr[s] {
                    Node::Binary {
                        op: BinaryOp::Pow,
                        args: [base, exponent],
                    } => {
                        let negated = match expr[exponent].as_literal() {
                            Some(c) => {
                                expr.rewire(exponent, Node::Literal(-c));
                                exponent
                            }
                            None => expr.alloc(Node::Unary {
                                op: UnaryOp::Negate,
                                operand: exponent,
                            }),
                        };
                        expr.rewire(
                            s,
                            Node::Binary {
                                op: BinaryOp::Pow,
                                args: [base, negated],
                            },
                        );
                        s
                    }
                    _ => {
                        let minus_one = expr.alloc(Node::Literal(-1.0));
                        expr.alloc(Node::Binary {
                            op: BinaryOp::Pow,
                            args: [s, minus_one],
                        })
                    }
                };
                expr.rewire(
                    id,
                    Node::Binary {
                        op: BinaryOp::Mul,
                        args: [a, inverse],
                    },
                );
            }
            BinaryOp::Sub => {
                let coefficient = match expr[s] {
                    Node::Binary {
                        op: BinaryOp::Mul,
                        args: [x, y],
                    } => [x, y].into_iter().find(|&f| expr[f].as_literal().is_some()),
                    _ => None,
                };
                let negated = match coefficient {
                    Some(k) => {
                        let v = expr[k].as_literal().unwrap_or(1.0);
                        expr.rewire(k, Node::Literal(-v));
                        s
                    }
                    None => {
                        let minus_one = expr.alloc(Node::Literal(-1.0));
                        expr.alloc(Node::Binary {
                            op: BinaryOp::Mul,
                            args: [s, minus_one],
                        })
                    }
                };
                expr.rewire(
                    id,
                    Node::Binary {
                        op: BinaryOp::Add,
                        args: [a, negated],
                    },
                );
            }
            _ => continue,
        }
        rewritten += 1;
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SubsTable, parse};

    fn collected(text: &str) -> Expr {
        let mut e = parse(text).unwrap();
        collect_common_terms(&mut e);
        e.check_parent_consistency().unwrap();
        e
    }

    #[test]
    fn merges_like_terms() {
        assert_eq!(collected("a+a"), parse("2*a").unwrap());
        assert_eq!(collected("a+b+a+b"), parse("2*a + 2*b").unwrap());
        assert_eq!(collected("2*a+3*a"), parse("5*a").unwrap());
        assert_eq!(collected("2*a+a+a"), parse("4*a").unwrap());
    }

    #[test]
    fn cancelling_terms() {
        assert_eq!(collected("a-a").as_literal(), Some(0.0));
        assert_eq!(collected("a-a-a"), parse("-1*a").unwrap());
        assert_eq!(collected("b-c-d-b+c+d").as_literal(), Some(0.0));
    }

    #[test]
    fn constants_lead() {
        assert_eq!(collected("1+a+1"), parse("2+a").unwrap());
    }

    #[test]
    fn zero_times_infinity_is_kept() {
        assert_eq!(collected("a + 0*oo"), parse("a + 0*oo").unwrap());
        assert_eq!(collected("oo - oo"), parse("0*oo").unwrap());
        assert_eq!(collected("a - a + b").to_string(), "b");
    }

    #[test]
    fn factor_order_does_not_matter() {
        assert_eq!(collected("a*b + b*a"), parse("2*a*b").unwrap());
        assert_eq!(collected("a/b - a*b^-1").as_literal(), Some(0.0));
    }

    #[test]
    fn negative_terms_use_subtraction() {
        assert_eq!(collected("a - 3*b + c"), parse("a - 3*b + c").unwrap());
    }

    #[test]
    fn scaled_sums_are_spliced() {
        assert_eq!(collected("a + 2*(a - b)/2"), parse("2*a - b").unwrap());
        assert_eq!(collected("c - (a + c)"), parse("-1*a").unwrap());
    }

    #[test]
    fn collects_inside_products() {
        assert_eq!(collected("x*(a+a)"), parse("x*(2*a)").unwrap());
    }

    #[test]
    fn idempotent_and_value_preserving() {
        let text = "2*a + b + c + 3*a";
        let once = collected(text);
        let mut twice = once.clone();
        assert_eq!(collect_common_terms(&mut twice), 0);
        assert_eq!(once, twice);

        let subs: SubsTable = [("a", 1.25), ("b", -4.0), ("c", 7.5)].into_iter().collect();
        let before = parse(text).unwrap().evaluate(&subs).unwrap();
        assert_eq!(once.evaluate(&subs).unwrap(), before);
    }

    #[test]
    fn long_chain() {
        let e = collected("a+b+c+d+e+f+g+h+a+b+c+d+e+f+g+h-h-g");
        assert_eq!(e, parse("2*a + 2*b + 2*c + 2*d + 2*e + 2*f + g + h").unwrap());
    }

    #[test]
    fn division_and_subtraction_elimination() {
        let cases = [
            ("a/s^x", "a*s^(-x)"),
            ("a/s^2", "a*s^(-2)"),
            ("a/s", "a*s^(-1)"),
            ("a-s", "a+s*(-1)"),
            ("a-3*s", "a+(-3)*s"),
        ];
        for (input, expected) in cases {
            let mut e = parse(input).unwrap();
            assert_eq!(eliminate_divisions_and_subtractions(&mut e), 1, "{input}");
            e.check_parent_consistency().unwrap();
            assert_eq!(e, parse(expected).unwrap(), "{input}");
        }
    }
}
