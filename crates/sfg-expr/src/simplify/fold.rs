//! Constant folding and algebraic identities.

use sfg_core::{ExprNodeId, Real};

use crate::tree::{BinaryOp, Expr, Node, UnaryOp};

/// Replace every operator whose operands are all literals by its value.
///
/// Division or remainder by a literal zero is left alone, as is any result
/// that is not finite, so the symbolic form survives for later substitution.
pub fn fold_constants(expr: &mut Expr) -> usize {
    let mut folded = 0;
    for id in expr.postorder() {
        let value = match &expr[id] {
            Node::Unary { op, operand } => expr[*operand].as_literal().map(|v| op.apply(v)),
            Node::Binary { op, args } => {
                match (expr[args[0]].as_literal(), expr[args[1]].as_literal()) {
                    (Some(_), Some(b))
                        if b == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) =>
                    {
                        None
                    }
                    (Some(a), Some(b)) => Some(op.apply(a, b)),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(v) = value.filter(|v| v.is_finite())
            && expr.morph_to_literal(id, v).is_ok()
        {
            folded += 1;
        }
    }
    folded
}

enum Identity {
    /// The node reduces to one of its operands.
    Operand(ExprNodeId),
    /// The node reduces to a constant.
    Constant(Real),
    /// `--x`
    DoubleNegation(ExprNodeId),
}

fn is_lit(expr: &Expr, id: ExprNodeId, value: Real) -> bool {
    expr[id].as_literal() == Some(value)
}

fn identity_at(expr: &Expr, id: ExprNodeId) -> Option<Identity> {
    match &expr[id] {
        Node::Unary {
            op: UnaryOp::Negate,
            operand,
        } => match &expr[*operand] {
            Node::Unary {
                op: UnaryOp::Negate,
                operand: inner,
            } => Some(Identity::DoubleNegation(*inner)),
            _ => None,
        },
        Node::Binary { op, args: [a, b] } => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add if is_lit(expr, a, 0.0) => Some(Identity::Operand(b)),
                BinaryOp::Add | BinaryOp::Sub if is_lit(expr, b, 0.0) => {
                    Some(Identity::Operand(a))
                }
                BinaryOp::Mul if is_lit(expr, a, 1.0) => Some(Identity::Operand(b)),
                BinaryOp::Mul | BinaryOp::Div if is_lit(expr, b, 1.0) => {
                    Some(Identity::Operand(a))
                }
                BinaryOp::Pow if is_lit(expr, b, 1.0) => Some(Identity::Operand(a)),
                BinaryOp::Pow if is_lit(expr, b, 0.0) || is_lit(expr, a, 1.0) => {
                    Some(Identity::Constant(1.0))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Remove `x+0`, `0+x`, `x-0`, `x*1`, `1*x`, `x/1`, `x^1`, `x^0`, `1^x` and
/// `--x`. Products with zero are kept: `oo*0` is not zero.
pub fn eliminate_identities(expr: &mut Expr) -> usize {
    let mut removed = 0;
    for id in expr.postorder() {
        let Some(rule) = identity_at(expr, id) else {
            continue;
        };
        let applied = match rule {
            Identity::Operand(keep) => expr.collapse_into_parent(keep),
            Identity::Constant(v) => expr.morph_to_literal(id, v),
            Identity::DoubleNegation(inner) => expr
                .collapse_into_parent(inner)
                .and_then(|()| expr.collapse_into_parent(inner)),
        };
        if applied.is_ok() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn folded(text: &str) -> Expr {
        let mut e = parse(text).unwrap();
        fold_constants(&mut e);
        e.check_parent_consistency().unwrap();
        e
    }

    #[test]
    fn folds_literal_subtrees() {
        assert_eq!(folded("4+2*3").as_literal(), Some(10.0));
        assert_eq!(folded("a*(3+2)"), parse("a*5").unwrap());
        assert_eq!(folded("-(2^3)").as_literal(), Some(-8.0));
    }

    #[test]
    fn division_by_zero_is_kept() {
        let e = folded("1/0");
        assert!(e.root_node().is_op(BinaryOp::Div));
        let e = folded("5%(2-2)");
        assert!(e.root_node().is_op(BinaryOp::Mod));
    }

    #[test]
    fn identities() {
        let cases = [
            ("a+0", "a"),
            ("0+a", "a"),
            ("a-0", "a"),
            ("1*a", "a"),
            ("a*1", "a"),
            ("a/1", "a"),
            ("a^1", "a"),
            ("a^0", "1"),
            ("--a", "a"),
            ("(a+0)*1", "a"),
        ];
        for (input, expected) in cases {
            let mut e = parse(input).unwrap();
            eliminate_identities(&mut e);
            e.check_parent_consistency().unwrap();
            assert_eq!(e, parse(expected).unwrap(), "{input}");
        }
    }

    #[test]
    fn zero_products_are_kept() {
        let mut e = parse("a*0").unwrap();
        assert_eq!(eliminate_identities(&mut e), 0);
    }
}
