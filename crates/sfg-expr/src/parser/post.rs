//! Passes run over a freshly parsed tree before it is handed out.

use sfg_core::ExprNodeId;

use crate::error::{ExprError, ExprResult};
use crate::tree::{BinaryOp, Expr, Node, UnaryOp};

/// Rewrite every `exp(x)` into `e^x`. Returns the number of rewrites.
///
/// The parser leaves `exp(x)` as a multiplication of `Variable("exp")` with a
/// one-item argument list; the list has to be the very next factor of the
/// product `exp` sits in. A sign in front (`-exp(x)`) wraps the variable in
/// negations, and the rewritten power stays under them.
pub(crate) fn replace_exp_calls(expr: &mut Expr) -> ExprResult<usize> {
    let mut count = 0;
    while let Some(exp) = expr.find_variable("exp") {
        rewrite_exp(expr, exp)?;
        count += 1;
    }
    Ok(count)
}

fn rewrite_exp(expr: &mut Expr, exp: ExprNodeId) -> ExprResult<()> {
    let malformed = |reason| Err(ExprError::MalformedFunctionCall { reason });

    // the factor `exp` occupies: itself, or the outermost negation around it
    let mut factor = exp;
    while let Some(p) = expr
        .parent(factor)
        .filter(|&p| matches!(expr[p], Node::Unary { op: UnaryOp::Negate, .. }))
    {
        factor = p;
    }

    let mut chain = match expr.parent(factor) {
        Some(p) if expr[p].is_op(BinaryOp::Mul) => p,
        _ => return malformed("exp must be followed by a parenthesized argument"),
    };
    while let Some(p) = expr.parent(chain).filter(|&p| expr[p].is_op(BinaryOp::Mul)) {
        chain = p;
    }

    let factors = collect_factors(expr, chain);
    let Some(pos) = factors.iter().position(|&f| f == factor) else {
        return malformed("exp is not part of its product");
    };
    let Some(&list) = factors.get(pos + 1) else {
        return malformed("missing argument list after exp");
    };
    let arg = match &expr[list] {
        Node::List(items) if items.len() == 1 => items[0],
        Node::List(_) => return malformed("exp takes exactly one argument"),
        _ => return malformed("exp must be followed by a parenthesized argument"),
    };

    // Move the argument out of the list, then build e^arg where exp was.
    if let Node::List(items) = expr.node_mut(list) {
        items.clear();
    }
    expr.set_parent(arg, None);
    let base = expr.alloc(Node::Variable("e".to_string()));
    let pow = expr.alloc(Node::Binary {
        op: BinaryOp::Pow,
        args: [base, arg],
    });
    expr.relink(exp, pow);
    expr.free_subtree(exp);

    // Drop the now empty list from the product.
    let holder = expr.parent(list).ok_or(ExprError::NoParent)?;
    let sibling = expr
        .children(holder)
        .iter()
        .copied()
        .find(|&c| c != list)
        .ok_or(ExprError::NoParent)?;
    expr.collapse_into_parent(sibling)
}

/// In-order factors of a multiplication chain.
fn collect_factors(expr: &Expr, id: ExprNodeId) -> Vec<ExprNodeId> {
    let mut out = Vec::new();
    let mut pending = vec![id];
    while let Some(id) = pending.pop() {
        match &expr[id] {
            Node::Binary {
                op: BinaryOp::Mul,
                args,
            } => {
                pending.push(args[1]);
                pending.push(args[0]);
            }
            _ => out.push(id),
        }
    }
    out
}

/// Replace every single-item argument list by its item, to fixpoint.
/// Returns the number of lists removed.
pub(crate) fn collapse_lists(expr: &mut Expr) -> ExprResult<usize> {
    let mut total = 0;
    loop {
        let mut removed = 0;
        for id in expr.postorder() {
            let only_child = match expr.node(id) {
                Some(Node::List(items)) if items.len() == 1 => items[0],
                _ => continue,
            };
            expr.collapse_into_parent(only_child)?;
            removed += 1;
        }
        if removed == 0 {
            return Ok(total);
        }
        total += removed;
    }
}
