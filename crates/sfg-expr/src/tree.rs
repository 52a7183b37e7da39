//! Arena-backed expression tree.
//!
//! Every node lives in a slot of one `Vec`; children and parents are stored
//! as [`ExprNodeId`] handles into that vector. The parent handle is a plain
//! back-reference and never owns anything: freeing walks child edges only.

use core::ops::{Add, Div, Index, Mul, Neg, Sub};
use std::collections::BTreeSet;

use sfg_core::{ExprNodeId, Real};

use crate::error::{ExprError, ExprResult};

/// Operators taking one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
}

impl UnaryOp {
    pub fn apply(self, x: Real) -> Real {
        match self {
            UnaryOp::Negate => -x,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
        }
    }
}

/// Operators taking two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Mod,
    /// Sequencing; evaluates to its right operand.
    Comma,
}

impl BinaryOp {
    /// IEEE semantics throughout: division by zero yields an infinity or NaN.
    pub fn apply(self, a: Real, b: Real) -> Real {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Mod => a % b,
            BinaryOp::Comma => b,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Mod => "%",
            BinaryOp::Comma => ",",
        }
    }

    /// Binding strength, low to high. Unary negation sits at 3.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Comma => 0,
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 2,
            BinaryOp::Pow => 4,
        }
    }

    pub fn is_additive(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub)
    }

    pub fn is_multiplicative(self) -> bool {
        matches!(self, BinaryOp::Mul | BinaryOp::Div)
    }
}

/// One node of an expression. Operand handles point into the owning [`Expr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Real),
    Variable(String),
    Infinity,
    Unary { op: UnaryOp, operand: ExprNodeId },
    Binary { op: BinaryOp, args: [ExprNodeId; 2] },
    /// Parenthesized argument list. Only survives parsing when it holds more
    /// than one item.
    List(Vec<ExprNodeId>),
}

impl Node {
    pub fn children(&self) -> &[ExprNodeId] {
        match self {
            Node::Literal(_) | Node::Variable(_) | Node::Infinity => &[],
            Node::Unary { operand, .. } => core::slice::from_ref(operand),
            Node::Binary { args, .. } => args,
            Node::List(items) => items,
        }
    }

    fn children_mut(&mut self) -> &mut [ExprNodeId] {
        match self {
            Node::Literal(_) | Node::Variable(_) | Node::Infinity => &mut [],
            Node::Unary { operand, .. } => core::slice::from_mut(operand),
            Node::Binary { args, .. } => args,
            Node::List(items) => items,
        }
    }

    /// Derived from the variant; never stored.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    pub fn as_literal(&self) -> Option<Real> {
        match self {
            Node::Literal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            Node::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn is_op(&self, op: BinaryOp) -> bool {
        self.binary_op() == Some(op)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<ExprNodeId>,
}

/// A symbolic expression: an arena of [`Node`]s plus the handle of the root.
///
/// `Clone` copies the whole arena, so a clone is fully independent of the
/// original. Use [`Expr::subtree`] to copy out just one branch.
#[derive(Debug, Clone)]
pub struct Expr {
    slots: Vec<Option<Slot>>,
    free: Vec<ExprNodeId>,
    root: ExprNodeId,
}

impl Index<ExprNodeId> for Expr {
    type Output = Node;

    /// Panics on a handle that does not belong to a live node of this arena.
    fn index(&self, id: ExprNodeId) -> &Node {
        match self.slots.get(id.slot()) {
            Some(Some(slot)) => &slot.node,
            _ => panic!("stale expression node {id:?}"),
        }
    }
}

impl Expr {
    /// Empty arena whose root is assigned later with [`Expr::set_root`].
    pub(crate) fn unrooted() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: ExprNodeId::from_index(0),
        }
    }

    fn leaf(node: Node) -> Self {
        let mut expr = Self::unrooted();
        expr.root = expr.alloc(node);
        expr
    }

    pub fn literal(value: Real) -> Self {
        Self::leaf(Node::Literal(value))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::leaf(Node::Variable(name.into()))
    }

    pub fn infinity() -> Self {
        Self::leaf(Node::Infinity)
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let mut expr = operand;
        let child = expr.root;
        expr.root = expr.alloc(Node::Unary { op, operand: child });
        expr
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let mut expr = lhs;
        let l = expr.root;
        let r = expr.graft(&rhs);
        expr.root = expr.alloc(Node::Binary { op, args: [l, r] });
        expr
    }

    /// Argument list node. Fails on an empty list.
    pub fn list(items: Vec<Expr>) -> ExprResult<Self> {
        let mut iter = items.into_iter();
        let Some(mut expr) = iter.next() else {
            return Err(ExprError::InvalidNode {
                what: "empty argument list".into(),
            });
        };
        let mut children = vec![expr.root];
        for item in iter {
            children.push(expr.graft(&item));
        }
        expr.root = expr.alloc(Node::List(children));
        Ok(expr)
    }

    pub fn pow(self, exponent: Expr) -> Self {
        Self::binary(BinaryOp::Pow, self, exponent)
    }

    /// Make room for `additional` more nodes, reporting allocation failure.
    pub fn try_reserve(&mut self, additional: usize) -> ExprResult<()> {
        self.slots
            .try_reserve(additional)
            .map_err(|_| ExprError::OutOfMemory {
                what: "expression arena",
            })
    }

    // ---- accessors ----

    pub fn root(&self) -> ExprNodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self[self.root]
    }

    /// Node behind a handle, or `None` if the slot is free or out of range.
    pub fn node(&self, id: ExprNodeId) -> Option<&Node> {
        self.slots
            .get(id.slot())
            .and_then(Option::as_ref)
            .map(|slot| &slot.node)
    }

    pub fn parent(&self, id: ExprNodeId) -> Option<ExprNodeId> {
        self.slots
            .get(id.slot())
            .and_then(Option::as_ref)
            .and_then(|slot| slot.parent)
    }

    pub fn children(&self, id: ExprNodeId) -> &[ExprNodeId] {
        self.node(id).map_or(&[], Node::children)
    }

    pub fn child_count(&self, id: ExprNodeId) -> usize {
        self.children(id).len()
    }

    /// Value of the root if the whole expression is a single literal.
    pub fn as_literal(&self) -> Option<Real> {
        self.root_node().as_literal()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reachable nodes, parents before children, left to right.
    pub fn preorder(&self) -> Vec<ExprNodeId> {
        self.preorder_from(self.root)
    }

    pub fn preorder_from(&self, start: ExprNodeId) -> Vec<ExprNodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Reachable nodes, children before parents, left to right.
    pub fn postorder(&self) -> Vec<ExprNodeId> {
        self.postorder_from(self.root)
    }

    pub fn postorder_from(&self, start: ExprNodeId) -> Vec<ExprNodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend_from_slice(self.children(id));
        }
        out.reverse();
        out
    }

    /// First variable named `name` in preorder.
    pub fn find_variable(&self, name: &str) -> Option<ExprNodeId> {
        self.preorder()
            .into_iter()
            .find(|&id| matches!(&self[id], Node::Variable(v) if v == name))
    }

    /// Distinct variable names, sorted.
    pub fn variables(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .preorder()
            .into_iter()
            .filter_map(|id| match &self[id] {
                Node::Variable(v) => Some(v.as_str()),
                _ => None,
            })
            .collect();
        names.into_iter().map(str::to_owned).collect()
    }

    /// Compare the subtree at `id` with the subtree at `other_id` of `other`.
    pub fn structurally_equal(&self, id: ExprNodeId, other: &Expr, other_id: ExprNodeId) -> bool {
        let mut pending = vec![(id, other_id)];
        while let Some((x, y)) = pending.pop() {
            let same = match (&self[x], &other[y]) {
                (Node::Literal(a), Node::Literal(b)) => a == b || (a.is_nan() && b.is_nan()),
                (Node::Variable(a), Node::Variable(b)) => a == b,
                (Node::Infinity, Node::Infinity) => true,
                (Node::Unary { op: a, .. }, Node::Unary { op: b, .. }) => a == b,
                (Node::Binary { op: a, .. }, Node::Binary { op: b, .. }) => a == b,
                (Node::List(a), Node::List(b)) => a.len() == b.len(),
                _ => false,
            };
            if !same {
                return false;
            }
            pending.extend(
                self[x]
                    .children()
                    .iter()
                    .copied()
                    .zip(other[y].children().iter().copied()),
            );
        }
        true
    }

    /// Walk the tree and verify every parent handle, that no node is reached
    /// twice, and that every live slot is reachable from the root.
    pub fn check_parent_consistency(&self) -> ExprResult<()> {
        let broken = |what: String| Err(ExprError::InvalidNode { what });

        if self.node(self.root).is_none() {
            return broken(format!("root {} is not a live node", self.root));
        }
        if let Some(p) = self.parent(self.root) {
            return broken(format!("root {} has parent {p}", self.root));
        }

        let mut seen = vec![false; self.slots.len()];
        let mut reached = 0usize;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.node(id).is_none() {
                return broken(format!("node {id} is referenced but free"));
            }
            if seen[id.slot()] {
                return broken(format!("node {id} is reachable twice"));
            }
            seen[id.slot()] = true;
            reached += 1;
            for &child in self.children(id) {
                if self.parent(child) != Some(id) {
                    return broken(format!(
                        "child {child} of {id} has parent {:?}",
                        self.parent(child)
                    ));
                }
                stack.push(child);
            }
        }

        if reached != self.len() {
            return broken(format!(
                "{} live nodes but only {reached} reachable",
                self.len()
            ));
        }
        Ok(())
    }

    // ---- surgery ----

    /// Copy all of `other` into this arena as a detached subtree.
    pub fn graft(&mut self, other: &Expr) -> ExprNodeId {
        self.copy_from(other, other.root)
    }

    /// Deep copy of the subtree at `id` as a standalone expression.
    pub fn subtree(&self, id: ExprNodeId) -> Expr {
        let mut out = Expr::unrooted();
        out.root = out.copy_from(self, id);
        out
    }

    /// Put `replacement` where `id` was and return the removed subtree.
    pub fn replace(&mut self, id: ExprNodeId, replacement: Expr) -> ExprResult<Expr> {
        self.check_live(id)?;
        let removed = self.subtree(id);
        let new = self.graft(&replacement);
        self.relink(id, new);
        self.free_subtree(id);
        Ok(removed)
    }

    /// Replace the parent of `id` with `id` itself, dropping the parent and
    /// all of its other operands.
    pub fn collapse_into_parent(&mut self, id: ExprNodeId) -> ExprResult<()> {
        self.check_live(id)?;
        let parent = self.parent(id).ok_or(ExprError::NoParent)?;
        self.relink(parent, id);
        self.free_except(parent, Some(id));
        Ok(())
    }

    /// Remove `id` from its parent's argument list and return it as a
    /// standalone expression. Only list parents can lose an operand.
    pub fn unlink_from_parent(&mut self, id: ExprNodeId) -> ExprResult<Expr> {
        self.check_live(id)?;
        let parent = self.parent(id).ok_or(ExprError::NoParent)?;
        match self.node_mut(parent) {
            Node::List(items) => items.retain(|&c| c != id),
            _ => return Err(ExprError::FixedArityParent),
        }
        self.set_parent(id, None);
        let out = self.subtree(id);
        self.free_subtree(id);
        Ok(out)
    }

    pub fn swap_operands(&mut self, id: ExprNodeId) -> ExprResult<()> {
        self.check_live(id)?;
        match self.node_mut(id) {
            Node::Binary { args, .. } => {
                args.swap(0, 1);
                Ok(())
            }
            _ => Err(ExprError::InvalidNode {
                what: format!("node {id} is not a binary operator"),
            }),
        }
    }

    /// Turn `id` into a literal in place, freeing whatever was below it.
    pub fn morph_to_literal(&mut self, id: ExprNodeId, value: Real) -> ExprResult<()> {
        self.check_live(id)?;
        let children = self[id].children().to_vec();
        for child in children {
            self.free_subtree(child);
        }
        *self.node_mut(id) = Node::Literal(value);
        Ok(())
    }

    pub fn set_binary_op(&mut self, id: ExprNodeId, new_op: BinaryOp) -> ExprResult<()> {
        self.check_live(id)?;
        match self.node_mut(id) {
            Node::Binary { op, .. } => {
                *op = new_op;
                Ok(())
            }
            _ => Err(ExprError::InvalidNode {
                what: format!("node {id} is not a binary operator"),
            }),
        }
    }

    // ---- crate-internal arena plumbing ----

    pub(crate) fn set_root(&mut self, id: ExprNodeId) {
        self.root = id;
        self.set_parent(id, None);
    }

    /// Store `node` in a fresh slot and point its operands back at it.
    pub(crate) fn alloc(&mut self, node: Node) -> ExprNodeId {
        let slot = Some(Slot { node, parent: None });
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id.slot()] = slot;
                id
            }
            None => {
                let id = ExprNodeId::from_index(self.slots.len() as u32);
                self.slots.push(slot);
                id
            }
        };
        self.adopt_children(id);
        id
    }

    /// Overwrite the node at `id`, keeping its slot and parent. The caller
    /// owns whatever the old node's operands were.
    pub(crate) fn rewire(&mut self, id: ExprNodeId, node: Node) {
        *self.node_mut(id) = node;
        self.adopt_children(id);
    }

    pub(crate) fn node_mut(&mut self, id: ExprNodeId) -> &mut Node {
        match self.slots.get_mut(id.slot()) {
            Some(Some(slot)) => &mut slot.node,
            _ => panic!("stale expression node {id:?}"),
        }
    }

    pub(crate) fn set_parent(&mut self, id: ExprNodeId, parent: Option<ExprNodeId>) {
        if let Some(Some(slot)) = self.slots.get_mut(id.slot()) {
            slot.parent = parent;
        }
    }

    /// Put `new` in the position `old` occupies. `old` is left detached.
    pub(crate) fn relink(&mut self, old: ExprNodeId, new: ExprNodeId) {
        let parent = self.parent(old);
        match parent {
            Some(p) => {
                for child in self.node_mut(p).children_mut() {
                    if *child == old {
                        *child = new;
                    }
                }
            }
            None if self.root == old => self.root = new,
            None => {}
        }
        self.set_parent(old, None);
        self.set_parent(new, parent);
    }

    pub(crate) fn free_subtree(&mut self, id: ExprNodeId) {
        self.free_except(id, None);
    }

    fn free_except(&mut self, id: ExprNodeId, keep: Option<ExprNodeId>) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if Some(cur) == keep {
                continue;
            }
            if let Some(slot) = self.slots.get_mut(cur.slot()).and_then(Option::take) {
                stack.extend_from_slice(slot.node.children());
                self.free.push(cur);
            }
        }
    }

    fn adopt_children(&mut self, id: ExprNodeId) {
        for i in 0..self[id].child_count() {
            let child = self[id].children()[i];
            self.set_parent(child, Some(id));
        }
    }

    fn check_live(&self, id: ExprNodeId) -> ExprResult<()> {
        match self.node(id) {
            Some(_) => Ok(()),
            None => Err(ExprError::InvalidNode {
                what: format!("node {id} is not live"),
            }),
        }
    }

    /// Copy the subtree of `src` at `id` into this arena, children first.
    fn copy_from(&mut self, src: &Expr, id: ExprNodeId) -> ExprNodeId {
        // In postorder a node's copied children are the top entries of `done`.
        let mut done: Vec<ExprNodeId> = Vec::new();
        let mut last = id;
        for old in src.postorder_from(id) {
            let mut node = src[old].clone();
            let base = done.len().saturating_sub(node.child_count());
            for (child, new) in node.children_mut().iter_mut().zip(done.drain(base..)) {
                *child = new;
            }
            last = self.alloc(node);
            done.push(last);
        }
        last
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_equal(self.root, other, other.root)
    }
}

impl From<Real> for Expr {
    fn from(value: Real) -> Self {
        Expr::literal(value)
    }
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

// Test-only: lets unit tests build `%` expressions like the other operators.
#[cfg(test)]
impl std::ops::Rem for Expr {
    type Output = Expr;
    fn rem(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mod, self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Negate, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::variable(name)
    }

    #[test]
    fn build_with_operators() {
        let e = var("a") * var("b") + Expr::literal(3.0);
        assert_eq!(e.len(), 5);
        assert!(e.root_node().is_op(BinaryOp::Add));
        let lhs = e.children(e.root())[0];
        assert!(e[lhs].is_op(BinaryOp::Mul));
        e.check_parent_consistency().unwrap();
    }

    #[test]
    fn child_count_follows_variant() {
        let e = -(var("x"));
        assert_eq!(e.child_count(e.root()), 1);
        let e = var("x") / var("y");
        assert_eq!(e.child_count(e.root()), 2);
        assert_eq!(Expr::infinity().child_count(Expr::infinity().root()), 0);
    }

    #[test]
    fn clone_is_independent() {
        let a = var("a") + var("b");
        let mut b = a.clone();
        let rhs = b.children(b.root())[1];
        b.morph_to_literal(rhs, 7.0).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, var("a") + var("b"));
        b.check_parent_consistency().unwrap();
    }

    #[test]
    fn collapse_into_parent_replaces_parent() {
        // (a + b) * c  ->  collapse b  ->  b * c
        let mut e = (var("a") + var("b")) * var("c");
        let sum = e.children(e.root())[0];
        let b = e.children(sum)[1];
        e.collapse_into_parent(b).unwrap();
        assert_eq!(e, var("b") * var("c"));
        assert_eq!(e.len(), 3);
        e.check_parent_consistency().unwrap();
    }

    #[test]
    fn collapse_root_child_becomes_root() {
        let mut e = -(var("z"));
        let z = e.children(e.root())[0];
        e.collapse_into_parent(z).unwrap();
        assert_eq!(e.root(), z);
        assert_eq!(e, var("z"));
        e.check_parent_consistency().unwrap();
    }

    #[test]
    fn collapse_root_fails() {
        let mut e = var("a");
        assert_eq!(e.collapse_into_parent(e.root()), Err(ExprError::NoParent));
    }

    #[test]
    fn unlink_from_list() {
        let mut e = Expr::list(vec![var("a"), var("b"), var("c")]).unwrap();
        let b = e.children(e.root())[1];
        let removed = e.unlink_from_parent(b).unwrap();
        assert_eq!(removed, var("b"));
        assert_eq!(e.child_count(e.root()), 2);
        e.check_parent_consistency().unwrap();
    }

    #[test]
    fn unlink_from_binary_is_rejected() {
        let mut e = var("a") + var("b");
        let a = e.children(e.root())[0];
        assert_eq!(e.unlink_from_parent(a), Err(ExprError::FixedArityParent));
        e.check_parent_consistency().unwrap();
    }

    #[test]
    fn replace_returns_old_subtree() {
        let mut e = var("a") * (var("b") + var("c"));
        let sum = e.children(e.root())[1];
        let old = e.replace(sum, Expr::literal(2.0)).unwrap();
        assert_eq!(old, var("b") + var("c"));
        assert_eq!(e, var("a") * Expr::literal(2.0));
        e.check_parent_consistency().unwrap();
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut e = var("a") * (var("b") + var("c"));
        let slots_before = e.slots.len();
        let sum = e.children(e.root())[1];
        e.morph_to_literal(sum, 1.0).unwrap();
        e.replace(sum, -var("x")).unwrap();
        assert_eq!(e.slots.len(), slots_before);
        e.check_parent_consistency().unwrap();
    }

    #[test]
    fn consistency_check_detects_bad_parent() {
        let mut e = var("a") + var("b");
        let a = e.children(e.root())[0];
        let b = e.children(e.root())[1];
        e.set_parent(a, Some(b));
        assert!(e.check_parent_consistency().is_err());
    }

    #[test]
    fn variables_are_sorted_and_unique() {
        let e = var("y") * var("x") + var("y");
        assert_eq!(e.variables(), vec!["x".to_string(), "y".to_string()]);
        assert!(e.find_variable("x").is_some());
        assert!(e.find_variable("exp").is_none());
    }

    #[test]
    fn postorder_visits_children_first() {
        let e = var("a") - var("b");
        let order = e.postorder();
        assert_eq!(order.len(), 3);
        assert_eq!(*order.last().unwrap(), e.root());
        assert_eq!(e[order[0]], Node::Variable("a".into()));
    }
}
