//! Substitution table and numeric evaluation.

use std::collections::HashMap;

use sfg_core::{ExprNodeId, Real};

use crate::error::{ExprError, ExprResult};
use crate::tree::{Expr, Node};

/// Value bound to a variable name.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Real),
    /// Resolved on lookup against the same table.
    Expr(Expr),
}

impl From<Real> for Binding {
    fn from(value: Real) -> Self {
        Binding::Value(value)
    }
}

impl From<Expr> for Binding {
    fn from(expr: Expr) -> Self {
        Binding::Expr(expr)
    }
}

/// Variable name to value mapping used by [`Expr::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct SubsTable {
    bindings: HashMap<String, Binding>,
}

impl SubsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with `e` and `pi` bound, so `exp(x)` rewritten to `e^x` evaluates.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.insert("e", core::f64::consts::E);
        table.insert("pi", core::f64::consts::PI);
        table
    }

    /// Bind `name`, replacing any previous binding. Returns the old one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Binding>) -> Option<Binding> {
        self.bindings.insert(name.into(), value.into())
    }

    /// Rebind an existing name.
    pub fn set(&mut self, name: &str, value: impl Into<Binding>) -> ExprResult<()> {
        match self.bindings.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(ExprError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        self.bindings.remove(name)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Numeric value of `name`, resolving expression bindings recursively.
    pub fn value_of(&self, name: &str) -> ExprResult<Real> {
        self.resolve(name, &mut Vec::new())
    }

    fn resolve(&self, name: &str, resolving: &mut Vec<String>) -> ExprResult<Real> {
        match self.bindings.get(name) {
            None => Err(ExprError::UndefinedVariable {
                name: name.to_string(),
            }),
            Some(Binding::Value(v)) => Ok(*v),
            Some(Binding::Expr(expr)) => {
                if resolving.iter().any(|n| n == name) {
                    return Err(ExprError::CyclicBinding {
                        name: name.to_string(),
                    });
                }
                resolving.push(name.to_string());
                let value = expr.eval_node(expr.root(), self, resolving);
                resolving.pop();
                value
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Real)> for SubsTable {
    fn from_iter<I: IntoIterator<Item = (K, Real)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}

impl Expr {
    /// Reduce to a number.
    ///
    /// Division by zero follows IEEE rules and `oo` evaluates to NaN; neither
    /// is an error. A variable missing from `subs` is.
    pub fn evaluate(&self, subs: &SubsTable) -> ExprResult<Real> {
        self.eval_node(self.root(), subs, &mut Vec::new())
    }

    /// Postorder walk with a value stack: each operator pops its operands.
    fn eval_node(
        &self,
        id: ExprNodeId,
        subs: &SubsTable,
        resolving: &mut Vec<String>,
    ) -> ExprResult<Real> {
        let mut values: Vec<Real> = Vec::new();
        for id in self.postorder_from(id) {
            let value = match &self[id] {
                Node::Literal(v) => *v,
                Node::Variable(name) => subs.resolve(name, resolving)?,
                Node::Infinity => Real::NAN,
                Node::Unary { op, .. } => op.apply(pop(&mut values)?),
                Node::Binary { op, .. } => {
                    let b = pop(&mut values)?;
                    let a = pop(&mut values)?;
                    op.apply(a, b)
                }
                Node::List(items) if items.len() == 1 => pop(&mut values)?,
                Node::List(_) => return Err(ExprError::NotEvaluable),
            };
            values.push(value);
        }
        pop(&mut values)
    }
}

fn pop(values: &mut Vec<Real>) -> ExprResult<Real> {
    values.pop().ok_or_else(|| ExprError::InvalidNode {
        what: "operator without operand".into(),
    })
}

/// Free-function form of [`Expr::evaluate`].
pub fn evaluate(expr: &Expr, subs: &SubsTable) -> ExprResult<Real> {
    expr.evaluate(subs)
}
