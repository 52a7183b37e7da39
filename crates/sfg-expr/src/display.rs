//! Infix rendering and Graphviz export.

use core::fmt::{self, Write as _};

use sfg_core::ExprNodeId;

use crate::tree::{BinaryOp, Expr, Node};

const NEGATE_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 5;

enum Piece {
    Node(ExprNodeId, u8),
    Text(&'static str),
}

impl Expr {
    fn precedence_of(&self, id: ExprNodeId) -> u8 {
        match &self[id] {
            Node::Binary { op, .. } => op.precedence(),
            Node::Unary { .. } => NEGATE_PRECEDENCE,
            // Negative literals print with a sign and bind like negation.
            Node::Literal(v) if v.is_sign_negative() && *v != 0.0 => NEGATE_PRECEDENCE,
            _ => ATOM_PRECEDENCE,
        }
    }

    /// Writes the subtree at `id` from an explicit work stack of pieces.
    fn fmt_node(&self, id: ExprNodeId, min_prec: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![Piece::Node(id, min_prec)];
        while let Some(piece) = pending.pop() {
            let (id, min_prec) = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(id, min_prec) => (id, min_prec),
            };
            let prec = self.precedence_of(id);
            let wrap = prec < min_prec;
            if wrap {
                f.write_char('(')?;
                pending.push(Piece::Text(")"));
            }
            match &self[id] {
                Node::Literal(v) => write!(f, "{v}")?,
                Node::Variable(name) => f.write_str(name)?,
                Node::Infinity => f.write_str("oo")?,
                Node::Unary { op, operand } => {
                    f.write_str(op.symbol())?;
                    pending.push(Piece::Node(*operand, NEGATE_PRECEDENCE));
                }
                Node::Binary { op, args } => {
                    // Pow is right-associative, everything else left.
                    let (lhs_min, rhs_min) = match op {
                        BinaryOp::Pow => (prec + 1, prec),
                        _ => (prec, prec + 1),
                    };
                    let separator = match op {
                        BinaryOp::Comma => ", ",
                        BinaryOp::Add => " + ",
                        BinaryOp::Sub => " - ",
                        _ => op.symbol(),
                    };
                    pending.push(Piece::Node(args[1], rhs_min));
                    pending.push(Piece::Text(separator));
                    pending.push(Piece::Node(args[0], lhs_min));
                }
                Node::List(items) => {
                    f.write_char('(')?;
                    pending.push(Piece::Text(")"));
                    for (i, &item) in items.iter().enumerate().rev() {
                        pending.push(Piece::Node(item, 1));
                        if i > 0 {
                            pending.push(Piece::Text(", "));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Graphviz digraph of the tree. Child edges carry their operand index;
    /// parent back-edges are drawn in blue.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph expr {\n");
        let order = self.preorder();
        for &id in &order {
            let label = match &self[id] {
                Node::Literal(v) => format!("{v}"),
                Node::Variable(name) => name.clone(),
                Node::Infinity => "oo".to_string(),
                Node::Unary { op, .. } => op.symbol().to_string(),
                Node::Binary { op, .. } => op.symbol().to_string(),
                Node::List(_) => "list".to_string(),
            };
            let _ = writeln!(out, "    N{id} [label=\"{}\"];", label.replace('"', "\\\""));
        }
        for &id in &order {
            for (i, &child) in self.children(id).iter().enumerate() {
                let _ = writeln!(out, "    N{id} -> N{child} [label=\"{i}\"];");
                if self.parent(child) == Some(id) {
                    let _ = writeln!(out, "    N{child} -> N{id} [color=\"blue\"];");
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root_node() {
            // a bare negative number at the top needs no parens
            Node::Literal(v) => write!(f, "{v}"),
            _ => self.fmt_node(self.root(), 0, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::Expr;

    fn var(name: &str) -> Expr {
        Expr::variable(name)
    }

    #[test]
    fn minimal_parentheses() {
        let e = (var("a") + var("b")) * var("c");
        assert_eq!(e.to_string(), "(a + b)*c");

        let e = var("a") + var("b") * var("c");
        assert_eq!(e.to_string(), "a + b*c");

        let e = var("a") - (var("b") - var("c"));
        assert_eq!(e.to_string(), "a - (b - c)");
    }

    #[test]
    fn pow_is_right_associative() {
        let e = var("a").pow(var("b").pow(var("c")));
        assert_eq!(e.to_string(), "a^b^c");
        let e = var("a").pow(var("b")).pow(var("c"));
        assert_eq!(e.to_string(), "(a^b)^c");
    }

    #[test]
    fn negatives() {
        assert_eq!(Expr::literal(-3.0).to_string(), "-3");
        let e = var("x").pow(Expr::literal(-1.0));
        assert_eq!(e.to_string(), "x^(-1)");
        let e = -(var("a") + var("b"));
        assert_eq!(e.to_string(), "-(a + b)");
        assert_eq!((Expr::infinity() * var("a")).to_string(), "oo*a");
    }

    #[test]
    fn dot_export_has_back_edges() {
        let e = var("a") + Expr::literal(1.0);
        let dot = e.to_dot();
        assert!(dot.starts_with("digraph expr {"));
        assert!(dot.contains("[label=\"+\"]"));
        assert!(dot.contains("[label=\"0\"]"));
        assert_eq!(dot.matches("color=\"blue\"").count(), 2);
    }
}
