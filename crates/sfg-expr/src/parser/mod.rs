//! Recursive-descent parser: text to [`Expr`].
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! sequence := additive (',' additive)*
//! additive := term (('+' | '-') term)*
//! term     := signed (('*' | '/' | '%') signed | power)*
//! signed   := ('-' | '+') signed | power
//! power    := atom ('^' exponent)?
//! exponent := ('-' | '+') exponent | power power*
//! atom     := NUMBER | IDENT | 'oo' | '(' additive (',' additive)* ')'
//! ```
//!
//! A `power` directly after another operand in `term` is an implicit
//! multiplication (`2a`, `a b`, `5(x)`). Parenthesized groups come out of the
//! grammar as argument lists; the post passes in [`post`] turn `exp(x)` into
//! `e^x` and dissolve the single-item lists.

mod lexer;
mod post;

use sfg_core::ExprNodeId;
use tracing::trace;

use crate::error::{ExprResult, ParseError, ParseErrorKind};
use crate::tree::{BinaryOp, Expr, Node, UnaryOp};
use lexer::{Token, TokenKind};

/// Parse `text` into an expression.
///
/// On failure nothing of the partially built tree escapes.
pub fn parse(text: &str) -> ExprResult<Expr> {
    let tokens = lexer::tokenize(text)?;
    if tokens.is_empty() {
        return Err(ParseError::new(text.len(), ParseErrorKind::UnexpectedEnd).into());
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: text.len(),
        expr: Expr::unrooted(),
    };
    parser.expr.try_reserve(tokens.len())?;

    let root = parser.sequence()?;
    if let Some(tok) = parser.peek_token() {
        let kind = if tok.kind == TokenKind::RParen {
            ParseErrorKind::UnbalancedParen
        } else {
            ParseErrorKind::UnexpectedToken
        };
        return Err(ParseError::new(tok.offset, kind).into());
    }

    let mut expr = parser.expr;
    expr.set_root(root);
    let rewritten = post::replace_exp_calls(&mut expr)?;
    let collapsed = post::collapse_lists(&mut expr)?;
    trace!(rewritten, collapsed, nodes = expr.len(), "parsed expression");
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Offset reported when input runs out.
    end: usize,
    expr: Expr,
}

type PResult = Result<ExprNodeId, ParseError>;

impl<'a> Parser<'a> {
    fn peek_token(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&'a TokenKind> {
        self.peek_token().map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn offset(&self) -> usize {
        self.peek_token().map_or(self.end, |t| t.offset)
    }

    fn binary(&mut self, op: BinaryOp, lhs: ExprNodeId, rhs: ExprNodeId) -> ExprNodeId {
        self.expr.alloc(Node::Binary { op, args: [lhs, rhs] })
    }

    fn sequence(&mut self) -> PResult {
        let mut lhs = self.additive()?;
        while self.peek() == Some(&TokenKind::Comma) {
            self.bump();
            let rhs = self.additive()?;
            lhs = self.binary(BinaryOp::Comma, lhs, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> PResult {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.term()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> PResult {
        let mut lhs = self.signed()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                Some(kind) if kind.starts_atom() => {
                    let rhs = self.power()?;
                    lhs = self.binary(BinaryOp::Mul, lhs, rhs);
                    continue;
                }
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.signed()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn signed(&mut self) -> PResult {
        let negations = self.sign_run();
        let operand = self.power()?;
        Ok(self.negate_times(operand, negations))
    }

    /// Consume a run of `+`/`-` signs and return how many were `-`.
    fn sign_run(&mut self) -> usize {
        let mut negations = 0;
        loop {
            match self.peek() {
                Some(TokenKind::Minus) => negations += 1,
                Some(TokenKind::Plus) => {}
                _ => return negations,
            }
            self.bump();
        }
    }

    fn negate_times(&mut self, mut operand: ExprNodeId, negations: usize) -> ExprNodeId {
        for _ in 0..negations {
            operand = self.negate(operand);
        }
        operand
    }

    /// A negated number literal becomes a negative literal.
    fn negate(&mut self, operand: ExprNodeId) -> ExprNodeId {
        if let Node::Literal(v) = self.expr[operand] {
            self.expr.rewire(operand, Node::Literal(-v));
            operand
        } else {
            self.expr.alloc(Node::Unary {
                op: UnaryOp::Negate,
                operand,
            })
        }
    }

    fn power(&mut self) -> PResult {
        let base = self.atom()?;
        if self.peek() != Some(&TokenKind::Caret) {
            return Ok(base);
        }
        self.bump();
        let exponent = self.exponent()?;
        Ok(self.binary(BinaryOp::Pow, base, exponent))
    }

    /// Right operand of `^`. Absorbs a run of juxtaposed factors so that
    /// `c^d(e+f)` reads as `c^(d*(e+f))`.
    fn exponent(&mut self) -> PResult {
        let negations = self.sign_run();
        let mut lhs = self.power()?;
        while self.peek().is_some_and(TokenKind::starts_atom) {
            let rhs = self.power()?;
            lhs = self.binary(BinaryOp::Mul, lhs, rhs);
        }
        Ok(self.negate_times(lhs, negations))
    }

    fn atom(&mut self) -> PResult {
        let offset = self.offset();
        let Some(tok) = self.bump() else {
            return Err(ParseError::new(offset, ParseErrorKind::UnexpectedEnd));
        };
        let node = match &tok.kind {
            TokenKind::Number(v) => Node::Literal(*v),
            TokenKind::Ident(name) => Node::Variable(name.clone()),
            TokenKind::Infinity => Node::Infinity,
            TokenKind::LParen => return self.group(offset),
            TokenKind::RParen => {
                return Err(ParseError::new(offset, ParseErrorKind::UnbalancedParen));
            }
            _ => return Err(ParseError::new(offset, ParseErrorKind::UnexpectedToken)),
        };
        Ok(self.expr.alloc(node))
    }

    /// Contents of `( ... )` after the opening parenthesis at `open`.
    fn group(&mut self, open: usize) -> PResult {
        let mut items = vec![self.additive()?];
        while self.peek() == Some(&TokenKind::Comma) {
            self.bump();
            items.push(self.additive()?);
        }
        match self.peek() {
            Some(TokenKind::RParen) => {
                self.bump();
                Ok(self.expr.alloc(Node::List(items)))
            }
            Some(_) => Err(ParseError::new(self.offset(), ParseErrorKind::UnexpectedToken)),
            None => Err(ParseError::new(open, ParseErrorKind::UnbalancedParen)),
        }
    }
}
