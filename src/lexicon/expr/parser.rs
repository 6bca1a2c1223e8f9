//! Recursive-descent parser for meaning expressions.
//!
//! Precedence, loosest first:
//! `or` → `and` → `not` → comparison / `in` → `+ -` → `* / %` → unary `-`
//! → postfix `[i]` → primary.
//!
//! Nesting and operator chains both count towards [`MAX_DEPTH`], which
//! bounds the depth of the resulting tree.

use super::ExprError;
use super::ast::{BinOp, Expr, Func, Literal, UnaryOp, Var, Attr};
use super::lexer::{Token, TokenKind};

/// Deepest tree a meaning expression may produce.
pub const MAX_DEPTH: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete expression, rejecting trailing input.
    pub fn parse(mut self) -> Result<Expr, ExprError> {
        if self.peek() == &TokenKind::Eof {
            return Err(ExprError::Empty);
        }
        let expr = self.parse_or()?;
        if self.peek() != &TokenKind::Eof {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    // ── Token helpers ──────────────────────────────────────────────────

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.offset).unwrap_or(0)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if matches!(self.peek(), TokenKind::Ident(name) if name == word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ExprError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ExprError {
        ExprError::UnexpectedToken {
            found: self.peek().to_string(),
            expected,
            offset: self.offset(),
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep {
                offset: self.offset(),
            });
        }
        Ok(())
    }

    fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    // ── Grammar ────────────────────────────────────────────────────────

    // Every nested `parse_or` and every link of an operator chain adds a
    // level; the level is released when the construct is finished.

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        self.enter()?;
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") || self.eat(&TokenKind::OrOr) {
            self.enter()?;
            let right = self.parse_and()?;
            left = Self::binary(left, BinOp::Or, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") || self.eat(&TokenKind::AndAnd) {
            self.enter()?;
            let right = self.parse_not()?;
            left = Self::binary(left, BinOp::And, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_keyword("not") || self.eat(&TokenKind::Bang) {
            self.enter()?;
            let operand = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<BinOp> {
        match self.peek() {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::NotEq => Some(BinOp::Ne),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Ge => Some(BinOp::Ge),
            TokenKind::Ident(name) if name == "in" => Some(BinOp::In),
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_additive()?;
        let Some(op) = self.comparison_op() else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_additive()?;
        if self.comparison_op().is_some() {
            return Err(ExprError::ChainedComparison {
                offset: self.offset(),
            });
        }
        Ok(Self::binary(left, op, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.enter()?;
            let right = self.parse_multiplicative()?;
            left = Self::binary(left, op, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            self.enter()?;
            let right = self.parse_unary()?;
            left = Self::binary(left, op, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Minus) {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(match operand {
                Expr::Literal(Literal::Int(n)) => Expr::Literal(Literal::Int(-n)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(other),
                },
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;
        while self.eat(&TokenKind::LBracket) {
            self.enter()?;
            let index = self.parse_or()?;
            self.expect(&TokenKind::RBracket, "`]`")?;
            expr = Expr::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let offset = self.offset();
        match self.advance() {
            TokenKind::Int(n) => Ok(Expr::Literal(Literal::Int(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Literal::Str(s))),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_or()?);
                        if self.eat(&TokenKind::RBracket) {
                            break;
                        }
                        self.expect(&TokenKind::Comma, "`,` or `]`")?;
                    }
                }
                Ok(Expr::List(items))
            }
            TokenKind::Ident(name) => self.parse_ident(name, offset),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.unexpected("a value"))
            }
        }
    }

    fn parse_ident(&mut self, name: String, offset: usize) -> Result<Expr, ExprError> {
        match name.as_str() {
            "True" | "true" => return Ok(Expr::Literal(Literal::Bool(true))),
            "False" | "false" => return Ok(Expr::Literal(Literal::Bool(false))),
            "None" | "none" | "null" => return Ok(Expr::Literal(Literal::Null)),
            _ => {}
        }

        if let Some(var) = Var::from_name(&name) {
            self.expect(&TokenKind::Dot, "`.` followed by an attribute")?;
            let attr_offset = self.offset();
            return match self.advance() {
                TokenKind::Ident(attr) => match Attr::from_name(&attr) {
                    Some(attr) => Ok(Expr::Attr { var, attr }),
                    None => Err(ExprError::UnknownAttribute {
                        attr,
                        offset: attr_offset,
                    }),
                },
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    Err(self.unexpected("an attribute name"))
                }
            };
        }

        if self.peek() == &TokenKind::LParen {
            let func = Func::from_name(&name)
                .ok_or_else(|| ExprError::UnknownFunction { name: name.clone(), offset })?;
            self.advance();
            let mut args = Vec::new();
            if !self.eat(&TokenKind::RParen) {
                loop {
                    args.push(self.parse_or()?);
                    if self.eat(&TokenKind::RParen) {
                        break;
                    }
                    self.expect(&TokenKind::Comma, "`,` or `)`")?;
                }
            }
            return Ok(Expr::Call { func, args });
        }

        Err(ExprError::UnknownName { name, offset })
    }
}
