//! Recursive-descent parser producing the expression tree.

use std::iter::Peekable;
use std::vec::IntoIter;

use crate::reflect::Value;

use super::ExpressionError;
use super::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Literal(Value),
    Root,
    Property(String),
    Call { name: String, args: Vec<Expr> },
    Field { target: Box<Expr>, name: String },
    Index { target: Box<Expr>, index: Box<Expr> },
    Negate(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl BinaryOp {
    pub(super) const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
            Self::Remainder => '%',
        }
    }
}

/// Parses a whole token stream; `end` is the source length used as the
/// offset of errors at end of input.
pub(super) fn parse(
    tokens: Vec<Token>,
    end: usize,
    max_depth: usize,
) -> Result<Expr, ExpressionError> {
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        end,
        depth: 0,
        max_depth,
    };
    let expr = parser.expression()?;
    match parser.tokens.next() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::syntax(token.offset, "unexpected trailing input")),
    }
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    end: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn peek_kind(&mut self) -> Option<&TokenKind> {
        self.tokens.peek().map(|token| &token.kind)
    }

    fn next_offset(&mut self) -> usize {
        self.tokens.peek().map_or(self.end, |token| token.offset)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.tokens.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ExpressionError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(ExpressionError::syntax(self.next_offset(), format!("expected {what}")))
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExpressionError::syntax(
                self.next_offset(),
                format!("expression nests deeper than {}", self.max_depth),
            ));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, ExpressionError> {
        self.descend()?;
        let expr = self.additive()?;
        self.depth -= 1;
        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Multiply,
                Some(TokenKind::Slash) => BinaryOp::Divide,
                Some(TokenKind::Percent) => BinaryOp::Remainder,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if !self.eat(&TokenKind::Minus) {
            return self.postfix();
        }
        self.descend()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Negate(Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, ExpressionError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let offset = self.next_offset();
                let Some(Token {
                    kind: TokenKind::Ident(name),
                    ..
                }) = self.tokens.next_if(|token| matches!(token.kind, TokenKind::Ident(_)))
                else {
                    return Err(ExpressionError::syntax(offset, "expected a field name after '.'"));
                };
                expr = Expr::Field {
                    target: Box::new(expr),
                    name,
                };
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.next_offset();
        let Some(token) = self.tokens.next() else {
            return Err(ExpressionError::syntax(offset, "expected an operand"));
        };
        match token.kind {
            TokenKind::Int(value) => Ok(Expr::Literal(Value::Int(value))),
            TokenKind::Float(value) => Ok(Expr::Literal(Value::Float(value))),
            TokenKind::Str(text) => Ok(Expr::Literal(Value::Str(text))),
            TokenKind::Root => Ok(Expr::Root),
            TokenKind::Ident(name) => self.identifier(name),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(ExpressionError::syntax(token.offset, "expected an operand")),
        }
    }

    fn identifier(&mut self, name: String) -> Result<Expr, ExpressionError> {
        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }
        if !self.eat(&TokenKind::LParen) {
            return Ok(Expr::Property(name));
        }
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.expression()?);
                if self.eat(&TokenKind::RParen) {
                    break;
                }
                self.expect(&TokenKind::Comma, "',' or ')'")?;
            }
        }
        Ok(Expr::Call { name, args })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::expression::lexer::tokenize;

    fn parse_source(source: &str) -> Result<Expr, ExpressionError> {
        parse(tokenize(source).expect("tokenize"), source.len(), 64)
    }

    fn property(name: &str) -> Box<Expr> {
        Box::new(Expr::Property(String::from(name)))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_source("a + b * c").expect("parse");
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: property("a"),
                rhs: Box::new(binary(
                    BinaryOp::Multiply,
                    Expr::Property(String::from("b")),
                    Expr::Property(String::from("c")),
                )),
            }
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse_source("a - b - c").expect("parse");
        let Expr::Binary { lhs, rhs, .. } = expr else {
            panic!("expected a binary expression");
        };
        assert_eq!(rhs, property("c"));
        assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Subtract, .. }));
    }

    #[test]
    fn parses_calls_and_postfix_chains() {
        let expr = parse_source("lookup('k', 2).items[0]").expect("parse");
        let Expr::Index { target, index } = expr else {
            panic!("expected an index");
        };
        assert_eq!(*index, Expr::Literal(Value::Int(0)));
        let Expr::Field { target: call, name } = *target else {
            panic!("expected a field");
        };
        assert_eq!(name, "items");
        assert_eq!(
            *call,
            Expr::Call {
                name: String::from("lookup"),
                args: vec![
                    Expr::Literal(Value::from("k")),
                    Expr::Literal(Value::Int(2)),
                ],
            }
        );
    }

    #[test]
    fn parses_empty_argument_lists() {
        assert_eq!(
            parse_source("size()").expect("parse"),
            Expr::Call {
                name: String::from("size"),
                args: Vec::new(),
            }
        );
    }

    #[test]
    fn keywords_are_literals() {
        assert_eq!(
            parse_source("null").expect("parse"),
            Expr::Literal(Value::Null)
        );
    }

    #[test]
    fn rejects_missing_field_name() {
        let error = parse_source("a.1").expect_err("field name required");
        assert_eq!(
            error,
            ExpressionError::syntax(2, "expected a field name after '.'")
        );
    }

    #[test]
    fn rejects_empty_input() {
        let error = parse_source("").expect_err("operand required");
        assert_eq!(error, ExpressionError::syntax(0, "expected an operand"));
    }

    #[test]
    fn rejects_deep_negation_chains() {
        let source = "-".repeat(70) + "1";
        assert!(parse_source(&source).is_err());
    }
}
