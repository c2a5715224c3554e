//! Precedence-climbing expression parser.
//!
//! Precedence, descending: logical OR, logical AND, bitwise OR, bitwise
//! XOR, bitwise AND, equality, comparison, shift, additive,
//! multiplicative, unary, primary.

use super::Parser;
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::errors::ErrorKind;
use crate::lexer::TokenKind;

impl<'t> Parser<'t> {
    pub(super) fn parse_expr(&mut self) -> Expr {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Expr {
        let mut lhs = self.parse_logical_and();
        while self.check(&TokenKind::PipePipe) {
            let loc = self.advance().loc.clone();
            let rhs = self.parse_logical_and();
            lhs = bin(BinaryOp::LogicalOr, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_logical_and(&mut self) -> Expr {
        let mut lhs = self.parse_bitor();
        while self.check(&TokenKind::AmpAmp) {
            let loc = self.advance().loc.clone();
            let rhs = self.parse_bitor();
            lhs = bin(BinaryOp::LogicalAnd, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_bitor(&mut self) -> Expr {
        let mut lhs = self.parse_bitxor();
        while self.check(&TokenKind::Pipe) {
            let loc = self.advance().loc.clone();
            let rhs = self.parse_bitxor();
            lhs = bin(BinaryOp::BitOr, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_bitxor(&mut self) -> Expr {
        let mut lhs = self.parse_bitand();
        while self.check(&TokenKind::Caret) {
            let loc = self.advance().loc.clone();
            let rhs = self.parse_bitand();
            lhs = bin(BinaryOp::BitXor, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_bitand(&mut self) -> Expr {
        let mut lhs = self.parse_equality();
        while self.check(&TokenKind::Amp) {
            let loc = self.advance().loc.clone();
            let rhs = self.parse_equality();
            lhs = bin(BinaryOp::BitAnd, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_equality(&mut self) -> Expr {
        let mut lhs = self.parse_comparison();
        loop {
            let op = if self.check(&TokenKind::EqEq) {
                BinaryOp::Eq
            } else if self.check(&TokenKind::NotEq) {
                BinaryOp::NotEq
            } else {
                break;
            };
            let loc = self.advance().loc.clone();
            let rhs = self.parse_comparison();
            lhs = bin(op, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_comparison(&mut self) -> Expr {
        let mut lhs = self.parse_shift();
        loop {
            let op = if self.check(&TokenKind::Le) {
                BinaryOp::Le
            } else if self.check(&TokenKind::Ge) {
                BinaryOp::Ge
            } else if self.check(&TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.check(&TokenKind::Gt) {
                BinaryOp::Gt
            } else {
                break;
            };
            let loc = self.advance().loc.clone();
            let rhs = self.parse_shift();
            lhs = bin(op, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_shift(&mut self) -> Expr {
        let mut lhs = self.parse_additive();
        loop {
            let op = if self.check(&TokenKind::Shl) {
                BinaryOp::Shl
            } else if self.check(&TokenKind::Shr) {
                BinaryOp::Shr
            } else {
                break;
            };
            let loc = self.advance().loc.clone();
            let rhs = self.parse_additive();
            lhs = bin(op, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_additive(&mut self) -> Expr {
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = if self.check(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.check(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let loc = self.advance().loc.clone();
            let rhs = self.parse_multiplicative();
            lhs = bin(op, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            let op = if self.check(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.check(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.check(&TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let loc = self.advance().loc.clone();
            let rhs = self.parse_unary();
            lhs = bin(op, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        let (op, loc) = if self.check(&TokenKind::Minus) {
            (UnaryOp::Neg, self.advance().loc.clone())
        } else if self.check(&TokenKind::Tilde) {
            (UnaryOp::BitNot, self.advance().loc.clone())
        } else if self.check(&TokenKind::Bang) {
            (UnaryOp::LogicalNot, self.advance().loc.clone())
        } else if self.check(&TokenKind::Lt) {
            (UnaryOp::LowByte, self.advance().loc.clone())
        } else if self.check(&TokenKind::Gt) {
            (UnaryOp::HighByte, self.advance().loc.clone())
        } else if self.check(&TokenKind::Caret) {
            (UnaryOp::BankByte, self.advance().loc.clone())
        } else {
            return self.parse_primary();
        };
        let operand = self.parse_unary();
        Expr::Unary {
            op,
            operand: Box::new(operand),
            loc,
        }
    }

    fn parse_primary(&mut self) -> Expr {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Number { value, .. } => {
                self.advance();
                Expr::Number(*value)
            }
            TokenKind::String(s) => {
                self.advance();
                Expr::Str(s.clone())
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Expr::Identifier(name.clone())
            }
            TokenKind::Mnemonic(name) => {
                // a mnemonic-looking word can still be referenced as a
                // plain identifier inside an expression, e.g. a label
                // that happens to collide with a target mnemonic.
                self.advance();
                Expr::Identifier(name.clone())
            }
            TokenKind::LocalLabel(name) => {
                self.advance();
                Expr::LocalLabel(name.clone())
            }
            TokenKind::AnonymousLabel(glyph, depth) => {
                let (glyph, depth) = (*glyph, *depth);
                self.advance();
                Expr::AnonymousLabelRef { glyph, depth }
            }
            TokenKind::Star => {
                self.advance();
                Expr::CurrentAddress
            }
            TokenKind::MacroParam(name) => {
                let name = name.clone();
                self.advance();
                Expr::MacroParam(name)
            }
            TokenKind::MacroArgCount => {
                self.advance();
                Expr::MacroArgCount
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(&TokenKind::RParen, "expected ')' to close expression");
                inner
            }
            _ => {
                self.error_at(
                    ErrorKind::MalformedExpression(format!(
                        "expected expression, found {:?}",
                        tok.kind
                    )),
                    tok.loc.clone(),
                );
                // Recovery: pretend it was a zero so callers higher up
                // can keep building a tree instead of bailing entirely.
                Expr::Number(0)
            }
        }
    }
}

fn bin(
    op: BinaryOp,
    lhs: Expr,
    rhs: Expr,
    loc: crate::source::SourceLocation,
) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        loc,
    }
}
