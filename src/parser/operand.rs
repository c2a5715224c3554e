//! Addressing-mode parsing: the syntactic shape of an instruction's
//! operand, inferred purely from the tokens that follow the mnemonic.
//! ZeroPage-vs-Absolute narrowing happens later, during analysis.

use super::Parser;
use crate::ast::{AddressingMode, Expr, IndexRegister};
use crate::lexer::TokenKind;

/// One operand's raw syntactic shape before it's known which side of a
/// two-operand instruction it sits on.
enum OperandShape {
    Register(String),
    Immediate(Expr),
    Indirect(Expr),
    Plain(Expr),
}

impl<'t> Parser<'t> {
    pub(super) fn parse_addressing_mode(&mut self) -> AddressingMode {
        if self.at_statement_end() {
            return AddressingMode::Implied;
        }

        if self.is_bare_accumulator() {
            self.advance();
            return AddressingMode::Accumulator;
        }

        if self.check(&TokenKind::Hash) {
            self.advance();
            return AddressingMode::Immediate(self.parse_expr());
        }

        if self.check(&TokenKind::LParen) {
            return self.parse_paren_operand();
        }

        if self.check(&TokenKind::LBracket) {
            return self.parse_bracket_operand();
        }

        let expr = self.parse_expr();
        if self.check(&TokenKind::Comma) {
            self.advance();
            let reg = self.parse_index_register();
            return AddressingMode::Indexed(expr, reg);
        }
        AddressingMode::Absolute(expr)
    }

    /// Parses a two-operand instruction's operand list (`LD A, (HL)`,
    /// `ADD A, B`, `MOVE.W D0, D1`) for register-oriented targets,
    /// returning whichever operand is a bare register name plus the
    /// `AddressingMode` the other operand parses to. A single operand
    /// (`JP nn`, `PUSH BC`, `INC (HL)`) is also accepted.
    pub(super) fn parse_two_operand_mode(&mut self) -> (Option<String>, AddressingMode) {
        if self.at_statement_end() {
            return (None, AddressingMode::Implied);
        }
        let first = self.parse_operand_shape();
        if self.check(&TokenKind::Comma) {
            self.advance();
            let second = self.parse_operand_shape();
            return combine_operands(first, second);
        }
        let reg = register_name(&first);
        (reg, shape_to_mode(first))
    }

    fn parse_operand_shape(&mut self) -> OperandShape {
        if self.check(&TokenKind::Hash) {
            self.advance();
            return OperandShape::Immediate(self.parse_expr());
        }
        if self.check(&TokenKind::LParen) {
            self.advance();
            let inner = self.parse_expr();
            self.expect(&TokenKind::RParen, "expected ')' to close indirect operand");
            return OperandShape::Indirect(inner);
        }
        let expr = self.parse_expr();
        if let Expr::Identifier(name) = &expr {
            if crate::isa::is_register_name(self.target, name) {
                return OperandShape::Register(name.clone());
            }
        }
        OperandShape::Plain(expr)
    }

    fn is_bare_accumulator(&self) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier(name) if name.eq_ignore_ascii_case("a"))
            && matches!(
                self.tokens.get(self.pos + 1).map(|t| &t.kind),
                Some(TokenKind::Newline) | Some(TokenKind::Eof) | None
            )
    }

    fn parse_paren_operand(&mut self) -> AddressingMode {
        self.advance(); // '('
        let inner = self.parse_expr();
        if self.check(&TokenKind::Comma) {
            // (expr,x)
            self.advance();
            let reg = self.parse_index_register();
            self.expect(&TokenKind::RParen, "expected ')' to close indexed-indirect operand");
            debug_assert_eq!(reg, IndexRegister::X);
            return AddressingMode::IndexedIndirect(inner);
        }
        self.expect(&TokenKind::RParen, "expected ')' to close indirect operand");
        if self.check(&TokenKind::Comma) {
            // (expr),y
            self.advance();
            let reg = self.parse_index_register();
            debug_assert_eq!(reg, IndexRegister::Y);
            return AddressingMode::IndirectIndexed(inner);
        }
        AddressingMode::Indirect(inner)
    }

    fn parse_bracket_operand(&mut self) -> AddressingMode {
        self.advance(); // '['
        let inner = self.parse_expr();
        self.expect(&TokenKind::RBracket, "expected ']' to close long-indirect operand");
        if self.check(&TokenKind::Comma) {
            self.advance();
            let reg = self.parse_index_register();
            debug_assert_eq!(reg, IndexRegister::Y);
            return AddressingMode::LongIndirectIndexed(inner);
        }
        AddressingMode::LongIndirect(inner)
    }

    fn parse_index_register(&mut self) -> IndexRegister {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let reg = match name.to_ascii_lowercase().as_str() {
                    "x" => IndexRegister::X,
                    "y" => IndexRegister::Y,
                    "s" => IndexRegister::S,
                    _ => IndexRegister::X,
                };
                self.advance();
                reg
            }
            _ => {
                let loc = self.peek().loc.clone();
                self.error_at(
                    crate::errors::ErrorKind::UnexpectedToken(
                        "expected index register (x, y, or s)".to_string(),
                    ),
                    loc,
                );
                IndexRegister::X
            }
        }
    }
}

fn register_name(shape: &OperandShape) -> Option<String> {
    match shape {
        OperandShape::Register(name) => Some(name.clone()),
        _ => None,
    }
}

fn shape_to_mode(shape: OperandShape) -> AddressingMode {
    match shape {
        OperandShape::Register(name) => AddressingMode::Register(name),
        OperandShape::Immediate(e) => AddressingMode::Immediate(e),
        OperandShape::Indirect(e) => AddressingMode::Indirect(e),
        OperandShape::Plain(e) => AddressingMode::Absolute(e),
    }
}

/// Whichever side of a two-operand instruction is a bare register becomes
/// the destination; the other side keeps its own shape. Two bare registers
/// (`LD A, B`) keep the left as the destination and turn the right into a
/// `Register` mode so codegen can still read its name for encodings that
/// depend on both operands (`LD r, r'`, `BIT n, r`).
fn combine_operands(first: OperandShape, second: OperandShape) -> (Option<String>, AddressingMode) {
    if let OperandShape::Register(name) = &first {
        return (Some(name.clone()), shape_to_mode(second));
    }
    if let OperandShape::Register(name) = &second {
        return (Some(name.clone()), shape_to_mode(first));
    }
    (None, shape_to_mode(first))
}
