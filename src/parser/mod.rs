//! Token stream → AST.
//!
//! Recursive-descent with precedence climbing for expressions (see
//! `expr.rs`). Top level parses a sequence of statements separated by
//! newlines. On any parse error, recovery advances to the next newline
//! and continues, so a single compile can report multiple parse errors
//! (spec §4.3).

mod expr;
mod operand;

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::errors::{ErrorKind, PoppyError};
use crate::lexer::{Token, TokenKind};
use crate::source::SourceLocation;
use crate::target::TargetArchitecture;

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    diagnostics: Diagnostics,
    target: TargetArchitecture,
}

pub fn parse(tokens: &[Token], target: TargetArchitecture) -> (Program, Diagnostics) {
    let mut parser = Parser::new(tokens, target);
    let program = parser.parse_program();
    (program, parser.diagnostics)
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token], target: TargetArchitecture) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Diagnostics::new(),
            target,
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at_eof() {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.skip_newlines();
        }
        Program { statements }
    }

    /// Parses statements until one of `terminators` is seen as a
    /// directive name at statement-start position (used by `.macro`,
    /// `.if`, `.repeat`, `.enum` bodies). The terminating directive
    /// token is consumed by the caller, not here.
    fn parse_block(&mut self, terminators: &[&str]) -> Vec<Statement> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at_eof() {
            if let TokenKind::Directive(name) = &self.peek().kind {
                if terminators.iter().any(|t| name.eq_ignore_ascii_case(t)) {
                    break;
                }
            }
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.skip_newlines();
        }
        statements
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match &self.peek().kind {
            TokenKind::LocalLabel(_) => self.parse_local_label_statement(),
            TokenKind::AnonymousLabel(_, _) => self.parse_anonymous_label_statement(),
            TokenKind::Identifier(_) => self.parse_identifier_led_statement(),
            TokenKind::Mnemonic(_) => self.parse_instruction_statement(),
            TokenKind::Directive(_) => self.parse_directive_statement(),
            TokenKind::Percent => self.parse_macro_invocation(),
            TokenKind::Newline => {
                self.advance();
                None
            }
            _ => {
                let tok = self.peek().clone();
                self.error_at(
                    ErrorKind::UnexpectedToken(format!("{:?}", tok.kind)),
                    tok.loc,
                );
                self.recover_to_newline();
                None
            }
        }
    }

    fn parse_local_label_statement(&mut self) -> Option<Statement> {
        let tok = self.advance().clone();
        let name = match &tok.kind {
            TokenKind::LocalLabel(n) => n.clone(),
            _ => unreachable!(),
        };
        if self.check(&TokenKind::Colon) {
            self.advance();
        } else {
            self.error_at(
                ErrorKind::UnexpectedToken("expected ':' after local label".to_string()),
                tok.loc.clone(),
            );
        }
        Some(Statement::Label(LabelNode {
            name,
            kind: LabelKind::Local,
            loc: tok.loc,
        }))
    }

    fn parse_anonymous_label_statement(&mut self) -> Option<Statement> {
        let tok = self.advance().clone();
        let glyph = match &tok.kind {
            TokenKind::AnonymousLabel(g, _) => *g,
            _ => unreachable!(),
        };
        if self.check(&TokenKind::Colon) {
            self.advance();
        } else {
            self.error_at(
                ErrorKind::UnexpectedToken("expected ':' after anonymous label".to_string()),
                tok.loc.clone(),
            );
        }
        Some(Statement::Label(LabelNode {
            name: tok.text.clone(),
            kind: LabelKind::Anonymous(glyph),
            loc: tok.loc,
        }))
    }

    /// An `Identifier` at statement-start is either `NAME:` (a global
    /// label) or `NAME = expr` (equ sugar), or — more rarely — a plain
    /// expression statement is not valid at all, so we commit to one of
    /// the two shapes and report an error otherwise.
    fn parse_identifier_led_statement(&mut self) -> Option<Statement> {
        let tok = self.advance().clone();
        let name = match &tok.kind {
            TokenKind::Identifier(n) => n.clone(),
            _ => unreachable!(),
        };
        if self.check(&TokenKind::Colon) {
            self.advance();
            return Some(Statement::Label(LabelNode {
                name,
                kind: LabelKind::Global,
                loc: tok.loc,
            }));
        }
        if self.check(&TokenKind::Equals) {
            self.advance();
            let value = self.parse_expr();
            return Some(Statement::Directive(DirectiveNode {
                name: "equ".to_string(),
                args: vec![Expr::Identifier(name), value],
                loc: tok.loc,
            }));
        }
        self.error_at(
            ErrorKind::UnexpectedToken(format!(
                "expected ':' or '=' after identifier '{}'",
                name
            )),
            tok.loc,
        );
        self.recover_to_newline();
        None
    }

    fn parse_instruction_statement(&mut self) -> Option<Statement> {
        let tok = self.advance().clone();
        let raw = match &tok.kind {
            TokenKind::Mnemonic(n) => n.clone(),
            _ => unreachable!(),
        };
        let (mnemonic, size_suffix) = split_size_suffix(&raw);
        let (dest_register, mode) = if crate::isa::uses_register_operand(self.target) {
            self.parse_two_operand_mode()
        } else {
            (None, self.parse_addressing_mode())
        };
        Some(Statement::Instruction(InstructionNode {
            mnemonic,
            size_suffix,
            dest_register,
            mode,
            loc: tok.loc,
        }))
    }

    fn parse_macro_invocation(&mut self) -> Option<Statement> {
        let start_loc = self.peek().loc.clone();
        self.advance(); // '%'
        let name = match &self.peek().kind {
            TokenKind::Identifier(n) | TokenKind::Mnemonic(n) => n.clone(),
            _ => {
                self.error_at(
                    ErrorKind::UnexpectedToken("expected macro name after '%'".to_string()),
                    start_loc,
                );
                self.recover_to_newline();
                return None;
            }
        };
        self.advance();
        let mut args = Vec::new();
        if !self.at_statement_end() {
            args.push(self.parse_expr());
            while self.check(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expr());
            }
        }
        Some(Statement::MacroInvocation(MacroInvocationNode {
            name,
            args,
            loc: start_loc,
        }))
    }

    fn parse_directive_statement(&mut self) -> Option<Statement> {
        let tok = self.advance().clone();
        let name = match &tok.kind {
            TokenKind::Directive(n) => n.to_ascii_lowercase(),
            _ => unreachable!(),
        };
        match name.as_str() {
            ".macro" => self.parse_macro_definition(tok.loc),
            ".if" | ".ifdef" | ".ifndef" => self.parse_conditional(&name, tok.loc),
            ".repeat" => self.parse_repeat_block(tok.loc),
            ".enum" => self.parse_enum_block(tok.loc),
            _ => self.parse_generic_directive(name, tok.loc),
        }
    }

    fn parse_generic_directive(&mut self, name: String, loc: SourceLocation) -> Option<Statement> {
        let mut args = Vec::new();
        if !self.at_statement_end() {
            args.push(self.parse_expr());
            while self.check(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expr());
            }
        }
        Some(Statement::Directive(DirectiveNode { name, args, loc }))
    }

    fn parse_macro_definition(&mut self, loc: SourceLocation) -> Option<Statement> {
        let name = self.expect_name("macro name");
        let mut params = Vec::new();
        while self.check(&TokenKind::Comma) {
            self.advance();
            let pname = self.expect_name("macro parameter name");
            params.push(MacroParam { name: pname });
        }
        self.skip_newlines();
        let body = self.parse_block(&[".endmacro"]);
        self.expect_directive(".endmacro");
        Some(Statement::MacroDefinition(MacroDefinitionNode {
            name,
            params,
            body,
            loc,
        }))
    }

    fn parse_conditional(&mut self, first_kind: &str, loc: SourceLocation) -> Option<Statement> {
        let mut branches = Vec::new();
        branches.push(self.parse_conditional_branch(first_kind));

        loop {
            self.skip_newlines();
            match &self.peek().kind {
                TokenKind::Directive(d) if d.eq_ignore_ascii_case(".elseif") => {
                    self.advance();
                    branches.push(self.parse_conditional_branch(".if"));
                }
                _ => break,
            }
        }

        self.skip_newlines();
        let else_body = if matches!(&self.peek().kind, TokenKind::Directive(d) if d.eq_ignore_ascii_case(".else"))
        {
            self.advance();
            self.skip_newlines();
            Some(self.parse_block(&[".endif"]))
        } else {
            None
        };

        self.expect_directive(".endif");
        Some(Statement::Conditional(ConditionalNode {
            branches,
            else_body,
            loc,
        }))
    }

    fn parse_conditional_branch(&mut self, kind: &str) -> ConditionalBranch {
        let (condition, symbol) = match kind {
            ".ifdef" | ".ifndef" => {
                let name = self.expect_name("symbol name");
                (None, Some(name))
            }
            _ => (Some(self.parse_expr()), None),
        };
        self.skip_newlines();
        let body = self.parse_block(&[".elseif", ".else", ".endif"]);
        ConditionalBranch {
            kind: match kind {
                ".ifdef" => ConditionalKind::IfDef,
                ".ifndef" => ConditionalKind::IfNDef,
                _ => ConditionalKind::If,
            },
            condition,
            symbol,
            body,
        }
    }

    fn parse_repeat_block(&mut self, loc: SourceLocation) -> Option<Statement> {
        let count = self.parse_expr();
        let counter = if self.check(&TokenKind::Comma) {
            self.advance();
            Some(self.expect_name("repeat counter name"))
        } else {
            None
        };
        self.skip_newlines();
        let body = self.parse_block(&[".endrepeat"]);
        self.expect_directive(".endrepeat");
        Some(Statement::RepeatBlock(RepeatBlockNode {
            count,
            counter,
            body,
            loc,
        }))
    }

    fn parse_enum_block(&mut self, loc: SourceLocation) -> Option<Statement> {
        let start = self.parse_expr();
        let step = if self.check(&TokenKind::Comma) {
            self.advance();
            Some(self.parse_expr())
        } else {
            None
        };
        self.skip_newlines();
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if let TokenKind::Directive(d) = &self.peek().kind {
                if d.eq_ignore_ascii_case(".endenum") {
                    break;
                }
            }
            if self.at_eof() {
                self.error_at(
                    ErrorKind::UnclosedBlock(".enum without matching .endenum".to_string()),
                    loc.clone(),
                );
                break;
            }
            match &self.peek().kind {
                TokenKind::Identifier(name) => {
                    entries.push(name.clone());
                    self.advance();
                }
                _ => {
                    let t = self.advance().clone();
                    self.error_at(
                        ErrorKind::UnexpectedToken(format!(
                            "expected identifier in .enum block, found {:?}",
                            t.kind
                        )),
                        t.loc,
                    );
                }
            }
        }
        self.expect_directive(".endenum");
        Some(Statement::EnumerationBlock(EnumerationBlockNode {
            start,
            step,
            entries,
            loc,
        }))
    }

    // --- token-stream helpers -------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            let loc = self.peek().loc.clone();
            self.error_at(ErrorKind::UnexpectedToken(message.to_string()), loc);
        }
    }

    fn expect_directive(&mut self, name: &str) {
        if let TokenKind::Directive(d) = &self.peek().kind {
            if d.eq_ignore_ascii_case(name) {
                self.advance();
                return;
            }
        }
        let loc = self.peek().loc.clone();
        self.error_at(
            ErrorKind::UnclosedBlock(format!("expected '{}'", name)),
            loc,
        );
    }

    fn expect_name(&mut self, what: &str) -> String {
        match &self.peek().kind {
            TokenKind::Identifier(n) | TokenKind::Mnemonic(n) => {
                let n = n.clone();
                self.advance();
                n
            }
            _ => {
                let loc = self.peek().loc.clone();
                self.error_at(
                    ErrorKind::UnexpectedToken(format!("expected {}", what)),
                    loc,
                );
                String::new()
            }
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn recover_to_newline(&mut self) {
        while !self.at_statement_end() {
            self.advance();
        }
    }

    fn error_at(&mut self, kind: ErrorKind, loc: SourceLocation) {
        self.diagnostics.error(PoppyError::new(kind, loc));
    }
}

/// Splits a mnemonic token's text (as lexed, e.g. `"LDA.b"`) back into
/// its base mnemonic and optional `.b|.w|.l` size suffix.
fn split_size_suffix(raw: &str) -> (String, Option<SizeSuffix>) {
    if raw.len() > 2 {
        let bytes = raw.as_bytes();
        if bytes[bytes.len() - 2] == b'.' {
            let suffix = match bytes[bytes.len() - 1] {
                b'b' | b'B' => Some(SizeSuffix::Byte),
                b'w' | b'W' => Some(SizeSuffix::Word),
                b'l' | b'L' => Some(SizeSuffix::Long),
                _ => None,
            };
            if let Some(suffix) = suffix {
                return (raw[..raw.len() - 2].to_string(), Some(suffix));
            }
        }
    }
    (raw.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use std::path::PathBuf;

    fn mnemonics(name: &str) -> bool {
        matches!(name.to_ascii_uppercase().as_str(), "NOP" | "LDA" | "STA" | "JMP" | "BNE" | "INX")
    }

    fn parse_src(src: &str) -> (Program, Diagnostics) {
        let tokens = Lexer::new(src, PathBuf::from("t.pasm"), &mnemonics).tokenize();
        parse(&tokens, TargetArchitecture::Mos6502)
    }

    #[test]
    fn parses_label_and_instruction() {
        let (program, diags) = parse_src("start:\n nop\n");
        assert!(!diags.has_errors());
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0], Statement::Label(_)));
        assert!(matches!(program.statements[1], Statement::Instruction(_)));
    }

    #[test]
    fn parses_equ_sugar_and_directive_form() {
        let (program, diags) = parse_src("FOO = 1\n.equ BAR, 2\n");
        assert!(!diags.has_errors());
        for stmt in &program.statements {
            match stmt {
                Statement::Directive(d) => assert_eq!(d.name, "equ"),
                other => panic!("unexpected statement {:?}", other),
            }
        }
    }

    #[test]
    fn parses_immediate_and_absolute_addressing() {
        let (program, diags) = parse_src("lda #$01\n sta $2000\n");
        assert!(!diags.has_errors());
        match &program.statements[0] {
            Statement::Instruction(i) => assert!(matches!(i.mode, AddressingMode::Immediate(_))),
            _ => panic!(),
        }
        match &program.statements[1] {
            Statement::Instruction(i) => assert!(matches!(i.mode, AddressingMode::Absolute(_))),
            _ => panic!(),
        }
    }

    #[test]
    fn parses_macro_definition_and_invocation() {
        let (program, diags) =
            parse_src(".macro SET, addr, val\n lda #\\val\n sta \\addr\n.endmacro\n %SET $2000, $01\n");
        assert!(!diags.has_errors(), "{:?}", diags.errors());
        assert!(matches!(program.statements[0], Statement::MacroDefinition(_)));
        assert!(matches!(program.statements[1], Statement::MacroInvocation(_)));
    }

    #[test]
    fn recovers_after_unexpected_token_and_keeps_parsing() {
        let (program, diags) = parse_src(")\n nop\n");
        assert!(diags.has_errors());
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Statement::Instruction(_)));
    }

    #[test]
    fn parses_if_else_endif() {
        let (program, diags) = parse_src(".if 1\n nop\n.else\n nop\n.endif\n");
        assert!(!diags.has_errors(), "{:?}", diags.errors());
        match &program.statements[0] {
            Statement::Conditional(c) => {
                assert_eq!(c.branches.len(), 1);
                assert!(c.else_body.is_some());
            }
            _ => panic!(),
        }
    }
}
