//! Token kinds produced by the lexer.

use crate::source::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberRadix {
    Decimal,
    Hex,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number {
        radix: NumberRadix,
        value: i64,
    },
    String(String),
    /// A bare identifier: label reference/definition, constant name, or
    /// (when not recognized as a mnemonic at statement-start position)
    /// anything else that reads like a name.
    Identifier(String),
    /// Recognized only at statement-start position, by exact match
    /// against the active target's mnemonic set.
    Mnemonic(String),
    /// Any token beginning with `.`; the remainder is the directive
    /// name whether or not it is recognized (recognition happens during
    /// semantic analysis so unknown directives still lex cleanly).
    Directive(String),
    /// `@name` or a leading-`.`-prefixed identifier used as a local
    /// label reference/definition, scoped to the nearest enclosing
    /// global label.
    LocalLabel(String),
    /// A run of `+` or `-` characters used as an anonymous label
    /// definition or reference (disambiguated from the arithmetic
    /// operators by the parser via lookahead).
    AnonymousLabel(char, usize),
    /// `\param` — a macro parameter reference, valid only inside a
    /// macro body.
    MacroParam(String),
    /// `\#` — the macro argument count, valid only inside a macro body.
    MacroArgCount,

    // Punctuation / operators
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Plus,
    Minus,
    /// Multiplication in infix position; the "current address"
    /// identifier `*` when the parser expects a primary expression.
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    AmpAmp,
    PipePipe,
    Bang,
    Hash,
    Equals,
    Newline,
    Eof,

    /// A lexical error. Carries a human-readable message; never thrown
    /// as an exception, always surfaced as a token so the lexer never
    /// panics on malformed input.
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: String, loc: SourceLocation) -> Self {
        Self { kind, text, loc }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
