//! Character stream → token stream.
//!
//! Single-pass, no backtracking beyond a single-character peek. Every
//! failure mode (bad numeric digits, unterminated strings/comments,
//! invalid escapes, unrecognized characters) produces an `Error` token
//! rather than aborting, matching spec §4.1 and §7.

mod numbers;

pub mod token;

use std::path::PathBuf;
use std::rc::Rc;

pub use token::{NumberRadix, Token, TokenKind};

use crate::source::SourceLocation;

pub struct Lexer<'a> {
    file: Rc<PathBuf>,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    /// mnemonic set for the active target; used only to decide whether
    /// an identifier at statement-start position lexes as `Mnemonic`.
    mnemonics: &'a dyn Fn(&str) -> bool,
    at_statement_start: bool,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Every directive name recognized anywhere downstream (preprocessor
/// `.include`, parser block directives, semantic analyzer directives).
/// The lexer uses this to disambiguate `.name` between `Directive` and
/// a `.`-prefixed local label (spec §4.1: "any token starting with `.`
/// where the remainder is a recognized directive name"); anything else
/// shaped like `.name` is a local label reference/definition instead.
const DIRECTIVE_NAMES: &[&str] = &[
    "include", "equ", "define", "set", "org", "segment", "bank", "align", "pad", "db", "byte",
    "dw", "word", "dl", "long", "ds", "fill", "incbin", "ascii", "big_endian", "nes", "snes",
    "gb", "gba", "genesis", "atari2600", "lynx", "tg16", "spc", "lorom", "hirom", "title",
    "snes_title", "gb_title", "mapper", "mirroring", "region", "cgb_flag", "sgb_flag",
    "game_code", "maker_code", "version", "bank_switching", "manufacturer", "rotation",
    "artist", "dumper", "comment", "chr_banks", "prg_banks", "submapper", "nes_timing", "macro", "endmacro", "if",
    "ifdef", "ifndef", "elseif", "else", "endif", "repeat", "endrepeat", "enum", "endenum",
];

fn is_known_directive(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    DIRECTIVE_NAMES.contains(&lower.as_str())
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, file: PathBuf, mnemonics: &'a dyn Fn(&str) -> bool) -> Self {
        Self {
            file: Rc::new(file),
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            mnemonics,
            at_statement_start: true,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.is_eof();
            let was_newline = matches!(tok.kind, TokenKind::Newline);
            tokens.push(tok);
            if is_eof {
                break;
            }
            if was_newline {
                self.at_statement_start = true;
            }
        }
        tokens
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.line, self.column, self.pos)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Non-destructive lookahead at the identifier that would follow a
    /// `.` at the current position, without consuming it.
    fn peek_dot_word(&self) -> String {
        let mut i = self.pos + 1;
        let mut word = String::new();
        while let Some(&c) = self.chars.get(i) {
            if is_ident_continue(c) {
                word.push(c);
                i += 1;
            } else {
                break;
            }
        }
        word
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn make(&self, kind: TokenKind, text: String, start: SourceLocation) -> Token {
        Token::new(kind, text, start)
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.skip_inline_whitespace();
            match self.peek() {
                None => return self.make(TokenKind::Eof, String::new(), self.loc()),
                Some('\n') => {
                    let start = self.loc();
                    self.advance();
                    let starting_stmt = self.at_statement_start;
                    self.at_statement_start = true;
                    if starting_stmt {
                        // collapse blank lines into a single newline token
                        continue;
                    }
                    return self.make(TokenKind::Newline, "\n".to_string(), start);
                }
                Some(';') | Some('#') if self.is_line_comment_start() => {
                    self.consume_line_comment();
                    continue;
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    self.consume_line_comment();
                    continue;
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    if let Some(err) = self.consume_block_comment() {
                        return err;
                    }
                    continue;
                }
                _ => break,
            }
        }

        let start = self.loc();
        let starting_stmt = self.at_statement_start;
        self.at_statement_start = false;
        let c = self.peek().unwrap();

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c == '$' {
            return self.lex_number(start);
        }
        if c == '%' && self.peek_at(1).map(|c| c == '0' || c == '1').unwrap_or(false) {
            return self.lex_number(start);
        }
        if c == '"' {
            return self.lex_string(start);
        }
        if c == '\'' {
            return self.lex_char_literal(start);
        }
        if c == '.' && self.peek_at(1).map(is_ident_start).unwrap_or(false) {
            if is_known_directive(&self.peek_dot_word()) {
                return self.lex_directive(start);
            }
            return self.lex_local_label(start);
        }
        if c == '@' {
            return self.lex_local_label(start);
        }
        if c == '.' && self.peek_at(1).map(is_ident_continue).unwrap_or(false) {
            return self.lex_local_label(start);
        }
        if c == '+' || c == '-' {
            return self.lex_plus_minus(start, starting_stmt);
        }
        if c == '\\' {
            return self.lex_macro_param(start);
        }
        if is_ident_start(c) {
            return self.lex_identifier(start, starting_stmt);
        }

        self.lex_punctuation(start)
    }

    fn is_line_comment_start(&self) -> bool {
        matches!(self.peek(), Some(';') | Some('#'))
    }

    fn consume_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Returns `Some(error token)` if the comment never closes.
    fn consume_block_comment(&mut self) -> Option<Token> {
        let start = self.loc();
        self.advance(); // '/'
        self.advance(); // '*'
        loop {
            match self.peek() {
                None => {
                    return Some(self.make(
                        TokenKind::Error("unterminated block comment".to_string()),
                        "/*".to_string(),
                        start,
                    ));
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return None;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn lex_macro_param(&mut self, start: SourceLocation) -> Token {
        self.advance(); // '\'
        if self.peek() == Some('#') {
            self.advance();
            return self.make(TokenKind::MacroArgCount, "\\#".to_string(), start);
        }
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return self.make(
                TokenKind::Error("expected parameter name after '\\'".to_string()),
                "\\".to_string(),
                start,
            );
        }
        let raw = format!("\\{}", text);
        self.make(TokenKind::MacroParam(text), raw, start)
    }

    fn lex_local_label(&mut self, start: SourceLocation) -> Token {
        let prefix = self.advance().unwrap(); // '@' or '.'
        let mut text = String::from(prefix);
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if text.len() <= 1 {
            return self.make(
                TokenKind::Error(format!("expected identifier after '{}'", prefix)),
                text,
                start,
            );
        }
        self.make(TokenKind::LocalLabel(text.clone()), text, start)
    }

    fn lex_plus_minus(&mut self, start: SourceLocation, starting_stmt: bool) -> Token {
        let c = self.advance().unwrap();
        let mut count = 1;
        while self.peek() == Some(c) {
            self.advance();
            count += 1;
        }
        let text: String = std::iter::repeat(c).take(count).collect();

        // A run immediately followed by something that can start a
        // primary expression is NOT an anonymous label: it is one or
        // more unary/arithmetic operators. Anonymous label references
        // stand alone (followed by whitespace, a comma, a colon, a
        // newline/EOF, or a closing bracket).
        let followed_by_primary_starter = matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || c == '$' || c == '%' || c == '"' || c == '\''
                || c == '(' || c == '[' || is_ident_start(c) || c == '@' || c == '.'
                || c == '+' || c == '-' || c == '~' || c == '!' || c == '<' || c == '>' || c == '^'
        );

        if count == 1 && followed_by_primary_starter {
            return self.make(
                if c == '+' { TokenKind::Plus } else { TokenKind::Minus },
                text,
                start,
            );
        }
        if count > 1 && followed_by_primary_starter && !starting_stmt {
            // A run of operators in expression position, e.g. `--x`.
            // Only the first is consumed here; back off to single char.
            self.pos -= count - 1;
            self.column -= count - 1;
            return self.make(
                if c == '+' { TokenKind::Plus } else { TokenKind::Minus },
                c.to_string(),
                start,
            );
        }

        self.make(TokenKind::AnonymousLabel(c, count), text, start)
    }

    fn lex_identifier(&mut self, start: SourceLocation, starting_stmt: bool) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // optional `.b|.w|.l` size suffix is lexed as part of the
        // mnemonic text so the parser can split it back off.
        if starting_stmt
            && self.peek() == Some('.')
            && matches!(self.peek_at(1), Some('b') | Some('w') | Some('l'))
            && !self.peek_at(2).map(is_ident_continue).unwrap_or(false)
        {
            text.push('.');
            self.advance();
            text.push(self.advance().unwrap());
        }

        if starting_stmt && (self.mnemonics)(&text) {
            return self.make(TokenKind::Mnemonic(text.clone()), text, start);
        }
        self.make(TokenKind::Identifier(text.clone()), text, start)
    }

    fn lex_directive(&mut self, start: SourceLocation) -> Token {
        let mut text = String::from('.');
        self.advance();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.make(TokenKind::Directive(text.clone()), text, start)
    }

    fn lex_char_literal(&mut self, start: SourceLocation) -> Token {
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        let mut raw = String::from('\'');
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return self.make(
                        TokenKind::Error("unterminated character literal".to_string()),
                        raw,
                        start,
                    );
                }
                Some('\'') => {
                    self.advance();
                    raw.push('\'');
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.lex_escape() {
                        Ok(b) => bytes.push(b),
                        Err(msg) => return self.make(TokenKind::Error(msg), raw, start),
                    }
                }
                Some(c) => {
                    self.advance();
                    raw.push(c);
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        if bytes.len() != 1 {
            return self.make(
                TokenKind::Error("character literal must be a single byte".to_string()),
                raw,
                start,
            );
        }
        self.make(
            TokenKind::Number {
                radix: NumberRadix::Decimal,
                value: bytes[0] as i64,
            },
            raw,
            start,
        )
    }

    fn lex_string(&mut self, start: SourceLocation) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return self
                        .make(TokenKind::Error("unterminated string literal".to_string()), value, start);
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.lex_escape() {
                        Ok(b) => value.push(b as char),
                        Err(msg) => return self.make(TokenKind::Error(msg), value, start),
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }
        self.make(TokenKind::String(value.clone()), value, start)
    }

    /// Consumes one escape sequence (the backslash has already been
    /// consumed) and returns its byte value.
    fn lex_escape(&mut self) -> Result<u8, String> {
        match self.advance() {
            Some('n') => Ok(b'\n'),
            Some('r') => Ok(b'\r'),
            Some('t') => Ok(b'\t'),
            Some('\\') => Ok(b'\\'),
            Some('"') => Ok(b'"'),
            Some('0') => Ok(0),
            Some('x') => {
                let hi = self.advance().and_then(|c| c.to_digit(16));
                let lo = self.advance().and_then(|c| c.to_digit(16));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                    _ => Err("invalid \\x escape: expected two hex digits".to_string()),
                }
            }
            Some(other) => Err(format!("invalid escape sequence: \\{}", other)),
            None => Err("invalid escape sequence at end of file".to_string()),
        }
    }

    fn lex_number(&mut self, start: SourceLocation) -> Token {
        numbers::lex_number(self, start)
    }

    fn lex_punctuation(&mut self, start: SourceLocation) -> Token {
        let c = self.advance().unwrap();
        macro_rules! two_char {
            ($second:expr, $two:expr, $one:expr) => {{
                if self.peek() == Some($second) {
                    self.advance();
                    return self.make($two, format!("{}{}", c, $second), start);
                }
                self.make($one, c.to_string(), start)
            }};
        }
        match c {
            ':' => self.make(TokenKind::Colon, ":".to_string(), start),
            ',' => self.make(TokenKind::Comma, ",".to_string(), start),
            '(' => self.make(TokenKind::LParen, "(".to_string(), start),
            ')' => self.make(TokenKind::RParen, ")".to_string(), start),
            '[' => self.make(TokenKind::LBracket, "[".to_string(), start),
            ']' => self.make(TokenKind::RBracket, "]".to_string(), start),
            '+' => self.make(TokenKind::Plus, "+".to_string(), start),
            '-' => self.make(TokenKind::Minus, "-".to_string(), start),
            '*' => self.make(TokenKind::Star, "*".to_string(), start),
            '/' => self.make(TokenKind::Slash, "/".to_string(), start),
            '%' => self.make(TokenKind::Percent, "%".to_string(), start),
            '~' => self.make(TokenKind::Tilde, "~".to_string(), start),
            '!' => two_char!('=', TokenKind::NotEq, TokenKind::Bang),
            '=' => two_char!('=', TokenKind::EqEq, TokenKind::Equals),
            '&' => two_char!('&', TokenKind::AmpAmp, TokenKind::Amp),
            '|' => two_char!('|', TokenKind::PipePipe, TokenKind::Pipe),
            '^' => self.make(TokenKind::Caret, "^".to_string(), start),
            '#' => self.make(TokenKind::Hash, "#".to_string(), start),
            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    self.make(TokenKind::Shl, "<<".to_string(), start)
                } else if self.peek() == Some('=') {
                    self.advance();
                    self.make(TokenKind::Le, "<=".to_string(), start)
                } else {
                    self.make(TokenKind::Lt, "<".to_string(), start)
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.advance();
                    self.make(TokenKind::Shr, ">>".to_string(), start)
                } else if self.peek() == Some('=') {
                    self.advance();
                    self.make(TokenKind::Ge, ">=".to_string(), start)
                } else {
                    self.make(TokenKind::Gt, ">".to_string(), start)
                }
            }
            other => self.make(
                TokenKind::Error(format!("unrecognized character: {:?}", other)),
                other.to_string(),
                start,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn no_mnemonics(_: &str) -> bool {
        false
    }

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, PathBuf::from("test.pasm"), &no_mnemonics)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_hex_and_binary_and_decimal() {
        let toks = lex("$ff %1010 1234 1_000");
        assert_eq!(
            toks,
            vec![
                TokenKind::Number { radix: NumberRadix::Hex, value: 0xff },
                TokenKind::Number { radix: NumberRadix::Binary, value: 0b1010 },
                TokenKind::Number { radix: NumberRadix::Decimal, value: 1234 },
                TokenKind::Number { radix: NumberRadix::Decimal, value: 1000 },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_with_escapes() {
        let toks = lex(r#""a\nb\x41""#);
        assert_eq!(toks[0], TokenKind::String("a\nbA".to_string()));
    }

    #[test]
    fn unterminated_string_is_error_token_not_panic() {
        let toks = lex("\"abc");
        assert!(matches!(toks[0], TokenKind::Error(_)));
    }

    #[test]
    fn line_comments_three_syntaxes() {
        for src in ["; comment\nNOP", "// comment\nNOP", "# comment\nNOP"] {
            let toks = lex(src);
            assert!(
                toks.iter()
                    .any(|t| matches!(t, TokenKind::Identifier(s) if s == "NOP")),
                "failed for {:?}: {:?}",
                src,
                toks
            );
        }
    }

    #[test]
    fn block_comment_does_not_nest() {
        let toks = lex("/* a /* b */ c */");
        // the outer comment closes at the first `*/`, leaving `c */`
        // as ordinary tokens.
        assert!(toks.iter().any(|t| matches!(t, TokenKind::Identifier(s) if s == "c")));
    }

    #[test]
    fn unterminated_block_comment_is_error_token() {
        let toks = lex("/* never closes");
        assert!(matches!(toks[0], TokenKind::Error(_)));
    }

    #[test]
    fn anonymous_labels_vs_unary_operators() {
        let toks = lex("+: -: + 1 - 1 ++ --");
        assert_eq!(
            toks,
            vec![
                TokenKind::AnonymousLabel('+', 1),
                TokenKind::Colon,
                TokenKind::AnonymousLabel('-', 1),
                TokenKind::Colon,
                TokenKind::Plus,
                TokenKind::Number { radix: NumberRadix::Decimal, value: 1 },
                TokenKind::Minus,
                TokenKind::Number { radix: NumberRadix::Decimal, value: 1 },
                TokenKind::AnonymousLabel('+', 2),
                TokenKind::AnonymousLabel('-', 2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn local_labels() {
        let toks = lex("@loop: .local");
        assert_eq!(
            toks,
            vec![
                TokenKind::LocalLabel("@loop".to_string()),
                TokenKind::Colon,
                TokenKind::LocalLabel(".local".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn recognized_directive_lexes_as_directive() {
        let toks = lex(".org $8000");
        assert_eq!(toks[0], TokenKind::Directive(".org".to_string()));
    }

    #[test]
    fn unrecognized_dot_name_lexes_as_local_label() {
        let toks = lex(".bogus 1");
        assert_eq!(toks[0], TokenKind::LocalLabel(".bogus".to_string()));
    }
}
