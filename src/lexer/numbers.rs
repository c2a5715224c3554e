//! Numeric literal lexing: `$hex`, `%binary`, and `decimal`, all
//! accepting `_` digit-group separators which are stripped before
//! parsing.

use super::token::{NumberRadix, Token, TokenKind};
use super::Lexer;
use crate::source::SourceLocation;

pub(super) fn lex_number(lexer: &mut Lexer, start: SourceLocation) -> Token {
    let marker = lexer.peek().unwrap();
    let (radix, digit_ok): (NumberRadix, fn(char) -> bool) = match marker {
        '$' => {
            lexer.advance();
            (NumberRadix::Hex, |c: char| c.is_ascii_hexdigit())
        }
        '%' => {
            lexer.advance();
            (NumberRadix::Binary, |c: char| c == '0' || c == '1')
        }
        _ => (NumberRadix::Decimal, |c: char| c.is_ascii_digit()),
    };

    let mut raw = String::new();
    raw.push(marker);
    let mut digits = String::new();
    while let Some(c) = lexer.peek() {
        if digit_ok(c) || c == '_' {
            raw.push(c);
            if c != '_' {
                digits.push(c);
            }
            lexer.advance();
        } else if radix == NumberRadix::Hex && c.is_ascii_alphanumeric() {
            // an invalid digit for this radix, e.g. `$1g` — consume it
            // so the error token carries the whole malformed literal.
            raw.push(c);
            lexer.advance();
            return lexer_error(lexer, start, raw, radix);
        } else {
            break;
        }
    }

    if digits.is_empty() {
        return lexer_error(lexer, start, raw, radix);
    }

    let parsed = match radix {
        NumberRadix::Hex => i64::from_str_radix(&digits, 16),
        NumberRadix::Binary => i64::from_str_radix(&digits, 2),
        NumberRadix::Decimal => digits.parse::<i64>(),
    };

    match parsed {
        Ok(value) => Token::new(TokenKind::Number { radix, value }, raw, start),
        Err(_) => lexer_error(lexer, start, raw, radix),
    }
}

fn lexer_error(_lexer: &Lexer, start: SourceLocation, raw: String, radix: NumberRadix) -> Token {
    let label = match radix {
        NumberRadix::Hex => "hex",
        NumberRadix::Binary => "binary",
        NumberRadix::Decimal => "decimal",
    };
    Token::new(
        TokenKind::Error(format!("invalid {} numeric literal: {}", label, raw)),
        raw,
        start,
    )
}

#[cfg(test)]
mod tests {
    use super::super::Lexer;
    use super::super::TokenKind;
    use std::path::PathBuf;

    fn no_mnemonics(_: &str) -> bool {
        false
    }

    #[test]
    fn underscores_are_ignored() {
        let toks = Lexer::new("$ff_ff", PathBuf::from("t.pasm"), &no_mnemonics).tokenize();
        assert_eq!(
            toks[0].kind,
            TokenKind::Number { radix: super::NumberRadix::Hex, value: 0xffff }
        );
    }

    #[test]
    fn bad_hex_digit_is_error_token() {
        let toks = Lexer::new("$1g", PathBuf::from("t.pasm"), &no_mnemonics).tokenize();
        assert!(matches!(toks[0].kind, TokenKind::Error(_)));
    }
}
