//! Token stream → expanded token stream.
//!
//! Walks the lexed token stream for the entry file; on each
//! `.include "path"` directive, resolves the referenced file (searched
//! against the including file's directory first, then the supplied
//! include paths), lexes it, and splices its tokens in place. An
//! include stack tracks open files by resolved path for cycle
//! detection. Tokens coming from a spliced file keep the `SourceLocation`
//! the lexer gave them — pointing at the original file, never the
//! includer.

use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostics;
use crate::errors::{ErrorKind, PoppyError};
use crate::file_reader::FileReader;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::source::SourceLocation;

pub fn preprocess<F: FileReader>(
    main_path: &Path,
    mnemonics: &dyn Fn(&str) -> bool,
    include_paths: &[PathBuf],
    reader: &F,
    diagnostics: &mut Diagnostics,
) -> Vec<Token> {
    let mut stack: Vec<PathBuf> = Vec::new();
    expand_file(main_path, mnemonics, include_paths, reader, &mut stack, diagnostics)
}

/// Exposed crate-wide so `.incbin` can resolve a binary file against the
/// same search order `.include` uses, without duplicating the logic.
pub(crate) fn resolve_include(
    current_file: &Path,
    requested: &str,
    include_paths: &[PathBuf],
    reader: &dyn FileReader,
) -> Option<PathBuf> {
    let requested_path = Path::new(requested);
    if requested_path.is_absolute() && reader.exists(requested_path) {
        return Some(requested_path.to_path_buf());
    }
    if let Some(dir) = current_file.parent() {
        let candidate = dir.join(requested_path);
        if reader.exists(&candidate) {
            return Some(candidate);
        }
    }
    for base in include_paths {
        let candidate = base.join(requested_path);
        if reader.exists(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn expand_file<F: FileReader>(
    path: &Path,
    mnemonics: &dyn Fn(&str) -> bool,
    include_paths: &[PathBuf],
    reader: &F,
    stack: &mut Vec<PathBuf>,
    diagnostics: &mut Diagnostics,
) -> Vec<Token> {
    let path_buf = path.to_path_buf();
    if stack.contains(&path_buf) {
        diagnostics.error(PoppyError::without_location(ErrorKind::CircularInclude(
            path.display().to_string(),
        )));
        return Vec::new();
    }

    let source = match reader.read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            diagnostics.error(PoppyError::without_location(ErrorKind::IncludeNotFound(
                format!("{}: {}", path.display(), e),
            )));
            return Vec::new();
        }
    };

    stack.push(path_buf);
    let tokens = Lexer::new(&source, path.to_path_buf(), mnemonics).tokenize();

    let mut expanded = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        if let TokenKind::Directive(name) = &tok.kind {
            if name == ".include" {
                // look ahead, skipping nothing (directive args are the
                // very next token here since the preprocessor runs
                // before the parser's statement structure exists).
                if let Some(next) = tokens.get(i + 1) {
                    if let TokenKind::String(include_path) = &next.kind {
                        match resolve_include(path, include_path, include_paths, reader) {
                            Some(resolved) => {
                                let nested = expand_file(
                                    &resolved,
                                    mnemonics,
                                    include_paths,
                                    reader,
                                    stack,
                                    diagnostics,
                                );
                                expanded.extend(nested);
                            }
                            None => {
                                diagnostics.error(PoppyError::new(
                                    ErrorKind::IncludeNotFound(include_path.clone()),
                                    tok.loc.clone(),
                                ));
                            }
                        }
                        i += 2;
                        continue;
                    } else {
                        diagnostics.error(PoppyError::new(
                            ErrorKind::MalformedExpression(
                                ".include expects a string path argument".to_string(),
                            ),
                            tok.loc.clone(),
                        ));
                    }
                }
            }
        }
        expanded.push(tok.clone());
        i += 1;
    }

    stack.pop();
    expanded
}

/// Inserts a terminating EOF token if the stream is empty or doesn't
/// already end with one; used after manual token-list construction in
/// tests.
pub fn ensure_eof(tokens: &mut Vec<Token>, file: &Path) {
    if !tokens.last().map(|t| t.is_eof()).unwrap_or(false) {
        tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            SourceLocation::new(std::rc::Rc::new(file.to_path_buf()), 0, 0, 0),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_reader::MockFileReader;

    fn no_mnemonics(_: &str) -> bool {
        false
    }

    #[test]
    fn splices_included_file_preserving_its_own_locations() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.pasm", "NOP\n.include \"lib.pasm\"\nHALT\n");
        reader.add_file("lib.pasm", "LIB_CONST\n");

        let mut diags = Diagnostics::new();
        let tokens = preprocess(
            Path::new("main.pasm"),
            &no_mnemonics,
            &[],
            &reader,
            &mut diags,
        );
        assert!(!diags.has_errors());

        let lib_tok = tokens
            .iter()
            .find(|t| matches!(&t.kind, TokenKind::Identifier(s) if s == "LIB_CONST"))
            .expect("spliced token missing");
        assert_eq!(lib_tok.loc.file_path(), Path::new("lib.pasm"));
    }

    #[test]
    fn detects_circular_include() {
        let mut reader = MockFileReader::default();
        reader.add_file("a.pasm", ".include \"b.pasm\"\n");
        reader.add_file("b.pasm", ".include \"a.pasm\"\n");

        let mut diags = Diagnostics::new();
        preprocess(Path::new("a.pasm"), &no_mnemonics, &[], &reader, &mut diags);
        assert!(diags.has_errors());
        assert!(matches!(
            diags.errors()[0].kind,
            ErrorKind::CircularInclude(_)
        ));
    }

    #[test]
    fn missing_include_reports_error_without_panicking() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.pasm", ".include \"missing.pasm\"\n");

        let mut diags = Diagnostics::new();
        preprocess(Path::new("main.pasm"), &no_mnemonics, &[], &reader, &mut diags);
        assert!(diags.has_errors());
    }
}
