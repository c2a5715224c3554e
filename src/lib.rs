//! Poppy: a multi-target retro assembler. One source file (plus
//! whatever it `.include`s) goes in; a target-specific ROM image comes
//! out. The pipeline is lexer → preprocessor → parser → semantic
//! analyzer → code generator → ROM builder, each stage a free function
//! in its own module, connected here by [`assemble`].

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod errors;
pub mod file_reader;
pub mod isa;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod preprocessor;
pub mod rom;
pub mod segment;
pub mod semantic;
pub mod source;
pub mod target;

use diagnostics::Diagnostics;
use errors::{ErrorKind, PoppyError};
use file_reader::FileReader;
use options::CompilerOptions;

/// Runs the full pipeline against `options.main_source` and returns the
/// assembled ROM bytes, or the full set of diagnostics collected along
/// the way if anything failed. Unlike each individual stage, this never
/// stops at the first error within a stage — it only stops *between*
/// stages, since a stage with errors can leave state later stages can't
/// usefully consume (an unparsed program, an unresolved symbol table).
pub fn assemble<F: FileReader>(
    options: &CompilerOptions,
    reader: &F,
) -> Result<Vec<u8>, Diagnostics> {
    let mut diagnostics = Diagnostics::new();

    log::debug!("preprocessing {}", options.main_source.display());
    let mnemonic_check = |name: &str| isa::is_mnemonic(options.target, name);
    let tokens = preprocessor::preprocess(
        &options.main_source,
        &mnemonic_check,
        &options.include_paths,
        reader,
        &mut diagnostics,
    );
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    log::debug!("parsing {} tokens", tokens.len());
    let (program, parse_diagnostics) = parser::parse(&tokens, options.target);
    diagnostics.merge(parse_diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    log::debug!("running semantic analysis");
    let analysis = semantic::analyze(&program, options, reader, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }
    if options.warnings_as_errors && !diagnostics.warnings().is_empty() {
        diagnostics.error(PoppyError::without_location(ErrorKind::Other(
            "warnings present with warnings-as-errors enabled".to_string(),
        )));
        return Err(diagnostics);
    }

    log::debug!("generating code for {} layout items", analysis.layout.len());
    let mut codegen_options = options.clone();
    codegen_options.big_endian_override = options.big_endian_override || analysis.big_endian_override;
    let segments = codegen::generate(&analysis.layout, &analysis.symbols, &codegen_options, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let platform = analysis
        .metadata
        .platform
        .clone()
        .unwrap_or_else(|| options.target.default_platform().to_string());
    log::debug!("building {} ROM image from {} segment(s)", platform, segments.len());
    match rom::build(&platform, &segments, &analysis.symbols, &analysis.metadata) {
        Ok(bytes) => {
            if diagnostics.has_errors() {
                Err(diagnostics)
            } else {
                Ok(bytes)
            }
        }
        Err(e) => {
            diagnostics.error(e);
            Err(diagnostics)
        }
    }
}
