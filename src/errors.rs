//! Structured error and warning kinds for every pipeline stage.
//!
//! Per the core's error handling contract, no exception crosses a stage
//! boundary: each stage returns either a usable result or a non-empty
//! list of `PoppyError`. `Diagnostics` (see `diagnostics.rs`) is the
//! per-compilation collector stages append to as they recover and keep
//! going.

use thiserror::Error;

use crate::source::SourceLocation;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Lexing
    #[error("invalid numeric literal: {0}")]
    InvalidNumeric(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),
    #[error("multi-byte character literal")]
    InvalidCharLiteral,
    #[error("unrecognized character: {0:?}")]
    UnrecognizedCharacter(char),

    // Preprocessing
    #[error("include file not found: {0}")]
    IncludeNotFound(String),
    #[error("circular include: {0}")]
    CircularInclude(String),

    // Parsing
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("malformed expression: {0}")]
    MalformedExpression(String),
    #[error("unclosed block: {0}")]
    UnclosedBlock(String),

    // Semantic analysis
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),
    #[error("redefinition of symbol: {0}")]
    Redefinition(String),
    #[error("circular constant definition: {0}")]
    CircularConstant(String),
    #[error("directive {directive} expects {expected} argument(s), got {got}")]
    InvalidDirectiveArity {
        directive: String,
        expected: String,
        got: usize,
    },
    #[error("unknown directive: {0}")]
    UnknownDirective(String),
    #[error("invalid addressing mode for {mnemonic}: {mode}")]
    InvalidAddressingMode { mnemonic: String, mode: String },
    #[error("segment {0} overflowed its maximum size")]
    SegmentOverflow(String),
    #[error("segment overlap between {first} and {second}")]
    SegmentOverlap { first: String, second: String },
    #[error("bank {0} is out of range for this target")]
    BankOutOfRange(u32),
    #[error("macro {name} invoked with {got} argument(s), expected {expected}")]
    MacroArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("unknown macro: {0}")]
    UnknownMacro(String),
    #[error("invalid conditional expression: {0}")]
    InvalidConditional(String),

    // Code generation
    #[error("branch target out of range: offset {offset} exceeds {bits}-bit signed range")]
    BranchOutOfRange { offset: i32, bits: u32 },
    #[error("value out of range: {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: i64, bits: u32 },
    #[error("checksum computation failed: {0}")]
    ChecksumFailure(String),

    // ROM layout
    #[error("invalid ROM size for target: {0}")]
    ROMSizeInvalid(String),
    #[error("segment overlaps reserved header region: {0}")]
    HeaderConflict(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoppyError {
    pub kind: ErrorKind,
    pub location: Option<SourceLocation>,
}

impl PoppyError {
    pub fn new(kind: ErrorKind, location: SourceLocation) -> Self {
        Self {
            kind,
            location: Some(location),
        }
    }

    pub fn without_location(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }
}

impl std::fmt::Display for PoppyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for PoppyError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    UnusedSymbol,
    DeprecatedDirective,
    InefficientAddressing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoppyWarning {
    pub kind: WarningKind,
    pub message: String,
    pub location: Option<SourceLocation>,
}
