//! Source locations shared by every stage of the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A position within a single source file, attached to every token, AST
/// node, symbol, and diagnostic so errors can always be traced back to
/// the text that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: Rc<PathBuf>,
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl SourceLocation {
    pub fn new(file: Rc<PathBuf>, line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            file,
            line,
            column,
            byte_offset,
        }
    }

    /// A placeholder location for synthesized nodes (macro expansion,
    /// autogenerated labels) that have no single point of origin.
    pub fn synthetic() -> Self {
        Self {
            file: Rc::new(PathBuf::from("<generated>")),
            line: 0,
            column: 0,
            byte_offset: 0,
        }
    }

    pub fn file_path(&self) -> &Path {
        self.file.as_path()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}
