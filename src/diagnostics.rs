//! Per-compilation error/warning collector.
//!
//! Every stage is handed a `&mut Diagnostics` and appends to it rather
//! than bailing out on the first problem, so a single compile can report
//! several unrelated mistakes (spec §7: "stages aggregate errors into a
//! per-stage list and continue processing where feasible").

use crate::errors::{PoppyError, PoppyWarning};

#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<PoppyError>,
    warnings: Vec<PoppyWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, err: PoppyError) {
        self.errors.push(err);
    }

    pub fn warn(&mut self, warning: PoppyWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[PoppyError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[PoppyWarning] {
        &self.warnings
    }

    pub fn into_errors(self) -> Vec<PoppyError> {
        self.errors
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Renders every collected diagnostic as `path:line:col: kind: message`,
    /// the conventional single-line compiler diagnostic format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for err in &self.errors {
            out.push_str(&format!("error: {}\n", err));
        }
        for warning in &self.warnings {
            match &warning.location {
                Some(loc) => out.push_str(&format!("warning: {}: {}\n", loc, warning.message)),
                None => out.push_str(&format!("warning: {}\n", warning.message)),
            }
        }
        out
    }
}
