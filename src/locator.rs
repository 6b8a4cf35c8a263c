//! Source excerpt lookup for failure reports.
//!
//! Assertion methods capture the user's call site with `#[track_caller]`;
//! the location lands here and is resolved to the failing line plus one
//! line of context on each side. A file that cannot be read degrades to
//! "no excerpt" rather than aborting the run.

use crate::errors::{SpecError, SpecResult};
use std::fs;
use std::path::{Path, PathBuf};

/// The failing source line and its immediate neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailingLine {
    pub filename: PathBuf,
    /// 1-based line number of the failing assertion call.
    pub number: u32,
    pub prev: String,
    pub content: String,
    pub next: String,
}

impl FailingLine {
    /// File basename for display, falling back to the full path.
    pub fn basename(&self) -> String {
        self.filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.display().to_string())
    }
}

/// Resolve a captured call site to a three-line source excerpt.
///
/// Lines missing at the start or end of the file render as empty strings.
pub fn failing_line(file: &str, number: u32) -> SpecResult<FailingLine> {
    let path = Path::new(file);
    let source = fs::read_to_string(path).map_err(|e| SpecError::SourceUnavailable {
        path: path.to_path_buf(),
        source: e,
    })?;

    let lines: Vec<&str> = source.lines().collect();
    let at = |n: u32| -> String {
        if n == 0 {
            return String::new();
        }
        lines
            .get((n - 1) as usize)
            .map(|line| soft_tabs(line))
            .unwrap_or_default()
    };

    Ok(FailingLine {
        filename: path.to_path_buf(),
        number,
        prev: at(number.saturating_sub(1)),
        content: at(number),
        next: at(number + 1),
    })
}

/// Tabs break column alignment in the excerpt block; render them as two
/// spaces.
pub(crate) fn soft_tabs(text: &str) -> String {
    text.replace('\t', "  ")
}
