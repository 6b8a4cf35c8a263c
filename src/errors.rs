//! Error types for the story harness.
//!
//! This module defines error types for source-excerpt lookup and
//! known-failures ledger loading.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur outside of ordinary assertion failures.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The failing test's source file could not be read, so no excerpt
    /// can be rendered.
    #[error("failed to read source file {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The known-failures ledger could not be loaded or parsed.
    #[error("failed to load ledger {}: {message}", path.display())]
    Ledger { path: PathBuf, message: String },
}

/// Result type for harness operations.
pub type SpecResult<T> = Result<T, SpecError>;
