//! Suite configuration.
//!
//! One `SuiteConfig` is owned by each [`crate::Suite`] and passed by
//! reference into the walker and reporter. There is no process-global
//! state: two suites never share style tokens, adapter factories, or
//! de-duplication cursors.

use crate::assert::{AdapterFactory, NormalizingAdapter};
use crate::pending::{KnownFailures, RunTally};
use crate::style::StylePalette;
use std::fmt;

/// Transcript output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Print the full story transcript.
    Verbose,
    /// Suppress all printing; assertions still execute and still mark
    /// the test-runner handle.
    Silent,
}

/// Configuration and printing state for one suite.
pub struct SuiteConfig {
    /// Style tokens, one per transcript element.
    pub styles: StylePalette,
    pub(crate) output: OutputMode,

    // De-duplication cursors: a header is printed only when its text
    // differs from the corresponding cursor.
    pub(crate) last_feature: String,
    pub(crate) last_given: String,
    pub(crate) last_when: String,
    pub(crate) last_spec: String,

    pub(crate) adapter_factory: AdapterFactory,
    pub(crate) known: KnownFailures,
    pub(crate) tally: RunTally,
}

impl SuiteConfig {
    pub fn new() -> Self {
        Self {
            styles: StylePalette::default(),
            output: OutputMode::Verbose,
            last_feature: String::new(),
            last_given: String::new(),
            last_when: String::new(),
            last_spec: String::new(),
            adapter_factory: Box::new(|_| Box::new(NormalizingAdapter)),
            known: KnownFailures::default(),
            tally: RunTally::default(),
        }
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    pub fn set_silent(&mut self) {
        self.output = OutputMode::Silent;
    }

    pub fn set_verbose(&mut self) {
        self.output = OutputMode::Verbose;
    }

    /// Install a custom assertion-adapter factory, invoked once per
    /// Specification.
    pub fn set_adapter_factory(&mut self, factory: AdapterFactory) {
        self.adapter_factory = factory;
    }

    /// Install a known-failures ledger.
    pub fn set_known_failures(&mut self, ledger: KnownFailures) {
        self.known = ledger;
    }

    pub fn known_failures(&self) -> &KnownFailures {
        &self.known
    }

    pub fn tally(&self) -> &RunTally {
        &self.tally
    }

    /// Clear the given/when/spec cursors at the end of a top-level given
    /// block. The feature cursor is deliberately kept: features group
    /// several givens under one header printed once.
    pub fn reset_lasts(&mut self) {
        self.last_given.clear();
        self.last_when.clear();
        self.last_spec.clear();
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SuiteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteConfig")
            .field("styles", &self.styles)
            .field("output", &self.output)
            .field("last_feature", &self.last_feature)
            .field("last_given", &self.last_given)
            .field("last_when", &self.last_when)
            .field("last_spec", &self.last_spec)
            .field("tally", &self.tally)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> SuiteConfig {
        let mut config = SuiteConfig::new();
        config.last_feature = "feature value".to_string();
        config.last_given = "context value".to_string();
        config.last_when = "when value".to_string();
        config.last_spec = "title value".to_string();
        config
    }

    #[test]
    fn test_reset_keeps_feature_cursor() {
        let mut config = populated();
        config.reset_lasts();

        assert_eq!(config.last_feature, "feature value");
    }

    #[test]
    fn test_reset_clears_given_when_spec_cursors() {
        let mut config = populated();
        config.reset_lasts();

        assert!(config.last_given.is_empty());
        assert!(config.last_when.is_empty());
        assert!(config.last_spec.is_empty());
    }

    #[test]
    fn test_output_mode_toggles() {
        let mut config = SuiteConfig::new();
        assert_eq!(config.output(), OutputMode::Verbose);

        config.set_silent();
        assert_eq!(config.output(), OutputMode::Silent);

        config.set_verbose();
        assert_eq!(config.output(), OutputMode::Verbose);
    }
}
