//! Known-failures ledger and run tally.
//!
//! A suite can load a TOML ledger of specs that are expected to fail.
//! A failing spec listed in the ledger still renders its failure in the
//! transcript, but does not mark the test-runner handle; an unlisted
//! failure is a regression.

use crate::errors::{SpecError, SpecResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Loaded known-failures ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnownFailures {
    /// Known failures (won't fix soon).
    #[serde(default)]
    pub known: Vec<FailureEntry>,
    /// Pending failures (awaiting fix).
    #[serde(default)]
    pub pending: Vec<FailureEntry>,
}

/// A single expected-failure entry, keyed by story sentences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEntry {
    /// The feature sentence of the spec.
    pub feature: String,
    /// The `It` sentence of the spec.
    pub spec: String,
    /// Human-readable reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Date added (YYYY-MM-DD).
    #[serde(default)]
    pub added: Option<String>,
    /// Related issue URL.
    #[serde(default)]
    pub issue: Option<String>,
}

/// Failure lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureState {
    /// Known limitation, won't fix soon.
    Known,
    /// Awaiting fix, not blocking.
    Pending,
    /// Expected to pass - failure is a regression.
    Regression,
}

impl KnownFailures {
    /// Load from a TOML file. An absent file yields an empty ledger.
    pub fn load(path: &Path) -> SpecResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SpecError::Ledger {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| SpecError::Ledger {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Classify a failing spec.
    pub fn classify(&self, feature: &str, spec: &str) -> FailureState {
        for entry in &self.known {
            if entry.feature == feature && entry.spec == spec {
                return FailureState::Known;
            }
        }

        for entry in &self.pending {
            if entry.feature == feature && entry.spec == spec {
                return FailureState::Pending;
            }
        }

        FailureState::Regression
    }

    /// Get entry for a specific failure (if expected).
    pub fn get_entry(&self, feature: &str, spec: &str) -> Option<&FailureEntry> {
        self.known
            .iter()
            .chain(self.pending.iter())
            .find(|e| e.feature == feature && e.spec == spec)
    }

    /// Count total expected failures.
    pub fn count(&self) -> usize {
        self.known.len() + self.pending.len()
    }
}

/// Per-suite outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    /// Total specs executed (including stubs).
    pub total: usize,
    /// Passed specs.
    pub passed: usize,
    /// Not-implemented stubs.
    pub not_implemented: usize,
    /// Failures listed in the ledger.
    pub expected_failures: usize,
    /// Unexpected failures.
    pub regressions: usize,
}

impl RunTally {
    /// Check if the suite passed (no regressions).
    pub fn success(&self) -> bool {
        self.regressions == 0
    }

    pub(crate) fn record_pass(&mut self) {
        self.total += 1;
        self.passed += 1;
    }

    pub(crate) fn record_not_implemented(&mut self) {
        self.total += 1;
        self.not_implemented += 1;
    }

    pub(crate) fn record_failure(&mut self, expected: bool) {
        self.total += 1;
        if expected {
            self.expected_failures += 1;
        } else {
            self.regressions += 1;
        }
    }
}
