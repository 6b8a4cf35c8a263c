//! Specification records and the per-leaf execution state machine.
//!
//! One `Specification` exists per `It` leaf, built when the leaf runs
//! and discarded when it finishes. Exactly one outcome line is rendered
//! per leaf: pass, fail (with source excerpt), or not-implemented.

use crate::assert::{Assert, AssertionAdapter};
use crate::config::SuiteConfig;
use crate::handle::TestHandle;
use crate::pending::FailureState;
use crate::report;
use std::io::Write;
use std::panic::Location;

/// The four sentences of one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    /// Top-level story name, derived from the enclosing test function.
    pub feature: String,
    /// Context sentence; may contain embedded newlines for "and ..."
    /// continuation clauses.
    pub given: String,
    /// Event sentence.
    pub when: String,
    /// Expected-outcome sentence.
    pub spec: String,
}

/// Terminal outcome of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    NotImplemented,
}

/// State for one executing `It` leaf.
pub struct Specification<'a> {
    pub story: Story,
    /// True iff at least one predicate failed during the callback.
    pub assertion_failed: bool,
    /// True iff the leaf was declared with no assertion callback.
    pub not_implemented: bool,
    pub(crate) outcome: Option<Outcome>,
    // True once a failure outside the known-failures ledger occurred.
    pub(crate) regression: bool,
    pub(crate) adapter: Box<dyn AssertionAdapter>,
    pub(crate) cfg: &'a mut SuiteConfig,
    pub(crate) handle: &'a mut (dyn TestHandle + 'a),
    pub(crate) out: &'a mut (dyn Write + 'a),
}

impl<'a> Specification<'a> {
    pub(crate) fn new(
        story: Story,
        cfg: &'a mut SuiteConfig,
        handle: &'a mut (dyn TestHandle + 'a),
        out: &'a mut (dyn Write + 'a),
    ) -> Self {
        let adapter = (cfg.adapter_factory)(&story);
        Self {
            story,
            assertion_failed: false,
            not_implemented: false,
            outcome: None,
            regression: false,
            adapter,
            cfg,
            handle,
            out,
        }
    }

    /// Execute an implemented leaf: print the story headers (no-ops when
    /// the cursors already hold the same text), run the callback against
    /// a fresh assertion capability, then render the pass line unless
    /// some other outcome was already rendered.
    pub(crate) fn run<F>(mut self, f: F)
    where
        F: FnOnce(&mut Assert<'a>),
    {
        self.print_headers();

        let mut assert = Assert { spec: self };
        f(&mut assert);
        let mut spec = assert.spec;

        match spec.outcome {
            None => {
                spec.print_spec();
                spec.outcome = Some(Outcome::Passed);
                spec.cfg.tally.record_pass();
            }
            Some(Outcome::Failed) => {
                spec.cfg.tally.record_failure(!spec.regression);
            }
            Some(Outcome::NotImplemented) => {
                spec.cfg.tally.record_not_implemented();
            }
            Some(Outcome::Passed) => {}
        }
    }

    /// Render a leaf declared with no assertion callback. Never runs
    /// anything and never marks the test-runner handle.
    pub(crate) fn run_not_implemented(mut self) {
        self.not_implemented = true;
        self.print_headers();
        self.render_not_implemented();
        self.cfg.tally.record_not_implemented();
    }

    fn print_headers(&mut self) {
        report::print_feature(self.cfg, self.out, &self.story.feature);
        report::print_context(self.cfg, self.out, &self.story.given);
        report::print_when(self.cfg, self.out, &self.story.when);
    }

    /// The eager failure path, entered from inside a failing predicate:
    /// fail-styled title (once per leaf), message, source excerpt, then
    /// handle marking unless the ledger expected this failure.
    pub(crate) fn fail(&mut self, message: &str, location: &Location<'_>) {
        self.assertion_failed = true;

        if self.outcome != Some(Outcome::Failed) {
            self.print_spec_with_error();
            self.outcome = Some(Outcome::Failed);
        }
        self.print_error(message, location);

        let state = self.cfg.known.classify(&self.story.feature, &self.story.spec);
        if state == FailureState::Regression {
            self.regression = true;
            self.handle.fail();
        }
    }

    /// Render the not-implemented marker, once. Also the landing spot
    /// for an `Expectation` dropped without any check.
    pub(crate) fn render_not_implemented(&mut self) {
        if self.outcome.is_none() {
            self.print_spec_not_implemented();
            self.outcome = Some(Outcome::NotImplemented);
        }
    }
}
