//! Transcript printing with header de-duplication.
//!
//! Headers (feature, given, when) are printed through cursor-guarded
//! functions: identical consecutive text prints once, changed text
//! reprints. Leaf outcomes and failure excerpts are rendered by the
//! `Specification` methods below, mirroring the header family.

use crate::config::{OutputMode, SuiteConfig};
use crate::locator;
use crate::pending::RunTally;
use crate::spec::Specification;
use std::io::Write;
use std::panic::Location;

/// Print the feature header unless it was the last one printed.
pub(crate) fn print_feature<W: Write + ?Sized>(cfg: &mut SuiteConfig, out: &mut W, text: &str) {
    if cfg.last_feature == text {
        return;
    }
    if cfg.output == OutputMode::Verbose {
        let _ = writeln!(
            out,
            "{}",
            cfg.styles.feature.paint(&format!("Feature: {}", text))
        );
    }
    cfg.last_feature = text.to_string();
}

/// Print the context line unless it was the last one printed.
/// Continuation clauses (embedded newlines) are padded to align under
/// the sentence.
pub(crate) fn print_context<W: Write + ?Sized>(cfg: &mut SuiteConfig, out: &mut W, text: &str) {
    if cfg.last_given == text {
        return;
    }
    if cfg.output == OutputMode::Verbose {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            cfg.styles
                .given
                .paint(&format!("  Given {}", pad_continuations(text, 2)))
        );
    }
    cfg.last_given = text.to_string();
}

/// Print the event line unless it was the last one printed.
pub(crate) fn print_when<W: Write + ?Sized>(cfg: &mut SuiteConfig, out: &mut W, text: &str) {
    if cfg.last_when == text {
        return;
    }
    if cfg.output == OutputMode::Verbose {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            cfg.styles.when.paint(&format!("    When {}", text))
        );
    }
    cfg.last_when = text.to_string();
}

impl Specification<'_> {
    /// The normal success line.
    pub(crate) fn print_spec(&mut self) {
        if self.cfg.output == OutputMode::Verbose {
            let _ = writeln!(
                self.out,
                "{}",
                self.cfg
                    .styles
                    .it_pass
                    .paint(&format!("    » It {}", self.story.spec))
            );
        }
        self.cfg.last_spec = self.story.spec.clone();
    }

    /// The fail-styled title line, rendered before the first failure
    /// message of a leaf.
    pub(crate) fn print_spec_with_error(&mut self) {
        if self.cfg.output == OutputMode::Verbose {
            let _ = writeln!(
                self.out,
                "{}",
                self.cfg
                    .styles
                    .it_fail
                    .paint(&format!("    » It {}", self.story.spec))
            );
        }
        self.cfg.last_spec = self.story.spec.clone();
    }

    /// The stub marker line.
    pub(crate) fn print_spec_not_implemented(&mut self) {
        if self.cfg.output == OutputMode::Verbose {
            let _ = writeln!(
                self.out,
                "{}",
                self.cfg
                    .styles
                    .it_not_implemented
                    .paint(&format!("    » It {} «-- NOT IMPLEMENTED", self.story.spec))
            );
        }
        self.cfg.last_spec = self.story.spec.clone();
    }

    /// The failure message plus, when the source file is readable, the
    /// three-line excerpt around the failing call. An unreadable file
    /// degrades to the message alone.
    pub(crate) fn print_error(&mut self, message: &str, location: &Location<'_>) {
        if self.cfg.output != OutputMode::Verbose {
            return;
        }

        let styles = &self.cfg.styles;
        let _ = writeln!(self.out, "{}", styles.error_message.paint(message));

        if let Ok(line) = locator::failing_line(location.file(), location.line()) {
            let _ = writeln!(
                self.out,
                "{}",
                styles
                    .code
                    .paint(&format!("        in {}:{}", line.basename(), line.number))
            );
            let _ = writeln!(self.out, "{}", styles.code.paint("        ---------"));
            if line.number > 1 {
                let _ = writeln!(
                    self.out,
                    "{}",
                    styles
                        .code
                        .paint(&format!("        {}. {}", line.number - 1, line.prev))
                );
            }
            let _ = writeln!(
                self.out,
                "{}",
                styles
                    .code_error
                    .paint(&format!("        {}. {}", line.number, line.content))
            );
            let _ = writeln!(
                self.out,
                "{}",
                styles
                    .code
                    .paint(&format!("        {}. {}", line.number + 1, line.next))
            );
        }

        let _ = writeln!(self.out);
    }
}

/// Pad embedded line breaks so continuation clauses align under the
/// first line of the sentence.
pub(crate) fn pad_continuations(text: &str, padding: usize) -> String {
    let pad = format!("\n{}", " ".repeat(padding));
    text.replace('\n', &pad)
}

/// End-of-suite summary line.
pub fn format_summary(feature: &str, tally: &RunTally) -> String {
    let status = if tally.success() { "PASS" } else { "FAIL" };
    format!(
        "{}: {}\n  {} passed, {} not implemented, {} failed ({} expected, {} regressions)",
        status,
        feature,
        tally.passed,
        tally.not_implemented,
        tally.expected_failures + tally.regressions,
        tally.expected_failures,
        tally.regressions
    )
}
