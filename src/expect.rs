//! A light matcher pattern built on the assertion capability.
//!
//! `assert.expect(value)` starts a chain ending in one terminal check.
//! Failures render through the same header/message path as the
//! predicate methods, with a self-describing message template:
//! ``Expected `<value>` to <description> `<other>` ``.
//!
//! An `Expectation` dropped without any check marks its spec as not
//! implemented, so a leaf can be sketched before its matcher is chosen.

use crate::assert::Assert;
use crate::asserts::{self, Emptiness, Existence};
use std::fmt::Debug;

/// The value being asserted, bound to the executing spec.
pub struct Expectation<'e, 'a, T> {
    assert: &'e mut Assert<'a>,
    value: T,
    checked: bool,
}

impl<'e, 'a, T> Expectation<'e, 'a, T> {
    pub(crate) fn new(assert: &'e mut Assert<'a>, value: T) -> Self {
        Self {
            assert,
            value,
            checked: false,
        }
    }

    /// Apply a custom matcher to the value.
    #[track_caller]
    pub fn to<U, M>(mut self, description: &str, other: &U, matcher: M) -> bool
    where
        T: Debug,
        U: Debug,
        M: FnOnce(&T, &U) -> bool,
    {
        self.checked = true;
        let raw = if matcher(&self.value, other) {
            Ok(())
        } else {
            Err(format!(
                "Expected `{:?}` to {} `{:?}`",
                self.value, description, other
            ))
        };
        self.assert.check(raw)
    }

    /// Structural equality, including cross-type comparisons where a
    /// `PartialEq` impl exists.
    #[track_caller]
    pub fn to_equal<U>(self, other: &U) -> bool
    where
        T: Debug + PartialEq<U>,
        U: Debug,
    {
        self.to("equal", other, |a, b| a == b)
    }

    #[track_caller]
    pub fn to_not_equal<U>(self, other: &U) -> bool
    where
        T: Debug + PartialEq<U>,
        U: Debug,
    {
        self.to("not equal", other, |a, b| a != b)
    }

    /// Matches both the concrete type and the value.
    #[track_caller]
    pub fn to_match_exactly(self, other: &T) -> bool
    where
        T: Debug + PartialEq,
    {
        self.to("exactly match values and type of", other, |a, b| a == b)
    }

    /// The value is non-null (`Some`, or a non-null pointer).
    #[track_caller]
    pub fn to_exist(mut self) -> bool
    where
        T: Existence + Debug,
    {
        self.checked = true;
        self.assert.check(asserts::some(&self.value))
    }

    /// The value is null (`None`, or a null pointer).
    #[track_caller]
    pub fn to_not_exist(mut self) -> bool
    where
        T: Existence + Debug,
    {
        self.checked = true;
        self.assert.check(asserts::none(&self.value))
    }

    /// The value is its zero/empty form.
    #[track_caller]
    pub fn to_be_empty(mut self) -> bool
    where
        T: Emptiness + Debug,
    {
        self.checked = true;
        self.assert.check(asserts::empty(&self.value))
    }

    #[track_caller]
    pub fn to_not_be_empty(mut self) -> bool
    where
        T: Emptiness + Debug,
    {
        self.checked = true;
        self.assert.check(asserts::not_empty(&self.value))
    }
}

impl<T> Drop for Expectation<'_, '_, T> {
    fn drop(&mut self) {
        if !self.checked {
            self.assert.spec.render_not_implemented();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::assert::Assert;
    use crate::config::SuiteConfig;
    use crate::handle::{RecordingHandle, TestHandle};
    use crate::spec::{Specification, Story};

    fn run_spec<F>(f: F) -> (String, bool)
    where
        F: FnOnce(&mut Assert<'_>),
    {
        colored::control::set_override(false);
        let mut cfg = SuiteConfig::new();
        let mut handle = RecordingHandle::default();
        let mut buf: Vec<u8> = Vec::new();
        {
            let story = Story {
                feature: "Expectations".to_string(),
                given: "a value".to_string(),
                when: "matched".to_string(),
                spec: "should hold".to_string(),
            };
            let spec = Specification::new(story, &mut cfg, &mut handle, &mut buf);
            spec.run(f);
        }
        (String::from_utf8(buf).unwrap(), handle.failed())
    }

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_equal_numbers() {
        let (_, failed) = run_spec(|assert| {
            assert.expect(5).to_equal(&5);
        });
        assert!(!failed);
    }

    #[test]
    fn test_not_equal_strings() {
        let (_, failed) = run_spec(|assert| {
            assert.expect("hello").to_not_equal(&"world");
        });
        assert!(!failed);
    }

    #[test]
    fn test_none_does_not_exist() {
        let (_, failed) = run_spec(|assert| {
            assert.expect(None::<&i32>).to_not_exist();
        });
        assert!(!failed);
    }

    #[test]
    fn test_structural_equality_of_distinct_instances() {
        let (_, failed) = run_spec(|assert| {
            let a = Point { x: 1, y: 2 };
            let b = Point { x: 1, y: 2 };
            assert.expect(a).to_equal(&b);
        });
        assert!(!failed);
    }

    #[test]
    fn test_match_exactly() {
        let (_, failed) = run_spec(|assert| {
            assert.expect(1i32).to_match_exactly(&1i32);
        });
        assert!(!failed);
    }

    #[test]
    fn test_emptiness_laws() {
        let (_, failed) = run_spec(|assert| {
            assert.expect("").to_be_empty();
            assert.expect(false).to_be_empty();
            assert.expect(0i32).to_be_empty();
            assert.expect(Vec::<i32>::new()).to_be_empty();
            assert.expect(std::time::Duration::ZERO).to_be_empty();

            assert.expect("x").to_not_be_empty();
            assert.expect(true).to_not_be_empty();
            assert.expect(1i32).to_not_be_empty();
        });
        assert!(!failed);
    }

    #[test]
    fn test_custom_matcher_passes_silently() {
        let (transcript, failed) = run_spec(|assert| {
            let differs_by_one = |a: &i32, b: &i32| (a - b).abs() == 1;
            assert.expect(4).to("differ by one from", &5, differs_by_one);
        });

        assert!(!failed);
        assert!(!transcript.contains("Expected"));
    }

    #[test]
    fn test_custom_matcher_failure_message() {
        let (transcript, failed) = run_spec(|assert| {
            let differs_by_one = |a: &i32, b: &i32| (a - b).abs() == 1;
            assert.expect(4).to("differ by one from", &10, differs_by_one);
        });

        assert!(failed);
        assert!(transcript.contains("Expected `4` to differ by one from `10`"));
    }

    #[test]
    fn test_failed_equality_message_template() {
        let (transcript, failed) = run_spec(|assert| {
            assert.expect(2).to_equal(&3);
        });

        assert!(failed);
        assert!(transcript.contains("Expected `2` to equal `3`"));
    }

    #[test]
    fn test_unchecked_expectation_is_not_implemented() {
        let (transcript, failed) = run_spec(|assert| {
            let _ = assert.expect(5);
        });

        assert!(!failed);
        assert!(transcript.contains("«-- NOT IMPLEMENTED"));
    }
}
