//! The assertion capability handed to each spec callback.
//!
//! `Assert` binds the predicate library to one executing Specification.
//! Every predicate method captures its call site with `#[track_caller]`,
//! feeds the raw predicate outcome through the installed
//! [`AssertionAdapter`], and on failure enters the eager rendering path.
//! A failing predicate never aborts the callback: later predicates and
//! sibling specs still run.

use crate::asserts::{self, Emptiness, Existence, HasLen};
use crate::expect::Expectation;
use crate::spec::{Specification, Story};
use std::fmt::Debug;
use std::panic::Location;
use std::time::{Duration, SystemTime};

/// Inspects raw predicate outcomes before they are rendered.
///
/// The factory producing adapters is injected into the suite at
/// construction; see [`crate::SuiteConfig::set_adapter_factory`].
pub trait AssertionAdapter {
    /// `None` means the predicate passed; `Some(message)` is the
    /// failure text to render.
    fn outcome(&mut self, raw: Result<(), String>) -> Option<String>;
}

/// Constructor for the adapter bound to each Specification.
pub type AdapterFactory = Box<dyn Fn(&Story) -> Box<dyn AssertionAdapter>>;

/// The default adapter: cleans up failure text from predicate
/// libraries that embed their own location or formatting noise.
#[derive(Debug, Default)]
pub struct NormalizingAdapter;

impl AssertionAdapter for NormalizingAdapter {
    fn outcome(&mut self, raw: Result<(), String>) -> Option<String> {
        raw.err().map(|message| normalize_message(&message))
    }
}

/// Strip carriage returns, collapse eight-space runs to tab
/// indentation, drop lines carrying a `Location:` marker (the harness
/// renders its own location), and re-join the non-empty remainder.
pub fn normalize_message(raw: &str) -> String {
    let text = raw.replace('\r', "").replace("        ", "\t\t\t");
    text.lines()
        .filter(|line| !line.contains("Location:"))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assertion capability for one Specification.
pub struct Assert<'a> {
    pub(crate) spec: Specification<'a>,
}

impl<'a> Assert<'a> {
    /// Uniform entry point: evaluate a raw predicate outcome. External
    /// predicate libraries report through this. Returns whether the
    /// predicate passed.
    #[track_caller]
    pub fn check(&mut self, raw: Result<(), String>) -> bool {
        self.check_at(raw, Location::caller())
    }

    pub(crate) fn check_at(&mut self, raw: Result<(), String>, location: &Location<'_>) -> bool {
        match self.spec.adapter.outcome(raw) {
            None => true,
            Some(message) => {
                self.spec.fail(&message, location);
                false
            }
        }
    }

    /// Begin a lightweight matcher chain on a value.
    pub fn expect<T>(&mut self, value: T) -> Expectation<'_, 'a, T> {
        Expectation::new(self, value)
    }

    /// The story sentences of the executing spec.
    pub fn story(&self) -> &Story {
        &self.spec.story
    }

    #[track_caller]
    pub fn equal<T, U>(&mut self, expected: &T, actual: &U) -> bool
    where
        T: Debug + PartialEq<U>,
        U: Debug,
    {
        self.check(asserts::equal(expected, actual))
    }

    #[track_caller]
    pub fn not_equal<T, U>(&mut self, expected: &T, actual: &U) -> bool
    where
        T: Debug + PartialEq<U>,
        U: Debug,
    {
        self.check(asserts::not_equal(expected, actual))
    }

    /// Equality of value and concrete type.
    #[track_caller]
    pub fn exactly<T>(&mut self, expected: &T, actual: &T) -> bool
    where
        T: Debug + PartialEq,
    {
        self.check(asserts::exactly(expected, actual))
    }

    #[track_caller]
    pub fn is_true(&mut self, value: bool) -> bool {
        self.check(asserts::is_true(value))
    }

    #[track_caller]
    pub fn is_false(&mut self, value: bool) -> bool {
        self.check(asserts::is_false(value))
    }

    #[track_caller]
    pub fn contains(&mut self, s: &str, needle: &str) -> bool {
        self.check(asserts::contains(s, needle))
    }

    #[track_caller]
    pub fn not_contains(&mut self, s: &str, needle: &str) -> bool {
        self.check(asserts::not_contains(s, needle))
    }

    #[track_caller]
    pub fn has_len<T>(&mut self, object: &T, length: usize) -> bool
    where
        T: HasLen + Debug + ?Sized,
    {
        self.check(asserts::has_len(object, length))
    }

    #[track_caller]
    pub fn empty<T>(&mut self, object: &T) -> bool
    where
        T: Emptiness + Debug + ?Sized,
    {
        self.check(asserts::empty(object))
    }

    #[track_caller]
    pub fn not_empty<T>(&mut self, object: &T) -> bool
    where
        T: Emptiness + Debug + ?Sized,
    {
        self.check(asserts::not_empty(object))
    }

    /// Asserts the value exists (is non-null).
    #[track_caller]
    pub fn some<T>(&mut self, object: &T) -> bool
    where
        T: Existence + Debug,
    {
        self.check(asserts::some(object))
    }

    /// Asserts the value does not exist (is null).
    #[track_caller]
    pub fn none<T>(&mut self, object: &T) -> bool
    where
        T: Existence + Debug,
    {
        self.check(asserts::none(object))
    }

    #[track_caller]
    pub fn ok<T, E>(&mut self, result: &Result<T, E>) -> bool
    where
        E: Debug,
    {
        self.check(asserts::ok(result))
    }

    #[track_caller]
    pub fn err<T, E>(&mut self, result: &Result<T, E>) -> bool
    where
        T: Debug,
    {
        self.check(asserts::err(result))
    }

    #[track_caller]
    pub fn err_eq<T, E>(&mut self, result: &Result<T, E>, message: &str) -> bool
    where
        T: Debug,
        E: std::fmt::Display,
    {
        self.check(asserts::err_eq(result, message))
    }

    #[track_caller]
    pub fn within_duration(
        &mut self,
        expected: &SystemTime,
        actual: &SystemTime,
        delta: Duration,
    ) -> bool {
        self.check(asserts::within_duration(expected, actual, delta))
    }
}
