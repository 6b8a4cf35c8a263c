//! The Given/When/It walker.
//!
//! A [`Suite`] owns the configuration, the test-runner handle, and the
//! transcript writer for one feature. `given` accumulates the story
//! path; each `It` leaf builds a Specification and executes it in
//! declaration order. Nesting `given` is not modeled: the tree is flat
//! (one given, many whens, many its).

use crate::assert::{AdapterFactory, Assert};
use crate::config::{OutputMode, SuiteConfig};
use crate::handle::{PanicHandle, TestHandle};
use crate::pending::{KnownFailures, RunTally};
use crate::report;
use crate::spec::{Specification, Story};
use std::fmt::Debug;
use std::io::{self, Write};

/// Driver for one feature's specifications.
pub struct Suite<H: TestHandle = PanicHandle> {
    feature: String,
    config: SuiteConfig,
    handle: H,
    out: Box<dyn Write>,
}

impl Suite<PanicHandle> {
    /// A suite bound to `cargo test`: a failing spec makes the owning
    /// test function fail once the suite is dropped.
    pub fn new(feature: impl Into<String>) -> Self {
        Self::with_handle(feature, PanicHandle::default())
    }
}

impl<H: TestHandle> Suite<H> {
    /// A suite reporting into a caller-supplied test-runner handle.
    pub fn with_handle(feature: impl Into<String>, handle: H) -> Self {
        Self {
            feature: feature.into(),
            config: SuiteConfig::new(),
            handle,
            out: Box::new(io::stdout()),
        }
    }

    /// Redirect the transcript (stdout by default).
    pub fn writer(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// Suppress the transcript; assertions still execute and still mark
    /// the handle.
    pub fn silent(mut self) -> Self {
        self.config.set_silent();
        self
    }

    /// Install a custom assertion-adapter factory.
    pub fn adapter_factory(mut self, factory: AdapterFactory) -> Self {
        self.config.set_adapter_factory(factory);
        self
    }

    /// Install a known-failures ledger.
    pub fn known_failures(mut self, ledger: KnownFailures) -> Self {
        self.config.set_known_failures(ledger);
        self
    }

    pub fn config_mut(&mut self) -> &mut SuiteConfig {
        &mut self.config
    }

    pub fn summary(&self) -> RunTally {
        *self.config.tally()
    }

    pub fn failed(&self) -> bool {
        self.handle.failed()
    }

    /// Declare a context and run its event blocks. Afterwards the
    /// given/when/spec cursors reset (the feature cursor survives) and a
    /// blank separator line is emitted.
    pub fn given<F>(&mut self, given: &str, block: F)
    where
        F: FnOnce(&mut When<'_>),
    {
        report::print_feature(&mut self.config, &mut *self.out, &self.feature);
        report::print_context(&mut self.config, &mut *self.out, given);

        {
            let mut when = When {
                feature: &self.feature,
                given,
                cfg: &mut self.config,
                handle: &mut self.handle,
                out: &mut *self.out,
            };
            block(&mut when);
        }

        self.config.reset_lasts();
        if self.config.output() == OutputMode::Verbose {
            let _ = writeln!(self.out);
        }
    }

    /// Declare an unimplemented context: the context line prints with
    /// no further structure.
    pub fn given_pending(&mut self, given: &str) {
        self.given(given, |_| {});
    }

    /// Print the summary line and return the tally. Dropping the suite
    /// afterwards lets the handle report accumulated failure to the
    /// host runner.
    pub fn finish(mut self) -> RunTally {
        let tally = *self.config.tally();
        if self.config.output() == OutputMode::Verbose {
            let _ = writeln!(self.out, "{}", report::format_summary(&self.feature, &tally));
        }
        tally
    }
}

/// Event-registration capability passed to `given` blocks.
pub struct When<'a> {
    feature: &'a str,
    given: &'a str,
    cfg: &'a mut SuiteConfig,
    handle: &'a mut (dyn TestHandle + 'a),
    out: &'a mut (dyn Write + 'a),
}

impl When<'_> {
    /// Declare an event and run its spec blocks.
    pub fn when<F>(&mut self, when: &str, block: F)
    where
        F: FnOnce(&mut It<'_>),
    {
        report::print_when(&mut *self.cfg, &mut *self.out, when);

        let mut it = It {
            feature: self.feature,
            given: self.given,
            when,
            cfg: &mut *self.cfg,
            handle: &mut *self.handle,
            out: &mut *self.out,
        };
        block(&mut it);
    }

    /// Declare an event with no specs yet: the event line prints and
    /// nothing else.
    pub fn when_pending(&mut self, when: &str) {
        self.when(when, |_| {});
    }
}

/// Spec-registration capability passed to `when` blocks.
pub struct It<'a> {
    feature: &'a str,
    given: &'a str,
    when: &'a str,
    cfg: &'a mut SuiteConfig,
    handle: &'a mut (dyn TestHandle + 'a),
    out: &'a mut (dyn Write + 'a),
}

impl It<'_> {
    fn story(&self, spec: String) -> Story {
        Story {
            feature: self.feature.to_string(),
            given: self.given.to_string(),
            when: self.when.to_string(),
            spec,
        }
    }

    /// Declare a spec with an assertion callback and execute it.
    pub fn it<F>(&mut self, spec: &str, f: F)
    where
        F: FnOnce(&mut Assert<'_>),
    {
        let story = self.story(spec.to_string());
        Specification::new(story, &mut *self.cfg, &mut *self.handle, &mut *self.out).run(f);
    }

    /// Declare a spec with no assertion callback: renders the
    /// not-implemented marker and never marks the handle.
    pub fn pending(&mut self, spec: &str) {
        let story = self.story(spec.to_string());
        Specification::new(story, &mut *self.cfg, &mut *self.handle, &mut *self.out)
            .run_not_implemented();
    }

    /// Table-driven variant: each case runs as an independent
    /// Specification. A `{}` placeholder in the sentence is replaced by
    /// the case's `Debug` form; without one, all cases share the
    /// sentence verbatim.
    pub fn it_each<C, F>(&mut self, spec: &str, cases: &[C], f: F)
    where
        C: Debug,
        F: Fn(&mut Assert<'_>, &C),
    {
        for case in cases {
            let sentence = if spec.contains("{}") {
                spec.replacen("{}", &format!("{:?}", case), 1)
            } else {
                spec.to_string()
            };
            let story = self.story(sentence);
            Specification::new(story, &mut *self.cfg, &mut *self.handle, &mut *self.out)
                .run(|assert| f(assert, case));
        }
    }
}

/// Wrap a spec callback in before/after effects. The before-effect is
/// observable inside the callback; the after-effect is observable as
/// soon as the callback returns, before the next leaf runs.
pub fn setup<B, A, F>(before: B, after: A, body: F) -> impl for<'r, 'x> FnOnce(&'r mut Assert<'x>)
where
    B: FnOnce(),
    A: FnOnce(),
    F: for<'r, 'x> FnOnce(&'r mut Assert<'x>),
{
    move |assert| {
        before();
        body(assert);
        after();
    }
}

/// Turn a raw function path (as produced by `type_name`) into a feature
/// sentence: the enclosing function's name with any `Test`/`test`
/// prefix stripped and underscores read as spaces.
pub fn humanize_feature(raw: &str) -> String {
    let mut segments: Vec<&str> = raw.split("::").collect();
    while matches!(segments.last(), Some(&"{{closure}}") | Some(&"__feature_fn")) {
        segments.pop();
    }
    let name = segments.last().copied().unwrap_or(raw);

    let stripped = name
        .strip_prefix("Test_")
        .or_else(|| name.strip_prefix("test_"))
        .or_else(|| name.strip_prefix("Test"))
        .or_else(|| name.strip_prefix("test"))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name);

    stripped.replace('_', " ")
}

/// Derive the feature sentence from the enclosing function's name.
///
/// ```
/// fn test_dog_washing() {
///     let suite = story_specs::Suite::new(story_specs::feature!());
///     // suite's feature is "dog washing"
///     # drop(suite);
/// }
/// # test_dog_washing();
/// ```
#[macro_export]
macro_rules! feature {
    () => {{
        fn __feature_fn() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::humanize_feature(__type_name_of(__feature_fn))
    }};
}
