//! jcr-test: Test domain for conformance testing
//!
//! Provides callbacks with observable behavior and the YAML fixture runner.
//! This is the reference extension that demonstrates how to build on the
//! `jcr` callback seam.
//!
//! # Example
//!
//! ```
//! use jcr_test::prelude::*;
//! use serde_json::json;
//!
//! let mut ctx = Context::new("[ $n * ] $n =: integer").unwrap();
//! let counter = CountingCallback::new();
//! ctx.register_callback("n", counter.clone());
//!
//! assert!(ctx.evaluate(&json!([1, 2, 3]), None).unwrap().success);
//! assert_eq!(counter.true_count(), 3);
//! ```

use jcr::prelude::*;
use jcr::Rule;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[cfg(feature = "fixtures")]
pub mod fixture;

/// Counts invocations and answers with configured outcomes.
///
/// Clones share their counters, so keep one clone to inspect after
/// registering another.
#[derive(Debug, Clone)]
pub struct CountingCallback {
    true_count: Arc<AtomicUsize>,
    false_count: Arc<AtomicUsize>,
    on_true: CallbackOutcome,
    on_false: CallbackOutcome,
}

impl CountingCallback {
    /// A callback that leaves every result as it is.
    #[must_use]
    pub fn new() -> Self {
        Self {
            true_count: Arc::new(AtomicUsize::new(0)),
            false_count: Arc::new(AtomicUsize::new(0)),
            on_true: CallbackOutcome::Pass,
            on_false: CallbackOutcome::Fail,
        }
    }

    /// Answer successful evaluations with `outcome` (builder pattern).
    #[must_use]
    pub fn on_true(mut self, outcome: CallbackOutcome) -> Self {
        self.on_true = outcome;
        self
    }

    /// Answer failed evaluations with `outcome` (builder pattern).
    #[must_use]
    pub fn on_false(mut self, outcome: CallbackOutcome) -> Self {
        self.on_false = outcome;
        self
    }

    /// Times the rule matched.
    #[must_use]
    pub fn true_count(&self) -> usize {
        self.true_count.load(Ordering::SeqCst)
    }

    /// Times the rule did not match.
    #[must_use]
    pub fn false_count(&self) -> usize {
        self.false_count.load(Ordering::SeqCst)
    }

    /// Zero both counters.
    pub fn reset(&self) {
        self.true_count.store(0, Ordering::SeqCst);
        self.false_count.store(0, Ordering::SeqCst);
    }
}

impl Default for CountingCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleCallback for CountingCallback {
    fn eval_true(&self, _rule: &Rule, _data: &Value) -> CallbackOutcome {
        self.true_count.fetch_add(1, Ordering::SeqCst);
        self.on_true.clone()
    }

    fn eval_false(&self, _rule: &Rule, _data: &Value, _result: &EvaluationResult) -> CallbackOutcome {
        self.false_count.fetch_add(1, Ordering::SeqCst);
        self.on_false.clone()
    }
}

/// Answers every evaluation with the same outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedCallback(pub CallbackOutcome);

impl FixedCallback {
    /// Always match.
    #[must_use]
    pub fn pass() -> Self {
        Self(CallbackOutcome::Pass)
    }

    /// Never match, with the evaluator's reason when there is one.
    #[must_use]
    pub fn fail() -> Self {
        Self(CallbackOutcome::Fail)
    }

    /// Never match, for `reason`.
    #[must_use]
    pub fn reason(reason: impl Into<String>) -> Self {
        Self(CallbackOutcome::Reason(reason.into()))
    }
}

impl RuleCallback for FixedCallback {
    fn eval_true(&self, _rule: &Rule, _data: &Value) -> CallbackOutcome {
        self.0.clone()
    }

    fn eval_false(&self, _rule: &Rule, _data: &Value, _result: &EvaluationResult) -> CallbackOutcome {
        self.0.clone()
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{CountingCallback, FixedCallback};
    pub use jcr::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counting_callback_counts_each_element() {
        let mut ctx = Context::new("[ $n * ] $n =: integer").unwrap();
        let counter = CountingCallback::new();
        ctx.register_callback("n", counter.clone());

        // The repetition stops at the first mismatch, which is still counted.
        let result = ctx.evaluate(&json!([1, 2, "x"]), None).unwrap();
        assert!(!result.success);
        assert_eq!(counter.true_count(), 2);
        assert_eq!(counter.false_count(), 1);

        counter.reset();
        assert_eq!(counter.true_count(), 0);
    }

    #[test]
    fn test_counting_callback_outcomes() {
        let mut ctx = Context::new("[ $n ] $n =: integer").unwrap();
        ctx.register_callback("n", CountingCallback::new().on_false(CallbackOutcome::Pass));
        assert!(ctx.evaluate(&json!(["x"]), None).unwrap().success);

        ctx.register_callback("n", CountingCallback::new().on_true(CallbackOutcome::Fail));
        let result = ctx.evaluate(&json!([1]), None).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_fixed_callback() {
        let mut ctx = Context::new("[ $n ] $n =: integer").unwrap();
        ctx.register_callback("n", FixedCallback::reason("nope"));
        let result = ctx.evaluate_with_trace(&json!([1]), None).unwrap();
        assert!(!result.result.success);
        assert!(result.failure_report().iter().any(|line| line.contains("nope")));

        ctx.register_callback("n", FixedCallback::pass());
        assert!(ctx.evaluate(&json!([true]), None).unwrap().success);
    }
}
