//! Failure diagnostics for evaluation.
//!
//! Evaluation explores many branches and most of them fail on purpose:
//! a choice tries alternatives, a greedy repetition stops at the first
//! mismatch. What survives is the chain of failures that explains the
//! final result.
//!
//! # How failures are kept
//!
//! Every evaluator frame sits at a call depth (the root rule is depth 0).
//! A failing frame records a [`Failure`] at its depth. A succeeding frame
//! discards everything recorded deeper than itself, because those failures
//! were explored and recovered from. What is left when a root fails is one
//! list of failures per depth, innermost last.
//!
//! # Example
//!
//! ```
//! use jcr::prelude::*;
//! use serde_json::json;
//!
//! let ctx = Context::new(r#"[ "foo" | "bar" ]"#).unwrap();
//! let trace = ctx.evaluate_with_trace(&json!(["baz"]), None).unwrap();
//!
//! assert!(!trace.result.success);
//! let levels = &trace.failed_roots[0].levels;
//! assert_eq!(levels.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 2]);
//! assert_eq!(trace.failure_report()[0], "- Failures for root rule at line 1");
//! ```

use crate::eval::EvaluationResult;
use crate::rule::Position;

/// One failed evaluator frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Failure {
    /// Elided JSON the rule was evaluated against.
    pub json: String,
    /// Elided rendering of the rule.
    pub rule: String,
    /// Where the rule is defined.
    pub position: Position,
    /// Elided failure reason.
    pub reason: String,
}

/// The failures kept for one attempted root.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailedRoot {
    /// Rule name, for named roots.
    pub name: Option<String>,
    /// Source line of the root rule.
    pub line: u32,
    /// Failures by call depth; index 0 is the root rule itself.
    pub levels: Vec<Vec<Failure>>,
}

impl FailedRoot {
    /// The report heading for this root.
    #[must_use]
    pub fn heading(&self) -> String {
        match &self.name {
            Some(name) => format!("- Failures for root rule named '{name}'"),
            None => format!("- Failures for root rule at line {}", self.line),
        }
    }

    /// Total number of recorded failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

/// Result of [`Context::evaluate_with_trace`](crate::Context::evaluate_with_trace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalTrace {
    /// The evaluation outcome.
    pub result: EvaluationResult,
    /// Failures for every root that was attempted and failed, in attempt order.
    pub failed_roots: Vec<FailedRoot>,
}

impl EvalTrace {
    /// Render the failures as an indented report.
    #[must_use]
    pub fn failure_report(&self) -> Vec<String> {
        failure_report(&self.failed_roots)
    }
}

/// Render failed roots as an indented report, one line per entry.
///
/// Depths are listed innermost first. Several failures at one depth are
/// alternatives that all failed, so they are listed under a single
/// "one of N reasons" line.
#[must_use]
pub fn failure_report(failed_roots: &[FailedRoot]) -> Vec<String> {
    let mut report = Vec::new();
    for root in failed_roots {
        report.push(root.heading());
        for (depth, failures) in root.levels.iter().enumerate().rev() {
            match failures.as_slice() {
                [] => {}
                [failure] => {
                    report.push(format!("  - failure at rule depth {depth} caused by"));
                    report.push(format!("    - {}", describe(failure)));
                }
                _ => {
                    report.push(format!(
                        "  - failure at rule depth {depth} caused by one of the following {} reasons",
                        failures.len()
                    ));
                    for failure in failures {
                        report.push(format!("    - {}", describe(failure)));
                    }
                }
            }
        }
    }
    report
}

fn describe(failure: &Failure) -> String {
    format!(
        "{} failed rule at {} [ {} ] because {}",
        failure.json, failure.position, failure.rule, failure.reason
    )
}
