//! Per-rule callbacks that can overrule evaluation.

use crate::eval::EvaluationResult;
use crate::rule::Rule;
use serde_json::Value;

/// What a callback decides about an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The rule matches.
    Pass,
    /// The rule does not match; keep the evaluator's reason if it failed.
    Fail,
    /// The rule does not match, for this reason.
    Reason(String),
}

/// Hook invoked after a named rule is evaluated.
///
/// Register with [`Context::register_callback`](crate::Context::register_callback)
/// under a rule name. The hook runs every time that rule is evaluated,
/// including each element a repetition tries, and may flip the result.
///
/// Closures taking `(rule, data, result)` implement this trait.
///
/// ```
/// use jcr::prelude::*;
/// use serde_json::json;
///
/// let mut ctx = Context::new("[ $even* ] $even =: integer").unwrap();
/// ctx.register_callback("even", |_: &jcr::Rule, data: &serde_json::Value, result: &EvaluationResult| {
///     match data.as_i64() {
///         Some(n) if result.success && n % 2 == 0 => CallbackOutcome::Pass,
///         _ => CallbackOutcome::Reason(format!("{data} is not even")),
///     }
/// });
/// assert!(ctx.evaluate(&json!([2, 4]), None).unwrap().success);
/// assert!(!ctx.evaluate(&json!([2, 3]), None).unwrap().success);
/// ```
pub trait RuleCallback: Send + Sync {
    /// Called when the rule matched.
    fn eval_true(&self, rule: &Rule, data: &Value) -> CallbackOutcome {
        let _ = (rule, data);
        CallbackOutcome::Pass
    }

    /// Called when the rule did not match; `result` carries the reason.
    fn eval_false(&self, rule: &Rule, data: &Value, result: &EvaluationResult) -> CallbackOutcome {
        let _ = (rule, data, result);
        CallbackOutcome::Fail
    }
}

impl<F> RuleCallback for F
where
    F: Fn(&Rule, &Value, &EvaluationResult) -> CallbackOutcome + Send + Sync,
{
    fn eval_true(&self, rule: &Rule, data: &Value) -> CallbackOutcome {
        self(rule, data, &EvaluationResult::pass())
    }

    fn eval_false(&self, rule: &Rule, data: &Value, result: &EvaluationResult) -> CallbackOutcome {
        self(rule, data, result)
    }
}

/// Apply a callback's decision to `result`.
pub(crate) fn apply(
    callback: &dyn RuleCallback,
    rule: &Rule,
    data: &Value,
    result: EvaluationResult,
) -> EvaluationResult {
    let outcome = if result.success {
        callback.eval_true(rule, data)
    } else {
        callback.eval_false(rule, data, &result)
    };
    let member_found = result.member_found;
    match outcome {
        CallbackOutcome::Pass => EvaluationResult::pass(),
        CallbackOutcome::Fail if !result.success => result,
        CallbackOutcome::Fail => EvaluationResult::fail(match &rule.name {
            Some(name) => format!("callback rejected ${name}"),
            None => "callback rejected rule".to_string(),
        }),
        CallbackOutcome::Reason(reason) => EvaluationResult::fail(reason),
    }
    .found(member_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Definition, ValueDef};
    use serde_json::json;

    struct Veto;

    impl RuleCallback for Veto {
        fn eval_true(&self, _: &Rule, _: &Value) -> CallbackOutcome {
            CallbackOutcome::Fail
        }
    }

    fn rule() -> Rule {
        Rule::new(Definition::Value(ValueDef::Integer)).named("n")
    }

    #[test]
    fn test_defaults_keep_result() {
        struct Quiet;
        impl RuleCallback for Quiet {}

        let passed = apply(&Quiet, &rule(), &json!(1), EvaluationResult::pass());
        assert!(passed.success);
        let failed = apply(&Quiet, &rule(), &json!("x"), EvaluationResult::fail("expected integer"));
        assert_eq!(failed.reason.as_deref(), Some("expected integer"));
    }

    #[test]
    fn test_veto_and_reason() {
        let vetoed = apply(&Veto, &rule(), &json!(1), EvaluationResult::pass());
        assert!(!vetoed.success);
        assert_eq!(vetoed.reason.as_deref(), Some("callback rejected $n"));

        let replaced = |_: &Rule, _: &Value, _: &EvaluationResult| CallbackOutcome::Reason("no".into());
        let result = apply(&replaced, &rule(), &json!(1), EvaluationResult::pass());
        assert_eq!(result.reason.as_deref(), Some("no"));
    }

    #[test]
    fn test_pass_flips_failure_and_keeps_member_found() {
        let accept = |_: &Rule, _: &Value, _: &EvaluationResult| CallbackOutcome::Pass;
        let result = apply(
            &accept,
            &rule(),
            &json!("x"),
            EvaluationResult::fail("wrong").found(true),
        );
        assert!(result.success);
        assert!(result.member_found);
    }
}
