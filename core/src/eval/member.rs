//! Member rules: one key/value pair of an object.

use super::{evaluate_rule, EvalContext, EvaluationResult, Subject};
use crate::rule::{MemberDef, Rule};
use serde_json::Value;

/// Evaluate a member rule against a key and its value.
///
/// `None` for both means the key is absent. The member's own `@{not}` is
/// left to the object evaluator, which applies it after repetition
/// accounting.
pub(super) fn evaluate(
    rule: &Rule,
    member: &MemberDef,
    key: Option<&str>,
    value: Option<&Value>,
    ctx: &mut EvalContext<'_>,
) -> EvaluationResult {
    ctx.frame(rule, Subject::Member(key, value), false, |ctx| match (key, value) {
        (Some(key), Some(value)) if member.matcher.matches(key) => {
            let result = evaluate_rule(&member.target, value, ctx, None);
            let result = if result.success {
                EvaluationResult::pass()
            } else {
                EvaluationResult::fail(format!(
                    "member {} has the wrong value: {}",
                    Value::String(key.to_string()),
                    result.reason.as_deref().unwrap_or("value mismatch")
                ))
            };
            result.found(true)
        }
        (Some(key), Some(_)) => EvaluationResult::fail(format!(
            "member name {} does not match {}",
            Value::String(key.to_string()),
            member.matcher
        )),
        _ => EvaluationResult::fail(format!("member {} not found", member.matcher)),
    })
}
