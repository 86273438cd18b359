//! Groups in value position: alternatives tried against one datum.

use super::{evaluate_rule, EvalContext, EvaluationResult};
use crate::rule::{Combinator, Item};
use serde_json::Value;

/// Try each item against `data`, honoring the combinators.
///
/// The group's result is the last evaluated item's. Repetitions have no
/// meaning against a single value and are ignored.
pub(super) fn evaluate(items: &[Item], data: &Value, ctx: &mut EvalContext<'_>) -> EvaluationResult {
    let mut result: Option<EvaluationResult> = None;
    for item in items {
        if let Some(previous) = &result {
            match item.combinator {
                Some(Combinator::Choice) if previous.success => continue,
                Some(Combinator::Sequence) if !previous.success => break,
                _ => {}
            }
        }
        result = Some(evaluate_rule(&item.rule, data, ctx, None));
    }
    result.unwrap_or_else(EvaluationResult::pass)
}
