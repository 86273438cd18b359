//! Array rules.
//!
//! Ordered arrays walk a cursor: each item takes elements from the cursor
//! on, first `min` times (mandatory), then greedily up to `max`. Greedy
//! means taken elements are never given back, so a later item that needed
//! them fails instead of the engine retrying with fewer.
//!
//! Unordered arrays let each item claim any unclaimed elements. Claims are
//! shared through [`ArrayBehavior::checked`], so no element is counted twice.
//!
//! Group items match against the whole array through a branch of the
//! behavior, merged back only on success.

use super::{evaluate_rule, is_group, is_negated, ArrayBehavior, Behavior, EvalContext, EvaluationResult};
use crate::render::elide;
use crate::repetition::{Repetition, RepetitionError};
use crate::rule::{Combinator, Item, Rule};
use crate::RULE_ELIDE_LEN;
use serde_json::Value;
use std::ops::ControlFlow;

pub(super) fn evaluate(
    rule: &Rule,
    items: &[Item],
    data: &Value,
    ctx: &mut EvalContext<'_>,
    inherited: Option<&mut ArrayBehavior>,
) -> EvaluationResult {
    let Value::Array(elements) = data else {
        return EvaluationResult::fail(format!("expected array but got {}", kind_of(data)));
    };
    let mut own;
    let behavior = match inherited {
        Some(behavior) => behavior,
        None if items.is_empty() => {
            return if elements.is_empty() {
                EvaluationResult::pass()
            } else {
                EvaluationResult::fail(format!(
                    "array of {} items where an empty array is expected",
                    elements.len()
                ))
            };
        }
        None => {
            own = ArrayBehavior::new();
            &mut own
        }
    };
    if behavior.ordered && !rule.annotations.is_unordered() {
        ordered(items, elements, data, ctx, behavior)
    } else {
        unordered(items, elements, data, ctx, behavior)
    }
}

fn kind_of(data: &Value) -> &'static str {
    match data {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `Choice` after a success and `Sequence` after a failure end the item walk.
fn short_circuits(item: &Item, previous: Option<&EvaluationResult>) -> bool {
    match (item.combinator, previous) {
        (Some(Combinator::Choice), Some(previous)) => previous.success,
        (Some(Combinator::Sequence), Some(previous)) => !previous.success,
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Ordered
// ═══════════════════════════════════════════════════════════════════════════════

fn ordered(
    items: &[Item],
    elements: &[Value],
    data: &Value,
    ctx: &mut EvalContext<'_>,
    behavior: &mut ArrayBehavior,
) -> EvaluationResult {
    let mut cursor = behavior.last_index;
    let mut result: Option<EvaluationResult> = None;
    for item in items {
        if short_circuits(item, result.as_ref()) {
            break;
        }
        let step = if is_group(ctx.mapping(), &item.rule) {
            ordered_group(item, data, ctx, behavior, &mut cursor)
        } else {
            ordered_element(item, elements, ctx, behavior, &mut cursor)
        };
        match step {
            ControlFlow::Continue(outcome) => result = Some(outcome),
            ControlFlow::Break(failure) => return failure,
        }
    }
    behavior.last_index = cursor;
    match result {
        Some(failure) if !failure.success => failure,
        _ if behavior.extra_prohibited && cursor < elements.len() => EvaluationResult::fail(format!(
            "more items in array than specified: {} of {} matched",
            cursor,
            elements.len()
        )),
        result => result.unwrap_or_else(EvaluationResult::pass),
    }
}

/// Match a plain item against elements at the cursor.
///
/// Breaks when the array runs out during the mandatory part.
fn ordered_element(
    item: &Item,
    elements: &[Value],
    ctx: &mut EvalContext<'_>,
    behavior: &mut ArrayBehavior,
    cursor: &mut usize,
) -> ControlFlow<EvaluationResult, EvaluationResult> {
    let repetition = item.repetition();
    let mut count = 0;
    while count < repetition.min {
        let Some(element) = elements.get(*cursor) else {
            return ControlFlow::Break(EvaluationResult::fail(format!(
                "array is not large enough for {}",
                render(item)
            )));
        };
        let result = evaluate_rule(&item.rule, element, ctx, None);
        if !result.success {
            return ControlFlow::Continue(result);
        }
        behavior.checked.insert(*cursor);
        *cursor += 1;
        count += 1;
    }
    while repetition.allows_more(count) {
        let Some(element) = elements.get(*cursor) else {
            break;
        };
        if !evaluate_rule(&item.rule, element, ctx, None).success {
            break;
        }
        behavior.checked.insert(*cursor);
        *cursor += 1;
        count += 1;
    }
    ControlFlow::Continue(tally(item, repetition, count))
}

/// Match a group item against the array from the cursor on.
fn ordered_group(
    item: &Item,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    behavior: &mut ArrayBehavior,
    cursor: &mut usize,
) -> ControlFlow<EvaluationResult, EvaluationResult> {
    let repetition = item.repetition();
    let negated = is_negated(ctx.mapping(), &item.rule);
    let len = data.as_array().map_or(0, Vec::len);
    let mut count = 0;
    while repetition.allows_more(count) {
        let mandatory = count < repetition.min;
        if *cursor >= len {
            if mandatory {
                return ControlFlow::Break(EvaluationResult::fail(format!(
                    "array is not large enough for {}",
                    render(item)
                )));
            }
            break;
        }
        let mut branch = behavior.branch(*cursor, true);
        let result = evaluate_rule(&item.rule, data, ctx, Some(Behavior::Array(&mut branch)));
        if !result.success {
            if mandatory {
                return ControlFlow::Continue(result);
            }
            break;
        }
        count += 1;
        if negated {
            break;
        }
        let advanced = branch.last_index > *cursor;
        *cursor = branch.last_index;
        behavior.merge(branch);
        if !advanced {
            count = count.max(repetition.min);
            break;
        }
    }
    ControlFlow::Continue(tally(item, repetition, count))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Unordered
// ═══════════════════════════════════════════════════════════════════════════════

fn unordered(
    items: &[Item],
    elements: &[Value],
    data: &Value,
    ctx: &mut EvalContext<'_>,
    behavior: &mut ArrayBehavior,
) -> EvaluationResult {
    let mut highest = behavior.last_index;
    let mut result: Option<EvaluationResult> = None;
    for item in items {
        if short_circuits(item, result.as_ref()) {
            break;
        }
        let repetition = item.repetition();
        let count = if is_group(ctx.mapping(), &item.rule) {
            unordered_group(item, data, ctx, behavior, &mut highest)
        } else {
            unordered_element(item, elements, ctx, behavior, &mut highest)
        };
        result = Some(tally(item, repetition, count));
    }
    behavior.last_index = highest;
    match result {
        Some(failure) if !failure.success => failure,
        _ if behavior.extra_prohibited && behavior.checked.len() < elements.len() => {
            EvaluationResult::fail(format!(
                "more items in array than specified: {} of {} matched",
                behavior.checked.len(),
                elements.len()
            ))
        }
        result => result.unwrap_or_else(EvaluationResult::pass),
    }
}

/// Claim unclaimed elements for a plain item, up to its maximum.
fn unordered_element(
    item: &Item,
    elements: &[Value],
    ctx: &mut EvalContext<'_>,
    behavior: &mut ArrayBehavior,
    highest: &mut usize,
) -> u32 {
    let repetition = item.repetition();
    let mut count = 0;
    for (index, element) in elements.iter().enumerate().skip(behavior.last_index) {
        if !repetition.allows_more(count) {
            break;
        }
        if behavior.checked.contains(&index) {
            continue;
        }
        if evaluate_rule(&item.rule, element, ctx, None).success {
            behavior.checked.insert(index);
            *highest = (*highest).max(index);
            count += 1;
        }
    }
    count
}

/// Let a group item claim elements, up to its maximum number of matches.
fn unordered_group(
    item: &Item,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    behavior: &mut ArrayBehavior,
    highest: &mut usize,
) -> u32 {
    let repetition = item.repetition();
    let negated = is_negated(ctx.mapping(), &item.rule);
    let mut count = 0;
    while repetition.allows_more(count) {
        let mut branch = behavior.branch(*highest, false);
        if !evaluate_rule(&item.rule, data, ctx, Some(Behavior::Array(&mut branch))).success {
            break;
        }
        count += 1;
        if negated {
            break;
        }
        let claimed = branch.checked.len() > behavior.checked.len();
        *highest = (*highest).max(branch.last_index);
        behavior.merge(branch);
        if !claimed {
            count = count.max(repetition.min);
            break;
        }
    }
    count
}

// ═══════════════════════════════════════════════════════════════════════════════
// Repetition accounting
// ═══════════════════════════════════════════════════════════════════════════════

fn render(item: &Item) -> String {
    elide(&item.to_string(), RULE_ELIDE_LEN)
}

fn tally(item: &Item, repetition: Repetition, count: u32) -> EvaluationResult {
    match repetition.check(count) {
        Ok(()) => EvaluationResult::pass(),
        Err(RepetitionError::BelowMinimum) if count == 0 => {
            EvaluationResult::fail(format!("array does not contain {}", render(item)))
        }
        Err(RepetitionError::BelowMinimum) => EvaluationResult::fail(format!(
            "array does not have enough {}: {count} of at least {}",
            render(item),
            repetition.min
        )),
        Err(RepetitionError::AboveMaximum) => EvaluationResult::fail(format!(
            "array has too many {}: {count}",
            render(item)
        )),
        Err(RepetitionError::StepMismatch) => EvaluationResult::fail(format!(
            "array has {count} of {}, off the repetition step",
            render(item)
        )),
    }
}
