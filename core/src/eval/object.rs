//! Object rules.
//!
//! Each item claims keys through [`ObjectBehavior::checked`]:
//!
//! - an exact-name member looks its key up directly
//! - a regex member scans the unclaimed keys in document order
//! - a group matches the whole object on a branch of the claims
//!
//! Unclaimed keys are allowed. "No other members" is written as a negated
//! catch-all such as `@{not} // : any +`.

use super::{evaluate_rule, is_group, is_negated, member, Behavior, EvalContext, EvaluationResult, ObjectBehavior};
use crate::render::{elide, elide_json};
use crate::repetition::{Repetition, RepetitionError};
use crate::rule::{Combinator, Definition, Item, MemberMatcher};
use crate::{JSON_ELIDE_LEN, RULE_ELIDE_LEN};
use serde_json::{Map, Value};

pub(super) fn evaluate(
    items: &[Item],
    data: &Value,
    ctx: &mut EvalContext<'_>,
    inherited: Option<&mut ObjectBehavior>,
) -> EvaluationResult {
    let Value::Object(object) = data else {
        return EvaluationResult::fail(format!(
            "expected object but got {}",
            elide_json(data, JSON_ELIDE_LEN)
        ));
    };
    let mut own;
    let behavior = match inherited {
        Some(behavior) => behavior,
        None if items.is_empty() => {
            return if object.is_empty() {
                EvaluationResult::pass()
            } else {
                EvaluationResult::fail(format!(
                    "object with {} members where an empty object is expected",
                    object.len()
                ))
            };
        }
        None => {
            own = ObjectBehavior::new();
            &mut own
        }
    };

    let mut result: Option<EvaluationResult> = None;
    for item in items {
        if let Some(previous) = &result {
            match item.combinator {
                Some(Combinator::Choice) if previous.success => continue,
                Some(Combinator::Sequence) if !previous.success => return previous.clone(),
                _ => {}
            }
        }
        result = Some(if is_group(ctx.mapping(), &item.rule) {
            group_item(item, data, ctx, behavior)
        } else {
            member_item(item, object, ctx, behavior)
        });
    }
    result.unwrap_or_else(EvaluationResult::pass)
}

fn render(item: &Item) -> String {
    elide(&item.to_string(), RULE_ELIDE_LEN)
}

/// Match a group item against the whole object, up to its maximum.
fn group_item(
    item: &Item,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    behavior: &mut ObjectBehavior,
) -> EvaluationResult {
    let repetition = item.repetition();
    let negated = is_negated(ctx.mapping(), &item.rule);
    let mut count = 0;
    let mut failure = None;
    while repetition.allows_more(count) {
        let mut branch = behavior.clone();
        let result = evaluate_rule(&item.rule, data, ctx, Some(Behavior::Object(&mut branch)));
        if !result.success {
            failure = Some(result);
            break;
        }
        count += 1;
        if negated {
            break;
        }
        let claimed = branch.checked.len() > behavior.checked.len();
        behavior.merge(branch);
        if !claimed {
            count = count.max(repetition.min);
            break;
        }
    }
    match repetition.check(count) {
        Ok(()) => EvaluationResult::pass(),
        Err(RepetitionError::BelowMinimum) if count == 0 => failure.unwrap_or_else(|| {
            EvaluationResult::fail(format!("object does not contain {}", render(item)))
        }),
        Err(error) => shortfall(item, repetition, count, error),
    }
}

/// Match a member item, then apply its `@{not}` to the accounted result.
fn member_item(
    item: &Item,
    object: &Map<String, Value>,
    ctx: &mut EvalContext<'_>,
    behavior: &mut ObjectBehavior,
) -> EvaluationResult {
    let mapping = ctx.mapping();
    let Some((leaf, _)) = mapping.dereference(&item.rule) else {
        return EvaluationResult::fail(format!("cannot resolve {}", render(item)));
    };
    let Definition::Member(def) = &leaf.definition else {
        return EvaluationResult::fail(format!("{} is not a member rule", render(item)));
    };
    let repetition = item.repetition();
    let mut count = 0;
    let mut found = false;
    let mut failure: Option<EvaluationResult> = None;

    match &def.matcher {
        MemberMatcher::Name(name) => {
            let entry = object
                .get_key_value(name.as_str())
                .filter(|(key, _)| !behavior.checked.contains(key.as_str()));
            let result = match entry {
                Some((key, value)) => member::evaluate(leaf, def, Some(key), Some(value), ctx),
                None => member::evaluate(leaf, def, None, None, ctx),
            };
            found = result.member_found;
            if result.success {
                behavior.checked.insert(name.clone());
                count = 1;
            } else {
                failure = Some(result);
            }
        }
        MemberMatcher::Regex(_) => {
            for (key, value) in object {
                if !repetition.allows_more(count) {
                    break;
                }
                if behavior.checked.contains(key) || !def.matcher.matches(key) {
                    continue;
                }
                let result = member::evaluate(leaf, def, Some(key), Some(value), ctx);
                found |= result.member_found;
                if result.success {
                    behavior.checked.insert(key.clone());
                    count += 1;
                } else {
                    failure = Some(result);
                }
            }
        }
    }

    let accounted = if found && count == 0 && !repetition.forbids() {
        EvaluationResult::fail(format!(
            "object has {} with the wrong value: {}",
            render(item),
            failure
                .as_ref()
                .and_then(|f| f.reason.as_deref())
                .unwrap_or("value mismatch")
        ))
    } else {
        match repetition.check(count) {
            Ok(()) => EvaluationResult::pass(),
            Err(RepetitionError::BelowMinimum) if count == 0 => EvaluationResult::fail(match &failure {
                Some(EvaluationResult {
                    reason: Some(reason), ..
                }) => format!("object does not contain {}: {reason}", render(item)),
                _ => format!("object does not contain {}", render(item)),
            }),
            Err(error) => shortfall(item, repetition, count, error),
        }
    };
    let result = accounted.found(found);
    if is_negated(mapping, &item.rule) {
        result.negated(leaf)
    } else {
        result
    }
}

fn shortfall(item: &Item, repetition: Repetition, count: u32, error: RepetitionError) -> EvaluationResult {
    EvaluationResult::fail(match error {
        RepetitionError::BelowMinimum => format!(
            "object does not have enough {}: {count} of at least {}",
            render(item),
            repetition.min
        ),
        RepetitionError::AboveMaximum => format!("object has too many {}: {count}", render(item)),
        RepetitionError::StepMismatch => {
            format!("object has {count} of {}, off the repetition step", render(item))
        }
    })
}
