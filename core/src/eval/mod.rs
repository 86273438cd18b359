//! Evaluation engine: matches JSON values against rules.
//!
//! [`evaluate_rule`] dispatches on the rule's kind. Each kind has its own
//! evaluator module:
//!
//! - `array`: ordered cursor matching and unordered claiming
//! - `object`: member lookup, regex scans and group items
//! - `group`: value alternatives
//! - `member`: one key/value pair
//!
//! Containers thread an [`ArrayBehavior`] or [`ObjectBehavior`] through
//! group items. A group works on a branch of its parent's behavior and the
//! branch is merged back only when the group succeeds.
//!
//! Failures are values. A failing sub-rule never aborts its siblings; it
//! returns an [`EvaluationResult`] that the parent weighs.

mod array;
mod group;
mod member;
mod object;

use crate::callback::{self, RuleCallback};
use crate::mapping::Mapping;
use crate::render::{elide, elide_json};
use crate::rule::{Definition, Position, Rule, ValueDef};
use crate::trace::Failure;
use crate::{value, JSON_ELIDE_LEN, MAX_EVAL_DEPTH, REASON_ELIDE_LEN, RULE_ELIDE_LEN};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

static NULL: Value = Value::Null;

// ═══════════════════════════════════════════════════════════════════════════════
// Results and behaviors
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of evaluating a rule against data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    /// Whether the data matched.
    pub success: bool,
    /// Why it did not match.
    pub reason: Option<String>,
    /// For member rules: the key matched, whatever the value did.
    pub member_found: bool,
}

impl EvaluationResult {
    /// A match.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            success: true,
            reason: None,
            member_found: false,
        }
    }

    /// A mismatch with a reason.
    #[must_use]
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            member_found: false,
        }
    }

    /// Set `member_found` (builder pattern).
    #[must_use]
    pub fn found(mut self, member_found: bool) -> Self {
        self.member_found = member_found;
        self
    }

    /// Invert the outcome for `@{not}`.
    #[must_use]
    pub fn negated(self, rule: &Rule) -> Self {
        let result = if self.success {
            Self::fail(format!(
                "{} matched but is negated",
                elide(&rule.to_string(), RULE_ELIDE_LEN)
            ))
        } else {
            Self::pass()
        };
        result.found(self.member_found)
    }
}

/// Progress of an array match: which elements are taken, and where to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBehavior {
    /// Indices claimed so far.
    pub checked: BTreeSet<usize>,
    /// Ordered cursor, or the scan start for unordered groups.
    pub last_index: usize,
    /// Items match left to right.
    pub ordered: bool,
    /// Unclaimed elements left at the end are a failure.
    pub extra_prohibited: bool,
}

impl ArrayBehavior {
    /// Fresh progress for a top-level array rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            checked: BTreeSet::new(),
            last_index: 0,
            ordered: true,
            extra_prohibited: true,
        }
    }

    /// Copy for a group item starting at `start`.
    ///
    /// A branch never prohibits extras: the enclosing array decides that.
    #[must_use]
    pub fn branch(&self, start: usize, ordered: bool) -> Self {
        Self {
            checked: self.checked.clone(),
            last_index: start,
            ordered,
            extra_prohibited: false,
        }
    }

    /// Take over the claims of a successful branch.
    pub fn merge(&mut self, branch: Self) {
        self.checked.extend(branch.checked);
    }
}

impl Default for ArrayBehavior {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress of an object match: which keys are taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectBehavior {
    /// Keys claimed so far.
    pub checked: BTreeSet<String>,
}

impl ObjectBehavior {
    /// Fresh progress for a top-level object rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over the claims of a successful branch.
    pub fn merge(&mut self, branch: Self) {
        self.checked.extend(branch.checked);
    }
}

/// Live progress handed to a group evaluated as a container item.
#[derive(Debug)]
pub enum Behavior<'b> {
    /// The group sits in an array.
    Array(&'b mut ArrayBehavior),
    /// The group sits in an object.
    Object(&'b mut ObjectBehavior),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-call evaluation state.
///
/// Lives for exactly one evaluation of one root. The mapping and callbacks
/// are borrowed read-only, so concurrent evaluations each build their own
/// context over the same shared rules.
pub struct EvalContext<'a> {
    mapping: &'a Mapping,
    callbacks: &'a HashMap<String, Arc<dyn RuleCallback>>,
    trace: bool,
    depth: usize,
    stack: Vec<Position>,
    failures: Vec<Vec<Failure>>,
}

impl<'a> EvalContext<'a> {
    /// Create a context over a mapping and its callbacks.
    #[must_use]
    pub fn new(mapping: &'a Mapping, callbacks: &'a HashMap<String, Arc<dyn RuleCallback>>) -> Self {
        Self {
            mapping,
            callbacks,
            trace: false,
            depth: 0,
            stack: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Emit a `jcr::trace` event per evaluator frame (builder pattern).
    #[must_use]
    pub fn traced(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// The rules references resolve against.
    #[must_use]
    pub fn mapping(&self) -> &'a Mapping {
        self.mapping
    }

    /// Positions of the frames currently being evaluated, outermost first.
    #[must_use]
    pub fn stack(&self) -> &[Position] {
        &self.stack
    }

    /// Failures recorded so far, by depth.
    #[must_use]
    pub fn failures(&self) -> &[Vec<Failure>] {
        &self.failures
    }

    /// Take the recorded failures, dropping empty trailing depths.
    pub fn take_failures(&mut self) -> Vec<Vec<Failure>> {
        let mut failures = std::mem::take(&mut self.failures);
        while failures.last().is_some_and(Vec::is_empty) {
            failures.pop();
        }
        failures
    }

    /// Run one evaluator frame for `rule`.
    ///
    /// Applies `@{not}` when `negate` is set, then the rule's callback, then
    /// records the outcome at this frame's depth.
    fn frame(
        &mut self,
        rule: &Rule,
        subject: Subject<'_>,
        negate: bool,
        evaluate: impl FnOnce(&mut Self) -> EvaluationResult,
    ) -> EvaluationResult {
        let level = self.stack.len();
        self.stack.push(rule.position);
        let mut result = evaluate(self);
        if negate && rule.annotations.is_not() {
            result = result.negated(rule);
        }
        if let Some(hook) = rule.name.as_ref().and_then(|name| self.callbacks.get(name)) {
            result = callback::apply(hook.as_ref(), rule, subject.value(), result);
        }
        self.stack.pop();
        self.record(level, rule, &subject, &result);
        result
    }

    fn record(&mut self, level: usize, rule: &Rule, subject: &Subject<'_>, result: &EvaluationResult) {
        if self.trace {
            debug!(
                target: "jcr::trace",
                depth = level,
                line = rule.position.line,
                column = rule.position.column,
                rule = %elide(&rule.to_string(), RULE_ELIDE_LEN),
                data = %subject.render(),
                success = result.success,
                reason = result.reason.as_deref().unwrap_or(""),
                "evaluated rule"
            );
        }
        if result.success {
            self.failures.truncate(level + 1);
            return;
        }
        if self.failures.len() <= level {
            self.failures.resize_with(level + 1, Vec::new);
        }
        self.failures[level].push(Failure {
            json: subject.render(),
            rule: elide(&rule.to_string(), RULE_ELIDE_LEN),
            position: rule.position,
            reason: elide(result.reason.as_deref().unwrap_or("no reason"), REASON_ELIDE_LEN),
        });
    }
}

/// What a frame evaluated: a value, or an object member.
enum Subject<'d> {
    Value(&'d Value),
    Member(Option<&'d str>, Option<&'d Value>),
}

impl Subject<'_> {
    fn value(&self) -> &Value {
        match self {
            Self::Value(value) | Self::Member(_, Some(value)) => value,
            Self::Member(_, None) => &NULL,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Value(value) => elide_json(value, JSON_ELIDE_LEN),
            Self::Member(Some(key), Some(value)) => elide(
                &format!("{}: {value}", Value::String((*key).to_string())),
                JSON_ELIDE_LEN,
            ),
            Self::Member(..) => "(absent member)".to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Dispatch
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluate `rule` against `data`.
///
/// `behavior` is the live progress of an enclosing array or object when
/// `rule` is a group used as one of its items; the group then matches
/// against the whole container. Pass `None` everywhere else.
///
/// References resolve through the context's mapping and recurse with the
/// same data and behavior, so recursive rules re-enter the evaluator
/// instead of expanding. Recursion deeper than [`MAX_EVAL_DEPTH`] fails.
pub fn evaluate_rule(
    rule: &Rule,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    behavior: Option<Behavior<'_>>,
) -> EvaluationResult {
    if ctx.depth >= MAX_EVAL_DEPTH {
        return EvaluationResult::fail(format!(
            "evaluation deeper than {MAX_EVAL_DEPTH} rules at {}",
            rule.position
        ));
    }
    ctx.depth += 1;
    let result = dispatch(rule, data, ctx, behavior);
    ctx.depth -= 1;
    result
}

fn dispatch(
    rule: &Rule,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    behavior: Option<Behavior<'_>>,
) -> EvaluationResult {
    let subject = Subject::Value(data);
    match (&rule.definition, behavior) {
        (Definition::TargetReference(name), behavior) => {
            let mapping = ctx.mapping;
            let Some(target) = mapping.get(name) else {
                return EvaluationResult::fail(format!("no rule named ${name}"));
            };
            let result = evaluate_rule(target, data, ctx, behavior);
            if rule.annotations.is_not() {
                result.negated(rule)
            } else {
                result
            }
        }
        (Definition::Array(items) | Definition::Group(items), Some(Behavior::Array(progress))) => {
            ctx.frame(rule, subject, true, |ctx| {
                array::evaluate(rule, items, data, ctx, Some(progress))
            })
        }
        (Definition::Object(items) | Definition::Group(items), Some(Behavior::Object(progress))) => {
            ctx.frame(rule, subject, true, |ctx| {
                object::evaluate(items, data, ctx, Some(progress))
            })
        }
        (Definition::Value(def), _) => ctx.frame(rule, subject, true, |_| value_rule(def, data)),
        (Definition::Array(items), _) => {
            ctx.frame(rule, subject, true, |ctx| array::evaluate(rule, items, data, ctx, None))
        }
        (Definition::Object(items), _) => {
            ctx.frame(rule, subject, true, |ctx| object::evaluate(items, data, ctx, None))
        }
        (Definition::Group(items), _) => {
            ctx.frame(rule, subject, true, |ctx| group::evaluate(items, data, ctx))
        }
        (Definition::Member(_), _) => ctx.frame(rule, subject, true, |_| {
            EvaluationResult::fail("member rule evaluated outside of an object")
        }),
    }
}

fn value_rule(def: &ValueDef, data: &Value) -> EvaluationResult {
    match value::check(def, data) {
        Ok(()) => EvaluationResult::pass(),
        Err(expected) => EvaluationResult::fail(format!(
            "expected {expected} but got {}",
            elide_json(data, JSON_ELIDE_LEN)
        )),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Shared helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Returns `true` if `rule` is a group, directly or through references.
fn is_group(mapping: &Mapping, rule: &Rule) -> bool {
    mapping
        .dereference(rule)
        .is_some_and(|(leaf, _)| matches!(leaf.definition, Definition::Group(_)))
}

/// Returns `true` if an odd number of `@{not}` sit on `rule`, its
/// reference chain and the leaf it resolves to.
fn is_negated(mapping: &Mapping, rule: &Rule) -> bool {
    mapping
        .dereference(rule)
        .is_some_and(|(leaf, nots)| (nots + usize::from(leaf.annotations.is_not())) % 2 == 1)
}
