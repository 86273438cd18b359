//! Ruleset context: ingestion, overrides, callbacks and root evaluation.
//!
//! A [`Context`] owns everything one ruleset needs to validate data:
//!
//! - the [`Mapping`] of named rules, including imported ones
//! - the [`Root`]s to try, in discovery order
//! - callbacks registered by rule name
//! - the failures of the last [`Context::evaluate`] call
//!
//! Ingestion runs once, through [`ContextBuilder::ingest`]:
//!
//! ```text
//! parse → qualify(alias) → resolve names → find roots → directives/imports
//!       → check references → check groups
//! ```
//!
//! Evaluation never mutates the mapping. [`Context::with_override`] builds a
//! new context; [`Context::override_in_place`] needs `&mut self`, so the
//! borrow checker keeps it away from concurrent evaluations.

use crate::callback::RuleCallback;
use crate::directives::process_directives;
use crate::eval::{evaluate_rule, EvalContext, EvaluationResult};
use crate::groups::check_groups;
use crate::loader::{FileLoader, RulesetLoader};
use crate::mapping::{check_references, resolve, Mapping};
use crate::parser::parse;
use crate::roots::{find_roots, Root};
use crate::rule::{Definition, RuleTree};
use crate::trace::{failure_report, EvalTrace, FailedRoot};
use crate::JcrError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Compilation
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed ruleset with its names, roots and imports resolved.
///
/// References and groups are not checked yet: an override is checked
/// against the mapping it is layered onto.
pub(crate) struct Ruleset {
    pub(crate) tree: RuleTree,
    pub(crate) id: Option<String>,
    pub(crate) mapping: Mapping,
    pub(crate) roots: Vec<Root>,
}

impl Ruleset {
    pub(crate) fn compile(
        text: &str,
        override_mode: bool,
        alias: Option<&str>,
        loader: &dyn RulesetLoader,
        depth: usize,
    ) -> Result<Self, JcrError> {
        let mut tree = parse(text)?;
        if let Some(alias) = alias {
            tree.qualify(alias);
        }
        let mut mapping = resolve(&tree, override_mode)?;
        let mut roots = find_roots(&tree);
        let directives = process_directives(&tree, loader, alias, override_mode, depth)?;
        mapping.merge(&directives.mapping, override_mode);
        roots.extend(directives.roots);
        Ok(Self {
            tree,
            id: directives.ruleset_id,
            mapping,
            roots,
        })
    }

    /// Run the structural checks against `mapping`.
    pub(crate) fn check(&self, mapping: &Mapping) -> Result<(), JcrError> {
        check_references(&self.tree, mapping)?;
        check_groups(&self.tree, mapping)
    }
}

/// Layer `overlay` roots over `base`.
///
/// A named root replaces the base root of the same name. A default root in
/// the overlay replaces the base default roots.
fn merge_roots(base: &mut Vec<Root>, overlay: Vec<Root>) {
    if overlay.iter().any(|root| root.is_default) {
        base.retain(|root| !root.is_default);
    }
    for root in overlay {
        let slot = root
            .name
            .as_ref()
            .and_then(|name| base.iter().position(|b| b.name.as_ref() == Some(name)));
        match slot {
            Some(index) => base[index] = root,
            None => base.push(root),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for ingesting a [`Context`].
///
/// ```
/// use jcr::prelude::*;
///
/// let loader = MemoryLoader::new().with("urn:net", "$port =: 0..65535");
/// let ctx = Context::builder()
///     .loader(loader)
///     .trace(true)
///     .ingest("# import urn:net as net\n[ $net.port + ]")
///     .unwrap();
/// assert!(ctx.mapping().contains("net.port"));
/// ```
pub struct ContextBuilder {
    override_mode: bool,
    alias: Option<String>,
    trace: bool,
    loader: Arc<dyn RulesetLoader>,
}

impl ContextBuilder {
    /// Create a builder with the defaults: no override, no alias, no trace,
    /// imports read from the filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self {
            override_mode: false,
            alias: None,
            trace: false,
            loader: Arc::new(FileLoader::new()),
        }
    }

    /// Let later rules replace earlier rules of the same name.
    #[must_use]
    pub fn override_mode(mut self, override_mode: bool) -> Self {
        self.override_mode = override_mode;
        self
    }

    /// Qualify every rule name with `alias.`.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Emit a `jcr::trace` debug event for every evaluator frame.
    #[must_use]
    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Fetch `# import` rulesets through `loader`.
    #[must_use]
    pub fn loader(mut self, loader: impl RulesetLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Ingest ruleset text.
    ///
    /// # Errors
    ///
    /// Returns the first structural error: parse errors, duplicate names,
    /// unresolved references, illegal groups, unsupported versions and
    /// failed imports.
    pub fn ingest(self, text: &str) -> Result<Context, JcrError> {
        let ruleset = Ruleset::compile(
            text,
            self.override_mode,
            self.alias.as_deref(),
            self.loader.as_ref(),
            0,
        )?;
        ruleset.check(&ruleset.mapping)?;
        debug!(
            rules = ruleset.mapping.len(),
            roots = ruleset.roots.len(),
            ruleset_id = ruleset.id.as_deref().unwrap_or(""),
            "ingested ruleset"
        );
        Ok(Context {
            id: ruleset.id,
            mapping: ruleset.mapping,
            roots: ruleset.roots,
            callbacks: HashMap::new(),
            alias: self.alias,
            trace: self.trace,
            loader: self.loader,
            failed_roots: Mutex::new(Vec::new()),
        })
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Context
// ═══════════════════════════════════════════════════════════════════════════════

/// An ingested ruleset, ready to evaluate JSON values.
///
/// `evaluate` takes `&self`; a context can be shared across threads and
/// used concurrently. Only [`failure_report`](Self::failure_report) is
/// shared between calls: it describes whichever call finished last. Use
/// [`evaluate_with_trace`](Self::evaluate_with_trace) for a per-call report.
pub struct Context {
    id: Option<String>,
    mapping: Mapping,
    roots: Vec<Root>,
    callbacks: HashMap<String, Arc<dyn RuleCallback>>,
    alias: Option<String>,
    trace: bool,
    loader: Arc<dyn RulesetLoader>,
    failed_roots: Mutex<Vec<FailedRoot>>,
}

impl Context {
    /// Ingest ruleset text with the default settings.
    ///
    /// # Errors
    ///
    /// See [`ContextBuilder::ingest`].
    pub fn new(text: &str) -> Result<Self, JcrError> {
        ContextBuilder::new().ingest(text)
    }

    /// Start configuring a context.
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// The `# ruleset-id`, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Named rules, including imported ones.
    #[must_use]
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Roots in the order `evaluate` tries them.
    #[must_use]
    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    /// Run `callback` every time the rule named `name` is evaluated.
    ///
    /// Replaces any callback already registered for `name`.
    pub fn register_callback(&mut self, name: impl Into<String>, callback: impl RuleCallback + 'static) {
        self.callbacks.insert(name.into(), Arc::new(callback));
    }

    /// Evaluate `data`.
    ///
    /// With `root`, only the rule of that name is tried. Otherwise every
    /// root is tried in discovery order and the first success wins; if all
    /// fail, the last result is returned and [`failure_report`](Self::failure_report)
    /// describes every attempt.
    ///
    /// # Errors
    ///
    /// - [`JcrError::NoSuchRoot`] when `root` names no rule
    /// - [`JcrError::RootIsMemberRule`] when `root` names a member rule
    /// - [`JcrError::NoRoots`] when no `root` is given and the ruleset has none
    pub fn evaluate(&self, data: &Value, root: Option<&str>) -> Result<EvaluationResult, JcrError> {
        let trace = self.evaluate_with_trace(data, root)?;
        *self
            .failed_roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = trace.failed_roots;
        Ok(trace.result)
    }

    /// Evaluate `data` and return the failures alongside the result.
    ///
    /// Does not touch the context's stored failures.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate).
    pub fn evaluate_with_trace(&self, data: &Value, root: Option<&str>) -> Result<EvalTrace, JcrError> {
        let requested;
        let roots: &[Root] = match root {
            Some(name) => {
                let rule = self.mapping.get(name).ok_or_else(|| JcrError::NoSuchRoot {
                    name: name.to_string(),
                })?;
                let is_member = self
                    .mapping
                    .dereference(rule)
                    .is_some_and(|(leaf, _)| matches!(leaf.definition, Definition::Member(_)));
                if is_member {
                    return Err(JcrError::RootIsMemberRule {
                        name: name.to_string(),
                    });
                }
                requested = [Root::named(Arc::clone(rule), name)];
                &requested
            }
            None if self.roots.is_empty() => return Err(JcrError::NoRoots),
            None => &self.roots,
        };

        let mut failed_roots = Vec::new();
        let mut last = EvaluationResult::pass();
        for root in roots {
            let rule = root
                .name
                .as_deref()
                .and_then(|name| self.mapping.get(name))
                .unwrap_or(&root.rule);
            let mut ctx = EvalContext::new(&self.mapping, &self.callbacks).traced(self.trace);
            let result = evaluate_rule(rule, data, &mut ctx, None);
            debug!(
                root = root.name.as_deref().unwrap_or(""),
                line = rule.position.line,
                success = result.success,
                "evaluated root"
            );
            if result.success {
                return Ok(EvalTrace {
                    result,
                    failed_roots: Vec::new(),
                });
            }
            failed_roots.push(FailedRoot {
                name: root.name.clone(),
                line: rule.position.line,
                levels: ctx.take_failures(),
            });
            last = result;
        }
        Ok(EvalTrace {
            result: last,
            failed_roots,
        })
    }

    /// Failures of the last [`evaluate`](Self::evaluate) call, per attempted root.
    #[must_use]
    pub fn failed_roots(&self) -> Vec<FailedRoot> {
        self.failed_roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Render the failures of the last [`evaluate`](Self::evaluate) call.
    ///
    /// Empty after a success.
    #[must_use]
    pub fn failure_report(&self) -> Vec<String> {
        failure_report(&self.failed_roots.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Layer another ruleset over this one and return the result.
    ///
    /// Rules and roots of `text` replace those of the same name; callbacks
    /// carry over. The receiver is unchanged.
    ///
    /// # Errors
    ///
    /// See [`ContextBuilder::ingest`]. References in `text` may point at
    /// rules of the receiver.
    pub fn with_override(&self, text: &str) -> Result<Self, JcrError> {
        let mut ctx = self.clone();
        ctx.override_in_place(text)?;
        Ok(ctx)
    }

    /// Layer another ruleset over this one, in place.
    ///
    /// # Errors
    ///
    /// Same as [`with_override`](Self::with_override). On error the context
    /// is unchanged.
    pub fn override_in_place(&mut self, text: &str) -> Result<(), JcrError> {
        let overlay = Ruleset::compile(text, true, self.alias.as_deref(), self.loader.as_ref(), 0)?;
        let mut mapping = self.mapping.clone();
        mapping.merge(&overlay.mapping, true);
        overlay.check(&mapping)?;
        debug!(
            rules = overlay.mapping.len(),
            roots = overlay.roots.len(),
            "applied override"
        );
        self.mapping = mapping;
        merge_roots(&mut self.roots, overlay.roots);
        if self.id.is_none() {
            self.id = overlay.id;
        }
        Ok(())
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            mapping: self.mapping.clone(),
            roots: self.roots.clone(),
            callbacks: self.callbacks.clone(),
            alias: self.alias.clone(),
            trace: self.trace,
            loader: Arc::clone(&self.loader),
            failed_roots: Mutex::new(self.failed_roots()),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("rules", &self.mapping.len())
            .field("roots", &self.roots.len())
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_first_successful_root_wins() {
        let ctx = Context::new(
            r#"@{root} $ints = [ integer * ]
               @{root} $strs = [ string * ]"#,
        )
        .unwrap();
        assert_eq!(ctx.roots().len(), 2);
        assert!(ctx.evaluate(&json!(["a", "b"]), None).unwrap().success);
        assert!(ctx.failure_report().is_empty());

        assert!(!ctx.evaluate(&json!([1, "b"]), None).unwrap().success);
        let failed = ctx.failed_roots();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].name.as_deref(), Some("ints"));
        assert_eq!(failed[1].name.as_deref(), Some("strs"));
    }

    #[test]
    fn test_requested_root() {
        let ctx = Context::new(r#"$m = "a" : integer $v = [ integer ] [ string ]"#).unwrap();
        assert!(ctx.evaluate(&json!([1]), Some("v")).unwrap().success);
        assert!(!ctx.evaluate(&json!([1]), None).unwrap().success);
        assert_eq!(
            ctx.evaluate(&json!(1), Some("nope")).unwrap_err(),
            JcrError::NoSuchRoot { name: "nope".into() }
        );
        assert_eq!(
            ctx.evaluate(&json!(1), Some("m")).unwrap_err(),
            JcrError::RootIsMemberRule { name: "m".into() }
        );
    }

    #[test]
    fn test_no_roots() {
        let ctx = Context::new("$v =: integer").unwrap();
        assert_eq!(ctx.evaluate(&json!(1), None).unwrap_err(), JcrError::NoRoots);
        assert!(ctx.evaluate(&json!(1), Some("v")).unwrap().success);
    }

    #[test]
    fn test_report_headings() {
        let ctx = Context::new("[ 0..2 ]").unwrap();
        ctx.evaluate(&json!(["bar"]), None).unwrap();
        assert_eq!(ctx.failure_report()[0], "- Failures for root rule at line 1");

        let ctx = Context::new("$root = [ 0..2 ]").unwrap();
        ctx.evaluate(&json!(["bar"]), Some("root")).unwrap();
        assert_eq!(ctx.failure_report()[0], "- Failures for root rule named 'root'");

        let ctx = Context::new("@{root} $root = [ 0..2 ]").unwrap();
        ctx.evaluate(&json!(["bar"]), None).unwrap();
        assert_eq!(ctx.failure_report()[0], "- Failures for root rule named 'root'");
    }

    #[test]
    fn test_override_does_not_touch_receiver() {
        let base = Context::new("[ $n * ] $n =: 0..2").unwrap();
        let data = json!([1, 2]);
        let overridden = base.with_override("$n =: 0..1").unwrap();

        assert!(base.evaluate(&data, None).unwrap().success);
        assert!(!overridden.evaluate(&data, None).unwrap().success);

        let mut in_place = base.clone();
        in_place.override_in_place("$n =: 0..1").unwrap();
        assert_eq!(
            in_place.evaluate(&data, None).unwrap(),
            overridden.evaluate(&data, None).unwrap()
        );
    }

    #[test]
    fn test_override_replaces_roots() {
        let base = Context::new("@{root} $r = [ integer ] [ string ]").unwrap();
        let over = base.with_override("@{root} $r = [ boolean ] [ null ]").unwrap();
        assert_eq!(over.roots().len(), 2);
        assert!(over.evaluate(&json!([true]), None).unwrap().success);
        assert!(over.evaluate(&json!([null]), None).unwrap().success);
        assert!(!over.evaluate(&json!(["s"]), None).unwrap().success);
    }

    #[test]
    fn test_failed_override_leaves_context_unchanged() {
        let mut ctx = Context::new("[ $n ] $n =: integer").unwrap();
        assert!(ctx.override_in_place("$n = [ $missing ]").is_err());
        assert!(ctx.evaluate(&json!([1]), None).unwrap().success);
    }

    #[test]
    fn test_duplicates_and_override_mode() {
        let text = "$n =: integer $n =: string [ $n ]";
        assert!(matches!(
            Context::new(text).unwrap_err(),
            JcrError::DuplicateRuleName { .. }
        ));
        let ctx = Context::builder().override_mode(true).ingest(text).unwrap();
        assert!(ctx.evaluate(&json!(["s"]), None).unwrap().success);
    }

    #[test]
    fn test_alias_and_imports() {
        let loader = MemoryLoader::new().with("urn:t", "$port =: 0..65535");
        let ctx = Context::builder()
            .alias("app")
            .loader(loader)
            .ingest("# import urn:t as t\n$ports = [ $t.port + ]")
            .unwrap();
        assert!(ctx.mapping().contains("app.ports"));
        assert!(ctx.mapping().contains("app.t.port"));
        assert!(ctx.evaluate(&json!([80, 443]), Some("app.ports")).unwrap().success);
    }

    #[test]
    fn test_callbacks_survive_override() {
        use crate::callback::CallbackOutcome;

        let mut ctx = Context::new("[ $n * ] $n =: integer").unwrap();
        ctx.register_callback("n", |_: &crate::Rule, data: &Value, _: &EvaluationResult| {
            if data.as_i64() == Some(13) {
                CallbackOutcome::Reason("unlucky".into())
            } else {
                CallbackOutcome::Pass
            }
        });
        assert!(!ctx.evaluate(&json!([1, 13]), None).unwrap().success);
        let over = ctx.with_override("$n =: 0..100").unwrap();
        assert!(!over.evaluate(&json!([1, 13]), None).unwrap().success);
        assert!(over.evaluate(&json!([1, 14]), None).unwrap().success);
    }

    #[test]
    fn test_evaluate_with_trace_is_per_call() {
        let ctx = Context::new(r#"[ "foo" | "bar" ]"#).unwrap();
        let trace = ctx.evaluate_with_trace(&json!(["baz"]), None).unwrap();
        assert!(!trace.result.success);
        assert_eq!(trace.failed_roots[0].failure_count(), 3);
        assert!(ctx.failure_report().is_empty());
        assert_eq!(trace.failure_report()[0], "- Failures for root rule at line 1");
    }
}
