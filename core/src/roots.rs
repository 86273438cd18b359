//! Root discovery: which rules are evaluation entry points.

use crate::rule::{Definition, Rule, RuleTree};
use std::sync::Arc;

/// An evaluation entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    /// The rule to evaluate.
    pub rule: Arc<Rule>,
    /// Set for `@{root}` on a named rule.
    pub name: Option<String>,
    /// Set for the unnamed top-level rule.
    pub is_default: bool,
}

impl Root {
    /// A root for an unnamed top-level rule.
    #[must_use]
    pub fn default_root(rule: Arc<Rule>) -> Self {
        Self {
            rule,
            name: None,
            is_default: true,
        }
    }

    /// A root for a named rule carrying `@{root}`.
    #[must_use]
    pub fn named(rule: Arc<Rule>, name: impl Into<String>) -> Self {
        Self {
            rule,
            name: Some(name.into()),
            is_default: false,
        }
    }

    /// A root for a rule nested inside another rule.
    #[must_use]
    pub fn nested(rule: Arc<Rule>) -> Self {
        Self {
            rule,
            name: None,
            is_default: false,
        }
    }

    /// Source line of the root rule.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.rule.position.line
    }
}

/// Find every root in declaration order, outer before inner.
///
/// - an unnamed top-level rule is the default root
/// - a named rule annotated `@{root}` is a named root
/// - any nested rule annotated `@{root}` is a nameless root
///
/// The search descends into every rule, including roots and member values,
/// so a root may contain further roots.
#[must_use]
pub fn find_roots(tree: &RuleTree) -> Vec<Root> {
    let mut roots = Vec::new();
    for rule in tree.rules() {
        match &rule.name {
            Some(name) if rule.annotations.is_root() => {
                roots.push(Root::named(Arc::new(rule.clone()), name.clone()));
            }
            Some(_) => {}
            None => roots.push(Root::default_root(Arc::new(rule.clone()))),
        }
        nested_roots(&rule.definition, &mut roots);
    }
    roots
}

fn nested_roots(definition: &Definition, roots: &mut Vec<Root>) {
    match definition {
        Definition::Member(member) => visit(&member.target, roots),
        Definition::Array(items) | Definition::Object(items) | Definition::Group(items) => {
            for item in items {
                visit(&item.rule, roots);
            }
        }
        Definition::Value(_) | Definition::TargetReference(_) => {}
    }
}

fn visit(rule: &Rule, roots: &mut Vec<Root>) {
    if rule.annotations.is_root() {
        roots.push(Root::nested(Arc::new(rule.clone())));
    }
    nested_roots(&rule.definition, roots);
}
