//! Name resolution: the rule arena and the reference checker.

use crate::rule::{Definition, Rule, RuleTree};
use crate::JcrError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Flat name → rule arena.
///
/// Rules reference each other by name and are looked up here at evaluation
/// time, so mutually recursive rules never expand eagerly. Imported rules
/// live in the same namespace under `alias.name`.
///
/// # INV (Dijkstra): a mapping is never mutated while an evaluation borrows it.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    rules: HashMap<String, Arc<Rule>>,
}

impl Mapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Rule>> {
        self.rules.get(name)
    }

    /// Returns `true` if a rule with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Number of named rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Insert a named rule, replacing any rule of the same name.
    ///
    /// Unnamed rules are ignored.
    pub fn insert(&mut self, rule: Arc<Rule>) {
        if let Some(name) = &rule.name {
            self.rules.insert(name.clone(), rule);
        }
    }

    /// Merge `other` into `self`.
    ///
    /// With `replace`, entries of `other` win on collision; otherwise the
    /// existing entries are kept.
    pub fn merge(&mut self, other: &Mapping, replace: bool) {
        for (name, rule) in &other.rules {
            if replace || !self.rules.contains_key(name) {
                self.rules.insert(name.clone(), Arc::clone(rule));
            }
        }
    }

    /// Follow a reference chain to the first non-reference rule.
    ///
    /// Also returns how many `@{not}` annotations sit on the references
    /// along the way (the leaf's own annotations are not counted).
    /// Returns `None` for a dangling reference or a reference cycle.
    #[must_use]
    pub fn dereference<'a>(&'a self, rule: &'a Rule) -> Option<(&'a Rule, usize)> {
        let mut current = rule;
        let mut nots = 0;
        let mut hops = 0;
        while let Definition::TargetReference(name) = &current.definition {
            if current.annotations.is_not() {
                nots += 1;
            }
            hops += 1;
            if hops > self.rules.len() {
                return None;
            }
            current = self.rules.get(name)?;
        }
        Some((current, nots))
    }
}

/// Build the name mapping for a tree.
///
/// # Errors
///
/// Returns [`JcrError::DuplicateRuleName`] when two rules share a name and
/// `override_allowed` is off. With it on, the later definition wins.
pub fn resolve(tree: &RuleTree, override_allowed: bool) -> Result<Mapping, JcrError> {
    let mut mapping = Mapping::new();
    for rule in tree.rules() {
        let Some(name) = &rule.name else { continue };
        if mapping.contains(name) && !override_allowed {
            return Err(JcrError::DuplicateRuleName {
                name: name.clone(),
                line: rule.position.line,
                column: rule.position.column,
            });
        }
        mapping.insert(Arc::new(rule.clone()));
    }
    debug!(rules = mapping.len(), override_allowed, "resolved rule names");
    Ok(mapping)
}

/// Check that every `$name` in the tree resolves.
///
/// # Errors
///
/// Returns [`JcrError::UnresolvedReference`] for the first dangling
/// reference, with the reference's position.
pub fn check_references(tree: &RuleTree, mapping: &Mapping) -> Result<(), JcrError> {
    let mut missing = None;
    for rule in tree.rules() {
        rule.walk(&mut |node| {
            if missing.is_some() {
                return;
            }
            if let Definition::TargetReference(name) = &node.definition {
                if !mapping.contains(name) {
                    missing = Some(JcrError::UnresolvedReference {
                        name: name.clone(),
                        line: node.position.line,
                        column: node.position.column,
                    });
                }
            }
        });
        if let Some(err) = missing.take() {
            return Err(err);
        }
    }
    Ok(())
}
