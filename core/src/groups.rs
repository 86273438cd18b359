//! Group legality: where groups may appear and what they may hold.
//!
//! A group takes on the role of the place it is used in:
//!
//! | Used as                  | May contain                                       |
//! |--------------------------|---------------------------------------------------|
//! | member value             | values, value groups; `\|` only                    |
//! | array item               | anything but members                              |
//! | object item              | members and member groups                         |
//!
//! Named groups are checked at every place they are referenced, against
//! the role of that place.

use crate::mapping::Mapping;
use crate::render::elide;
use crate::rule::{Combinator, Definition, Item, Rule, RuleTree};
use crate::{JcrError, RULE_ELIDE_LEN};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Role {
    Value,
    Array,
    Object,
}

/// Check every group in the tree against the role of the place it is used in.
///
/// # Errors
///
/// Returns [`JcrError::IllegalGroup`] for the first violation, carrying the
/// offending rule's rendering and position.
pub fn check_groups(tree: &RuleTree, mapping: &Mapping) -> Result<(), JcrError> {
    let mut checker = Checker {
        mapping,
        checked: HashSet::new(),
    };
    for rule in tree.rules() {
        checker.rule(rule)?;
    }
    Ok(())
}

struct Checker<'a> {
    mapping: &'a Mapping,
    /// Named groups already checked in a role.
    checked: HashSet<(String, Role)>,
}

fn illegal(rule: &Rule, reason: impl Into<String>) -> JcrError {
    JcrError::IllegalGroup {
        rule: elide(&rule.to_string(), RULE_ELIDE_LEN),
        reason: reason.into(),
        line: rule.position.line,
        column: rule.position.column,
    }
}

impl<'a> Checker<'a> {
    /// Walk a rule, checking each container's items in the container's role.
    fn rule(&mut self, rule: &'a Rule) -> Result<(), JcrError> {
        match &rule.definition {
            Definition::Array(items) => {
                for item in items {
                    self.place(&item.rule, Role::Array)?;
                    self.rule(&item.rule)?;
                }
            }
            Definition::Object(items) => {
                for item in items {
                    self.place(&item.rule, Role::Object)?;
                    self.rule(&item.rule)?;
                }
            }
            Definition::Member(member) => {
                self.place(&member.target, Role::Value)?;
                self.rule(&member.target)?;
            }
            Definition::Group(items) => {
                for item in items {
                    self.rule(&item.rule)?;
                }
            }
            Definition::Value(_) | Definition::TargetReference(_) => {}
        }
        Ok(())
    }

    /// Check a rule used directly in a role (an item or a member value).
    fn place(&mut self, rule: &'a Rule, role: Role) -> Result<(), JcrError> {
        let target = match &rule.definition {
            Definition::TargetReference(name) => match self.mapping.dereference(rule) {
                Some((leaf, _)) => {
                    if let Definition::Group(_) = leaf.definition {
                        if !self.checked.insert((name.clone(), role)) {
                            return Ok(());
                        }
                    }
                    leaf
                }
                None => return Ok(()),
            },
            _ => rule,
        };
        match (&target.definition, role) {
            (Definition::Group(items), _) => self.group(target, items, role),
            (Definition::Member(_), Role::Array) => Err(illegal(rule, "member rule in an array")),
            (Definition::Member(_), Role::Value) => {
                Err(illegal(rule, "member rule as a member value"))
            }
            (Definition::Value(_) | Definition::Array(_) | Definition::Object(_), Role::Object) => {
                Err(illegal(
                    rule,
                    format!("{} rule in an object", target.definition.kind_name()),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Check a group's items against `role`.
    fn group(&mut self, group: &'a Rule, items: &'a [Item], role: Role) -> Result<(), JcrError> {
        for item in items {
            if role == Role::Value && item.combinator == Some(Combinator::Sequence) {
                return Err(illegal(group, "AND combinator among value alternatives"));
            }
            let inner = &item.rule;
            let kind = match self.mapping.dereference(inner) {
                Some((leaf, _)) => &leaf.definition,
                None => continue,
            };
            match (kind, role) {
                (Definition::Group(_), _) => self.place(inner, role)?,
                (Definition::Member(_), Role::Array) => {
                    return Err(illegal(group, "member rule in a group used as an array item"));
                }
                (Definition::Member(_) | Definition::Array(_) | Definition::Object(_), Role::Value) => {
                    return Err(illegal(
                        group,
                        format!("{} rule among value alternatives", kind.kind_name()),
                    ));
                }
                (Definition::Value(_) | Definition::Array(_) | Definition::Object(_), Role::Object) => {
                    return Err(illegal(
                        group,
                        format!("{} rule in a group used as an object item", kind.kind_name()),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
