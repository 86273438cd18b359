//! Source-like rendering of rules for reasons, reports and structural errors.
//!
//! Rendering is not a pretty-printer: it normalizes spacing and drops
//! comments, but the output parses back to the same rule.

use crate::repetition::Repetition;
use crate::rule::{
    Annotation, Annotations, Combinator, Definition, Item, MemberDef, MemberMatcher, Rule,
    ValueDef,
};
use std::fmt::{self, Display, Formatter, Write};

/// Cap `text` at `max` characters, marking the cut with `...`.
#[must_use]
pub fn elide(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str(" ...");
    out
}

/// Render a JSON value compactly, elided to `max` characters.
#[must_use]
pub fn elide_json(value: &serde_json::Value, max: usize) -> String {
    elide(&value.to_string(), max)
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}${name} = ", self.annotations)?;
            if matches!(self.definition, Definition::Value(_)) {
                f.write_str(": ")?;
            }
            return write!(f, "{}", self.definition);
        }
        write!(f, "{}{}", self.annotations, self.definition)
    }
}

impl Display for Definition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Member(member) => write!(f, "{member}"),
            Self::Array(items) => write_items(f, "[", items, "]"),
            Self::Object(items) => write_items(f, "{", items, "}"),
            Self::Group(items) => write_items(f, "(", items, ")"),
            Self::TargetReference(name) => write!(f, "${name}"),
        }
    }
}

fn write_items(f: &mut Formatter<'_>, open: &str, items: &[Item], close: &str) -> fmt::Result {
    if items.is_empty() {
        return write!(f, "{open} {close}");
    }
    write!(f, "{open} ")?;
    for item in items {
        match item.combinator {
            Some(Combinator::Sequence) => f.write_str(", ")?,
            Some(Combinator::Choice) => f.write_str(" | ")?,
            None => {}
        }
        write!(f, "{item}")?;
    }
    write!(f, " {close}")
}

impl Display for Item {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)?;
        if let Some(repetition) = &self.repetition {
            write!(f, " {repetition}")?;
        }
        Ok(())
    }
}

impl Display for MemberDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.matcher, self.target)
    }
}

impl Display for MemberMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", serde_json::Value::from(name.as_str())),
            Self::Regex(pattern) => write!(f, "/{}/{}", pattern.source(), pattern.flags()),
        }
    }
}

impl Display for Annotations {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for annotation in self.iter() {
            write!(f, "{annotation} ")?;
        }
        Ok(())
    }
}

impl Display for Annotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Not => f.write_str("@{not}"),
            Self::Unordered => f.write_str("@{unordered}"),
            Self::Root => f.write_str("@{root}"),
            Self::Unknown { name, params: None } => write!(f, "@{{{name}}}"),
            Self::Unknown {
                name,
                params: Some(params),
            } => write!(f, "@{{{name} {params}}}"),
        }
    }
}

impl Display for Repetition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, Some(1)) => f.write_str("?")?,
            (1, None) => f.write_str("+")?,
            (0, None) => f.write_str("*")?,
            (min, Some(max)) if min == max => write!(f, "*{min}")?,
            (min, None) => write!(f, "*{min}..")?,
            (0, Some(max)) => write!(f, "*..{max}")?,
            (min, Some(max)) => write!(f, "*{min}..{max}")?,
        }
        if let Some(step) = self.step {
            write!(f, "%{step}")?;
        }
        Ok(())
    }
}

impl Display for ValueDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::Boolean => f.write_str("boolean"),
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
            Self::String => f.write_str("string"),
            Self::StringLiteral(s) => write!(f, "{}", serde_json::Value::from(s.as_str())),
            Self::Regex(pattern) => write!(f, "/{}/{}", pattern.source(), pattern.flags()),
            Self::Integer => f.write_str("integer"),
            Self::IntegerLiteral(n) => write!(f, "{n}"),
            Self::IntegerRange { min, max } => write_range(f, min.as_ref(), max.as_ref()),
            Self::SizedInteger { bits, signed } => {
                write!(f, "{}int{bits}", if *signed { "" } else { "u" })
            }
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::FloatLiteral(n) => write!(f, "{n:?}"),
            Self::FloatRange { min, max } => {
                let min = min.map(|n| format!("{n:?}"));
                let max = max.map(|n| format!("{n:?}"));
                write_range(f, min.as_ref(), max.as_ref())
            }
            Self::Ipv4 => f.write_str("ipv4"),
            Self::Ipv6 => f.write_str("ipv6"),
            Self::IpAddr => f.write_str("ipaddr"),
            Self::Fqdn => f.write_str("fqdn"),
            Self::Idn => f.write_str("idn"),
            Self::Uri => f.write_str("uri"),
            Self::UriScheme(scheme) => write!(f, "uri..{scheme}"),
            Self::UriTemplate(template) => write!(f, "uri..{}", template.source()),
            Self::Email => f.write_str("email"),
            Self::Phone => f.write_str("phone"),
            Self::Hex => f.write_str("hex"),
            Self::Base32 => f.write_str("base32"),
            Self::Base32Hex => f.write_str("base32hex"),
            Self::Base64 => f.write_str("base64"),
            Self::Base64Url => f.write_str("base64url"),
            Self::DateTime => f.write_str("datetime"),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::Enumeration(values) => {
                f.write_str("<")?;
                for value in values {
                    write!(f, " {value}")?;
                }
                f.write_str(" >")
            }
        }
    }
}

fn write_range<T: Display>(f: &mut Formatter<'_>, min: Option<&T>, max: Option<&T>) -> fmt::Result {
    let mut out = String::new();
    if let Some(min) = min {
        write!(out, "{min}")?;
    }
    out.push_str("..");
    if let Some(max) = max {
        write!(out, "{max}")?;
    }
    f.write_str(&out)
}
