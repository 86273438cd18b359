//! Rule tree: the immutable data model every other component reads.
//!
//! A ruleset is an ordered list of [`Node`]s: directives and rules. A
//! [`Rule`] carries an optional name, its [`Annotations`], a [`Definition`]
//! and the source [`Position`] it was parsed from.
//!
//! # Shape
//!
//! - [`Definition::Value`]: a primitive check ([`ValueDef`])
//! - [`Definition::Member`]: key matcher + value rule, only legal inside objects
//! - [`Definition::Array`] / [`Definition::Object`] / [`Definition::Group`]: item lists
//! - [`Definition::TargetReference`]: a named rule, resolved through the mapping
//!
//! Items in a list are joined by [`Combinator`] edges. The combinator of an
//! item links it to the item before it, so the first item never has one.

use crate::repetition::Repetition;
use regex::Regex;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Positions
// ═══════════════════════════════════════════════════════════════════════════════

/// Source location of a rule node (1-based line and column, 0-based byte offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number (in characters), starting at 1.
    pub column: u32,
    /// Byte offset from the start of the ruleset text.
    pub offset: usize,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tree
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed ruleset: directives and rules in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleTree {
    /// Top-level nodes in document order.
    pub nodes: Vec<Node>,
}

/// A top-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A `#` directive line.
    Directive(Directive),
    /// A named rule or an unnamed (default root) rule.
    Rule(Rule),
}

impl RuleTree {
    /// Create a tree from nodes.
    #[must_use]
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// All top-level rules, named and unnamed.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Rule(rule) => Some(rule),
            Node::Directive(_) => None,
        })
    }

    /// All directives in document order.
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Directive(directive) => Some(directive),
            Node::Rule(_) => None,
        })
    }

    /// Prefix every rule name and every reference with `alias.`.
    ///
    /// Used when a ruleset is ingested under an import alias: the merged
    /// mapping stays flat and references inside the imported ruleset keep
    /// pointing at their own rules.
    pub fn qualify(&mut self, alias: &str) {
        for node in &mut self.nodes {
            if let Node::Rule(rule) = node {
                if let Some(name) = &rule.name {
                    rule.name = Some(format!("{alias}.{name}"));
                }
                rule.qualify_references(alias);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Directives
// ═══════════════════════════════════════════════════════════════════════════════

/// A directive line and where it appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// What the directive says.
    pub kind: DirectiveKind,
    /// Where the `#` was.
    pub position: Position,
}

/// The directives the language defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `# jcr-version major.minor [+ extension ...]`
    JcrVersion {
        /// Major version.
        major: u32,
        /// Minor version.
        minor: u32,
        /// Named extensions following `+`.
        extensions: Vec<String>,
    },
    /// `# ruleset-id id`
    RulesetId(String),
    /// `# import uri [as alias]`
    Import {
        /// Where to fetch the ruleset from.
        uri: String,
        /// Prefix for the imported rule names.
        alias: Option<String>,
    },
    /// Any other directive; kept for completeness, ignored by processing.
    Unknown {
        /// Directive name.
        name: String,
        /// Raw parameters after the name.
        params: Option<String>,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rules
// ═══════════════════════════════════════════════════════════════════════════════

/// A rule node.
///
/// Top-level rules may be named; rules nested in items and member targets
/// never are.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// `Some` for `$name = ...` rules.
    pub name: Option<String>,
    /// Annotations prefixing the rule.
    pub annotations: Annotations,
    /// What the rule matches.
    pub definition: Definition,
    /// Where the rule starts in the source.
    pub position: Position,
}

impl Rule {
    /// Create an unnamed, unannotated rule.
    #[must_use]
    pub fn new(definition: Definition) -> Self {
        Self {
            name: None,
            annotations: Annotations::default(),
            definition,
            position: Position::default(),
        }
    }

    /// Give the rule a name (builder pattern).
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an annotation (builder pattern).
    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Set the source position (builder pattern).
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Returns `true` for member rules.
    #[must_use]
    pub fn is_member(&self) -> bool {
        matches!(self.definition, Definition::Member(_))
    }

    fn qualify_references(&mut self, alias: &str) {
        match &mut self.definition {
            Definition::TargetReference(name) => *name = format!("{alias}.{name}"),
            Definition::Member(member) => member.target.qualify_references(alias),
            Definition::Array(items) | Definition::Object(items) | Definition::Group(items) => {
                for item in items {
                    item.rule.qualify_references(alias);
                }
            }
            Definition::Value(_) => {}
        }
    }

    /// Visit this rule and every rule nested inside it, outer to inner.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Rule)) {
        visit(self);
        match &self.definition {
            Definition::Member(member) => member.target.walk(visit),
            Definition::Array(items) | Definition::Object(items) | Definition::Group(items) => {
                for item in items {
                    item.rule.walk(visit);
                }
            }
            Definition::Value(_) | Definition::TargetReference(_) => {}
        }
    }
}

/// What a rule matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// A primitive check.
    Value(ValueDef),
    /// A `"name" : rule` or `/regex/ : rule` pair.
    Member(MemberDef),
    /// `[ items ]`
    Array(Vec<Item>),
    /// `{ items }`
    Object(Vec<Item>),
    /// `( items )`
    Group(Vec<Item>),
    /// `$name`, resolved through the mapping at evaluation time.
    TargetReference(String),
}

impl Definition {
    /// Item list of an array, object or group.
    #[must_use]
    pub fn items(&self) -> Option<&[Item]> {
        match self {
            Self::Array(items) | Self::Object(items) | Self::Group(items) => Some(items),
            _ => None,
        }
    }

    /// Short kind name used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Member(_) => "member",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Group(_) => "group",
            Self::TargetReference(_) => "reference",
        }
    }
}

/// One entry of an array, object or group.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Edge to the previous item (`None` for the first item).
    pub combinator: Option<Combinator>,
    /// The item's rule (never named).
    pub rule: Rule,
    /// Repetition suffix; `None` means exactly once.
    pub repetition: Option<Repetition>,
}

impl Item {
    /// Create an item with no combinator and no repetition.
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        Self {
            combinator: None,
            rule,
            repetition: None,
        }
    }

    /// Set the combinator joining this item to the previous one.
    #[must_use]
    pub fn joined(mut self, combinator: Combinator) -> Self {
        self.combinator = Some(combinator);
        self
    }

    /// Set the repetition.
    #[must_use]
    pub fn repeated(mut self, repetition: Repetition) -> Self {
        self.repetition = Some(repetition);
        self
    }

    /// Effective repetition (defaults to exactly once).
    #[must_use]
    pub fn repetition(&self) -> Repetition {
        self.repetition.unwrap_or(Repetition::ONCE)
    }
}

/// Relationship between consecutive items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// AND, written `,`.
    Sequence,
    /// OR, written `|`.
    Choice,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Annotations
// ═══════════════════════════════════════════════════════════════════════════════

/// A rule modifier written `@{...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// `@{not}`: inverts the result.
    Not,
    /// `@{unordered}`: array items may match in any order.
    Unordered,
    /// `@{root}`: the rule is an evaluation entry point.
    Root,
    /// Any other annotation, kept verbatim.
    Unknown {
        /// Annotation name.
        name: String,
        /// Raw parameters.
        params: Option<String>,
    },
}

/// The annotation set of a rule node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotations(Vec<Annotation>);

impl Annotations {
    /// Create an annotation set.
    #[must_use]
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self(annotations)
    }

    /// Add an annotation.
    pub fn push(&mut self, annotation: Annotation) {
        self.0.push(annotation);
    }

    /// Append every annotation of `other`.
    pub fn extend(&mut self, other: Annotations) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn is_not(&self) -> bool {
        self.0.contains(&Annotation::Not)
    }

    #[must_use]
    pub fn is_unordered(&self) -> bool {
        self.0.contains(&Annotation::Unordered)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.contains(&Annotation::Root)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.0.iter()
    }
}

impl From<Vec<Annotation>> for Annotations {
    fn from(annotations: Vec<Annotation>) -> Self {
        Self(annotations)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Members
// ═══════════════════════════════════════════════════════════════════════════════

/// A member rule: key matcher plus the rule for the value.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDef {
    /// How the JSON key is matched.
    pub matcher: MemberMatcher,
    /// Rule applied to the member value.
    pub target: Box<Rule>,
}

/// Key matcher of a member rule.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberMatcher {
    /// Exact key.
    Name(String),
    /// Regular expression searched in the key.
    Regex(Pattern),
}

impl MemberMatcher {
    /// Check a JSON key.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Name(name) => name == key,
            Self::Regex(pattern) => pattern.is_match(key),
        }
    }
}

/// A compiled regular expression that remembers its source text.
///
/// Equality compares the source and flags, not the compiled automaton.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    flags: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` with the JCR modifiers `i`, `s` and `x`.
    ///
    /// # Errors
    ///
    /// Returns the regex crate's error for an invalid pattern.
    pub fn new(source: &str, flags: &str) -> Result<Self, regex::Error> {
        let regex = regex::RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()?;
        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            regex,
        })
    }

    /// The pattern as written between the slashes.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Modifier letters following the closing slash.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Unanchored search.
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

/// An RFC 6570 URI template, matched as a whole-string regex.
///
/// Each `{...}` expression becomes one capture group whose character set
/// follows the expression's operator; literal text must match exactly.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    regex: Regex,
}

/// Characters a simple expansion leaves unencoded, plus list and pair separators.
const UNRESERVED: &str = r"[A-Za-z0-9\-._~%,=]";
/// What `{+var}` and `{#var}` may expand to.
const RESERVED: &str = r"[A-Za-z0-9\-._~%:/?#\[\]@!$&'()*+,;=]";

impl UriTemplate {
    /// Compile `source`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed expression.
    pub fn new(source: &str) -> Result<Self, &'static str> {
        let mut expr = String::from("^");
        let mut rest = source;
        while let Some(brace) = rest.find(['{', '}']) {
            let (literal, tail) = rest.split_at(brace);
            expr.push_str(&regex::escape(literal));
            let tail = tail
                .strip_prefix('{')
                .ok_or("unmatched '}' in URI template")?;
            let close = tail
                .find('}')
                .ok_or("unterminated expression in URI template")?;
            expr.push('(');
            expr.push_str(&expansion(&tail[..close])?);
            expr.push(')');
            rest = &tail[close + 1..];
        }
        expr.push_str(&regex::escape(rest));
        expr.push('$');
        let regex = Regex::new(&expr).map_err(|_| "invalid URI template")?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The template as written after `uri..`.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `uri` is some expansion of the template.
    #[must_use]
    pub fn is_match(&self, uri: &str) -> bool {
        self.regex.is_match(uri)
    }
}

/// Regex for the text one `{...}` expression can expand to.
fn expansion(expression: &str) -> Result<String, &'static str> {
    let (operator, variables) = match expression.chars().next() {
        Some(op @ ('+' | '#' | '.' | '/' | ';' | '?' | '&')) => (Some(op), &expression[1..]),
        Some('=' | ',' | '!' | '@' | '|') => return Err("reserved operator in URI template"),
        _ => (None, expression),
    };
    let valid = |var: &str| {
        !var.is_empty()
            && var
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '%' | '.' | '*' | ':'))
    };
    if !variables.split(',').all(valid) {
        return Err("malformed variable list in URI template");
    }
    Ok(match operator {
        None => format!("{UNRESERVED}*"),
        Some('+') => format!("{RESERVED}*"),
        Some('#') => format!("(?:#{RESERVED}*)?"),
        Some('?') => format!(r"(?:\?(?:{UNRESERVED}|&)*)?"),
        Some(op) => format!("(?:{}{UNRESERVED}*)*", regex::escape(&op.to_string())),
    })
}

impl PartialEq for UriTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Values
// ═══════════════════════════════════════════════════════════════════════════════

/// Primitive validators.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueDef {
    /// `any`
    Any,
    /// `null`
    Null,
    /// `boolean`
    Boolean,
    /// `true`
    True,
    /// `false`
    False,
    /// `string`
    String,
    /// `"literal"`
    StringLiteral(String),
    /// `/regex/`
    Regex(Pattern),
    /// `integer`
    Integer,
    /// An exact integer.
    IntegerLiteral(i64),
    /// `min..max`, either bound optional.
    IntegerRange {
        /// Inclusive lower bound.
        min: Option<i64>,
        /// Inclusive upper bound.
        max: Option<i64>,
    },
    /// `int8`..`int64`, `uint8`..`uint64`
    SizedInteger {
        /// Width in bits.
        bits: u8,
        /// `false` for the `uint` family.
        signed: bool,
    },
    /// `float`
    Float,
    /// `double`
    Double,
    /// An exact float.
    FloatLiteral(f64),
    /// `min..max` with float bounds.
    FloatRange {
        /// Inclusive lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
    },
    /// `ipv4`
    Ipv4,
    /// `ipv6`
    Ipv6,
    /// `ipaddr`: either family.
    IpAddr,
    /// `fqdn`
    Fqdn,
    /// `idn`
    Idn,
    /// `uri`
    Uri,
    /// `uri..scheme`: a URI with the given scheme.
    UriScheme(String),
    /// `uri..template`: a URI produced by expanding the template.
    UriTemplate(UriTemplate),
    /// `email`
    Email,
    /// `phone`
    Phone,
    /// `hex`
    Hex,
    /// `base32`
    Base32,
    /// `base32hex`
    Base32Hex,
    /// `base64`
    Base64,
    /// `base64url`
    Base64Url,
    /// `datetime` (RFC 3339 date-time)
    DateTime,
    /// `date` (RFC 3339 full-date)
    Date,
    /// `time` (RFC 3339 partial-time)
    Time,
    /// `< lit lit ... >`: any one of the literals.
    Enumeration(Vec<ValueDef>),
}
