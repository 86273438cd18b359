//! jcr - Rust implementation of JSON Content Rules
//!
//! Validates JSON documents against rulesets written in the JCR language:
//! value, array, object, group and member rules combined with choice and
//! sequence combinators, repetitions and annotations.
//!
//! # Architecture
//!
//! Ingestion builds immutable data once; evaluation reads it many times.
//!
//! - [`RuleTree`]: Parsed ruleset ([`parse`]), the substrate everything reads
//! - [`Mapping`]: Name → rule arena; references resolve by lookup, so cycles are fine
//! - [`check_references`] / [`check_groups`]: Structural checks, run once at ingestion
//! - [`find_roots`]: Evaluation entry points in declaration order
//! - [`Context`]: Orchestrates ingestion, overrides, imports, callbacks and roots
//! - [`EvaluationResult`]: Per-call outcome; failures are values, never errors
//!
//! # Key Design Insights
//!
//! 1. **Greedy, not backtracking**: a repetition consumes as much as it can and
//!    never gives it back. `[ string *, "end" ]` does not match
//!    `["a","end"]`, and that is the language's documented behavior.
//!
//! 2. **Rollback on branch**: group items match against a clone of the
//!    array/object progress record, merged back only on success.
//!
//! 3. **Non-mutating override**: [`Context::with_override`] returns a new
//!    context; the receiver keeps evaluating with its own mapping.
//!
//! # Example
//!
//! ```
//! use jcr::prelude::*;
//! use serde_json::json;
//!
//! let ctx = Context::new(r#"
//!     ; a pair of small integers followed by a fruit
//!     [ 0..2 *2, ( "apple" | "banana" ) ]
//! "#).unwrap();
//!
//! assert!(ctx.evaluate(&json!([1, 2, "apple"]), None).unwrap().success);
//!
//! let result = ctx.evaluate(&json!([1, 2, "cherry"]), None).unwrap();
//! assert!(!result.success);
//! assert!(!ctx.failure_report().is_empty());
//! ```
//!
//! # Extensions
//!
//! - [`jcr-test`](https://docs.rs/jcr-test): Test callbacks and the YAML conformance runner (internal)

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod callback;
mod context;
mod directives;
mod eval;
mod groups;
mod loader;
mod mapping;
mod parser;
mod parts;
mod render;
mod repetition;
mod roots;
mod rule;
mod trace;
pub mod value;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Data model
pub use repetition::{Repetition, RepetitionError};
pub use rule::{
    Annotation, Annotations, Combinator, Definition, Directive, DirectiveKind, Item, MemberDef,
    MemberMatcher, Node, Pattern, Position, Rule, RuleTree, UriTemplate, ValueDef,
};

// Ingestion
pub use directives::{process_directives, Directives};
pub use groups::check_groups;
pub use loader::{FileLoader, MemoryLoader, RulesetLoader};
pub use mapping::{check_references, resolve, Mapping};
pub use parser::parse;
pub use roots::{find_roots, Root};

// Evaluation
pub use callback::{CallbackOutcome, RuleCallback};
pub use context::{Context, ContextBuilder};
pub use eval::{evaluate_rule, ArrayBehavior, Behavior, EvalContext, EvaluationResult, ObjectBehavior};
pub use trace::{EvalTrace, FailedRoot, Failure};

// Tooling
pub use parts::{JcrParts, Part};
pub use render::elide;

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use jcr::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Entry points
        ingest,
        CallbackOutcome,
        Context,
        ContextBuilder,
        // Trace types
        EvalTrace,
        EvaluationResult,
        FailedRoot,
        Failure,
        // Errors
        JcrError,
        MemoryLoader,
        Root,
        RuleCallback,
        RulesetLoader,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// The `major.minor` version accepted by the `jcr-version` directive.
pub const SUPPORTED_JCR_VERSION: (u32, u32) = (0, 7);

/// Maximum evaluator nesting for a single `evaluate` call.
///
/// Rules may reference themselves. A rule that recurses without consuming
/// data (`$r = [ $r ]` against a deeply nested array, or `$g = ( $g )`)
/// fails with a depth reason instead of overflowing the stack.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Maximum nesting of `import` directives.
///
/// Guards against rulesets that import each other.
pub const MAX_IMPORT_DEPTH: usize = 16;

/// Characters of JSON data kept in failure reports.
pub const JSON_ELIDE_LEN: usize = 40;

/// Characters of rule rendering kept in failure reports.
pub const RULE_ELIDE_LEN: usize = 50;

/// Characters of reason text kept in failure reports.
pub const REASON_ELIDE_LEN: usize = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Structural errors from ingestion.
///
/// These are caught before any evaluation happens. Fix the ruleset and
/// ingest it again. Evaluation never returns these for data mismatches;
/// see [`EvaluationResult`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JcrError {
    /// The ruleset text is not valid JCR.
    #[error("parse error at line {line} column {column}: {message}")]
    Parse {
        /// Line of the failure.
        line: u32,
        /// Column of the failure.
        column: u32,
        /// What the parser expected.
        message: String,
    },
    /// Two rules share a name and override mode is off.
    #[error("rule ${name} at line {line} column {column} is already defined")]
    DuplicateRuleName {
        /// The repeated name.
        name: String,
        /// Line of the second definition.
        line: u32,
        /// Column of the second definition.
        column: u32,
    },
    /// A `$name` reference has no definition.
    #[error("no rule named ${name} (referenced at line {line} column {column})")]
    UnresolvedReference {
        /// The missing name.
        name: String,
        /// Line of the reference.
        line: u32,
        /// Column of the reference.
        column: u32,
    },
    /// A group appears where its contents are not allowed.
    #[error("illegal group at line {line} column {column}: {reason} in {rule}")]
    IllegalGroup {
        /// Rendering of the offending rule.
        rule: String,
        /// What is not allowed.
        reason: String,
        /// Line of the offending rule.
        line: u32,
        /// Column of the offending rule.
        column: u32,
    },
    /// The `jcr-version` directive names a version this crate does not speak.
    #[error(
        "unsupported jcr-version {major}.{minor}, expected {}.{}",
        SUPPORTED_JCR_VERSION.0,
        SUPPORTED_JCR_VERSION.1
    )]
    UnsupportedVersion {
        /// Requested major version.
        major: u32,
        /// Requested minor version.
        minor: u32,
    },
    /// A regular expression failed to compile.
    #[error("invalid pattern /{pattern}/: {message}")]
    InvalidPattern {
        /// The pattern text.
        pattern: String,
        /// The regex compiler's message.
        message: String,
    },
    /// An imported ruleset could not be fetched or ingested.
    #[error("cannot import {uri}: {reason}")]
    ImportFailed {
        /// The import URI.
        uri: String,
        /// What went wrong.
        reason: String,
    },
    /// The requested root is not a rule of this context.
    #[error("no rule named ${name} to use as root")]
    NoSuchRoot {
        /// The requested root name.
        name: String,
    },
    /// The requested root resolves to a member rule.
    #[error("rule ${name} is a member rule and cannot be a root")]
    RootIsMemberRule {
        /// The requested root name.
        name: String,
    },
    /// Nothing to evaluate: no default rule and no `@{root}` rules.
    #[error("ruleset has no roots; add an unnamed rule, an @{{root}} annotation, or name a root")]
    NoRoots,
}

/// Shorthand result type for ingestion.
pub type Result<T, E = JcrError> = std::result::Result<T, E>;

/// Ingest ruleset text into a [`Context`].
///
/// `override_mode` lets later rules replace earlier rules of the same name.
/// `alias` qualifies every rule name as `alias.name`.
///
/// # Errors
///
/// Returns the first structural error found: parse, naming, references,
/// groups, directives or imports.
pub fn ingest(text: &str, override_mode: bool, alias: Option<&str>) -> Result<Context> {
    let mut builder = Context::builder().override_mode(override_mode);
    if let Some(alias) = alias {
        builder = builder.alias(alias);
    }
    builder.ingest(text)
}
