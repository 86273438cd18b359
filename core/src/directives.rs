//! Directive processing: ruleset id, version check and imports.

use crate::context::Ruleset;
use crate::loader::RulesetLoader;
use crate::mapping::Mapping;
use crate::roots::Root;
use crate::rule::{DirectiveKind, RuleTree};
use crate::{JcrError, MAX_IMPORT_DEPTH, SUPPORTED_JCR_VERSION};
use tracing::debug;

/// What a ruleset's directives contribute.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    /// From `# ruleset-id`.
    pub ruleset_id: Option<String>,
    /// From `# jcr-version`, once checked.
    pub version: Option<(u32, u32)>,
    /// Extensions named after the version.
    pub extensions: Vec<String>,
    /// URIs imported, in document order.
    pub imports: Vec<String>,
    /// Rules of every imported ruleset, alias-qualified.
    pub mapping: Mapping,
    /// Roots of every imported ruleset.
    pub roots: Vec<Root>,
}

/// Apply the directives of `tree` in document order.
///
/// Each `# import uri [as name]` is fetched through `loader` and ingested
/// on its own. Its rules are qualified with `name`, nested under `alias`
/// when the importing ruleset is itself aliased; without `as` they share
/// the importer's namespace. Later imports replace earlier rules of the
/// same name only when `override_mode` is on.
///
/// # Errors
///
/// - [`JcrError::UnsupportedVersion`] for a `jcr-version` other than
///   [`SUPPORTED_JCR_VERSION`]
/// - [`JcrError::ImportFailed`] when an import cannot be fetched or
///   ingested, or imports nest deeper than [`MAX_IMPORT_DEPTH`]
pub fn process_directives(
    tree: &RuleTree,
    loader: &dyn RulesetLoader,
    alias: Option<&str>,
    override_mode: bool,
    depth: usize,
) -> Result<Directives, JcrError> {
    let mut directives = Directives::default();
    for directive in tree.directives() {
        match &directive.kind {
            DirectiveKind::RulesetId(id) => directives.ruleset_id = Some(id.clone()),
            DirectiveKind::JcrVersion {
                major,
                minor,
                extensions,
            } => {
                if (*major, *minor) != SUPPORTED_JCR_VERSION {
                    return Err(JcrError::UnsupportedVersion {
                        major: *major,
                        minor: *minor,
                    });
                }
                directives.version = Some((*major, *minor));
                directives.extensions.extend(extensions.iter().cloned());
            }
            DirectiveKind::Import { uri, alias: name } => {
                let imported = import(uri, name.as_deref(), alias, loader, depth)?;
                directives.mapping.merge(&imported.mapping, override_mode);
                directives.roots.extend(imported.roots);
                directives.imports.push(uri.clone());
            }
            DirectiveKind::Unknown { name, .. } => {
                debug!(directive = %name, line = directive.position.line, "ignoring unknown directive");
            }
        }
    }
    Ok(directives)
}

fn import(
    uri: &str,
    name: Option<&str>,
    outer: Option<&str>,
    loader: &dyn RulesetLoader,
    depth: usize,
) -> Result<Ruleset, JcrError> {
    if depth >= MAX_IMPORT_DEPTH {
        return Err(JcrError::ImportFailed {
            uri: uri.to_string(),
            reason: format!("imports nested deeper than {MAX_IMPORT_DEPTH}"),
        });
    }
    let alias = match (outer, name) {
        (Some(outer), Some(name)) => Some(format!("{outer}.{name}")),
        (None, Some(name)) => Some(name.to_string()),
        (outer, None) => outer.map(str::to_string),
    };
    let text = loader.load(uri)?;
    let wrap = |error: JcrError| match error {
        JcrError::ImportFailed { .. } => error,
        other => JcrError::ImportFailed {
            uri: uri.to_string(),
            reason: other.to_string(),
        },
    };
    let ruleset = Ruleset::compile(&text, false, alias.as_deref(), loader, depth + 1).map_err(wrap)?;
    ruleset.check(&ruleset.mapping).map_err(wrap)?;
    debug!(
        uri,
        alias = alias.as_deref().unwrap_or(""),
        rules = ruleset.mapping.len(),
        roots = ruleset.roots.len(),
        "imported ruleset"
    );
    Ok(ruleset)
}
