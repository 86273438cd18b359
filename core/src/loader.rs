//! Import fetching: where `# import` directives get their ruleset text.

use crate::JcrError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Fetches ruleset text for an `# import` directive.
///
/// Loaders run during ingestion only, never during evaluation.
pub trait RulesetLoader: Send + Sync {
    /// Return the ruleset text behind `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`JcrError::ImportFailed`] when the ruleset cannot be fetched.
    fn load(&self, uri: &str) -> Result<String, JcrError>;
}

fn failed(uri: &str, reason: impl Into<String>) -> JcrError {
    JcrError::ImportFailed {
        uri: uri.to_string(),
        reason: reason.into(),
    }
}

/// Loads `file:` URIs and plain paths from the local filesystem.
///
/// Relative paths resolve against the base directory, if one is set.
/// Network schemes are rejected.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    base: Option<PathBuf>,
}

impl FileLoader {
    /// Create a loader resolving relative paths against the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base`.
    #[must_use]
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn path_for(&self, uri: &str) -> Result<PathBuf, JcrError> {
        let path = match url::Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|()| failed(uri, "not a local file URI"))?,
            // Single letters are Windows drive prefixes, not schemes.
            Ok(url) if url.scheme().len() > 1 => {
                return Err(failed(
                    uri,
                    format!("scheme '{}' is not supported for imports", url.scheme()),
                ))
            }
            _ => PathBuf::from(uri),
        };
        Ok(match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        })
    }
}

impl RulesetLoader for FileLoader {
    fn load(&self, uri: &str) -> Result<String, JcrError> {
        let path = self.path_for(uri)?;
        std::fs::read_to_string(&path)
            .map_err(|e| failed(uri, format!("{}: {e}", path.display())))
    }
}

/// In-memory rulesets keyed by URI.
///
/// ```
/// use jcr::prelude::*;
///
/// let loader = MemoryLoader::new().with("urn:types", "$port =: 0..65535");
/// assert!(loader.load("urn:types").is_ok());
/// assert!(loader.load("urn:other").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    rulesets: HashMap<String, String>,
}

impl MemoryLoader {
    /// Create an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ruleset (builder pattern).
    #[must_use]
    pub fn with(mut self, uri: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(uri, text);
        self
    }

    /// Add a ruleset.
    pub fn insert(&mut self, uri: impl Into<String>, text: impl Into<String>) {
        self.rulesets.insert(uri.into(), text.into());
    }
}

impl RulesetLoader for MemoryLoader {
    fn load(&self, uri: &str) -> Result<String, JcrError> {
        self.rulesets
            .get(uri)
            .cloned()
            .ok_or_else(|| failed(uri, "no such ruleset"))
    }
}
