//! Ruleset parts: split one ruleset into the fragments a document quotes.
//!
//! Marker comments sit alone on their line, leading whitespace allowed:
//!
//! ```text
//! ; all_parts FILE     every non-marker line goes to FILE
//! ; start_part FILE    following lines go to FILE (and to all_parts)
//! ; end_part           closes the current part
//! ```
//!
//! Besides the parts, an XML entity listing is produced next to the first
//! file named, so a document can pull each part in by entity reference.
//!
//! ```
//! use jcr::JcrParts;
//!
//! let parts = JcrParts::process("; start_part p1.jcr\n$a =: integer\n; end_part\n$b =: string\n");
//! assert_eq!(parts.parts[0].name, "p1.jcr");
//! assert_eq!(parts.parts[0].text, "$a =: integer\n");
//! assert_eq!(parts.entity_refs.unwrap().name, "p1_xml_entity_refs");
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// File name as written in the marker.
    pub name: String,
    /// File contents; every line ends with a newline.
    pub text: String,
}

impl Part {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
        }
    }

    fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }
}

/// The files split out of a ruleset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JcrParts {
    /// The `all_parts` file, when one is named.
    pub all_parts: Option<Part>,
    /// `start_part` files in document order.
    pub parts: Vec<Part>,
    /// The XML entity listing, when any file is named.
    pub entity_refs: Option<Part>,
}

fn marker<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    line.trim_start()
        .strip_prefix(';')?
        .trim_start()
        .strip_prefix(keyword)
}

fn named_marker<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let name = marker(line, keyword)?.trim();
    (!name.is_empty()).then_some(name)
}

fn stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
}

impl JcrParts {
    /// Split `text` at its marker comments.
    ///
    /// Only the first `all_parts` marker counts; later ones are ordinary
    /// lines. A `start_part` while a part is open closes it first. An
    /// `end_part` with no open part is an ordinary line.
    #[must_use]
    pub fn process(text: &str) -> Self {
        let mut parts = Self::default();
        let mut all_lines = Part::new("");
        let mut names = Vec::new();
        let mut current: Option<Part> = None;

        for line in text.lines() {
            if parts.all_parts.is_none() {
                if let Some(name) = named_marker(line, "all_parts") {
                    parts.all_parts = Some(Part::new(name));
                    names.push(name.to_string());
                    continue;
                }
            }
            if let Some(name) = named_marker(line, "start_part") {
                parts.parts.extend(current.take());
                current = Some(Part::new(name));
                names.push(name.to_string());
            } else if marker(line, "end_part").is_some() && current.is_some() {
                parts.parts.extend(current.take());
            } else {
                if let Some(part) = current.as_mut() {
                    part.push_line(line);
                }
                all_lines.push_line(line);
            }
        }
        parts.parts.extend(current);

        if let Some(all) = parts.all_parts.as_mut() {
            all.text = all_lines.text;
        }
        if let Some(first) = names.first() {
            let file = format!("{}_xml_entity_refs", stem(first));
            let mut refs = Part::new(match Path::new(first).parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.join(file).to_string_lossy().into_owned(),
                _ => file,
            });
            for name in &names {
                refs.push_line(&format!("<!ENTITY {} PUBLIC '' '{name}'>", stem(name)));
            }
            parts.entity_refs = Some(refs);
        }
        parts
    }

    /// Every file to write, in the order they were named.
    pub fn files(&self) -> impl Iterator<Item = &Part> {
        self.all_parts
            .iter()
            .chain(&self.parts)
            .chain(&self.entity_refs)
    }

    /// Write every file under `dir`. Absolute names ignore `dir`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error.
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for part in self.files() {
            let path = dir.join(&part.name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &part.text)?;
            debug!(path = %path.display(), bytes = part.text.len(), "wrote ruleset part");
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_markers() {
        for line in [
            "; start_part foo.jcr",
            ";start_part foo.jcr",
            " ;start_part foo.jcr",
            " ; start_part  foo.jcr",
        ] {
            assert_eq!(named_marker(line, "start_part"), Some("foo.jcr"), "{line}");
        }
        assert_eq!(named_marker(" ; start_part  /tmp/foo-bar.jcr", "start_part"), Some("/tmp/foo-bar.jcr"));
        assert_eq!(named_marker(" ; end_part  foo.jcr", "start_part"), None);
        assert_eq!(named_marker(";all_parts foo_bar.jcr", "all_parts"), Some("foo_bar.jcr"));
        assert!(marker("; end_part", "end_part").is_some());
        assert!(marker("; end_part foo.jcr", "end_part").is_some());
        assert!(marker(" ; start_part foo.jcr", "end_part").is_none());
    }

    const RULESET: &str = "\
; all_parts all.jcr
; my jcr ruleset

$thing1 = [ integer * ]

; start_part part1.jcr
$thing2 = [ string * ]

; end_part

$thing3 =: \"foo\"
; start_part part2.jcr
$thing4 = [ float *]
; end_part
";

    #[test]
    fn test_process() {
        let parts = JcrParts::process(RULESET);
        assert_eq!(
            parts.all_parts.as_ref().unwrap().text,
            "; my jcr ruleset\n\n$thing1 = [ integer * ]\n\n$thing2 = [ string * ]\n\n\n$thing3 =: \"foo\"\n$thing4 = [ float *]\n"
        );
        assert_eq!(parts.parts.len(), 2);
        assert_eq!(parts.parts[0].text, "$thing2 = [ string * ]\n\n");
        assert_eq!(parts.parts[1].text, "$thing4 = [ float *]\n");

        let refs = parts.entity_refs.unwrap();
        assert_eq!(refs.name, "all_xml_entity_refs");
        assert_eq!(
            refs.text,
            "<!ENTITY all PUBLIC '' 'all.jcr'>\n<!ENTITY part1 PUBLIC '' 'part1.jcr'>\n<!ENTITY part2 PUBLIC '' 'part2.jcr'>\n"
        );
    }

    #[test]
    fn test_unclosed_part_and_stray_end() {
        let parts = JcrParts::process("; end_part\n; start_part a.jcr\nx\n; start_part b.jcr\ny");
        assert!(parts.all_parts.is_none());
        assert_eq!(parts.parts[0], Part { name: "a.jcr".into(), text: "x\n".into() });
        assert_eq!(parts.parts[1], Part { name: "b.jcr".into(), text: "y\n".into() });
    }

    #[test]
    fn test_entity_refs_follow_first_directory() {
        let parts = JcrParts::process("; start_part out/p.jcr\nx\n; end_part");
        assert_eq!(parts.entity_refs.unwrap().name, "out/p_xml_entity_refs");
    }

    #[test]
    fn test_no_markers() {
        assert_eq!(JcrParts::process("[ integer ]\n"), JcrParts::default());
    }

    #[test]
    fn test_write_to() {
        let dir = std::env::temp_dir().join(format!("jcr-parts-{}", std::process::id()));
        let written = JcrParts::process(RULESET).write_to(&dir).unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(
            fs::read_to_string(dir.join("part2.jcr")).unwrap(),
            "$thing4 = [ float *]\n"
        );
        fs::remove_dir_all(&dir).unwrap();
    }
}
