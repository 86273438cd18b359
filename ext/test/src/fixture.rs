//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the jcr engine.
//!
//! ```yaml
//! name: ordered_array
//! description: integers then one string
//! ruleset: |
//!   [ integer *, string ]
//! cases:
//!   - name: match
//!     json: [1, 2, "x"]
//!     expect: true
//! ```
//!
//! Optional keys: `root` (evaluate one named rule), `override` (ruleset
//! layered with [`Context::with_override`]), `imports` (URI to ruleset text,
//! served by a [`MemoryLoader`]), and `expect_ingest_error` (the ruleset
//! must be rejected; `cases` are ignored).

use jcr::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub ruleset: String,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default, rename = "override")]
    pub override_with: Option<String>,
    #[serde(default)]
    pub imports: BTreeMap<String, String>,
    #[serde(default)]
    pub expect_ingest_error: bool,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// Test case
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub json: Value,
    pub expect: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: bool,
    pub actual: Result<bool, JcrError>,
    pub report: Vec<String>,
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Ingest the ruleset, with its imports and override
    pub fn context(&self) -> Result<Context, JcrError> {
        let mut loader = MemoryLoader::new();
        for (uri, text) in &self.imports {
            loader.insert(uri.clone(), text.clone());
        }
        let ctx = Context::builder().loader(loader).ingest(&self.ruleset)?;
        match &self.override_with {
            Some(text) => ctx.with_override(text),
            None => Ok(ctx),
        }
    }

    /// Run all test cases and return results
    ///
    /// # Errors
    ///
    /// Returns the ingestion error; with `expect_ingest_error` a successful
    /// ingestion is the error case and is reported as `Ok(None)`.
    pub fn run(&self) -> Result<Option<Vec<CaseResult>>, JcrError> {
        let ctx = match self.context() {
            Ok(_) if self.expect_ingest_error => return Ok(None),
            Err(_) if self.expect_ingest_error => return Ok(Some(Vec::new())),
            result => result?,
        };
        let results = self
            .cases
            .iter()
            .map(|case| {
                let traced = ctx.evaluate_with_trace(&case.json, self.root.as_deref());
                let (actual, report) = match traced {
                    Ok(trace) => (Ok(trace.result.success), trace.failure_report()),
                    Err(error) => (Err(error), Vec::new()),
                };
                CaseResult {
                    case_name: case.name.clone(),
                    passed: actual.as_ref().is_ok_and(|success| *success == case.expect),
                    expected: case.expect,
                    actual,
                    report,
                }
            })
            .collect();
        Ok(Some(results))
    }

    /// Run all test cases and panic on first failure
    pub fn run_and_assert(&self) {
        let results = match self.run() {
            Ok(Some(results)) => results,
            Ok(None) => panic!("Fixture '{}': ruleset was expected to be rejected", self.name),
            Err(e) => panic!("Fixture '{}': ruleset rejected: {e}", self.name),
        };
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {:?}, got {:?}\n{}",
                self.name,
                result.case_name,
                result.expected,
                result.actual,
                result.report.join("\n")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: ints
description: integers only
ruleset: "[ integer * ]"
cases:
  - name: ints
    json: [1, 2]
    expect: true
  - name: mixed
    json: [1, "x"]
    expect: false
---
name: broken
ruleset: "[ $missing ]"
expect_ingest_error: true
"#;

    #[test]
    fn test_parse_and_run() {
        let fixtures = Fixture::from_yaml_multi(YAML).unwrap();
        assert_eq!(fixtures.len(), 2);

        let results = fixtures[0].run().unwrap().unwrap();
        assert!(results.iter().all(|r| r.passed));
        assert!(results[0].report.is_empty());
        assert!(!results[1].report.is_empty());

        fixtures[1].run_and_assert();
    }

    #[test]
    fn test_unexpected_ingest_error() {
        let fixture = Fixture::from_yaml("name: bad\nruleset: \"[ $missing ]\"").unwrap();
        assert!(matches!(fixture.run(), Err(JcrError::UnresolvedReference { .. })));
    }

    #[test]
    #[should_panic(expected = "expected to be rejected")]
    fn test_missing_ingest_error_panics() {
        Fixture::from_yaml("name: ok\nruleset: \"[ integer ]\"\nexpect_ingest_error: true")
            .unwrap()
            .run_and_assert();
    }
}
