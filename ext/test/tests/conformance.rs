//! Conformance tests that run YAML fixtures against jcr
//!
//! Run with: cargo test -p jcr-test --test conformance
//!
//! Set `RUST_LOG=jcr::trace=debug` to see every evaluator frame.

#![cfg(feature = "fixtures")]

use jcr_test::fixture::Fixture;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Get the conformance directory relative to the workspace root
fn fixtures_dir() -> PathBuf {
    // The manifest dir is ext/test
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let ext_test = Path::new(manifest_dir);

    // Go up: ext/test -> ext -> workspace root
    let root = ext_test
        .parent() // ext
        .and_then(|p| p.parent()) // workspace root
        .expect("Could not find workspace root");

    root.join("conformance")
}

/// Load and run all fixtures in a directory
fn run_fixtures_in_dir(dir: &Path) {
    if !dir.exists() {
        panic!("Fixtures directory does not exist: {}", dir.display());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|e| e == "yaml" || e == "yml"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no fixtures in {}", dir.display());

    for path in paths {
        println!("Running fixture: {}", path.display());

        let yaml = fs::read_to_string(&path).expect("read yaml");

        // Parse potentially multiple fixtures (separated by ---)
        let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
            panic!("Failed to parse {}: {}", path.display(), e);
        });

        for fixture in fixtures {
            println!("  Running: {}", fixture.name);
            fixture.run_and_assert();
        }
    }
}

#[test]
fn test_values() {
    run_fixtures_in_dir(&fixtures_dir().join("01_values"));
}

#[test]
fn test_arrays() {
    run_fixtures_in_dir(&fixtures_dir().join("02_arrays"));
}

#[test]
fn test_objects() {
    run_fixtures_in_dir(&fixtures_dir().join("03_objects"));
}

#[test]
fn test_groups() {
    run_fixtures_in_dir(&fixtures_dir().join("04_groups"));
}

#[test]
fn test_rulesets() {
    run_fixtures_in_dir(&fixtures_dir().join("05_rulesets"));
}
