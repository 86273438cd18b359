//! End-to-end tests of the `Context` API: callbacks, overrides, imports,
//! roots, failure reports and concurrent use.

use jcr_test::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Overrides
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn override_leaves_base_context_alone() {
    let base = Context::new("[ $n * ] $n =: 0..2").unwrap();
    let data = json!([1, 2]);
    assert!(base.evaluate(&data, None).unwrap().success);

    let overridden = base.with_override("$n =: 0..1").unwrap();
    assert!(!overridden.evaluate(&data, None).unwrap().success);
    assert!(base.evaluate(&data, None).unwrap().success);
}

#[test]
fn override_may_reference_base_rules() {
    let base = Context::new("$port =: 0..65535 $host =: fqdn { \"port\" : $port }").unwrap();
    let over = base
        .with_override("$server = { \"host\" : $host, \"port\" : $port }")
        .unwrap();
    let data = json!({"host": "example.com", "port": 8080});
    assert!(over.evaluate(&data, Some("server")).unwrap().success);
    assert_eq!(
        base.evaluate(&data, Some("server")).unwrap_err(),
        JcrError::NoSuchRoot { name: "server".into() }
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Imports
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn imported_rules_are_qualified() {
    let loader = MemoryLoader::new()
        .with("urn:net", "$port =: 0..65535 $ports = [ $port + ]")
        .with("urn:names", "$label =: /^[a-z]+$/");
    let ctx = Context::builder()
        .loader(loader)
        .ingest(
            "# import urn:net as net\n# import urn:names\n{ \"ports\" : $net.ports, \"name\" : $label }",
        )
        .unwrap();

    assert!(ctx.mapping().contains("net.port"));
    assert!(ctx.mapping().contains("label"));
    assert!(ctx.evaluate(&json!({"ports": [80, 443], "name": "web"}), None).unwrap().success);
    assert!(!ctx.evaluate(&json!({"ports": [80, 70000], "name": "web"}), None).unwrap().success);
}

#[test]
fn broken_import_is_an_ingestion_error() {
    let loader = MemoryLoader::new().with("urn:bad", "$x = [ ");
    let err = Context::builder()
        .loader(loader)
        .ingest("# import urn:bad as b\n[ integer ]")
        .unwrap_err();
    assert!(matches!(err, JcrError::ImportFailed { ref uri, .. } if uri == "urn:bad"), "{err}");
}

#[test]
fn network_imports_are_rejected_by_the_file_loader() {
    let err = Context::new("# import https://example.com/types.jcr\n[ integer ]").unwrap_err();
    assert!(matches!(err, JcrError::ImportFailed { .. }), "{err}");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Callbacks
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn callback_sees_every_evaluation_of_its_rule() {
    let mut ctx = Context::new("{ \"a\" : $n, \"b\" : [ $n * ] } $n =: integer").unwrap();
    let counter = CountingCallback::new();
    ctx.register_callback("n", counter.clone());

    assert!(ctx.evaluate(&json!({"a": 1, "b": [2, 3]}), None).unwrap().success);
    assert_eq!(counter.true_count(), 3);
    assert_eq!(counter.false_count(), 0);
}

#[test]
fn callback_can_reject_and_accept() {
    let mut ctx = Context::new("[ $n * ] $n =: integer").unwrap();

    ctx.register_callback("n", FixedCallback::reason("only strings today"));
    let trace = ctx.evaluate_with_trace(&json!([1]), None).unwrap();
    assert!(!trace.result.success);
    assert!(trace
        .failure_report()
        .iter()
        .any(|line| line.ends_with("because only strings today")));

    ctx.register_callback("n", CountingCallback::new().on_false(CallbackOutcome::Pass));
    assert!(ctx.evaluate(&json!(["one", "two"]), None).unwrap().success);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Roots and failure reports
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn failure_report_names_each_failed_root() {
    let ctx = Context::new(
        r#"@{root} $root = [ 0..2 *2, ( "foo" | "bar" ) ]
           { "x" : integer }"#,
    )
    .unwrap();
    let result = ctx.evaluate(&json!([1, 2, "fuz"]), None).unwrap();
    assert!(!result.success);

    let report = ctx.failure_report();
    let headings: Vec<&String> = report.iter().filter(|line| line.starts_with("- ")).collect();
    assert_eq!(
        headings,
        vec!["- Failures for root rule named 'root'", "- Failures for root rule at line 2"]
    );
    assert!(report.iter().any(|line| line.contains("\"fuz\" failed rule")));

    assert!(ctx.evaluate(&json!({"x": 1}), None).unwrap().success);
    assert!(ctx.failure_report().is_empty());
}

#[test]
fn requested_root_errors() {
    let ctx = Context::new("$m = \"m\" : integer $a = { $m }").unwrap();
    assert_eq!(ctx.evaluate(&json!([]), None).unwrap_err(), JcrError::NoRoots);
    assert_eq!(
        ctx.evaluate(&json!({"m": 1}), Some("m")).unwrap_err(),
        JcrError::RootIsMemberRule { name: "m".into() }
    );
}

#[test]
fn ingest_shorthand_with_alias() {
    let ctx = jcr::ingest("$n =: integer [ $n ]", false, Some("lib")).unwrap();
    assert!(ctx.mapping().contains("lib.n"));
    assert!(ctx.evaluate(&json!([3]), None).unwrap().success);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn contexts_evaluate_concurrently() {
    let ctx = Arc::new(Context::new("$tree = [ ( integer | $tree ) * ] $tree").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let good = json!([i, [i, [i]]]);
                let bad = json!([i, ["x"]]);
                (0..50).all(|_| {
                    let good = ctx.evaluate_with_trace(&good, None).unwrap();
                    let bad = ctx.evaluate_with_trace(&bad, None).unwrap();
                    good.result.success && !bad.result.success && !bad.failed_roots.is_empty()
                })
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
