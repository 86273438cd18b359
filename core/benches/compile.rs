//! Compile benchmarks: ruleset text → context.
//!
//! Measures the one-time cost of ingestion: parsing, name resolution,
//! reference and group checks, and regex compilation, at growing scale.

use jcr::prelude::*;

fn main() {
    divan::main();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Single rules
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench]
fn parse_value_rule(bencher: divan::Bencher) {
    bencher.bench_local(|| jcr::parse("0..65535"));
}

#[divan::bench]
fn parse_object_rule(bencher: divan::Bencher) {
    bencher.bench_local(|| {
        jcr::parse(r#"{ "host" : fqdn, "port" : 0..65535, "tags" : [ string * ] ?, /^x-/ : any * }"#)
    });
}

#[divan::bench]
fn ingest_regex_complex(bencher: divan::Bencher) {
    bencher.bench_local(|| {
        Context::new(r"/^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$/")
    });
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rulesets at scale
// ═══════════════════════════════════════════════════════════════════════════════

fn chain(rules: usize) -> String {
    // $r0 = [ $r1 * ] ... $rN =: integer, each rule referencing the next.
    let mut text = String::from("[ $r0 ]\n");
    for i in 0..rules {
        text.push_str(&format!("$r{i} = [ $r{} * ]\n", i + 1));
    }
    text.push_str(&format!("$r{rules} =: integer\n"));
    text
}

fn wide_object(members: usize) -> String {
    let members: Vec<String> = (0..members).map(|i| format!("\"m{i}\" : integer ?")).collect();
    format!("{{ {} }}", members.join(", "))
}

#[divan::bench(args = [1, 10, 50, 100, 200])]
fn ingest_reference_chain(bencher: divan::Bencher, rules: usize) {
    let text = chain(rules);

    bencher.bench_local(|| Context::new(&text));
}

#[divan::bench(args = [10, 50, 100, 500])]
fn ingest_wide_object(bencher: divan::Bencher, members: usize) {
    let text = wide_object(members);

    bencher.bench_local(|| Context::new(&text));
}

#[divan::bench(args = [1, 10, 50])]
fn ingest_with_imports(bencher: divan::Bencher, imports: usize) {
    let mut loader = MemoryLoader::new();
    let mut text = String::new();
    for i in 0..imports {
        loader.insert(format!("urn:lib{i}"), "$port =: 0..65535 $host =: fqdn");
        text.push_str(&format!("# import urn:lib{i} as l{i}\n"));
    }
    text.push_str("[ $l0.port * ]\n");

    bencher.bench_local(|| Context::builder().loader(loader.clone()).ingest(&text));
}

#[divan::bench(args = [1, 10, 50])]
fn override_layer(bencher: divan::Bencher, rules: usize) {
    let base = Context::new(&chain(rules)).unwrap();

    bencher.bench_local(|| base.with_override(&format!("$r{rules} =: string")));
}
