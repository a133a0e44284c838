//! Criterion benchmarks for lexmatch.
//!
//! Covers the hot paths of a query evaluation:
//! - Posting-list iteration under different operators
//! - Top-k matching with and without pruning
//! - Sorting and collapsing
//! - Query expansion

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use lexmatch::prelude::*;
use lexmatch::query::WildcardOptions;
use lexmatch::util::sortable::sortable_serialise;

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<String> {
    let words = [
        "search", "engine", "full", "text", "index", "query", "document", "field", "term", "phrase",
        "boolean", "vector", "similarity", "relevance", "score", "analysis", "tokenization",
        "stemming", "normalization", "clustering", "machine", "learning", "algorithm", "data",
        "structure", "performance", "optimization", "memory", "storage", "retrieval", "ranking",
        "filtering",
    ];

    let mut documents = Vec::with_capacity(count);
    for i in 0..count {
        let doc_length = 50 + (i % 100);
        let mut doc_words = Vec::with_capacity(doc_length);
        for j in 0..doc_length {
            // Skewed pseudo-random distribution so term frequencies differ.
            let word_idx = ((i * 7 + j * 13) % words.len()).min((i + j * j) % words.len());
            doc_words.push(words[word_idx]);
        }
        documents.push(doc_words.join(" "));
    }
    documents
}

fn build_database(count: usize, shards: usize) -> Database {
    let texts = generate_test_documents(count);
    let mut per_shard: Vec<Vec<Document>> = (0..shards).map(|_| Vec::new()).collect();
    for (i, text) in texts.iter().enumerate() {
        let doc = Document::new()
            .with_text(text)
            .with_value(0, sortable_serialise((i % 97) as f64))
            .with_value(1, format!("site{}", i % 50));
        per_shard[i % shards].push(doc);
    }
    let mut db = Database::new();
    for docs in per_shard {
        db.add_shard(Arc::new(MemoryShard::from_documents(docs)));
    }
    db
}

fn terms(words: &[&str]) -> Vec<Query> {
    words.iter().map(|w| Query::term(*w)).collect()
}

/// Benchmark matching under each operator.
fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");
    let db = build_database(5000, 1);
    let words = ["search", "engine", "ranking", "data"];

    let queries = [
        ("or", Query::combine(Op::Or, terms(&words))),
        ("and", Query::combine(Op::And, terms(&words[..2]))),
        ("and_not", Query::and_not(Query::term("search"), Query::term("data"))),
        ("synonym", Query::combine(Op::Synonym, terms(&words))),
        ("phrase", Query::combine(Op::Phrase, terms(&["full", "text"]))),
        ("wildcard", Query::wildcard("s", WildcardOptions::new())),
    ];

    group.throughput(Throughput::Elements(5000));
    for (name, query) in queries {
        let mut enquire = Enquire::new(db.clone());
        enquire.set_query(query);
        group.bench_function(name, |b| b.iter(|| black_box(enquire.evaluate(0, 10, None).unwrap())));
    }
    group.finish();
}

/// Benchmark how the result set size affects pruning.
fn bench_top_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("top_k");
    let db = build_database(5000, 1);
    let mut enquire = Enquire::new(db);
    enquire.set_query(Query::combine(Op::Or, terms(&["search", "engine", "ranking", "data", "memory"])));

    for k in [1, 10, 100, 1000] {
        group.bench_function(format!("top_{k}"), |b| {
            b.iter(|| black_box(enquire.evaluate(0, black_box(k), None).unwrap()))
        });
    }

    enquire.set_options(MatchOptions::new().with_check_at_least(5000));
    group.bench_function("top_10_check_all", |b| {
        b.iter(|| black_box(enquire.evaluate(0, 10, None).unwrap()))
    });
    group.finish();
}

/// Benchmark sorting by value and collapsing.
fn bench_sort_and_collapse(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_and_collapse");
    let db = build_database(5000, 1);
    let query = Query::combine(Op::Or, terms(&["search", "engine"]));

    let mut enquire = Enquire::new(db.clone());
    enquire.set_query(query.clone());
    enquire.set_options(MatchOptions::new().with_sort_by_value(0, true));
    group.bench_function("sort_by_value", |b| {
        b.iter(|| black_box(enquire.evaluate(0, 10, None).unwrap()))
    });

    let mut enquire = Enquire::new(db);
    enquire.set_query(query);
    enquire.set_options(MatchOptions::new().with_collapse_key(1, 2));
    group.bench_function("collapse", |b| {
        b.iter(|| black_box(enquire.evaluate(0, 10, None).unwrap()))
    });
    group.finish();
}

/// Benchmark matching over sharded databases.
fn bench_shards(c: &mut Criterion) {
    let mut group = c.benchmark_group("shards");
    group.sample_size(20);
    for shards in [1, 4, 16] {
        let mut enquire = Enquire::new(build_database(5000, shards));
        enquire.set_query(Query::combine(Op::Or, terms(&["search", "retrieval"])));
        group.bench_function(format!("{shards}_shards"), |b| {
            b.iter(|| black_box(enquire.evaluate(0, 10, None).unwrap()))
        });
    }
    group.finish();
}

/// Benchmark query expansion.
fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    let mut enquire = Enquire::new(build_database(5000, 1));
    enquire.set_query(Query::term("search"));
    let rset: RSet = (1..=50).collect();

    group.throughput(Throughput::Elements(50));
    for scheme in ["trad", "bo1"] {
        enquire.set_expand_options(ExpandOptions::new().with_scheme(scheme));
        group.bench_function(scheme, |b| b.iter(|| black_box(enquire.expand(&rset, 10).unwrap())));
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_operators,
    bench_top_k,
    bench_sort_and_collapse,
    bench_expand
);

// Separate group for slower benchmarks
criterion_group!(slow_benches, bench_shards);

criterion_main!(benches, slow_benches);
