use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use time::OffsetDateTime;
use vocab_core::tokenizer::Tokenizer;
use vocab_core::{IndexTables, VocabConfig};

fn bench_tokenize(c: &mut Criterion) {
    let text = include_str!("../src/vocabulary.rs");
    let tokenizer = Tokenizer::new(&VocabConfig::in_dir("/tmp/vocab-bench"));
    c.bench_function("tokenize_source_file", |b| b.iter(|| tokenizer.tokenize(text)));
}

fn bench_weights(c: &mut Criterion) {
    let tokenizer = Tokenizer::new(&VocabConfig::in_dir("/tmp/vocab-bench"));
    let sources = [
        include_str!("../src/vocabulary.rs"),
        include_str!("../src/similarity.rs"),
        include_str!("../src/ingest.rs"),
        include_str!("../src/persist.rs"),
    ];
    let mut tables = IndexTables::new();
    let now = OffsetDateTime::now_utc();
    for (i, text) in sources.iter().enumerate() {
        let mut doc = vocab_core::DocumentInfo {
            path: format!("doc{i}"),
            file_hash: String::new(),
            last_modified: now,
            total_terms: 0,
            unique_terms: 0,
            term_freqs: Default::default(),
            term_positions: Default::default(),
            language: "rust".into(),
            file_type: ".rs".into(),
            size: text.len() as u64,
        };
        for token in tokenizer.tokenize(text) {
            *doc.term_freqs.entry(token.term.clone()).or_insert(0) += 1;
            doc.term_positions.entry(token.term).or_default().push(token.position);
            doc.total_terms += 1;
        }
        doc.unique_terms = doc.term_freqs.len();
        tables.insert_document(doc, &HashMap::new(), now);
    }
    c.bench_function("recompute_weights", |b| {
        b.iter(|| {
            tables.update_global_stats();
            tables.calculate_weights();
        })
    });
}

criterion_group!(benches, bench_tokenize, bench_weights);
criterion_main!(benches);
