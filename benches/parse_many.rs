//! This bench parses and validates a large set of generated documents, then
//! diffs the result against a snapshot of itself.

#![allow(missing_docs)]

use std::{fmt::Write, hint::black_box};

use criterion::{Criterion, criterion_group, criterion_main};
use reqlock::{Document, Snapshot, diff, load};

const DOCUMENTS: usize = 50;
const REQUIREMENTS_PER_DOCUMENT: usize = 200;

/// Each requirement is a child of the previous one in the same document and
/// of the first requirement of the previous document.
fn generate() -> Vec<Document> {
    (0..DOCUMENTS)
        .map(|doc| {
            let mut text = format!("# Document {doc}\n\nSome prose.\n\n");
            for i in 0..REQUIREMENTS_PER_DOCUMENT {
                let n = doc * REQUIREMENTS_PER_DOCUMENT + i;
                writeln!(text, "> REQ-{n}\n> Requirement number {n}").unwrap();
                if n % 7 == 0 {
                    writeln!(text, "> critical").unwrap();
                }
                if i > 0 {
                    writeln!(text, "> child-of: REQ-{}", n - 1).unwrap();
                }
                if doc > 0 && i == 0 {
                    writeln!(text, "> child-of: REQ-{}", n - REQUIREMENTS_PER_DOCUMENT).unwrap();
                }
                text.push('\n');
            }
            Document::new(format!("doc-{doc}.md"), text)
        })
        .collect()
}

fn parse_many(c: &mut Criterion) {
    let documents = generate();

    c.bench_function("load documents", |b| {
        b.iter(|| load(black_box(&documents)).unwrap());
    });

    let graph = load(&documents).unwrap();
    let snapshot = Snapshot::from_graph(&graph);

    c.bench_function("diff against snapshot", |b| {
        b.iter(|| diff(black_box(&snapshot), black_box(&graph)));
    });
}

criterion_group!(benches, parse_many);
criterion_main!(benches);
