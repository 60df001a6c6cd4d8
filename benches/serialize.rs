//! Benchmarks for Markdown export and the math scanner.
//!
//! Run with: cargo bench

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use livemark::math::{find_math_spans, restore_underscores};
use livemark::{parse_html, serialize};

const ANSWER: &str = include_str!("../tests/fixtures/chat_answer.html");

/// A long conversation built from the fixture answer.
fn conversation(messages: usize) -> String {
    let body_start = ANSWER.find("<main").unwrap();
    let body_end = ANSWER.find("</main>").unwrap() + "</main>".len();
    ANSWER[body_start..body_end].repeat(messages)
}

fn math_heavy_text(formulas: usize) -> String {
    (0..formulas)
        .map(|i| format!("Step {i}: with $x_{i} + y^{i}$ we get \\[\\sum_k a_k\\] and cost $5. "))
        .collect()
}

// ============================================================================
// Parsing and serialization
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let html = conversation(20);
    c.bench_function("parse_conversation", |b| {
        b.iter(|| parse_html(black_box(&html)));
    });
}

fn bench_serialize(c: &mut Criterion) {
    let tree = parse_html(&conversation(20));
    c.bench_function("serialize_conversation", |b| {
        b.iter(|| serialize(black_box(&tree), tree.body()));
    });
}

// ============================================================================
// Math
// ============================================================================

fn bench_find_math_spans(c: &mut Criterion) {
    let text = math_heavy_text(500);
    c.bench_function("find_math_spans", |b| {
        b.iter(|| find_math_spans(black_box(&text)));
    });
}

fn bench_restore_underscores(c: &mut Criterion) {
    let html: String = (0..200)
        .map(|i| format!("<p>Let $a<em>{i}</em>b$ and $c<strong>d</strong>e$ hold.</p>"))
        .collect();
    c.bench_function("restore_underscores", |b| {
        b.iter_batched(
            || parse_html(&html),
            |mut tree| {
                let body = tree.body();
                restore_underscores(&mut tree, body)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_serialize,
    bench_find_math_spans,
    bench_restore_underscores
);
criterion_main!(benches);
