use criterion::{criterion_group, criterion_main, Criterion};
use lakbay::lexer::Lexer;
use std::hint::black_box;

static INPUT: &str = include_str!("../programs/shapes.lakbay");

fn lexer(input: &str) {
    let mut i = 0;
    for token in Lexer::new(input) {
        if token.is_err() {
            break;
        }
        i += 1;
    }
    black_box(i);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("lexer", |b| {
        b.iter(|| {
            lexer(black_box(INPUT));
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
