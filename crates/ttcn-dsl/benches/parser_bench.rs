use criterion::{black_box, criterion_group, criterion_main, Criterion};

const ALT_BASIC: &str = include_str!("../../../samples/alt_basic.ttcn");
const CALL_RESPONSE: &str = include_str!("../../../samples/call_response.ttcn");
const INTERLEAVE: &str = include_str!("../../../samples/interleave.ttcn");

fn bench_parse_alt(c: &mut Criterion) {
    c.bench_function("parse_alt_basic", |b| {
        b.iter(|| ttcn_dsl::parse(black_box(ALT_BASIC), "alt_basic.ttcn").unwrap())
    });
}

fn bench_parse_call(c: &mut Criterion) {
    c.bench_function("parse_call_response", |b| {
        b.iter(|| ttcn_dsl::parse(black_box(CALL_RESPONSE), "call_response.ttcn").unwrap())
    });
}

fn bench_parse_interleave(c: &mut Criterion) {
    c.bench_function("parse_interleave", |b| {
        b.iter(|| ttcn_dsl::parse(black_box(INTERLEAVE), "interleave.ttcn").unwrap())
    });
}

criterion_group!(
    benches,
    bench_parse_alt,
    bench_parse_call,
    bench_parse_interleave
);
criterion_main!(benches);
