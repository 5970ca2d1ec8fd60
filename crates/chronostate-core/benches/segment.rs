use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chronostate_core::segment::{encode, segment_at, PAGE_LIMIT};

fn bench_encode(c: &mut Criterion) {
    let records: Vec<u64> = (0..10_000).collect();

    c.bench_function("encode 10k", |b| {
        b.iter(|| encode(black_box(records.clone()), PAGE_LIMIT))
    });

    c.bench_function("segment_at 10k middle", |b| {
        b.iter(|| segment_at(black_box(&records), PAGE_LIMIT, 50))
    });
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
