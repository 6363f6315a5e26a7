use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pullstream::{CollectSubscriber, Pipeline};
use std::sync::Arc;

fn bench_pipeline(c: &mut Criterion) {
    c.bench_function("map_filter_collect_10k", |b| {
        b.iter(|| {
            let collected = Pipeline::from_iter(0..10_000i64)
                .map(|x| x * 2)
                .filter(|x| x % 4 == 0)
                .collect()
                .unwrap();
            black_box(collected)
        })
    });

    c.bench_function("one_at_a_time_pull_10k", |b| {
        b.iter(|| {
            let pipeline = Pipeline::from_iter(0..10_000i64).map(|x| x + 1);
            let collector = Arc::new(CollectSubscriber::one_by_one());
            pipeline.subscribe(collector.clone());
            black_box(collector.take_items())
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
