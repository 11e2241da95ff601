mod common;
use common::*;

use bson::doc;
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use shale_query::sort_documents;

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    for n in [100, 1_000, 10_000] {
        let docs = generate_docs(n);

        group.bench_with_input(BenchmarkId::new("single", n), &n, |b, _| {
            let spec = doc! { "score": -1 };
            b.iter_batched(
                || docs.clone(),
                |mut docs| sort_documents(&mut docs, &spec).unwrap(),
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("multi", n), &n, |b, _| {
            let spec = doc! { "status": 1, "address.city": 1, "score": -1 };
            b.iter_batched(
                || docs.clone(),
                |mut docs| sort_documents(&mut docs, &spec).unwrap(),
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("array", n), &n, |b, _| {
            let spec = doc! { "tags": 1 };
            b.iter_batched(
                || docs.clone(),
                |mut docs| sort_documents(&mut docs, &spec).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sort);
criterion_main!(benches);
