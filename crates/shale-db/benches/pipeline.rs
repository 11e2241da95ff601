use bson::{Document, doc};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use shale_db::{
    DistinctOptions, FindOptions, Pipeline, UpdateOptions, UpdateStatement, ValuesIter, update_many,
};
use shale_query::QueryConfig;

// ── Helpers ─────────────────────────────────────────────────

const STATUSES: &[&str] = &["active", "rejected", "trial"];
const TAGS: &[&str] = &["renewal_due", "high_value", "churning", "new_customer", "enterprise"];

fn generate_docs(n: usize) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|i| {
            let tags: Vec<&str> = (0..rng.gen_range(0..=3))
                .map(|_| TAGS[rng.gen_range(0..TAGS.len())])
                .collect();
            doc! {
                "_id": format!("acct-{i}"),
                "name": format!("Company-{i}"),
                "status": STATUSES[rng.gen_range(0..STATUSES.len())],
                "score": rng.gen_range(0_i32..100),
                "tags": tags,
            }
        })
        .collect()
}

fn run(pipeline: Pipeline<'_>) -> usize {
    pipeline.collect().unwrap().len()
}

// ── Benchmarks ──────────────────────────────────────────────

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");
    let config = QueryConfig::default();
    for n in [100, 1_000, 10_000] {
        let docs = generate_docs(n);

        group.bench_with_input(BenchmarkId::new("filter", n), &n, |b, _| {
            let options = FindOptions {
                filter: doc! { "status": "active", "score": { "$gte": 50 } },
                ..FindOptions::default()
            };
            b.iter_batched(
                || Box::new(ValuesIter::new(docs.clone())),
                |source| run(Pipeline::find(source, &options, &config).unwrap()),
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("filter+sort+limit", n), &n, |b, _| {
            let options = FindOptions {
                filter: doc! { "tags": "enterprise" },
                sort: Some(doc! { "score": -1 }),
                limit: 10,
                projection: Some(doc! { "name": 1, "score": 1 }),
                ..FindOptions::default()
            };
            b.iter_batched(
                || Box::new(ValuesIter::new(docs.clone())),
                |source| run(Pipeline::find(source, &options, &config).unwrap()),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_aggregates(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregates");
    let config = QueryConfig::default();
    for n in [1_000, 10_000] {
        let docs = generate_docs(n);

        group.bench_with_input(BenchmarkId::new("count", n), &n, |b, _| {
            let filter = doc! { "status": { "$in": ["active", "trial"] } };
            b.iter_batched(
                || Box::new(ValuesIter::new(docs.clone())),
                |source| run(Pipeline::count(source, &filter, &config).unwrap()),
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("distinct", n), &n, |b, _| {
            let options = DistinctOptions {
                key: "tags".into(),
                filter: doc! {},
            };
            b.iter_batched(
                || Box::new(ValuesIter::new(docs.clone())),
                |source| run(Pipeline::distinct(source, &options, &config).unwrap()),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    let config = QueryConfig::default();
    for n in [1_000, 10_000] {
        let docs = generate_docs(n);
        let statements = [UpdateStatement {
            filter: doc! { "status": "active" },
            update: doc! { "$inc": { "score": 1 }, "$addToSet": { "tags": "touched" } },
            multi: true,
        }];

        group.bench_with_input(BenchmarkId::new("multi", n), &n, |b, _| {
            b.iter_batched(
                || docs.clone(),
                |mut docs| {
                    let outcome = update_many(&mut docs, &statements, &UpdateOptions::default(), &config);
                    assert!(outcome.write_errors.is_empty());
                    outcome.modified
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find, bench_aggregates, bench_update);
criterion_main!(benches);
