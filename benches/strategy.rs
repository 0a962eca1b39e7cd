//! Benchmarks for forest training and strategy evaluation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vaxflow::prelude::*;
use vaxflow::synthetic::generate_areas;

fn trained(n_samples: usize, n_estimators: usize) -> TrainedPipeline {
    let df = generate(n_samples, 42).unwrap();
    DualModelTrainer::new(TrainerConfig::default().with_n_estimators(n_estimators))
        .train(&df)
        .unwrap()
}

fn bench_train(c: &mut Criterion) {
    let mut group = c.benchmark_group("dual_model_train");
    group.sample_size(10);

    for size in [250, 1000].iter() {
        let df = generate(*size, 42).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                DualModelTrainer::new(TrainerConfig::default().with_n_estimators(25))
                    .train(black_box(&df))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let pipeline = trained(1000, 100);
    let area = AreaRecord::from_array([150_000.0, 0.35, 2500.0, 3.5, 75.0, 0.85, 45.0]);
    let engine = StrategyEngine::new();

    c.bench_function("strategy_evaluate", |b| {
        b.iter(|| {
            engine
                .evaluate(black_box(&area), pipeline.processor(), pipeline.models())
                .unwrap()
        });
    });
}

fn bench_batch(c: &mut Criterion) {
    let pipeline = trained(1000, 100);
    let mut group = c.benchmark_group("strategy_batch");

    for size in [10, 100, 1000].iter() {
        let rows: Vec<FieldMap> = generate_areas(*size, 7)
            .unwrap()
            .iter()
            .map(AreaRecord::to_mapping)
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| evaluate_batch(black_box(&rows), pipeline.processor(), pipeline.models()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_train, bench_evaluate, bench_batch);
criterion_main!(benches);
