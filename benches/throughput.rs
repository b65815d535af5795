use criterion::{black_box, criterion_group, criterion_main, Criterion};
use radio_pipeline::{EnvelopeDetector, MapTransform, PipelineBuilder};
use std::time::Duration;

fn benchmark_envelope_throughput(c: &mut Criterion) {
    let samples: Vec<f32> = (0..10_000).map(|i| (i as f32).sin()).collect();

    for workers in [1, 3, 8] {
        let pipeline = PipelineBuilder::new()
            .name("bench")
            .workers(workers)
            .capacity(64)
            .build(EnvelopeDetector::new())
            .expect("Build failed");

        c.bench_function(&format!("envelope_10000_samples_{workers}_workers"), |b| {
            b.iter(|| {
                let out = pipeline
                    .process(black_box(samples.clone()))
                    .expect("Run failed");
                black_box(out.len())
            });
        });
    }
}

fn benchmark_small_capacity(c: &mut Criterion) {
    let pipeline = PipelineBuilder::new()
        .name("tight")
        .workers(3)
        .capacity(2)
        .build(MapTransform::new("square", |x: u64| x.wrapping_mul(x)))
        .expect("Build failed");

    c.bench_function("capacity_2_5000_items", |b| {
        b.iter(|| {
            let out = pipeline.process(black_box(0..5_000u64)).expect("Run failed");
            black_box(out.len())
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_envelope_throughput, benchmark_small_capacity
);
criterion_main!(benches);
