use criterion::{Criterion, black_box, criterion_group, criterion_main};

use boundary_mlp::shader::{self, FieldPalette};
use boundary_mlp::{
    Dataset, DatasetKind, InitMode, MAX_BATCH, Network, OptimizerConfig, OptimizerKind, Topology,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn moons(n: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(0);
    Dataset::generate(DatasetKind::TwoMoons, n, 0.2, &mut rng)
}

fn train_batch_bench(c: &mut Criterion) {
    let data = moons(MAX_BATCH);
    let batch = data.samples();

    for kind in OptimizerKind::ALL {
        let mut net = Network::new(Topology::new(16, 16), InitMode::HeUniform, 0);
        net.set_optimizer(OptimizerConfig::default().with_kind(kind).with_lr(0.01));
        c.bench_function(&format!("train_batch_256_16_16_{}", kind.name()), |b| {
            b.iter(|| {
                let report = net.train_batch(black_box(batch));
                black_box(report);
            })
        });
    }
}

fn forward_grid_bench(c: &mut Criterion) {
    let net = Network::new(Topology::default(), InitMode::HeUniform, 0);
    let snapshot = net.snapshot();
    let palette = FieldPalette::default();

    c.bench_function("decision_grid_64", |b| {
        b.iter(|| black_box(shader::decision_grid(black_box(&net), 64)))
    });
    c.bench_function("shade_grid_64", |b| {
        b.iter(|| black_box(shader::shade_grid(black_box(&snapshot), &palette, 64)))
    });
}

criterion_group!(benches, train_batch_bench, forward_grid_bench);
criterion_main!(benches);
