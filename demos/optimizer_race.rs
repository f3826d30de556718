use boundary_mlp::{Dataset, DatasetKind, OptimizerConfig, Trainer, TrainerConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() {
    let mut rng = StdRng::seed_from_u64(7);
    let train = Dataset::generate(DatasetKind::TwoMoons, 600, 0.15, &mut rng);

    // Same seed and data for every optimizer, so only the update rule differs.
    let contenders = [
        OptimizerConfig::sgd(0.1),
        OptimizerConfig::momentum(0.05, 0.9),
        OptimizerConfig::adam(0.01, 0.9, 0.999, 1e-8),
    ];

    for optimizer in contenders {
        let mut trainer = Trainer::new(TrainerConfig {
            optimizer,
            auto_max_steps: 3000,
            target_loss: 0.05,
            ..TrainerConfig::default()
        });
        trainer.set_auto_train(true);
        while trainer.step_auto(&train) {}

        let losses = trainer.history().losses();
        let checkpoints: Vec<String> = [0, 100, 500, 1000]
            .iter()
            .filter_map(|&i| losses.get(i).map(|l| format!("{i}:{l:.3}")))
            .collect();
        println!(
            "{:<9} steps={:<5} loss={:.4} acc={:.3} [{}]",
            optimizer.kind.name(),
            trainer.step_count(),
            trainer.last_loss(),
            trainer.last_accuracy(),
            checkpoints.join(" ")
        );
    }
}
