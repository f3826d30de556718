use boundary_mlp::{Dataset, OptimizerConfig, Trainer, TrainerConfig};

fn main() -> boundary_mlp::Result<()> {
    // Two hand-placed clusters either side of the y axis.
    let points: [[f32; 2]; 8] = [
        [-0.6, 0.1],
        [-0.5, -0.2],
        [-0.4, 0.3],
        [-0.7, -0.1],
        [0.6, -0.1],
        [0.5, 0.2],
        [0.4, -0.3],
        [0.7, 0.1],
    ];
    let labels: [usize; 8] = [0, 0, 0, 0, 1, 1, 1, 1];
    let train = Dataset::from_rows(&points, &labels)?;

    let mut trainer = Trainer::new(TrainerConfig {
        batch_size: 8,
        optimizer: OptimizerConfig::momentum(0.1, 0.9),
        auto_max_steps: 500,
        target_loss: 0.01,
        ..TrainerConfig::default()
    });

    trainer.set_auto_train(true);
    while trainer.step_auto(&train) {}

    println!(
        "steps={} loss={:.5} accuracy={:.3}",
        trainer.step_count(),
        trainer.last_loss(),
        trainer.last_accuracy()
    );

    let net = trainer.network();
    for p in points {
        let [p0, p1] = net.forward_single(p[0], p[1]);
        println!("x={p:?} p0={p0:.3} p1={p1:.3}");
    }

    Ok(())
}
