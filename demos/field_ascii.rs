use boundary_mlp::shader::{self, FieldPalette};
use boundary_mlp::{DatasetKind, OptimizerConfig, Scene, SceneSettings, TrainerConfig};

const RES: usize = 40;

fn main() {
    let config = TrainerConfig {
        optimizer: OptimizerConfig::adam(0.02, 0.9, 0.999, 1e-8),
        auto_max_steps: 2000,
        target_loss: 0.02,
        ..TrainerConfig::default()
    };
    let settings = SceneSettings {
        dataset_kind: DatasetKind::ConcentricCircles,
        num_points: 800,
        spread: 0.1,
        ..SceneSettings::default()
    };
    let mut scene = Scene::new(config, settings);
    scene.set_topology(boundary_mlp::Topology::new(8, 8));

    // Host loop: train while auto is on, redraw whenever a snapshot comes back.
    scene.set_auto_train(true);
    let mut snapshot = None;
    let mut redraws = 0;
    while scene.is_auto_training() {
        if let Some(s) = scene.tick() {
            snapshot = Some(s);
            redraws += 1;
        }
    }
    let Some(snapshot) = snapshot else {
        return;
    };

    println!(
        "steps={} loss={:.4} accuracy={:.3} redraws={redraws}",
        scene.step_count(),
        scene.last_loss(),
        scene.last_accuracy()
    );

    // Render the shader's output by its red channel: blue-ish is class 0, orange class 1.
    let palette = FieldPalette::default();
    let colors = shader::shade_grid(&snapshot, &palette, RES);
    for j in (0..RES).rev() {
        let line: String = colors[j * RES..(j + 1) * RES]
            .iter()
            .map(|c| {
                if *c == palette.neutral {
                    '?'
                } else if c[0] < 0.45 {
                    '.'
                } else if c[0] > 0.75 {
                    '#'
                } else {
                    '+'
                }
            })
            .collect();
        println!("{line}");
    }

    scene.set_probe_enabled(true);
    scene.set_probe(0.0, 0.0);
    if let Some(probe) = scene.probe() {
        println!(
            "probe (0, 0): class {} p={:?} hidden2={:?}",
            probe.predicted(),
            probe.probs,
            probe.hidden2()
        );
    }
}
