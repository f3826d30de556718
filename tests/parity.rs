//! The CPU forward pass and the shader's formula must agree on the class-1 probability.

use approx::assert_abs_diff_eq;
use boundary_mlp::shader::{self, DEFAULT_RESOLUTION, FieldPalette};
use boundary_mlp::{
    Dataset, DatasetKind, InitMode, Network, ParamSnapshot, Topology, Trainer, TrainerConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn assert_grid_parity(net: &Network) {
    let snapshot = net.snapshot();
    let cpu = shader::decision_grid(net, DEFAULT_RESOLUTION);
    for j in 0..DEFAULT_RESOLUTION {
        let y = shader::grid_coord(j, DEFAULT_RESOLUTION);
        for i in 0..DEFAULT_RESOLUTION {
            let x = shader::grid_coord(i, DEFAULT_RESOLUTION);
            let gpu = shader::probability(&snapshot, x, y).expect("finite parameters");
            assert_abs_diff_eq!(cpu[j * DEFAULT_RESOLUTION + i], gpu, epsilon = 1e-4);
        }
    }
}

#[test]
fn constant_parameters_agree_on_the_grid() {
    let mut net = Network::default();
    net.load_parameters(&ParamSnapshot::filled(Topology::default(), 0.1, 0.0))
        .unwrap();
    assert_grid_parity(&net);
}

#[test]
fn trained_parameters_agree_for_several_topologies() {
    let mut rng = StdRng::seed_from_u64(2);
    let data = Dataset::generate(DatasetKind::XorQuads, 400, 0.3, &mut rng);

    for (h1, h2) in [(4, 8), (1, 1), (16, 16), (3, 11)] {
        let mut trainer = Trainer::new(TrainerConfig {
            topology: Topology::new(h1, h2),
            init_mode: InitMode::HeNormal,
            ..TrainerConfig::default()
        });
        for _ in 0..200 {
            trainer.step_once(&data);
        }
        assert_grid_parity(trainer.network());
    }
}

#[test]
fn shaded_colors_follow_the_cpu_probability() {
    let net = Network::new(Topology::new(5, 6), InitMode::HeUniform, 17);
    let snapshot = net.snapshot();
    let palette = FieldPalette::default();
    let res = 16;

    let colors = shader::shade_grid(&snapshot, &palette, res);
    let probs = shader::decision_grid(&net, res);
    assert_eq!(colors.len(), probs.len());

    for (c, &p1) in colors.iter().zip(&probs) {
        let expected_r = palette.color0[0] * (1.0 - p1) + palette.color1[0] * p1;
        assert_abs_diff_eq!(c[0], expected_r, epsilon = 1e-4);
        assert_eq!(c[3], palette.alpha);
    }
}

#[test]
fn both_paths_fall_back_on_degenerate_logits() {
    let mut snap = ParamSnapshot::filled(Topology::default(), 0.1, 0.0);
    snap.b3 = vec![f32::INFINITY, f32::INFINITY];

    let palette = FieldPalette::default();
    assert_eq!(shader::shade(&snap, &palette, 0.2, 0.2), palette.neutral);

    // Loading rejects non-finite values, so the CPU path is checked through the
    // largest finite bias instead: both logits overflow to +inf in the sum.
    snap.b3 = vec![f32::MAX, f32::MAX];
    snap.w3 = vec![f32::MAX; snap.w3.len()];
    let mut net = Network::default();
    net.load_parameters(&snap).unwrap();
    assert_eq!(net.forward_single(0.5, 0.5), [0.5, 0.5]);
    assert_eq!(shader::probability(&snap, 0.5, 0.5), None);
}
