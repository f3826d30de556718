use boundary_mlp::{
    Dataset, DatasetKind, InitMode, OptimizerKind, Sample, Topology, Trainer, TrainerConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn numbered(n: usize) -> Dataset {
    let samples = (0..n)
        .map(|i| Sample::new(i as f32 * 0.1, -(i as f32) * 0.1, i % 2))
        .collect();
    Dataset::from_samples(samples).unwrap()
}

fn blobs(n: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(3);
    Dataset::generate(DatasetKind::TwoBlobs, n, 0.2, &mut rng)
}

#[test]
fn batches_cycle_round_robin() {
    let data = numbered(5);
    let mut trainer = Trainer::default();
    trainer.set_batch_size(1);

    let mut seen = Vec::new();
    for _ in 0..10 {
        let batch = trainer.make_batch(&data);
        assert_eq!(batch.len(), 1);
        seen.push(batch[0]);
    }
    let first: Vec<Sample> = data.samples().to_vec();
    assert_eq!(&seen[..5], first.as_slice());
    assert_eq!(&seen[5..], first.as_slice());
}

#[test]
fn empty_dataset_is_a_no_op() {
    let empty = Dataset::empty();
    let mut trainer = Trainer::default();
    assert!(trainer.make_batch(&empty).is_empty());

    let before = trainer.network().snapshot();
    let report = trainer.step_once(&empty);
    assert_eq!(report.samples, 0);
    assert_eq!(report.loss, 0.0);
    assert_eq!(trainer.step_count(), 0);
    assert!(trainer.history().is_empty());
    assert_eq!(trainer.network().snapshot(), before);

    trainer.set_auto_train(true);
    assert!(!trainer.step_auto(&empty));
}

#[test]
fn step_once_records_history() {
    let data = blobs(100);
    let mut trainer = Trainer::default();
    for _ in 0..5 {
        trainer.step_once(&data);
    }
    assert_eq!(trainer.step_count(), 5);
    assert_eq!(trainer.history().len(), 5);
    let last = trainer.history().last().unwrap();
    assert_eq!(last.loss, trainer.last_loss());
    assert_eq!(last.accuracy, trainer.last_accuracy());
}

#[test]
fn bounded_history_keeps_newest_entries() {
    let data = blobs(50);
    let mut trainer = Trainer::new(TrainerConfig {
        history_capacity: 4,
        ..TrainerConfig::default()
    });
    let mut losses = Vec::new();
    for _ in 0..10 {
        losses.push(trainer.step_once(&data).loss);
    }
    assert_eq!(trainer.history().losses(), losses[6..].to_vec());
}

#[test]
fn settings_are_pushed_into_the_network_on_step() {
    let data = blobs(50);
    let mut trainer = Trainer::default();
    trainer.set_learning_rate(0.02);
    trainer.set_optimizer_kind(OptimizerKind::Adam);
    assert_eq!(trainer.network().learning_rate(), 0.1);

    trainer.step_once(&data);
    assert_eq!(trainer.network().learning_rate(), 0.02);
    assert_eq!(trainer.network().optimizer().kind, OptimizerKind::Adam);
    assert_eq!(trainer.network().optimizer_state().step_count(), 1);
}

#[test]
fn auto_training_stops_at_max_steps() {
    let data = blobs(100);
    let mut trainer = Trainer::new(TrainerConfig {
        auto_max_steps: 7,
        target_loss_enabled: false,
        ..TrainerConfig::default()
    });

    assert!(!trainer.step_auto(&data), "auto is off by default");
    trainer.set_auto_train(true);
    let mut ticks = 0;
    while trainer.step_auto(&data) {
        ticks += 1;
        assert!(ticks <= 7);
    }
    assert_eq!(ticks, 7);
    assert_eq!(trainer.step_count(), 7);
    assert!(!trainer.is_auto_training());
}

#[test]
fn auto_training_stops_at_target_loss() {
    let data = blobs(100);
    let mut trainer = Trainer::new(TrainerConfig {
        auto_max_steps: 0,
        target_loss: 10.0,
        target_loss_enabled: true,
        ..TrainerConfig::default()
    });
    trainer.set_auto_train(true);
    assert!(trainer.step_auto(&data));
    assert!(!trainer.is_auto_training());
    assert_eq!(trainer.step_count(), 1);
}

#[test]
fn zero_max_steps_disables_the_bound() {
    let data = blobs(100);
    let mut trainer = Trainer::new(TrainerConfig {
        auto_max_steps: 0,
        target_loss_enabled: false,
        ..TrainerConfig::default()
    });
    trainer.set_auto_train(true);
    for _ in 0..3000 {
        assert!(trainer.step_auto(&data));
    }
    assert!(trainer.is_auto_training());
    assert_eq!(trainer.step_count(), 3000);
}

#[test]
fn reset_for_new_dataset_clears_everything() {
    let data = blobs(80);
    let mut trainer = Trainer::default();
    let fresh = trainer.network().snapshot();

    trainer.set_auto_train(true);
    for _ in 0..12 {
        trainer.step_once(&data);
    }
    assert_eq!(trainer.step_count(), 12);

    trainer.reset_for_new_dataset();
    assert_eq!(trainer.step_count(), 0);
    assert_eq!(trainer.last_loss(), 0.0);
    assert_eq!(trainer.last_accuracy(), 0.0);
    assert!(trainer.history().is_empty());
    assert!(!trainer.is_auto_training());
    assert_eq!(trainer.cursor(), 0);
    // Same seed and init mode reproduce the starting parameters.
    assert_eq!(trainer.network().snapshot(), fresh);
}

#[test]
fn init_mode_applies_on_reset() {
    let mut trainer = Trainer::default();
    trainer.set_init_mode(InitMode::Zero);
    assert!(trainer.network().w1().iter().any(|&w| w != 0.0));
    trainer.reset_for_new_dataset();
    assert!(trainer.network().w1().iter().all(|&w| w == 0.0));
}

#[test]
fn set_topology_resizes_and_resets() {
    let data = blobs(60);
    let mut trainer = Trainer::default();
    trainer.step_once(&data);

    trainer.set_topology(Topology::new(12, 3));
    assert_eq!(trainer.config().topology, Topology::new(12, 3));
    assert_eq!(trainer.network().w2().len(), 3 * 12);
    assert_eq!(trainer.step_count(), 0);
    assert!(trainer.history().is_empty());

    let report = trainer.step_once(&data);
    assert_eq!(report.samples, trainer.batch_size());
}
