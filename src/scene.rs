//! Scene context: one per running visualizer instance.
//!
//! Owns the dataset, the trainer and the cosmetic settings a host UI edits, and
//! tracks whether the decision field needs to be redrawn. Hosts drive it through
//! the setters and call [`Scene::tick`] once per frame.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::shader::{FieldPalette, FieldUniforms};
use crate::{
    BatchReport, Dataset, DatasetKind, InitMode, OptimizerKind, ParamSnapshot, Probe, Topology,
    Trainer, TrainerConfig,
};

pub const MIN_POINTS: usize = 10;
pub const DEFAULT_MAX_POINTS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    pub dataset_kind: DatasetKind,
    pub num_points: usize,
    pub spread: f32,
    pub point_size: f32,
    pub max_points: usize,
    pub probe_enabled: bool,
    pub probe: (f32, f32),
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            dataset_kind: DatasetKind::TwoBlobs,
            num_points: 1000,
            spread: 0.25,
            point_size: 6.0,
            max_points: DEFAULT_MAX_POINTS,
            probe_enabled: false,
            probe: (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    settings: SceneSettings,
    dataset: Dataset,
    trainer: Trainer,
    palette: FieldPalette,
    data_rng: StdRng,
    field_dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(TrainerConfig::default(), SceneSettings::default())
    }
}

impl Scene {
    /// Build a scene and generate its first dataset.
    ///
    /// The dataset generator is seeded from `config.seed`.
    pub fn new(config: TrainerConfig, settings: SceneSettings) -> Self {
        let mut scene = Self {
            settings,
            dataset: Dataset::empty(),
            trainer: Trainer::new(config),
            palette: FieldPalette::default(),
            data_rng: StdRng::seed_from_u64(config.seed),
            field_dirty: true,
        };
        scene.settings.max_points = scene.settings.max_points.max(MIN_POINTS);
        scene.set_dataset(settings.dataset_kind, settings.num_points, settings.spread);
        scene
    }

    /// Regenerate the dataset and restart training on it.
    ///
    /// `num_points` is clamped to `[MIN_POINTS, max_points]`.
    pub fn set_dataset(&mut self, kind: DatasetKind, num_points: usize, spread: f32) {
        let num_points = num_points.clamp(MIN_POINTS, self.settings.max_points);
        let spread = if spread.is_finite() { spread.max(0.0) } else { 0.0 };
        self.settings.dataset_kind = kind;
        self.settings.num_points = num_points;
        self.settings.spread = spread;

        self.dataset = Dataset::generate(kind, num_points, spread, &mut self.data_rng);
        self.trainer.reset_for_new_dataset();
        self.field_dirty = true;
        debug!(kind = kind.name(), num_points, spread, "dataset regenerated");
    }

    /// Replace the dataset with caller-supplied samples and restart training.
    pub fn set_custom_dataset(&mut self, dataset: Dataset) {
        self.settings.num_points = dataset.len();
        self.dataset = dataset;
        self.trainer.reset_for_new_dataset();
        self.field_dirty = true;
    }

    /// Per-frame update: one auto-training step if enabled.
    ///
    /// Returns a parameter snapshot when the field must be redrawn, at most once
    /// per call and always after the step has completed.
    pub fn tick(&mut self) -> Option<ParamSnapshot> {
        if self.trainer.step_auto(&self.dataset) {
            self.field_dirty = true;
        }
        self.take_field_update()
    }

    /// Snapshot for the field if anything changed since the last one.
    pub fn take_field_update(&mut self) -> Option<ParamSnapshot> {
        if !self.field_dirty {
            return None;
        }
        self.field_dirty = false;
        Some(self.trainer.network().snapshot())
    }

    #[inline]
    pub fn is_field_dirty(&self) -> bool {
        self.field_dirty
    }

    pub fn mark_field_dirty(&mut self) {
        self.field_dirty = true;
    }

    /// One manual training step.
    pub fn step_train(&mut self) -> BatchReport {
        let report = self.trainer.step_once(&self.dataset);
        self.field_dirty = true;
        report
    }

    /// Reinitialize the network on the current dataset.
    pub fn reset_training(&mut self) {
        self.trainer.reset_for_new_dataset();
        self.field_dirty = true;
    }

    /// Change hidden widths. This resets training.
    pub fn set_topology(&mut self, topology: Topology) {
        self.trainer.set_topology(topology);
        self.field_dirty = true;
    }

    /// Inference at the probe point, if probing is enabled.
    pub fn probe(&self) -> Option<Probe> {
        if !self.settings.probe_enabled {
            return None;
        }
        let (x, y) = self.settings.probe;
        Some(
            self.trainer
                .network()
                .forward_single_with_activations(x, y),
        )
    }

    pub fn set_probe(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.settings.probe = (x, y);
        }
    }

    pub fn set_probe_enabled(&mut self, enabled: bool) {
        self.settings.probe_enabled = enabled;
    }

    /// At least 1.
    pub fn set_point_size(&mut self, size: f32) {
        self.settings.point_size = if size.is_nan() { 1.0 } else { size.max(1.0) };
    }

    pub fn set_palette(&mut self, palette: FieldPalette) {
        self.palette = palette;
        self.field_dirty = true;
    }

    /// Uniform block for the field shader at the current topology.
    pub fn field_uniforms(&self) -> FieldUniforms {
        FieldUniforms::new(self.trainer.network().topology(), &self.palette)
    }

    pub fn set_auto_train(&mut self, on: bool) {
        self.trainer.set_auto_train(on);
    }

    pub fn set_learning_rate(&mut self, lr: f32) {
        self.trainer.set_learning_rate(lr);
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.trainer.set_batch_size(batch_size);
    }

    pub fn set_optimizer_kind(&mut self, kind: OptimizerKind) {
        self.trainer.set_optimizer_kind(kind);
    }

    pub fn set_optimizer_hyperparams(&mut self, momentum: f32, beta1: f32, beta2: f32, eps: f32) {
        self.trainer
            .set_optimizer_hyperparams(momentum, beta1, beta2, eps);
    }

    pub fn set_init_mode(&mut self, mode: InitMode) {
        self.trainer.set_init_mode(mode);
    }

    pub fn set_auto_max_steps(&mut self, steps: u64) {
        self.trainer.set_auto_max_steps(steps);
    }

    pub fn set_target_loss(&mut self, target: f32, enabled: bool) {
        self.trainer.set_target_loss(target);
        self.trainer.set_target_loss_enabled(enabled);
    }

    #[inline]
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    #[inline]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[inline]
    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    #[inline]
    pub fn trainer_mut(&mut self) -> &mut Trainer {
        &mut self.trainer
    }

    #[inline]
    pub fn palette(&self) -> &FieldPalette {
        &self.palette
    }

    #[inline]
    pub fn last_loss(&self) -> f32 {
        self.trainer.last_loss()
    }

    #[inline]
    pub fn last_accuracy(&self) -> f32 {
        self.trainer.last_accuracy()
    }

    #[inline]
    pub fn step_count(&self) -> u64 {
        self.trainer.step_count()
    }

    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.trainer.learning_rate()
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.trainer.batch_size()
    }

    #[inline]
    pub fn is_auto_training(&self) -> bool {
        self.trainer.is_auto_training()
    }
}
