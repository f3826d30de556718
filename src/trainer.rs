//! Training controller.
//!
//! Draws batches round-robin from a dataset, runs one network step per call and
//! keeps the loss/accuracy history. Auto-training repeats that once per external
//! tick until a step bound or a target loss is reached.

use tracing::{debug, info, trace};

use crate::{
    BatchReport, Dataset, History, InitMode, MAX_BATCH, Network, OptimizerConfig, OptimizerKind,
    Sample, Topology, TrainerConfig, clamp_batch_size,
};

#[derive(Debug, Clone)]
pub struct Trainer {
    net: Network,
    config: TrainerConfig,
    step_count: u64,
    last_loss: f32,
    last_accuracy: f32,
    history: History,
    auto_train: bool,
    cursor: usize,
    batch: Vec<Sample>,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

/// Why auto-training stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxSteps,
    TargetLoss,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        let config = config.clamped();
        let mut net = Network::new(config.topology, config.init_mode, config.seed);
        net.set_optimizer(config.optimizer);
        Self {
            net,
            config,
            step_count: 0,
            last_loss: 0.0,
            last_accuracy: 0.0,
            history: History::with_capacity(config.history_capacity),
            auto_train: false,
            cursor: 0,
            batch: Vec::with_capacity(MAX_BATCH),
        }
    }

    /// Fill the batch buffer with `batch_size` samples starting at the cursor.
    ///
    /// The cursor wraps, so over many calls every sample is drawn equally often.
    /// Returns an empty slice for an empty dataset.
    pub fn make_batch(&mut self, dataset: &Dataset) -> &[Sample] {
        self.fill_batch(dataset);
        &self.batch
    }

    fn fill_batch(&mut self, dataset: &Dataset) {
        self.batch.clear();
        let n = dataset.len();
        if n == 0 {
            return;
        }
        // The dataset may have shrunk since the last call.
        self.cursor %= n;
        for _ in 0..self.config.batch_size {
            self.batch.push(dataset.sample(self.cursor));
            self.cursor = (self.cursor + 1) % n;
        }
    }

    /// Push the current settings into the network, train on one batch and record
    /// the result.
    ///
    /// On an empty dataset nothing happens and a zero report is returned.
    pub fn step_once(&mut self, dataset: &Dataset) -> BatchReport {
        self.net.set_optimizer(self.config.optimizer);
        self.net.set_init_mode(self.config.init_mode);

        self.fill_batch(dataset);
        if self.batch.is_empty() {
            return BatchReport::default();
        }

        let report = self.net.train_batch(&self.batch);
        self.step_count += 1;
        self.last_loss = report.loss;
        self.last_accuracy = report.accuracy;
        self.history.push(report.loss, report.accuracy);

        trace!(
            step = self.step_count,
            loss = report.loss,
            accuracy = report.accuracy,
            "step"
        );
        report
    }

    /// Run one step if auto-training is on, then clear the flag if a stopping
    /// condition is met.
    ///
    /// Returns `true` if a step ran.
    pub fn step_auto(&mut self, dataset: &Dataset) -> bool {
        if !self.auto_train || dataset.is_empty() {
            return false;
        }
        self.step_once(dataset);

        if let Some(reason) = self.stop_reason() {
            self.auto_train = false;
            info!(
                ?reason,
                step = self.step_count,
                loss = self.last_loss,
                accuracy = self.last_accuracy,
                "auto-training stopped"
            );
        }
        true
    }

    fn stop_reason(&self) -> Option<StopReason> {
        let max = self.config.auto_max_steps;
        if max > 0 && self.step_count >= max {
            return Some(StopReason::MaxSteps);
        }
        if self.config.target_loss_enabled && self.last_loss <= self.config.target_loss {
            return Some(StopReason::TargetLoss);
        }
        None
    }

    /// Reinitialize the network and clear every counter, the history, the auto flag
    /// and the sampling cursor. Call whenever the dataset is replaced.
    pub fn reset_for_new_dataset(&mut self) {
        self.net.set_init_mode(self.config.init_mode);
        self.net.reset_parameters(self.config.seed);
        self.clear_progress();
    }

    fn clear_progress(&mut self) {
        self.step_count = 0;
        self.last_loss = 0.0;
        self.last_accuracy = 0.0;
        self.history.clear();
        self.auto_train = false;
        self.cursor = 0;
    }

    /// Change the hidden widths. This resets training.
    pub fn set_topology(&mut self, topology: Topology) {
        self.net.set_init_mode(self.config.init_mode);
        self.net.resize(topology, self.config.seed);
        self.config.topology = self.net.topology();
        self.clear_progress();
        debug!(topology = ?self.config.topology, "trainer topology changed");
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.net
    }

    /// Direct access for loading parameters or probing. Training counters are not
    /// touched.
    #[inline]
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.net
    }

    #[inline]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    #[inline]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    #[inline]
    pub fn last_loss(&self) -> f32 {
        self.last_loss
    }

    #[inline]
    pub fn last_accuracy(&self) -> f32 {
        self.last_accuracy
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn is_auto_training(&self) -> bool {
        self.auto_train
    }

    pub fn set_auto_train(&mut self, on: bool) {
        self.auto_train = on;
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Clamped to `[1, MAX_BATCH]`.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.config.batch_size = clamp_batch_size(batch_size);
    }

    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.config.optimizer.lr
    }

    pub fn set_learning_rate(&mut self, lr: f32) {
        self.config.optimizer = self.config.optimizer.with_lr(lr);
    }

    #[inline]
    pub fn optimizer(&self) -> &OptimizerConfig {
        &self.config.optimizer
    }

    pub fn set_optimizer(&mut self, cfg: OptimizerConfig) {
        self.config.optimizer = cfg.clamped();
    }

    pub fn set_optimizer_kind(&mut self, kind: OptimizerKind) {
        self.config.optimizer.kind = kind;
    }

    pub fn set_optimizer_hyperparams(&mut self, momentum: f32, beta1: f32, beta2: f32, eps: f32) {
        self.config.optimizer = self
            .config
            .optimizer
            .with_momentum(momentum)
            .with_betas(beta1, beta2)
            .with_eps(eps);
    }

    #[inline]
    pub fn init_mode(&self) -> InitMode {
        self.config.init_mode
    }

    /// Takes effect on the next reset.
    pub fn set_init_mode(&mut self, mode: InitMode) {
        self.config.init_mode = mode;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.config.seed = seed;
    }

    /// `0` disables the step bound.
    pub fn set_auto_max_steps(&mut self, steps: u64) {
        self.config.auto_max_steps = steps;
    }

    /// Negative or non-finite values become `0`.
    pub fn set_target_loss(&mut self, target: f32) {
        self.config.target_loss = if target.is_finite() { target.max(0.0) } else { 0.0 };
    }

    pub fn set_target_loss_enabled(&mut self, enabled: bool) {
        self.config.target_loss_enabled = enabled;
    }

    /// Rebuilds the history with the new capacity, keeping the newest entries.
    pub fn set_history_capacity(&mut self, capacity: usize) {
        let mut history = History::with_capacity(capacity);
        for e in self.history.iter() {
            history.push(e.loss, e.accuracy);
        }
        self.history = history;
        self.config.history_capacity = capacity;
    }
}
