//! Configuration types.
//!
//! Everything here is adjusted by interactive controls, so values are clamped
//! into range instead of rejected. The only error here is malformed JSON
//! (feature: `serde`).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Input dimension (x, y).
pub const INPUT_DIM: usize = 2;
/// Number of classes.
pub const OUTPUT_DIM: usize = 2;
/// Largest batch the network allocates scratch space for.
pub const MAX_BATCH: usize = 256;
/// Smallest allowed hidden layer width.
pub const MIN_HIDDEN: usize = 1;
/// Largest allowed hidden layer width (also the array size baked into the field shader).
pub const MAX_HIDDEN: usize = 16;

const MAX_LR: f32 = 10.0;
const MAX_DECAY: f32 = 0.9999;
const MIN_EPS: f32 = 1e-12;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Parameter update rule.
pub enum OptimizerKind {
    #[default]
    Sgd,
    /// SGD with a velocity buffer.
    Momentum,
    /// Adam with bias correction.
    Adam,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 3] = [Self::Sgd, Self::Momentum, Self::Adam];

    /// Maps a host-side integer (0 = SGD, 1 = momentum, 2 = Adam).
    ///
    /// Out-of-range values clamp to the nearest kind.
    pub fn from_index(index: i32) -> Self {
        match index {
            i32::MIN..=0 => Self::Sgd,
            1 => Self::Momentum,
            _ => Self::Adam,
        }
    }

    pub fn index(self) -> i32 {
        match self {
            Self::Sgd => 0,
            Self::Momentum => 1,
            Self::Adam => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sgd => "sgd",
            Self::Momentum => "momentum",
            Self::Adam => "adam",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Update rule plus every hyperparameter any rule may need.
pub struct OptimizerConfig {
    pub kind: OptimizerKind,
    pub lr: f32,
    pub momentum: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            kind: OptimizerKind::Sgd,
            lr: 0.1,
            momentum: 0.9,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

impl OptimizerConfig {
    pub fn sgd(lr: f32) -> Self {
        Self {
            kind: OptimizerKind::Sgd,
            ..Self::default()
        }
        .with_lr(lr)
    }

    pub fn momentum(lr: f32, momentum: f32) -> Self {
        Self {
            kind: OptimizerKind::Momentum,
            ..Self::default()
        }
        .with_lr(lr)
        .with_momentum(momentum)
    }

    pub fn adam(lr: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            kind: OptimizerKind::Adam,
            ..Self::default()
        }
        .with_lr(lr)
        .with_betas(beta1, beta2)
        .with_eps(eps)
    }

    #[must_use]
    pub fn with_kind(mut self, kind: OptimizerKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_lr(mut self, lr: f32) -> Self {
        self.lr = clamp_lr(lr);
        self
    }

    #[must_use]
    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = clamp_decay(momentum, Self::default().momentum);
        self
    }

    #[must_use]
    pub fn with_betas(mut self, beta1: f32, beta2: f32) -> Self {
        let d = Self::default();
        self.beta1 = clamp_decay(beta1, d.beta1);
        self.beta2 = clamp_decay(beta2, d.beta2);
        self
    }

    #[must_use]
    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = if eps.is_nan() {
            Self::default().eps
        } else {
            eps.clamp(MIN_EPS, 1.0)
        };
        self
    }

    /// Re-applies every clamp. Used after deserializing.
    #[must_use]
    pub fn clamped(self) -> Self {
        self.with_lr(self.lr)
            .with_momentum(self.momentum)
            .with_betas(self.beta1, self.beta2)
            .with_eps(self.eps)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Weight initialization scheme. Biases always start at zero.
pub enum InitMode {
    /// All weights zero.
    Zero,
    /// `U(-1, 1) / sqrt(fan_in)`.
    #[default]
    HeUniform,
    /// `N(0, 1) / sqrt(fan_in)`.
    HeNormal,
}

impl InitMode {
    pub fn from_index(index: i32) -> Self {
        match index {
            i32::MIN..=0 => Self::Zero,
            1 => Self::HeUniform,
            _ => Self::HeNormal,
        }
    }

    pub fn index(self) -> i32 {
        match self {
            Self::Zero => 0,
            Self::HeUniform => 1,
            Self::HeNormal => 2,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Hidden layer widths of the 2 -> hidden1 -> hidden2 -> 2 network.
pub struct Topology {
    pub hidden1: usize,
    pub hidden2: usize,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            hidden1: 4,
            hidden2: 8,
        }
    }
}

impl Topology {
    /// Builds a topology with both widths clamped to `[MIN_HIDDEN, MAX_HIDDEN]`.
    pub fn new(hidden1: usize, hidden2: usize) -> Self {
        Self {
            hidden1: hidden1.clamp(MIN_HIDDEN, MAX_HIDDEN),
            hidden2: hidden2.clamp(MIN_HIDDEN, MAX_HIDDEN),
        }
    }

    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.hidden1, self.hidden2)
    }

    /// `(in_dim, out_dim)` for each of the three dense layers.
    pub fn layer_dims(self) -> [(usize, usize); 3] {
        [
            (INPUT_DIM, self.hidden1),
            (self.hidden1, self.hidden2),
            (self.hidden2, OUTPUT_DIM),
        ]
    }

    /// Total number of trainable scalars.
    pub fn num_params(self) -> usize {
        self.layer_dims()
            .iter()
            .map(|&(i, o)| i * o + o)
            .sum()
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Settings owned by the training controller.
pub struct TrainerConfig {
    pub batch_size: usize,
    pub optimizer: OptimizerConfig,
    pub init_mode: InitMode,
    pub topology: Topology,
    /// Seed used every time parameters are reinitialized.
    pub seed: u64,
    /// Auto-training stops once this many steps have run. `0` disables the bound.
    pub auto_max_steps: u64,
    pub target_loss: f32,
    pub target_loss_enabled: bool,
    /// Loss/accuracy history length. `0` keeps every entry.
    pub history_capacity: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            optimizer: OptimizerConfig::default(),
            init_mode: InitMode::HeUniform,
            topology: Topology::default(),
            seed: 1,
            auto_max_steps: 2500,
            target_loss: 0.01,
            target_loss_enabled: true,
            history_capacity: 4096,
        }
    }
}

impl TrainerConfig {
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.batch_size = clamp_batch_size(self.batch_size);
        self.optimizer = self.optimizer.clamped();
        self.topology = self.topology.clamped();
        if !self.target_loss.is_finite() || self.target_loss < 0.0 {
            self.target_loss = 0.0;
        }
        self
    }

    /// Parses a JSON config. Missing fields take their defaults; present ones are clamped.
    #[cfg(feature = "serde")]
    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        let cfg: TrainerConfig = serde_json::from_str(s)?;
        Ok(cfg.clamped())
    }

    #[cfg(feature = "serde")]
    pub fn to_json_string_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[inline]
pub fn clamp_batch_size(batch_size: usize) -> usize {
    batch_size.clamp(1, MAX_BATCH)
}

#[inline]
fn clamp_lr(lr: f32) -> f32 {
    if lr.is_nan() {
        OptimizerConfig::default().lr
    } else {
        lr.clamp(0.0, MAX_LR)
    }
}

#[inline]
fn clamp_decay(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, MAX_DECAY)
    }
}
