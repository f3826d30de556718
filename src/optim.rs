//! Optimizers.
//!
//! The update rule is chosen per step from an [`OptimizerConfig`]; the auxiliary
//! state each rule needs lives in [`OptimizerState`], a tagged enum so that only
//! the buffers of the active rule exist:
//!
//! - SGD: no state.
//! - Momentum: one velocity buffer per parameter array.
//! - Adam: first and second moment buffers plus a step counter.
//!
//! Changing hyperparameters keeps the state. Changing the kind drops the old
//! state and starts the new rule from zeroed buffers.

use tracing::debug;

use crate::{Gradients, Layer, OptimizerConfig, OptimizerKind};

#[derive(Debug, Clone, Default, PartialEq)]
/// Owned optimizer state, shaped like the network parameters.
pub enum OptimizerState {
    /// Plain SGD (no state).
    #[default]
    Sgd,
    /// SGD with momentum state.
    Momentum {
        v_weights: Vec<Vec<f32>>,
        v_biases: Vec<Vec<f32>>,
    },
    /// Adam state.
    Adam {
        /// Number of updates applied so far; drives bias correction.
        t: u64,
        m_weights: Vec<Vec<f32>>,
        m_biases: Vec<Vec<f32>>,
        v_weights: Vec<Vec<f32>>,
        v_biases: Vec<Vec<f32>>,
    },
}

impl OptimizerState {
    /// Zeroed state for `kind`, sized for `layers`.
    pub fn new(kind: OptimizerKind, layers: &[Layer]) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerState::Sgd,
            OptimizerKind::Momentum => {
                let (v_weights, v_biases) = zeros_like_params(layers);
                OptimizerState::Momentum {
                    v_weights,
                    v_biases,
                }
            }
            OptimizerKind::Adam => {
                let (m_weights, m_biases) = zeros_like_params(layers);
                let (v_weights, v_biases) = zeros_like_params(layers);
                OptimizerState::Adam {
                    t: 0,
                    m_weights,
                    m_biases,
                    v_weights,
                    v_biases,
                }
            }
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerState::Sgd => OptimizerKind::Sgd,
            OptimizerState::Momentum { .. } => OptimizerKind::Momentum,
            OptimizerState::Adam { .. } => OptimizerKind::Adam,
        }
    }

    /// Adam's step counter; `0` for the other rules.
    pub fn step_count(&self) -> u64 {
        match self {
            OptimizerState::Adam { t, .. } => *t,
            _ => 0,
        }
    }

    /// Zeroes every buffer and the step counter, keeping the kind.
    pub fn reset(&mut self) {
        match self {
            OptimizerState::Sgd => {}
            OptimizerState::Momentum {
                v_weights,
                v_biases,
            } => {
                zero_all(v_weights);
                zero_all(v_biases);
            }
            OptimizerState::Adam {
                t,
                m_weights,
                m_biases,
                v_weights,
                v_biases,
            } => {
                *t = 0;
                zero_all(m_weights);
                zero_all(m_biases);
                zero_all(v_weights);
                zero_all(v_biases);
            }
        }
    }

    /// Apply one optimizer step to every layer.
    ///
    /// `grads` must already be averaged over the batch. Adam's step counter advances
    /// exactly once per call, however many layers there are.
    pub fn step(&mut self, cfg: &OptimizerConfig, layers: &mut [Layer], grads: &Gradients) {
        assert_eq!(
            layers.len(),
            grads.num_layers(),
            "grads has {} layers, model has {} layers",
            grads.num_layers(),
            layers.len()
        );

        if self.kind() != cfg.kind {
            debug!(
                from = self.kind().name(),
                to = cfg.kind.name(),
                "optimizer kind changed, rebuilding state"
            );
            *self = OptimizerState::new(cfg.kind, layers);
        }

        let lr = cfg.lr;
        match self {
            OptimizerState::Sgd => {
                for (idx, layer) in layers.iter_mut().enumerate() {
                    let (w, b) = layer.params_mut();
                    sgd_update(w, grads.d_weights(idx), lr);
                    sgd_update(b, grads.d_biases(idx), lr);
                }
            }
            OptimizerState::Momentum {
                v_weights,
                v_biases,
            } => {
                let mu = cfg.momentum;
                for (idx, layer) in layers.iter_mut().enumerate() {
                    let (w, b) = layer.params_mut();
                    momentum_update(w, grads.d_weights(idx), &mut v_weights[idx], mu, lr);
                    momentum_update(b, grads.d_biases(idx), &mut v_biases[idx], mu, lr);
                }
            }
            OptimizerState::Adam {
                t,
                m_weights,
                m_biases,
                v_weights,
                v_biases,
            } => {
                *t += 1;
                let steps = *t as f32;
                let adam = AdamStep {
                    lr,
                    beta1: cfg.beta1,
                    beta2: cfg.beta2,
                    eps: cfg.eps,
                    corr1: 1.0 - cfg.beta1.powf(steps),
                    corr2: 1.0 - cfg.beta2.powf(steps),
                };

                for (idx, layer) in layers.iter_mut().enumerate() {
                    let (w, b) = layer.params_mut();
                    adam.update(w, grads.d_weights(idx), &mut m_weights[idx], &mut v_weights[idx]);
                    adam.update(b, grads.d_biases(idx), &mut m_biases[idx], &mut v_biases[idx]);
                }
            }
        }
    }
}

#[inline]
fn sgd_update(params: &mut [f32], grads: &[f32], lr: f32) {
    debug_assert_eq!(params.len(), grads.len());
    for (p, &g) in params.iter_mut().zip(grads) {
        *p -= lr * g;
    }
}

#[inline]
fn momentum_update(params: &mut [f32], grads: &[f32], velocity: &mut [f32], mu: f32, lr: f32) {
    debug_assert_eq!(params.len(), grads.len());
    debug_assert_eq!(params.len(), velocity.len());
    for ((p, &g), v) in params.iter_mut().zip(grads).zip(velocity.iter_mut()) {
        *v = mu * *v - lr * g;
        *p += *v;
    }
}

/// Per-call Adam constants.
struct AdamStep {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    corr1: f32,
    corr2: f32,
}

impl AdamStep {
    #[inline]
    fn update(&self, params: &mut [f32], grads: &[f32], m: &mut [f32], v: &mut [f32]) {
        debug_assert_eq!(params.len(), grads.len());
        debug_assert_eq!(m.len(), params.len());
        debug_assert_eq!(v.len(), params.len());

        let one_minus_beta1 = 1.0 - self.beta1;
        let one_minus_beta2 = 1.0 - self.beta2;
        for i in 0..params.len() {
            let g = grads[i];
            m[i] = self.beta1 * m[i] + one_minus_beta1 * g;
            v[i] = self.beta2 * v[i] + one_minus_beta2 * g * g;
            let m_hat = m[i] / self.corr1;
            let v_hat = v[i] / self.corr2;
            params[i] -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

pub(crate) fn zeros_like_params(layers: &[Layer]) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
    let ws = layers
        .iter()
        .map(|l| vec![0.0; l.in_dim() * l.out_dim()])
        .collect();
    let bs = layers.iter().map(|l| vec![0.0; l.out_dim()]).collect();
    (ws, bs)
}

fn zero_all(bufs: &mut [Vec<f32>]) {
    for b in bufs {
        b.fill(0.0);
    }
}
