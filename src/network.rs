//! The 2 -> hidden1 -> hidden2 -> 2 classifier.
//!
//! Layers 1 and 2 use ReLU, the output layer produces logits that go through a
//! stable softmax. Every weight matrix is row-major `(out_dim, in_dim)`, so the
//! six parameter arrays can be handed to the field shader as they are.
//!
//! Buffers for a whole batch (activations, gradients, optimizer state) are
//! allocated when the network is built or resized and reused afterwards; a
//! training step does not allocate.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace, warn};

use crate::loss::{argmax, cross_entropy, softmax};
use crate::optim::zeros_like_params;
use crate::{
    BatchReport, Error, INPUT_DIM, InitMode, Layer, MAX_BATCH, MAX_HIDDEN, MIN_HIDDEN, OUTPUT_DIM,
    OptimizerConfig, OptimizerKind, OptimizerState, Result, Sample, Topology,
};

const L1: usize = 0;
const L2: usize = 1;
const L3: usize = 2;

#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    /// Always three layers: input -> hidden1, hidden1 -> hidden2, hidden2 -> output.
    layers: Vec<Layer>,
    scratch: BatchScratch,
    grads: Gradients,
    optimizer: OptimizerConfig,
    opt_state: OptimizerState,
    init_mode: InitMode,
}

/// Per-batch activations, each `MAX_BATCH * width` scalars, row per sample.
///
/// Overwritten by every `train_batch` call; nothing survives between batches.
#[derive(Debug, Clone)]
pub struct BatchScratch {
    a0: Vec<f32>,
    z1: Vec<f32>,
    a1: Vec<f32>,
    z2: Vec<f32>,
    a2: Vec<f32>,
    logits: Vec<f32>,
    probs: Vec<f32>,
}

impl BatchScratch {
    fn new(topology: Topology) -> Self {
        let h1 = topology.hidden1;
        let h2 = topology.hidden2;
        Self {
            a0: vec![0.0; MAX_BATCH * INPUT_DIM],
            z1: vec![0.0; MAX_BATCH * h1],
            a1: vec![0.0; MAX_BATCH * h1],
            z2: vec![0.0; MAX_BATCH * h2],
            a2: vec![0.0; MAX_BATCH * h2],
            logits: vec![0.0; MAX_BATCH * OUTPUT_DIM],
            probs: vec![0.0; MAX_BATCH * OUTPUT_DIM],
        }
    }

    /// Softmax output of the most recent batch (`MAX_BATCH * OUTPUT_DIM`, only the
    /// first `samples` rows are meaningful).
    #[inline]
    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    #[inline]
    pub fn logits(&self) -> &[f32] {
        &self.logits
    }
}

#[inline]
fn row(buf: &[f32], n: usize, width: usize) -> &[f32] {
    &buf[n * width..(n + 1) * width]
}

#[inline]
fn row_mut(buf: &mut [f32], n: usize, width: usize) -> &mut [f32] {
    &mut buf[n * width..(n + 1) * width]
}

/// Parameter gradients, one weight and one bias buffer per layer.
///
/// Zeroed at the start of a batch, accumulated per sample, then averaged.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    d_weights: Vec<Vec<f32>>,
    d_biases: Vec<Vec<f32>>,
}

impl Gradients {
    pub fn new(layers: &[Layer]) -> Self {
        let (d_weights, d_biases) = zeros_like_params(layers);
        Self {
            d_weights,
            d_biases,
        }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.d_weights.len()
    }

    #[inline]
    pub fn d_weights(&self, layer_idx: usize) -> &[f32] {
        &self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases(&self, layer_idx: usize) -> &[f32] {
        &self.d_biases[layer_idx]
    }

    #[inline]
    pub fn d_weights_mut(&mut self, layer_idx: usize) -> &mut [f32] {
        &mut self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases_mut(&mut self, layer_idx: usize) -> &mut [f32] {
        &mut self.d_biases[layer_idx]
    }

    #[inline]
    fn layer_mut(&mut self, layer_idx: usize) -> (&mut [f32], &mut [f32]) {
        (&mut self.d_weights[layer_idx], &mut self.d_biases[layer_idx])
    }

    fn zero(&mut self) {
        for g in self.d_weights.iter_mut().chain(self.d_biases.iter_mut()) {
            g.fill(0.0);
        }
    }

    fn scale(&mut self, factor: f32) {
        for g in self.d_weights.iter_mut().chain(self.d_biases.iter_mut()) {
            for v in g.iter_mut() {
                *v *= factor;
            }
        }
    }
}

/// Result of a single-sample forward pass, including hidden activations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub probs: [f32; OUTPUT_DIM],
    hidden1: [f32; MAX_HIDDEN],
    hidden2: [f32; MAX_HIDDEN],
    topology: Topology,
}

impl Probe {
    /// Post-ReLU activations of the first hidden layer.
    #[inline]
    pub fn hidden1(&self) -> &[f32] {
        &self.hidden1[..self.topology.hidden1]
    }

    /// Post-ReLU activations of the second hidden layer.
    #[inline]
    pub fn hidden2(&self) -> &[f32] {
        &self.hidden2[..self.topology.hidden2]
    }

    #[inline]
    pub fn predicted(&self) -> usize {
        argmax(&self.probs)
    }
}

/// Owned copy of the six parameter arrays.
///
/// Taken after a completed step, so a consumer never sees a half-updated layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSnapshot {
    pub topology: Topology,
    pub w1: Vec<f32>,
    pub b1: Vec<f32>,
    pub w2: Vec<f32>,
    pub b2: Vec<f32>,
    pub w3: Vec<f32>,
    pub b3: Vec<f32>,
}

impl ParamSnapshot {
    /// Snapshot with every weight set to `weight` and every bias to `bias`.
    pub fn filled(topology: Topology, weight: f32, bias: f32) -> Self {
        let topology = topology.clamped();
        let [(i1, o1), (i2, o2), (i3, o3)] = topology.layer_dims();
        Self {
            topology,
            w1: vec![weight; i1 * o1],
            b1: vec![bias; o1],
            w2: vec![weight; i2 * o2],
            b2: vec![bias; o2],
            w3: vec![weight; i3 * o3],
            b3: vec![bias; o3],
        }
    }

    /// The arrays in upload order: W1, b1, W2, b2, W3, b3.
    pub fn arrays(&self) -> [&[f32]; 6] {
        [&self.w1, &self.b1, &self.w2, &self.b2, &self.w3, &self.b3]
    }

    /// Raw bytes of each array, in upload order, for copying into GPU buffers.
    pub fn as_bytes(&self) -> [&[u8]; 6] {
        self.arrays().map(|a| bytemuck::cast_slice::<f32, u8>(a))
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new(Topology::default(), InitMode::HeUniform, 1)
    }
}

impl Network {
    /// Build a network and initialize it with `seed`.
    ///
    /// Hidden widths are clamped to `[MIN_HIDDEN, MAX_HIDDEN]`.
    pub fn new(topology: Topology, init_mode: InitMode, seed: u64) -> Self {
        let topology = topology.clamped();
        let layers: Vec<Layer> = topology
            .layer_dims()
            .iter()
            .map(|&(i, o)| Layer::new(i, o))
            .collect();
        let optimizer = OptimizerConfig::default();
        let mut net = Self {
            topology,
            scratch: BatchScratch::new(topology),
            grads: Gradients::new(&layers),
            opt_state: OptimizerState::new(optimizer.kind, &layers),
            layers,
            optimizer,
            init_mode,
        };
        net.reset_parameters(seed);
        net
    }

    /// Reinitialize all weights with the current init mode and zero the biases.
    ///
    /// Optimizer state (velocity, moments, step counter) is zeroed as well.
    pub fn reset_parameters(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for layer in &mut self.layers {
            layer.init(self.init_mode, &mut rng);
        }
        self.opt_state.reset();
        debug!(
            seed,
            init = ?self.init_mode,
            hidden1 = self.topology.hidden1,
            hidden2 = self.topology.hidden2,
            "parameters reinitialized"
        );
    }

    /// Change the hidden widths.
    ///
    /// This resets training: every parameter, gradient, scratch and optimizer buffer
    /// is rebuilt for the new shape and the parameters are reinitialized from `seed`.
    pub fn resize(&mut self, topology: Topology, seed: u64) {
        let topology = topology.clamped();
        debug!(
            from = ?self.topology,
            to = ?topology,
            "resizing network"
        );
        let mut fresh = Self::new(topology, self.init_mode, seed);
        fresh.optimizer = self.optimizer;
        fresh.opt_state = OptimizerState::new(self.optimizer.kind, &fresh.layers);
        *self = fresh;
    }

    /// Replace all parameters with `snapshot`.
    ///
    /// The snapshot's topology must be within bounds and every array must match it
    /// and be finite. Counts as a reinitialization: optimizer state is zeroed.
    pub fn load_parameters(&mut self, snapshot: &ParamSnapshot) -> Result<()> {
        let t = snapshot.topology;
        for h in [t.hidden1, t.hidden2] {
            if !(MIN_HIDDEN..=MAX_HIDDEN).contains(&h) {
                return Err(Error::InvalidShape(format!(
                    "hidden width {h} outside [{MIN_HIDDEN}, {MAX_HIDDEN}]"
                )));
            }
        }

        let pairs = [
            (&snapshot.w1, &snapshot.b1),
            (&snapshot.w2, &snapshot.b2),
            (&snapshot.w3, &snapshot.b3),
        ];
        let mut layers = Vec::with_capacity(3);
        for (idx, (&(i, o), (w, b))) in t.layer_dims().iter().zip(pairs).enumerate() {
            let layer = Layer::from_parts(i, o, w.clone(), b.clone())
                .map_err(|e| Error::InvalidData(format!("layer {} invalid: {e}", idx + 1)))?;
            layers.push(layer);
        }

        if t != self.topology {
            self.topology = t;
            self.scratch = BatchScratch::new(t);
            self.grads = Gradients::new(&layers);
        }
        self.opt_state = OptimizerState::new(self.optimizer.kind, &layers);
        self.layers = layers;
        Ok(())
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn w1(&self) -> &[f32] {
        self.layers[L1].weights()
    }

    #[inline]
    pub fn b1(&self) -> &[f32] {
        self.layers[L1].biases()
    }

    #[inline]
    pub fn w2(&self) -> &[f32] {
        self.layers[L2].weights()
    }

    #[inline]
    pub fn b2(&self) -> &[f32] {
        self.layers[L2].biases()
    }

    #[inline]
    pub fn w3(&self) -> &[f32] {
        self.layers[L3].weights()
    }

    #[inline]
    pub fn b3(&self) -> &[f32] {
        self.layers[L3].biases()
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            topology: self.topology,
            w1: self.w1().to_vec(),
            b1: self.b1().to_vec(),
            w2: self.w2().to_vec(),
            b2: self.b2().to_vec(),
            w3: self.w3().to_vec(),
            b3: self.b3().to_vec(),
        }
    }

    /// Gradients of the most recent batch (already averaged).
    #[inline]
    pub fn gradients(&self) -> &Gradients {
        &self.grads
    }

    #[inline]
    pub fn scratch(&self) -> &BatchScratch {
        &self.scratch
    }

    #[inline]
    pub fn optimizer(&self) -> &OptimizerConfig {
        &self.optimizer
    }

    #[inline]
    pub fn optimizer_state(&self) -> &OptimizerState {
        &self.opt_state
    }

    #[inline]
    pub fn init_mode(&self) -> InitMode {
        self.init_mode
    }

    /// Takes effect on the next `reset_parameters`.
    pub fn set_init_mode(&mut self, mode: InitMode) {
        self.init_mode = mode;
    }

    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.optimizer.lr
    }

    /// Clamped to `[0, 10]`.
    pub fn set_learning_rate(&mut self, lr: f32) {
        self.optimizer = self.optimizer.with_lr(lr);
    }

    /// Switching kind drops the previous rule's state on the next update.
    ///
    /// Jumping into Adam with a learning rate tuned for SGD is the caller's concern.
    pub fn set_optimizer_kind(&mut self, kind: OptimizerKind) {
        self.optimizer.kind = kind;
    }

    pub fn set_optimizer_hyperparams(&mut self, momentum: f32, beta1: f32, beta2: f32, eps: f32) {
        self.optimizer = self
            .optimizer
            .with_momentum(momentum)
            .with_betas(beta1, beta2)
            .with_eps(eps);
    }

    /// Replace the whole optimizer configuration (clamped).
    pub fn set_optimizer(&mut self, cfg: OptimizerConfig) {
        self.optimizer = cfg.clamped();
    }

    /// One training step on `batch`: forward, loss, backward, averaged gradients and
    /// an optimizer update.
    ///
    /// Only the first `MAX_BATCH` samples are used. An empty batch returns a zero
    /// report and leaves every buffer untouched.
    pub fn train_batch(&mut self, batch: &[Sample]) -> BatchReport {
        let report = self.compute_gradients(batch);
        if report.samples == 0 {
            return report;
        }
        self.opt_state
            .step(&self.optimizer, &mut self.layers, &self.grads);
        report
    }

    /// Forward and backward over `batch` without updating parameters.
    ///
    /// Leaves the averaged gradients in `gradients()`.
    pub fn compute_gradients(&mut self, batch: &[Sample]) -> BatchReport {
        let n = batch.len().min(MAX_BATCH);
        if n == 0 {
            return BatchReport::default();
        }

        let h1 = self.topology.hidden1;
        let h2 = self.topology.hidden2;
        let s = &mut self.scratch;

        for (i, sample) in batch[..n].iter().enumerate() {
            let a0 = row_mut(&mut s.a0, i, INPUT_DIM);
            a0[0] = sample.x;
            a0[1] = sample.y;
        }

        for i in 0..n {
            self.layers[L1].forward(
                row(&s.a0, i, INPUT_DIM),
                row_mut(&mut s.z1, i, h1),
                row_mut(&mut s.a1, i, h1),
                true,
            );
        }
        for i in 0..n {
            self.layers[L2].forward(
                row(&s.a1, i, h1),
                row_mut(&mut s.z2, i, h2),
                row_mut(&mut s.a2, i, h2),
                true,
            );
        }

        let mut loss_sum = 0.0_f32;
        let mut correct = 0usize;
        let mut degenerate = 0usize;
        let mut logits = [0.0_f32; OUTPUT_DIM];
        for (i, sample) in batch[..n].iter().enumerate() {
            self.layers[L3].forward(
                row(&s.a2, i, h2),
                row_mut(&mut s.logits, i, OUTPUT_DIM),
                &mut logits,
                false,
            );
            let probs = row_mut(&mut s.probs, i, OUTPUT_DIM);
            if !softmax(&logits, probs) {
                degenerate += 1;
            }
            if argmax(probs) == sample.label {
                correct += 1;
            }
            loss_sum += cross_entropy(probs[sample.label]);
        }

        if degenerate > 0 {
            warn!(degenerate, samples = n, "degenerate softmax in batch, using 0.5/0.5");
        }

        let inv_n = 1.0 / n as f32;
        let report = BatchReport {
            loss: loss_sum * inv_n,
            accuracy: correct as f32 * inv_n,
            samples: n,
            degenerate,
        };

        self.grads.zero();

        let mut delta3 = [0.0_f32; OUTPUT_DIM];
        let mut delta2 = [0.0_f32; MAX_HIDDEN];
        let mut delta1 = [0.0_f32; MAX_HIDDEN];
        let delta2 = &mut delta2[..h2];
        let delta1 = &mut delta1[..h1];

        for (i, sample) in batch[..n].iter().enumerate() {
            // Softmax + cross-entropy: dL/dlogits = probs - onehot(label).
            let probs = row(&s.probs, i, OUTPUT_DIM);
            for (k, d) in delta3.iter_mut().enumerate() {
                let target = if k == sample.label { 1.0 } else { 0.0 };
                *d = probs[k] - target;
            }

            let (dw, db) = self.grads.layer_mut(L3);
            self.layers[L3].backward(row(&s.a2, i, h2), &delta3, dw, db, Some(&mut *delta2));
            relu_backward(delta2, row(&s.z2, i, h2));

            let (dw, db) = self.grads.layer_mut(L2);
            self.layers[L2].backward(row(&s.a1, i, h1), delta2, dw, db, Some(&mut *delta1));
            relu_backward(delta1, row(&s.z1, i, h1));

            let (dw, db) = self.grads.layer_mut(L1);
            self.layers[L1].backward(row(&s.a0, i, INPUT_DIM), delta1, dw, db, None);
        }

        self.grads.scale(inv_n);

        trace!(loss = report.loss, accuracy = report.accuracy, samples = n, "batch");
        report
    }

    /// Class probabilities for one point. Touches no training state.
    ///
    /// Returns `[0.5, 0.5]` if the softmax denominator degenerates.
    pub fn forward_single(&self, x: f32, y: f32) -> [f32; OUTPUT_DIM] {
        self.forward_single_with_activations(x, y).probs
    }

    /// Like `forward_single`, also returning both hidden layers' activations.
    pub fn forward_single_with_activations(&self, x: f32, y: f32) -> Probe {
        let h1 = self.topology.hidden1;
        let h2 = self.topology.hidden2;
        let mut probe = Probe {
            probs: [0.0; OUTPUT_DIM],
            hidden1: [0.0; MAX_HIDDEN],
            hidden2: [0.0; MAX_HIDDEN],
            topology: self.topology,
        };
        let mut pre = [0.0_f32; MAX_HIDDEN];
        let mut logits = [0.0_f32; OUTPUT_DIM];
        let mut out = [0.0_f32; OUTPUT_DIM];

        self.layers[L1].forward(&[x, y], &mut pre[..h1], &mut probe.hidden1[..h1], true);
        self.layers[L2].forward(
            &probe.hidden1[..h1],
            &mut pre[..h2],
            &mut probe.hidden2[..h2],
            true,
        );
        self.layers[L3].forward(&probe.hidden2[..h2], &mut logits, &mut out, false);
        softmax(&logits, &mut probe.probs);
        probe
    }
}

/// Masks `delta` by the ReLU derivative at `z` (1 where `z > 0`).
#[inline]
fn relu_backward(delta: &mut [f32], z: &[f32]) {
    debug_assert_eq!(delta.len(), z.len());
    for (d, &z) in delta.iter_mut().zip(z) {
        if !(z > 0.0) {
            *d = 0.0;
        }
    }
}
