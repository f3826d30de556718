use rand::Rng;
use rand_distr::StandardNormal;

use crate::{Error, InitMode, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    /// Row-major matrix with shape (out_dim, in_dim): element (row, col) is `row * in_dim + col`.
    weights: Vec<f32>,
    biases: Vec<f32>,
}

#[inline]
pub(crate) fn relu(x: f32) -> f32 {
    if x > 0.0 { x } else { 0.0 }
}

impl Layer {
    #[inline]
    pub fn new(in_dim: usize, out_dim: usize) -> Self {
        assert!(in_dim > 0 && out_dim > 0, "layer dims must be > 0");
        Self {
            in_dim,
            out_dim,
            weights: vec![0.0; in_dim * out_dim],
            biases: vec![0.0; out_dim],
        }
    }

    /// Builds a layer from explicit parameters.
    ///
    /// Validates shapes and that every value is finite.
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidShape(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        if weights.len() != in_dim * out_dim {
            return Err(Error::InvalidShape(format!(
                "weights length {} does not match out_dim * in_dim ({out_dim} * {in_dim})",
                weights.len()
            )));
        }
        if biases.len() != out_dim {
            return Err(Error::InvalidShape(format!(
                "biases length {} does not match out_dim {out_dim}",
                biases.len()
            )));
        }
        if weights.iter().chain(&biases).any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "layer parameters must be finite".to_owned(),
            ));
        }
        Ok(Self {
            in_dim,
            out_dim,
            weights,
            biases,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[inline]
    pub(crate) fn params_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.weights, &mut self.biases)
    }

    /// Refills the weights according to `mode` and zeroes the biases.
    ///
    /// The scale is `1 / sqrt(in_dim)`.
    pub fn init<R: Rng + ?Sized>(&mut self, mode: InitMode, rng: &mut R) {
        let scale = 1.0 / (self.in_dim as f32).sqrt();
        match mode {
            InitMode::Zero => self.weights.fill(0.0),
            InitMode::HeUniform => {
                for w in &mut self.weights {
                    *w = scale * rng.gen_range(-1.0_f32..=1.0);
                }
            }
            InitMode::HeNormal => {
                for w in &mut self.weights {
                    let n: f32 = rng.sample(StandardNormal);
                    *w = scale * n;
                }
            }
        }
        self.biases.fill(0.0);
    }

    /// Dense forward pass for a single sample.
    ///
    /// Writes `z = W * inputs + b` into `pre` and `act(z)` into `out`, where `act` is
    /// ReLU when `rectify` is set and the identity otherwise.
    ///
    /// Accumulation order is bias first, then inputs by increasing column. The field
    /// shader sums in the same order.
    #[inline]
    pub fn forward(&self, inputs: &[f32], pre: &mut [f32], out: &mut [f32], rectify: bool) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(pre.len(), self.out_dim);
        debug_assert_eq!(out.len(), self.out_dim);

        for o in 0..self.out_dim {
            let row = o * self.in_dim;
            let mut sum = self.biases[o];
            for i in 0..self.in_dim {
                sum += self.weights[row + i] * inputs[i];
            }
            pre[o] = sum;
            out[o] = if rectify { relu(sum) } else { sum };
        }
    }

    /// Backward pass for a single sample (accumulate semantics).
    ///
    /// `delta` is dL/dz for this layer. Adds `delta ⊗ inputs` into `d_weights` and
    /// `delta` into `d_biases`. When `d_inputs` is given it is overwritten with
    /// `W^T * delta`, the raw gradient w.r.t. the inputs (before the previous
    /// layer's activation derivative).
    #[inline]
    pub fn backward(
        &self,
        inputs: &[f32],
        delta: &[f32],
        d_weights: &mut [f32],
        d_biases: &mut [f32],
        mut d_inputs: Option<&mut [f32]>,
    ) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(delta.len(), self.out_dim);
        debug_assert_eq!(d_weights.len(), self.weights.len());
        debug_assert_eq!(d_biases.len(), self.out_dim);

        if let Some(d_in) = d_inputs.as_deref_mut() {
            debug_assert_eq!(d_in.len(), self.in_dim);
            d_in.fill(0.0);
        }

        for o in 0..self.out_dim {
            let d_z = delta[o];
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                d_weights[row + i] += d_z * inputs[i];
                if let Some(d_in) = d_inputs.as_deref_mut() {
                    d_in[i] += d_z * self.weights[row + i];
                }
            }
            d_biases[o] += d_z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn forward_uses_row_major_weights() {
        let layer = Layer::from_parts(2, 2, vec![1.0, 2.0, -3.0, 4.0], vec![0.5, -10.0]).unwrap();
        let mut pre = [0.0; 2];
        let mut out = [0.0; 2];
        layer.forward(&[1.0, 1.0], &mut pre, &mut out, true);
        assert_eq!(pre, [3.5, -9.0]);
        assert_eq!(out, [3.5, 0.0]);

        layer.forward(&[1.0, 1.0], &mut pre, &mut out, false);
        assert_eq!(out, [3.5, -9.0]);
    }

    #[test]
    fn backward_accumulates_and_propagates() {
        let layer = Layer::from_parts(2, 2, vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 0.0]).unwrap();
        let mut dw = [1.0_f32; 4];
        let mut db = [0.0_f32; 2];
        let mut d_in = [99.0_f32; 2];
        layer.backward(&[2.0, -1.0], &[0.5, -1.0], &mut dw, &mut db, Some(&mut d_in));

        assert_eq!(dw, [2.0, 0.5, -1.0, 2.0]);
        assert_eq!(db, [0.5, -1.0]);
        // W^T * delta = [1*0.5 + 3*-1, 2*0.5 + 4*-1]
        assert_eq!(d_in, [-2.5, -3.0]);
    }

    #[test]
    fn init_scales_by_fan_in_and_zeroes_biases() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut layer = Layer::new(4, 8);
        layer.biases.fill(3.0);
        layer.init(InitMode::HeUniform, &mut rng);
        assert!(layer.weights().iter().all(|w| w.abs() <= 0.5));
        assert!(layer.weights().iter().any(|&w| w != 0.0));
        assert!(layer.biases().iter().all(|&b| b == 0.0));

        layer.init(InitMode::Zero, &mut rng);
        assert!(layer.weights().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn he_normal_variance_tracks_fan_in() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Layer::new(16, 256);
        layer.init(InitMode::HeNormal, &mut rng);
        let n = layer.weights().len() as f32;
        let mean = layer.weights().iter().sum::<f32>() / n;
        let var = layer.weights().iter().map(|w| (w - mean).powi(2)).sum::<f32>() / n;
        // Expected variance 1/16.
        assert!((var - 1.0 / 16.0).abs() < 0.015, "var={var}");
    }

    #[test]
    fn from_parts_rejects_bad_shapes_and_non_finite() {
        assert!(Layer::from_parts(2, 2, vec![0.0; 3], vec![0.0; 2]).is_err());
        assert!(Layer::from_parts(2, 2, vec![0.0; 4], vec![0.0; 1]).is_err());
        assert!(Layer::from_parts(2, 1, vec![0.0, f32::NAN], vec![0.0]).is_err());
        assert!(Layer::from_parts(0, 1, vec![], vec![0.0]).is_err());
    }
}
