//! Decision-field shader and its CPU mirror.
//!
//! The WGSL fragment shader re-runs the network's forward pass once per pixel.
//! It reads the six parameter arrays as storage buffers named `u_W1` .. `u_b3`,
//! laid out exactly like [`ParamSnapshot`], plus a small [`FieldUniforms`] block
//! carrying the hidden widths and the palette.
//!
//! [`shade`] evaluates the same math on the CPU so the two can be compared in
//! tests and used as a fallback renderer.

use bytemuck::{Pod, Zeroable};

use crate::{MAX_HIDDEN, Network, OUTPUT_DIM, ParamSnapshot, Topology};

/// WGSL source of the decision-field pipeline (`vs_main` / `fs_main`).
pub const FIELD_SHADER_WGSL: &str = include_str!("shaders/decision_field.wgsl");

/// Binding of the [`FieldUniforms`] block in group 0.
pub const FIELD_UNIFORM_BINDING: u32 = 0;

/// Parameter array names in upload order, with their group 0 bindings.
pub const PARAM_BINDINGS: [(&str, u32); 6] = [
    ("u_W1", 1),
    ("u_b1", 2),
    ("u_W2", 3),
    ("u_b2", 4),
    ("u_W3", 5),
    ("u_b3", 6),
];

/// Default grid resolution of the CPU field.
pub const DEFAULT_RESOLUTION: usize = 64;

/// Initial running maximum of the shader's softmax.
const SHADER_MIN_LOGIT: f32 = -1e30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldPalette {
    /// Color at p1 = 0.
    pub color0: [f32; 3],
    /// Color at p1 = 1.
    pub color1: [f32; 3],
    pub alpha: f32,
    /// Output for a degenerate softmax.
    pub neutral: [f32; 4],
}

impl Default for FieldPalette {
    fn default() -> Self {
        Self {
            color0: [0.2, 0.6, 1.0],
            color1: [1.0, 0.5, 0.2],
            alpha: 0.4,
            neutral: [0.5, 0.5, 0.5, 0.4],
        }
    }
}

/// Uniform block mirrored by `struct Field` in the WGSL source.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FieldUniforms {
    pub hidden1: u32,
    pub hidden2: u32,
    pub alpha: f32,
    _pad: f32,
    pub color0: [f32; 4],
    pub color1: [f32; 4],
    pub neutral: [f32; 4],
}

impl FieldUniforms {
    pub fn new(topology: Topology, palette: &FieldPalette) -> Self {
        let [r0, g0, b0] = palette.color0;
        let [r1, g1, b1] = palette.color1;
        Self {
            hidden1: topology.hidden1 as u32,
            hidden2: topology.hidden2 as u32,
            alpha: palette.alpha,
            _pad: 0.0,
            color0: [r0, g0, b0, 1.0],
            color1: [r1, g1, b1, 1.0],
            neutral: palette.neutral,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Expected length of each parameter array for `topology`, in upload order.
pub fn param_lengths(topology: Topology) -> [usize; 6] {
    let [(i1, o1), (i2, o2), (i3, o3)] = topology.layer_dims();
    [i1 * o1, o1, i2 * o2, o2, i3 * o3, o3]
}

/// Parameter arrays paired with their shader names, ready for upload.
pub fn named_arrays(snapshot: &ParamSnapshot) -> [(&'static str, &[f32]); 6] {
    let arrays = snapshot.arrays();
    let mut i = 0;
    arrays.map(|a| {
        let name = PARAM_BINDINGS[i].0;
        i += 1;
        (name, a)
    })
}

#[inline]
fn dense_relu(weights: &[f32], biases: &[f32], inputs: &[f32], out: &mut [f32]) {
    let cols = inputs.len();
    for (j, o) in out.iter_mut().enumerate() {
        let mut sum = biases[j];
        for (i, &x) in inputs.iter().enumerate() {
            sum += weights[j * cols + i] * x;
        }
        *o = sum.max(0.0);
    }
}

/// Class-1 probability as the fragment shader computes it.
///
/// `None` where the shader would emit the neutral color.
pub fn probability(snapshot: &ParamSnapshot, x: f32, y: f32) -> Option<f32> {
    let h1 = snapshot.topology.hidden1.min(MAX_HIDDEN);
    let h2 = snapshot.topology.hidden2.min(MAX_HIDDEN);

    let a0 = [x, y];
    let mut a1 = [0.0_f32; MAX_HIDDEN];
    let mut a2 = [0.0_f32; MAX_HIDDEN];
    dense_relu(&snapshot.w1, &snapshot.b1, &a0, &mut a1[..h1]);
    dense_relu(&snapshot.w2, &snapshot.b2, &a1[..h1], &mut a2[..h2]);

    let mut logits = [0.0_f32; OUTPUT_DIM];
    let mut max_logit = SHADER_MIN_LOGIT;
    for (k, logit) in logits.iter_mut().enumerate() {
        let mut sum = snapshot.b3[k];
        for j in 0..h2 {
            sum += snapshot.w3[k * h2 + j] * a2[j];
        }
        *logit = sum;
        if sum > max_logit {
            max_logit = sum;
        }
    }

    let mut probs = [0.0_f32; OUTPUT_DIM];
    let mut exp_sum = 0.0_f32;
    for (p, &l) in probs.iter_mut().zip(&logits) {
        let e = (l - max_logit).exp();
        *p = e;
        exp_sum += e;
    }
    if !(exp_sum > 0.0) {
        return None;
    }
    Some(probs[1] / exp_sum)
}

/// RGBA the fragment shader writes at `(x, y)`.
pub fn shade(snapshot: &ParamSnapshot, palette: &FieldPalette, x: f32, y: f32) -> [f32; 4] {
    let Some(p1) = probability(snapshot, x, y) else {
        return palette.neutral;
    };
    let mix = |a: f32, b: f32| a * (1.0 - p1) + b * p1;
    let [r0, g0, b0] = palette.color0;
    let [r1, g1, b1] = palette.color1;
    [mix(r0, r1), mix(g0, g1), mix(b0, b1), palette.alpha]
}

/// Coordinate of lattice index `i` on `[-1, 1]` with `resolution` points per axis.
#[inline]
pub fn grid_coord(i: usize, resolution: usize) -> f32 {
    let step = 2.0 / (resolution.max(2) - 1) as f32;
    -1.0 + step * i as f32
}

/// Class-1 probability from `Network::forward_single` over a
/// `resolution x resolution` lattice on `[-1, 1]^2`, row `j` at `y = grid_coord(j)`.
///
/// `resolution` is raised to at least 2.
pub fn decision_grid(net: &Network, resolution: usize) -> Vec<f32> {
    let res = resolution.max(2);
    let mut probs = Vec::with_capacity(res * res);
    for j in 0..res {
        let y = grid_coord(j, res);
        for i in 0..res {
            let x = grid_coord(i, res);
            probs.push(net.forward_single(x, y)[1]);
        }
    }
    probs
}

/// Shader output over the same lattice as [`decision_grid`].
pub fn shade_grid(snapshot: &ParamSnapshot, palette: &FieldPalette, resolution: usize) -> Vec<[f32; 4]> {
    let res = resolution.max(2);
    let mut colors = Vec::with_capacity(res * res);
    for j in 0..res {
        let y = grid_coord(j, res);
        for i in 0..res {
            colors.push(shade(snapshot, palette, grid_coord(i, res), y));
        }
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn source_declares_every_parameter_binding() {
        for (name, binding) in PARAM_BINDINGS {
            let decl = format!("@binding({binding}) var<storage, read> {name}: array<f32>;");
            assert!(FIELD_SHADER_WGSL.contains(&decl), "missing {decl}");
        }
        assert!(FIELD_SHADER_WGSL.contains("var<uniform> field: Field;"));
        assert!(FIELD_SHADER_WGSL.contains("const MAX_HIDDEN: u32 = 16u;"));
        assert!(FIELD_SHADER_WGSL.contains("var max_logit = -1e30;"));
    }

    #[test]
    fn uniform_block_is_std140_sized() {
        let u = FieldUniforms::new(Topology::new(4, 8), &FieldPalette::default());
        assert_eq!(u.as_bytes().len(), 64);
        assert_eq!(u.hidden1, 4);
        assert_eq!(u.hidden2, 8);
    }

    #[test]
    fn param_lengths_match_snapshot() {
        let t = Topology::new(5, 3);
        let snap = ParamSnapshot::filled(t, 0.0, 0.0);
        let lens = param_lengths(t);
        for ((name, arr), len) in named_arrays(&snap).iter().zip(lens) {
            assert_eq!(arr.len(), len, "{name}");
        }
        assert_eq!(named_arrays(&snap)[2].0, "u_W2");
    }

    #[test]
    fn zero_parameters_shade_the_midpoint_color() {
        let snap = ParamSnapshot::filled(Topology::default(), 0.0, 0.0);
        let palette = FieldPalette::default();
        assert_eq!(probability(&snap, 0.3, -0.2), Some(0.5));
        let c = shade(&snap, &palette, 0.3, -0.2);
        assert_abs_diff_eq!(c[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(c[1], 0.55, epsilon = 1e-6);
        assert_abs_diff_eq!(c[2], 0.6, epsilon = 1e-6);
        assert_eq!(c[3], 0.4);
    }

    #[test]
    fn degenerate_softmax_shades_neutral() {
        let mut snap = ParamSnapshot::filled(Topology::default(), 0.1, 0.0);
        snap.b3 = vec![f32::INFINITY, f32::INFINITY];
        let palette = FieldPalette::default();
        assert_eq!(probability(&snap, 0.0, 0.0), None);
        assert_eq!(shade(&snap, &palette, 0.0, 0.0), palette.neutral);
    }

    #[test]
    fn grid_spans_the_unit_square() {
        assert_eq!(grid_coord(0, 64), -1.0);
        assert_abs_diff_eq!(grid_coord(63, 64), 1.0, epsilon = 1e-6);
        let net = Network::default();
        let grid = decision_grid(&net, 8);
        assert_eq!(grid.len(), 64);
        assert!(grid.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(decision_grid(&net, 0).len(), 4);
    }
}
