//! Labelled 2D samples.
//!
//! A `Dataset` is a read-only, ordered list of `(x, y, label)` points. The
//! trainer walks it round-robin; replacing it means calling
//! `Trainer::reset_for_new_dataset`.

use std::f32::consts::PI;

use rand::Rng;

use crate::{Error, OUTPUT_DIM, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f32,
    pub y: f32,
    /// Class index, `0` or `1`.
    pub label: usize,
}

impl Sample {
    #[inline]
    pub const fn new(x: f32, y: f32, label: usize) -> Self {
        Self { x, y, label }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Procedural point layouts used to exercise the classifier.
pub enum DatasetKind {
    #[default]
    TwoBlobs,
    ConcentricCircles,
    TwoMoons,
    XorQuads,
    Spirals,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        Self::TwoBlobs,
        Self::ConcentricCircles,
        Self::TwoMoons,
        Self::XorQuads,
        Self::Spirals,
    ];

    /// Host-side index; out-of-range values clamp to the nearest kind.
    pub fn from_index(index: i32) -> Self {
        let i = index.clamp(0, Self::ALL.len() as i32 - 1) as usize;
        Self::ALL[i]
    }

    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|&k| k == self).unwrap_or(0) as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TwoBlobs => "two blobs",
            Self::ConcentricCircles => "concentric circles",
            Self::TwoMoons => "two moons",
            Self::XorQuads => "xor quads",
            Self::Spirals => "spirals",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dataset, checking labels are valid classes and coordinates are finite.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        for (i, s) in samples.iter().enumerate() {
            if s.label >= OUTPUT_DIM {
                return Err(Error::InvalidData(format!(
                    "sample {i} has label {}, expected < {OUTPUT_DIM}",
                    s.label
                )));
            }
            if !(s.x.is_finite() && s.y.is_finite()) {
                return Err(Error::InvalidData(format!(
                    "sample {i} has non-finite coordinates ({}, {})",
                    s.x, s.y
                )));
            }
        }
        Ok(Self { samples })
    }

    /// Build a dataset from parallel point/label slices.
    pub fn from_rows(points: &[[f32; 2]], labels: &[usize]) -> Result<Self> {
        if points.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "points/labels length mismatch: {} vs {}",
                points.len(),
                labels.len()
            )));
        }
        let samples = points
            .iter()
            .zip(labels)
            .map(|(p, &label)| Sample::new(p[0], p[1], label))
            .collect();
        Self::from_samples(samples)
    }

    /// Generate `num_points` samples of the given layout.
    ///
    /// `spread` is a radius for blob-like layouts and a noise amplitude for the
    /// curve-like ones. Roughly half the points get each label.
    pub fn generate<R: Rng + ?Sized>(
        kind: DatasetKind,
        num_points: usize,
        spread: f32,
        rng: &mut R,
    ) -> Self {
        let spread = if spread.is_finite() { spread.max(0.0) } else { 0.0 };
        let mut samples = Vec::with_capacity(num_points);
        match kind {
            DatasetKind::TwoBlobs => two_blobs(num_points, spread, rng, &mut samples),
            DatasetKind::ConcentricCircles => circles(num_points, spread, rng, &mut samples),
            DatasetKind::TwoMoons => moons(num_points, spread, rng, &mut samples),
            DatasetKind::XorQuads => xor_quads(num_points, spread, rng, &mut samples),
            DatasetKind::Spirals => spirals(num_points, spread, rng, &mut samples),
        }
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Panics if `idx >= len`.
    #[inline]
    pub fn sample(&self, idx: usize) -> Sample {
        self.samples[idx]
    }
}

#[inline]
fn unit<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(0.0_f32..=1.0)
}

fn scatter_disc<R: Rng + ?Sized>(
    cx: f32,
    cy: f32,
    radius: f32,
    label: usize,
    count: usize,
    rng: &mut R,
    out: &mut Vec<Sample>,
) {
    for _ in 0..count {
        let angle = unit(rng) * 2.0 * PI;
        let r = radius * unit(rng);
        out.push(Sample::new(cx + angle.cos() * r, cy + angle.sin() * r, label));
    }
}

fn two_blobs<R: Rng + ?Sized>(n: usize, spread: f32, rng: &mut R, out: &mut Vec<Sample>) {
    let half = n / 2;
    scatter_disc(-0.5, 0.0, spread, 0, half, rng, out);
    scatter_disc(0.5, 0.0, spread, 1, n - half, rng, out);
}

fn circles<R: Rng + ?Sized>(n: usize, noise: f32, rng: &mut R, out: &mut Vec<Sample>) {
    let half = n / 2;
    for (label, radius, count) in [(0, 0.3_f32, half), (1, 0.75, n - half)] {
        for _ in 0..count {
            let angle = unit(rng) * 2.0 * PI;
            let r = radius + noise * (unit(rng) - 0.5);
            out.push(Sample::new(r * angle.cos(), r * angle.sin(), label));
        }
    }
}

fn moons<R: Rng + ?Sized>(n: usize, noise: f32, rng: &mut R, out: &mut Vec<Sample>) {
    const RADIUS: f32 = 0.8;
    const OFFSET_X: f32 = 0.5;
    const OFFSET_Y: f32 = 0.25;

    let half = n / 2;
    for i in 0..n {
        let t = unit(rng) * PI;
        let (x, y, label) = if i < half {
            (t.cos() * RADIUS - OFFSET_X, t.sin() * RADIUS * 0.5, 0)
        } else {
            (
                t.cos() * RADIUS + OFFSET_X,
                -t.sin() * RADIUS * 0.5 + OFFSET_Y,
                1,
            )
        };
        let jx = noise * (unit(rng) - 0.5);
        let jy = noise * (unit(rng) - 0.5);
        out.push(Sample::new(x + jx, y + jy, label));
    }
}

fn xor_quads<R: Rng + ?Sized>(n: usize, spread: f32, rng: &mut R, out: &mut Vec<Sample>) {
    let quarter = n / 4;
    scatter_disc(-0.5, -0.5, spread, 0, quarter, rng, out);
    scatter_disc(0.5, 0.5, spread, 0, quarter, rng, out);
    scatter_disc(-0.5, 0.5, spread, 1, quarter, rng, out);
    scatter_disc(0.5, -0.5, spread, 1, n - 3 * quarter, rng, out);
}

fn spirals<R: Rng + ?Sized>(n: usize, noise: f32, rng: &mut R, out: &mut Vec<Sample>) {
    const MAX_T: f32 = 3.5 * PI;
    const A: f32 = 0.1;
    const B: f32 = 0.05;

    let half = n / 2;
    for (label, phase, count) in [(0, 0.0_f32, half), (1, PI, n - half)] {
        for _ in 0..count {
            let t = unit(rng) * MAX_T;
            let r = A + B * t;
            let x = r * (t + phase).cos() + noise * (unit(rng) - 0.5);
            let y = r * (t + phase).sin() + noise * (unit(rng) - 0.5);
            out.push(Sample::new(x, y, label));
        }
    }
}
