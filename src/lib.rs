//! A tiny two-class classifier with a GPU mirror of its forward pass.
//!
//! `boundary-mlp` trains a fixed-shape `2 -> hidden1 -> hidden2 -> 2` ReLU network on
//! the CPU with hand-written backpropagation and one of three optimizers (SGD,
//! momentum, Adam). The trained parameters are handed to a WGSL fragment shader
//! that re-runs the same forward pass per pixel to draw the decision field.
//!
//! # Design goals
//!
//! - Two backends, one formula: [`Network::forward_single`] and the shader (see
//!   [`shader`]) compute the same sums in the same order with the same softmax.
//! - Predictable performance: batch activations, gradients and optimizer state are
//!   allocated once per shape and reused by every step.
//! - Closed interactive core: setters clamp instead of failing, empty input is a
//!   no-op. [`Result`] appears only where external data is validated.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - Layer weights are row-major with shape `(out_dim, in_dim)`; element
//!   `(row, col)` lives at `row * in_dim + col`.
//! - Parameter arrays are exposed in upload order `W1, b1, W2, b2, W3, b3`.
//!
//! # Quick start
//!
//! ```rust
//! use boundary_mlp::{Dataset, DatasetKind, OptimizerConfig, Trainer, TrainerConfig};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let data = Dataset::generate(DatasetKind::TwoBlobs, 200, 0.2, &mut rng);
//!
//! let mut trainer = Trainer::new(TrainerConfig {
//!     optimizer: OptimizerConfig::adam(0.05, 0.9, 0.999, 1e-8),
//!     ..TrainerConfig::default()
//! });
//! for _ in 0..100 {
//!     trainer.step_once(&data);
//! }
//! assert_eq!(trainer.step_count(), 100);
//!
//! let [p0, p1] = trainer.network().forward_single(0.5, 0.0);
//! assert!((p0 + p1 - 1.0).abs() < 1e-5);
//! ```
//!
//! # Driving the field shader
//!
//! ```rust
//! use boundary_mlp::Scene;
//! use boundary_mlp::shader::{FIELD_SHADER_WGSL, PARAM_BINDINGS};
//!
//! let mut scene = Scene::default();
//! scene.set_auto_train(true);
//! if let Some(snapshot) = scene.tick() {
//!     let uniforms = scene.field_uniforms();
//!     for ((name, _binding), bytes) in PARAM_BINDINGS.iter().zip(snapshot.as_bytes()) {
//!         // queue.write_buffer(&buffers[name], 0, bytes);
//!         assert!(!bytes.is_empty(), "{name}");
//!     }
//!     assert_eq!(uniforms.as_bytes().len(), 64);
//! }
//! assert!(FIELD_SHADER_WGSL.contains("fs_main"));
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod layer;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod scene;
pub mod shader;
pub mod trainer;

pub use config::{
    INPUT_DIM, InitMode, MAX_BATCH, MAX_HIDDEN, MIN_HIDDEN, OUTPUT_DIM, OptimizerConfig,
    OptimizerKind, Topology, TrainerConfig, clamp_batch_size,
};
pub use data::{Dataset, DatasetKind, Sample};
pub use error::{Error, Result};
pub use layer::Layer;
pub use metrics::{BatchReport, History, HistoryEntry};
pub use network::{BatchScratch, Gradients, Network, ParamSnapshot, Probe};
pub use optim::OptimizerState;
pub use scene::{Scene, SceneSettings};
pub use trainer::{StopReason, Trainer};
