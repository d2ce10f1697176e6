//! Grafo: Simplified graph convolution training in pure Rust.
//!
//! Grafo trains node classifiers on citation graphs by folding the graph
//! structure into the features up front. Smoothing through the normalized
//! adjacency happens once per experiment; training then reduces to a linear
//! model over the pre-computed features, repeated across seeds and reported
//! as mean and standard deviation.
//!
//! # Quick Start
//!
//! ```
//! use grafo::autograd::Tensor;
//! use grafo::experiment::{evaluate, train_classifier, TrainOptions};
//! use grafo::graph::{AdjacencyMatrix, Normalization};
//! use grafo::models::{self, ModelKind};
//! use grafo::primitives::Matrix;
//! use grafo::propagation::propagate;
//!
//! // Two-cluster toy graph: papers 0-1 cite each other, papers 2-3 cite each other
//! let adj = AdjacencyMatrix::from_edges(4, &[(0, 1), (2, 3)])
//!     .normalize(Normalization::AugNormAdj);
//! let features = Matrix::from_vec(4, 2, vec![
//!     1.0, 0.0,
//!     0.9, 0.1,
//!     0.0, 1.0,
//!     0.1, 0.9,
//! ]).unwrap();
//! let labels = vec![0, 0, 1, 1];
//!
//! // Fold one smoothing step into the features, then train a linear head
//! let (smoothed, _elapsed) = propagate(&features, &adj, 1, 0.0).unwrap();
//! let x = Tensor::new(smoothed.as_slice(), &[4, 2]);
//! let mut model = models::build(ModelKind::Sgc, 2, 2, 0, 0.0, &adj, Some(42)).unwrap();
//!
//! let opts = TrainOptions { epochs: 100, lr: 0.5, weight_decay: 0.0 };
//! let report = train_classifier(&mut model, &x, &labels, &x, &labels, &opts);
//! assert!(report.best_val_acc > 0.99);
//! assert!(evaluate(&mut model, &x, &labels) > 0.99);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`autograd`]: Tape-based reverse-mode automatic differentiation
//! - [`nn`]: Layers, cross-entropy loss, and the Adam optimizer
//! - [`graph`]: Sparse adjacency construction and normalization schemes
//! - [`data`]: Citation dataset loading and Planetoid-style splits
//! - [`propagation`]: Feature pre-computation through the normalized adjacency
//! - [`models`]: Node classifier architectures (SGC, GCN)
//! - [`experiment`]: Repeat-and-aggregate training driver
//! - [`metrics`]: Evaluation metrics
//! - [`tuning`]: Tuned hyperparameters stored alongside the datasets
//! - [`random`]: Seed derivation for reproducible repeats
//! - [`error`]: Crate-wide error type

pub mod autograd;
pub mod data;
pub mod error;
pub mod experiment;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod nn;
pub mod primitives;
pub mod propagation;
pub mod random;
pub mod tuning;

pub use autograd::Tensor;
pub use error::{GrafoError, Result};
pub use primitives::{Matrix, Vector};
