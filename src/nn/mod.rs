//! Neural network building blocks for node classification.
//!
//! This module is organized around the [`Module`] trait, which defines
//! the interface shared by all layers:
//!
//! - **Layers**: [`Linear`], [`GraphConv`]
//! - **Regularization**: [`Dropout`]
//! - **Loss**: [`CrossEntropyLoss`]
//! - **Optimization**: [`Adam`]
//!
//! # Example
//!
//! ```ignore
//! use grafo::nn::{Linear, Module};
//! use grafo::autograd::Tensor;
//!
//! let model = Linear::with_seed(1433, 7, Some(42));
//! let x = Tensor::zeros(&[2708, 1433]);
//! let logits = model.forward(&x); // [2708, 7]
//! ```
//!
//! # References
//!
//! - Glorot, X., & Bengio, Y. (2010). Understanding the difficulty of training
//!   deep feedforward neural networks. AISTATS.
//! - Kipf, T. N., & Welling, M. (2017). Semi-supervised classification with
//!   graph convolutional networks. ICLR.

mod dropout;
mod graph_conv;
mod init;
mod linear;
mod loss;
mod module;
mod optim;

pub use dropout::Dropout;
pub use graph_conv::GraphConv;
pub use init::xavier_uniform;
pub use linear::Linear;
pub use loss::CrossEntropyLoss;
pub use module::Module;
pub use optim::{Adam, Optimizer};
