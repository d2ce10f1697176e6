//! Core compute primitives (Vector, Matrix).
//!
//! These types provide the foundation for the dataset pipeline and the
//! autograd tensors built on top of them.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
