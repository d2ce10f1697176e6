//! Evaluation metrics for node classification.

pub mod classification;

pub use classification::{accuracy, argmax_rows};
