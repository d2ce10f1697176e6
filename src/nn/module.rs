//! Base trait for neural network layers and models.

use crate::autograd::Tensor;

/// Common interface for layers and models.
///
/// A module maps an input tensor to an output tensor and exposes its
/// trainable parameters to optimizers. Modules that behave differently
/// during training and inference (dropout) override `train`/`eval`.
pub trait Module {
    /// Compute the forward pass.
    fn forward(&self, input: &Tensor) -> Tensor;

    /// Get references to all trainable parameters.
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Get mutable references to all trainable parameters.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Switch the module to training mode.
    fn train(&mut self) {}

    /// Switch the module to evaluation mode.
    fn eval(&mut self) {}

    /// Check whether the module is in training mode.
    fn training(&self) -> bool {
        true
    }

    /// Total number of trainable scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
