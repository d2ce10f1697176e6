//! Loss functions.
//!
//! The training loop optimizes cross-entropy over the labeled node
//! partition, and re-uses the same criterion to score the validation
//! partition when deciding whether to checkpoint.

use std::sync::Arc;

use crate::autograd::grad_fn::CrossEntropyBackward;
use crate::autograd::{is_grad_enabled, with_graph, Tensor};

/// Cross-entropy loss for multi-class classification.
///
/// Combines softmax and negative log-likelihood in one step for
/// numerical stability, averaging over the batch:
///
/// ```text
/// loss = mean(-log(softmax(logits)[target_class]))
/// ```
///
/// # Arguments
///
/// * `logits` - Raw model outputs, shape [batch, num_classes]
/// * `targets` - Target class indices (as f32), shape [batch]
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute the mean cross-entropy loss.
    ///
    /// # Panics
    ///
    /// Panics if logits are not 2D, targets are not 1D, batch sizes
    /// differ, or a target index is out of bounds.
    #[must_use]
    pub fn forward(&self, logits: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(logits.ndim(), 2, "Logits must be 2D [batch, classes]");
        assert_eq!(targets.ndim(), 1, "Targets must be 1D [batch]");
        assert_eq!(
            logits.shape()[0],
            targets.shape()[0],
            "Batch sizes must match"
        );

        let batch_size = logits.shape()[0];
        let num_classes = logits.shape()[1];

        // Softmax is kept for the backward pass; log-softmax computes the
        // loss itself without overflow.
        let softmax_output = softmax_2d(logits);
        let log_probs = log_softmax(logits);

        let target_indices: Vec<usize> = targets
            .data()
            .iter()
            .map(|&t| {
                let idx = t as usize;
                assert!(
                    idx < num_classes,
                    "Target class {idx} out of bounds for {num_classes} classes"
                );
                idx
            })
            .collect();

        let total: f32 = target_indices
            .iter()
            .enumerate()
            .map(|(b, &target_class)| -log_probs.data()[b * num_classes + target_class])
            .sum();
        let mean_val = total / batch_size as f32;

        let mut loss = Tensor::from_slice(&[mean_val]);

        if is_grad_enabled() && logits.requires_grad_enabled() {
            loss.requires_grad_(true);
            let grad_fn = Arc::new(CrossEntropyBackward {
                softmax_output,
                targets: target_indices,
            });
            loss.set_grad_fn(grad_fn.clone());

            with_graph(|graph| {
                graph.register_tensor(logits.clone());
                graph.record(loss.id(), grad_fn, vec![logits.id()]);
            });
        }

        loss
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Row-wise softmax with max subtraction for numerical stability.
fn softmax_2d(x: &Tensor) -> Tensor {
    assert_eq!(x.ndim(), 2);

    let (batch, features) = (x.shape()[0], x.shape()[1]);
    let mut output = vec![0.0; batch * features];

    for b in 0..batch {
        let row_start = b * features;

        let max_val = x.data()[row_start..row_start + features]
            .iter()
            .fold(f32::NEG_INFINITY, |a, &b| a.max(b));

        let mut sum = 0.0;
        for j in 0..features {
            let exp_val = (x.data()[row_start + j] - max_val).exp();
            output[row_start + j] = exp_val;
            sum += exp_val;
        }

        for j in 0..features {
            output[row_start + j] /= sum;
        }
    }

    Tensor::new(&output, x.shape())
}

/// Row-wise log-softmax: x - max - log(sum(exp(x - max))).
fn log_softmax(x: &Tensor) -> Tensor {
    assert_eq!(x.ndim(), 2);

    let (batch, features) = (x.shape()[0], x.shape()[1]);
    let mut output = vec![0.0; batch * features];

    for b in 0..batch {
        let row_start = b * features;

        let max_val = x.data()[row_start..row_start + features]
            .iter()
            .fold(f32::NEG_INFINITY, |a, &b| a.max(b));

        let log_sum_exp: f32 = x.data()[row_start..row_start + features]
            .iter()
            .map(|&v| (v - max_val).exp())
            .sum::<f32>()
            .ln();

        for j in 0..features {
            output[row_start + j] = x.data()[row_start + j] - max_val - log_sum_exp;
        }
    }

    Tensor::new(&output, x.shape())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, get_grad};

    #[test]
    fn test_uniform_logits_loss_is_ln_classes() {
        // Equal logits over 2 classes: loss = ln(2) regardless of target
        let logits = Tensor::new(&[0.0, 0.0, 0.0, 0.0], &[2, 2]);
        let targets = Tensor::from_slice(&[0.0, 1.0]);

        let criterion = CrossEntropyLoss::new();
        let loss = criterion.forward(&logits, &targets);

        assert!((loss.item() - 2.0_f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_confident_correct_prediction_near_zero() {
        let logits = Tensor::new(&[10.0, -10.0], &[1, 2]);
        let targets = Tensor::from_slice(&[0.0]);

        let loss = CrossEntropyLoss::new().forward(&logits, &targets);
        assert!(loss.item() < 1e-3);
    }

    #[test]
    fn test_confident_wrong_prediction_large_loss() {
        let logits = Tensor::new(&[10.0, -10.0], &[1, 2]);
        let targets = Tensor::from_slice(&[1.0]);

        let loss = CrossEntropyLoss::new().forward(&logits, &targets);
        assert!(loss.item() > 5.0);
    }

    #[test]
    fn test_gradient_is_softmax_minus_one_hot() {
        clear_graph();
        let logits = Tensor::new(&[0.0, 0.0], &[1, 2]).requires_grad();
        let targets = Tensor::from_slice(&[0.0]);

        let loss = CrossEntropyLoss::new().forward(&logits, &targets);
        loss.backward();

        let grad = get_grad(logits.id()).unwrap();
        // softmax = [0.5, 0.5], one_hot = [1, 0], batch = 1
        assert!((grad.data()[0] - (-0.5)).abs() < 1e-5);
        assert!((grad.data()[1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_loss_invariant_to_logit_shift() {
        // Softmax is shift-invariant; large offsets must not overflow
        let logits_a = Tensor::new(&[1.0, 2.0, 3.0], &[1, 3]);
        let logits_b = Tensor::new(&[1001.0, 1002.0, 1003.0], &[1, 3]);
        let targets = Tensor::from_slice(&[2.0]);

        let criterion = CrossEntropyLoss::new();
        let loss_a = criterion.forward(&logits_a, &targets);
        let loss_b = criterion.forward(&logits_b, &targets);

        assert!((loss_a.item() - loss_b.item()).abs() < 1e-4);
    }

    #[test]
    #[should_panic(expected = "Batch sizes must match")]
    fn test_batch_mismatch_panics() {
        let logits = Tensor::new(&[0.0, 0.0], &[1, 2]);
        let targets = Tensor::from_slice(&[0.0, 1.0]);
        let _ = CrossEntropyLoss::new().forward(&logits, &targets);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_target_out_of_bounds_panics() {
        let logits = Tensor::new(&[0.0, 0.0], &[1, 2]);
        let targets = Tensor::from_slice(&[5.0]);
        let _ = CrossEntropyLoss::new().forward(&logits, &targets);
    }

    #[test]
    fn test_no_grad_skips_recording() {
        use crate::autograd::no_grad;

        clear_graph();
        let logits = Tensor::new(&[1.0, 2.0], &[1, 2]).requires_grad();
        let targets = Tensor::from_slice(&[0.0]);

        let loss = no_grad(|| CrossEntropyLoss::new().forward(&logits, &targets));
        assert!(!loss.requires_grad_enabled());
    }
}
