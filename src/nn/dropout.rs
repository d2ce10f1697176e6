//! Dropout regularization.
//!
//! Dropout randomly zeroes elements during training to prevent
//! co-adaptation of hidden units. The two-layer graph convolution
//! classifier applies it between layers; in evaluation mode it is the
//! identity.
//!
//! # Reference
//!
//! - Srivastava, N., et al. (2014). Dropout: A simple way to prevent neural
//!   networks from overfitting. JMLR.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::module::Module;
use crate::autograd::grad_fn::DropoutBackward;
use crate::autograd::{is_grad_enabled, with_graph, Tensor};

/// Dropout layer.
///
/// During training, zeroes each element independently with probability
/// `p` and scales survivors by `1/(1-p)` so activations keep their
/// expected value (inverted dropout). During evaluation, returns the
/// input unchanged.
pub struct Dropout {
    /// Probability of an element being zeroed
    p: f32,

    /// Whether in training mode
    training: bool,

    /// Random number generator (Mutex because forward takes &self)
    rng: Mutex<StdRng>,
}

impl Dropout {
    /// Create a new Dropout layer.
    ///
    /// # Arguments
    ///
    /// * `p` - Probability of an element being zeroed (must be in [0, 1))
    ///
    /// # Panics
    ///
    /// Panics if `p` is not in [0, 1).
    #[must_use]
    pub fn new(p: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "Dropout probability must be in [0, 1), got {p}",
        );

        Self {
            p,
            training: true,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a new Dropout layer with a specific seed for reproducibility.
    #[must_use]
    pub fn with_seed(p: f32, seed: u64) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "Dropout probability must be in [0, 1), got {p}",
        );

        Self {
            p,
            training: true,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Reseed the internal generator.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
    }

    /// Get the dropout probability.
    #[must_use]
    pub fn probability(&self) -> f32 {
        self.p
    }
}

impl Module for Dropout {
    fn forward(&self, input: &Tensor) -> Tensor {
        if !self.training || self.p == 0.0 {
            return input.clone();
        }

        let scale = 1.0 / (1.0 - self.p);
        let mask: Vec<f32> = {
            let mut rng = self.rng.lock().expect("Dropout RNG lock poisoned");
            input
                .data()
                .iter()
                .map(|_| if rng.gen::<f32>() < self.p { 0.0 } else { scale })
                .collect()
        };

        let data: Vec<f32> = input
            .data()
            .iter()
            .zip(mask.iter())
            .map(|(&x, &m)| x * m)
            .collect();

        let mut result = Tensor::new(&data, input.shape());

        if is_grad_enabled() && input.requires_grad_enabled() {
            result.requires_grad_(true);
            let grad_fn = Arc::new(DropoutBackward { mask });
            result.set_grad_fn(grad_fn.clone());

            with_graph(|graph| {
                graph.register_tensor(input.clone());
                graph.record(result.id(), grad_fn, vec![input.id()]);
            });
        }

        result
    }

    fn train(&mut self) {
        self.training = true;
    }

    fn eval(&mut self) {
        self.training = false;
    }

    fn training(&self) -> bool {
        self.training
    }
}

impl Clone for Dropout {
    fn clone(&self) -> Self {
        let rng = self
            .rng
            .lock()
            .map_or_else(|_| StdRng::from_entropy(), |r| r.clone());
        Self {
            p: self.p,
            training: self.training,
            rng: Mutex::new(rng),
        }
    }
}

impl std::fmt::Debug for Dropout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dropout")
            .field("p", &self.p)
            .field("training", &self.training)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{clear_graph, get_grad};

    #[test]
    fn test_eval_mode_is_identity() {
        let mut dropout = Dropout::with_seed(0.5, 42);
        dropout.eval();

        let x = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let y = dropout.forward(&x);

        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let dropout = Dropout::new(0.0);
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let y = dropout.forward(&x);

        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn test_training_zeroes_and_scales() {
        let dropout = Dropout::with_seed(0.5, 42);
        let x = Tensor::ones(&[1000]);
        let y = dropout.forward(&x);

        let zeros = y.data().iter().filter(|&&v| v == 0.0).count();
        let kept = y.data().iter().filter(|&&v| (v - 2.0).abs() < 1e-6).count();

        // Every element is either dropped or scaled by 1/(1-p) = 2
        assert_eq!(zeros + kept, 1000);
        // Roughly half dropped
        assert!((300..700).contains(&zeros), "dropped {zeros} of 1000");
    }

    #[test]
    fn test_reproducible_with_seed() {
        let d1 = Dropout::with_seed(0.5, 7);
        let d2 = Dropout::with_seed(0.5, 7);
        let x = Tensor::ones(&[100]);

        assert_eq!(d1.forward(&x).data(), d2.forward(&x).data());
    }

    #[test]
    fn test_gradient_masked_like_forward() {
        clear_graph();
        let dropout = Dropout::with_seed(0.5, 42);
        let x = Tensor::ones(&[50]).requires_grad();
        let y = dropout.forward(&x);
        let forward_data = y.data().to_vec();

        y.sum().backward();
        let grad = get_grad(x.id()).unwrap();

        // Gradient is zero exactly where the activation was dropped
        for (g, v) in grad.data().iter().zip(forward_data.iter()) {
            if *v == 0.0 {
                assert_eq!(*g, 0.0);
            } else {
                assert!((g - 2.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    #[should_panic(expected = "must be in [0, 1)")]
    fn test_invalid_probability_panics() {
        let _ = Dropout::new(1.0);
    }

    #[test]
    fn test_training_mode_toggles() {
        let mut dropout = Dropout::new(0.5);
        assert!(dropout.training());

        dropout.eval();
        assert!(!dropout.training());

        dropout.train();
        assert!(dropout.training());
    }
}
