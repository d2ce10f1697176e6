//! Gradient function trait and implementations.
//!
//! Each differentiable operation implements `GradFn` to define
//! how gradients flow backward through the operation.

use super::tensor::Tensor;

/// Trait for functions that compute gradients during backward pass.
///
/// Each differentiable operation creates a `GradFn` implementation
/// that captures the necessary context for gradient computation.
///
/// # Example Implementation
///
/// For element-wise addition z = x + y:
/// - ∂z/∂x = 1
/// - ∂z/∂y = 1
///
/// So `backward(grad_output)` returns [`grad_output`, `grad_output`].
pub trait GradFn: Send + Sync {
    /// Compute gradients with respect to inputs.
    ///
    /// # Arguments
    ///
    /// * `grad_output` - Gradient flowing back from downstream operations
    ///
    /// # Returns
    ///
    /// Vector of gradients, one for each input tensor.
    /// The order must match the input order used during forward pass.
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor>;

    /// Human-readable name for debugging.
    fn name(&self) -> &'static str;
}

// ============================================================================
// Element-wise Operations
// ============================================================================

/// Gradient function for addition: z = x + y (equal shapes)
pub(crate) struct AddBackward;

impl GradFn for AddBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(x+y)/∂x = 1, ∂(x+y)/∂y = 1
        vec![grad_output.clone(), grad_output.clone()]
    }

    fn name(&self) -> &'static str {
        "AddBackward"
    }
}

/// Gradient function for subtraction: z = x - y (equal shapes)
pub(crate) struct SubBackward;

impl GradFn for SubBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(x-y)/∂x = 1, ∂(x-y)/∂y = -1
        let grad_y_data: Vec<f32> = grad_output.data().iter().map(|&g| -g).collect();
        vec![
            grad_output.clone(),
            Tensor::new(&grad_y_data, grad_output.shape()),
        ]
    }

    fn name(&self) -> &'static str {
        "SubBackward"
    }
}

/// Gradient function for multiplication: z = x * y (equal shapes)
pub(crate) struct MulBackward {
    pub(crate) x: Tensor,
    pub(crate) y: Tensor,
}

impl GradFn for MulBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(x*y)/∂x = y, ∂(x*y)/∂y = x
        let grad_x_data: Vec<f32> = grad_output
            .data()
            .iter()
            .zip(self.y.data().iter())
            .map(|(&g, &y)| g * y)
            .collect();
        let grad_y_data: Vec<f32> = grad_output
            .data()
            .iter()
            .zip(self.x.data().iter())
            .map(|(&g, &x)| g * x)
            .collect();

        vec![
            Tensor::new(&grad_x_data, grad_output.shape()),
            Tensor::new(&grad_y_data, grad_output.shape()),
        ]
    }

    fn name(&self) -> &'static str {
        "MulBackward"
    }
}

/// Gradient function for scalar multiplication: z = x * c
pub(crate) struct MulScalarBackward {
    pub(crate) scalar: f32,
}

impl GradFn for MulScalarBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(c*x)/∂x = c
        let grad_data: Vec<f32> = grad_output.data().iter().map(|&g| g * self.scalar).collect();
        vec![Tensor::new(&grad_data, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "MulScalarBackward"
    }
}

/// Gradient function for negation: z = -x
pub(crate) struct NegBackward;

impl GradFn for NegBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(-x)/∂x = -1
        let grad_data: Vec<f32> = grad_output.data().iter().map(|&g| -g).collect();
        vec![Tensor::new(&grad_data, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "NegBackward"
    }
}

/// Gradient function for pow: z = x^n
pub(crate) struct PowBackward {
    pub(crate) x: Tensor,
    pub(crate) n: f32,
}

impl GradFn for PowBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(x^n)/∂x = n * x^(n-1)
        let grad_data: Vec<f32> = grad_output
            .data()
            .iter()
            .zip(self.x.data().iter())
            .map(|(&g, &x)| g * self.n * x.powf(self.n - 1.0))
            .collect();
        vec![Tensor::new(&grad_data, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "PowBackward"
    }
}

// ============================================================================
// Reduction Operations
// ============================================================================

/// Gradient function for sum: z = sum(x)
pub(crate) struct SumBackward {
    pub(crate) input_shape: Vec<usize>,
}

impl GradFn for SumBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂sum(x)/∂x_i = 1 for all i
        // Broadcast scalar gradient to input shape
        let g = grad_output.item();
        let numel: usize = self.input_shape.iter().product();
        vec![Tensor::new(&vec![g; numel], &self.input_shape)]
    }

    fn name(&self) -> &'static str {
        "SumBackward"
    }
}

/// Gradient function for mean: z = mean(x)
pub(crate) struct MeanBackward {
    pub(crate) input_shape: Vec<usize>,
}

impl GradFn for MeanBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂mean(x)/∂x_i = 1/n for all i
        let g = grad_output.item();
        let numel: usize = self.input_shape.iter().product();
        let grad_val = g / numel as f32;
        vec![Tensor::new(&vec![grad_val; numel], &self.input_shape)]
    }

    fn name(&self) -> &'static str {
        "MeanBackward"
    }
}

// ============================================================================
// Activation Functions
// ============================================================================

/// Gradient function for `ReLU`: z = max(0, x)
pub(crate) struct ReluBackward {
    pub(crate) x: Tensor,
}

impl GradFn for ReluBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂relu(x)/∂x = 1 if x > 0, else 0
        let grad_data: Vec<f32> = grad_output
            .data()
            .iter()
            .zip(self.x.data().iter())
            .map(|(&g, &x)| if x > 0.0 { g } else { 0.0 })
            .collect();
        vec![Tensor::new(&grad_data, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "ReluBackward"
    }
}

// ============================================================================
// Linear Algebra Operations
// ============================================================================

/// Row-major matmul on raw slices: [m, k] x [k, n] -> [m, n].
fn matmul_data(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; m * n];
    for i in 0..m {
        for kk in 0..k {
            let a_ik = a[i * k + kk];
            if a_ik == 0.0 {
                continue;
            }
            for j in 0..n {
                out[i * n + j] += a_ik * b[kk * n + j];
            }
        }
    }
    out
}

/// Transpose raw row-major data: [rows, cols] -> [cols, rows].
fn transpose_data(x: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            out[j * rows + i] = x[i * cols + j];
        }
    }
    out
}

/// Gradient function for matrix multiplication: z = x @ y
pub(crate) struct MatmulBackward {
    pub(crate) x: Tensor,
    pub(crate) y: Tensor,
}

impl GradFn for MatmulBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // For z = x @ y with x: [m, k], y: [k, n], grad: [m, n]:
        // ∂L/∂x = grad @ yᵀ   [m, k]
        // ∂L/∂y = xᵀ @ grad   [k, n]
        let (m, k) = (self.x.shape()[0], self.x.shape()[1]);
        let n = self.y.shape()[1];

        let y_t = transpose_data(self.y.data(), k, n);
        let grad_x = matmul_data(grad_output.data(), &y_t, m, n, k);

        let x_t = transpose_data(self.x.data(), m, k);
        let grad_y = matmul_data(&x_t, grad_output.data(), k, m, n);

        vec![
            Tensor::new(&grad_x, &[m, k]),
            Tensor::new(&grad_y, &[k, n]),
        ]
    }

    fn name(&self) -> &'static str {
        "MatmulBackward"
    }
}

/// Gradient function for 2D transpose: z = xᵀ
pub(crate) struct TransposeBackward;

impl GradFn for TransposeBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂(xᵀ)/∂x transposes the gradient back
        let (rows, cols) = (grad_output.shape()[0], grad_output.shape()[1]);
        let grad_data = transpose_data(grad_output.data(), rows, cols);
        vec![Tensor::new(&grad_data, &[cols, rows])]
    }

    fn name(&self) -> &'static str {
        "TransposeBackward"
    }
}

/// Gradient function for broadcast addition of a 1D bias over rows:
/// z[i, j] = x[i, j] + b[j]
pub(crate) struct BroadcastAddBackward;

impl GradFn for BroadcastAddBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        // ∂z/∂x = 1, ∂z/∂b sums the gradient over rows
        let (rows, cols) = (grad_output.shape()[0], grad_output.shape()[1]);
        let grad_data = grad_output.data();

        let mut grad_b = vec![0.0f32; cols];
        for i in 0..rows {
            for j in 0..cols {
                grad_b[j] += grad_data[i * cols + j];
            }
        }

        vec![grad_output.clone(), Tensor::new(&grad_b, &[cols])]
    }

    fn name(&self) -> &'static str {
        "BroadcastAddBackward"
    }
}

// ============================================================================
// Classification Loss
// ============================================================================

/// Gradient function for Cross-Entropy Loss (combined softmax + NLL)
/// For L = mean(-log(softmax(x)[target])), the gradient is:
/// ∂`L/∂x` = (softmax(logits) - `one_hot(targets)`) / batch
pub(crate) struct CrossEntropyBackward {
    pub(crate) softmax_output: Tensor,
    pub(crate) targets: Vec<usize>,
}

impl GradFn for CrossEntropyBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (batch, classes) = (
            self.softmax_output.shape()[0],
            self.softmax_output.shape()[1],
        );
        let g = grad_output.item();

        let mut grad = self.softmax_output.data().to_vec();
        for (b, &target) in self.targets.iter().enumerate() {
            grad[b * classes + target] -= 1.0;
        }
        for value in &mut grad {
            *value *= g / batch as f32;
        }

        vec![Tensor::new(&grad, self.softmax_output.shape())]
    }

    fn name(&self) -> &'static str {
        "CrossEntropyBackward"
    }
}

// ============================================================================
// Regularization
// ============================================================================

/// Gradient function for dropout: z = x * mask
///
/// The mask already carries the 1/(1-p) training-time scaling, so the
/// backward pass is a plain element-wise product with it.
pub(crate) struct DropoutBackward {
    pub(crate) mask: Vec<f32>,
}

impl GradFn for DropoutBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let grad_data: Vec<f32> = grad_output
            .data()
            .iter()
            .zip(self.mask.iter())
            .map(|(&g, &m)| g * m)
            .collect();
        vec![Tensor::new(&grad_data, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "DropoutBackward"
    }
}

// ============================================================================
// Graph Operations
// ============================================================================

/// Gradient function for sparse neighborhood aggregation:
/// out[tgt] += w * h[src] for each weighted edge.
///
/// The backward pass applies the transposed edge set:
/// `grad_h[src]` += w * `grad_out[tgt]`.
pub(crate) struct GraphAggregateBackward {
    pub(crate) edge_src: Vec<usize>,
    pub(crate) edge_tgt: Vec<usize>,
    pub(crate) edge_weight: Vec<f32>,
}

impl GradFn for GraphAggregateBackward {
    fn backward(&self, grad_output: &Tensor) -> Vec<Tensor> {
        let (nodes, features) = (grad_output.shape()[0], grad_output.shape()[1]);
        let grad_data = grad_output.data();
        let mut grad_input = vec![0.0f32; nodes * features];

        for ((&src, &tgt), &w) in self
            .edge_src
            .iter()
            .zip(self.edge_tgt.iter())
            .zip(self.edge_weight.iter())
        {
            for f in 0..features {
                grad_input[src * features + f] += w * grad_data[tgt * features + f];
            }
        }

        vec![Tensor::new(&grad_input, grad_output.shape())]
    }

    fn name(&self) -> &'static str {
        "GraphAggregateBackward"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_backward_passes_gradient_through() {
        let grad = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let grads = AddBackward.backward(&grad);
        assert_eq!(grads.len(), 2);
        assert_eq!(grads[0].data(), grad.data());
        assert_eq!(grads[1].data(), grad.data());
    }

    #[test]
    fn test_sub_backward_negates_second_input() {
        let grad = Tensor::from_slice(&[1.0, -2.0]);
        let grads = SubBackward.backward(&grad);
        assert_eq!(grads[0].data(), &[1.0, -2.0]);
        assert_eq!(grads[1].data(), &[-1.0, 2.0]);
    }

    #[test]
    fn test_matmul_backward_shapes() {
        // x: [2, 3], y: [3, 4], z: [2, 4]
        let x = Tensor::new(&[1.0; 6], &[2, 3]);
        let y = Tensor::new(&[1.0; 12], &[3, 4]);
        let grad = Tensor::new(&[1.0; 8], &[2, 4]);

        let grads = MatmulBackward { x, y }.backward(&grad);
        assert_eq!(grads[0].shape(), &[2, 3]);
        assert_eq!(grads[1].shape(), &[3, 4]);
    }

    #[test]
    fn test_matmul_backward_values() {
        // x = [[1, 2]], y = [[3], [4]], z = [[11]]
        let x = Tensor::new(&[1.0, 2.0], &[1, 2]);
        let y = Tensor::new(&[3.0, 4.0], &[2, 1]);
        let grad = Tensor::new(&[1.0], &[1, 1]);

        let grads = MatmulBackward { x, y }.backward(&grad);
        // dz/dx = grad @ yᵀ = [[3, 4]]
        assert_eq!(grads[0].data(), &[3.0, 4.0]);
        // dz/dy = xᵀ @ grad = [[1], [2]]
        assert_eq!(grads[1].data(), &[1.0, 2.0]);
    }

    #[test]
    fn test_broadcast_add_backward_sums_bias_over_rows() {
        let grad = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let grads = BroadcastAddBackward.backward(&grad);
        assert_eq!(grads[0].shape(), &[2, 2]);
        assert_eq!(grads[1].shape(), &[2]);
        assert_eq!(grads[1].data(), &[4.0, 6.0]);
    }

    #[test]
    fn test_cross_entropy_backward_softmax_minus_one_hot() {
        // Uniform softmax over 2 classes, single sample, target 0
        let softmax = Tensor::new(&[0.5, 0.5], &[1, 2]);
        let grads = CrossEntropyBackward {
            softmax_output: softmax,
            targets: vec![0],
        }
        .backward(&Tensor::from_slice(&[1.0]));

        assert!((grads[0].data()[0] - (-0.5)).abs() < 1e-6);
        assert!((grads[0].data()[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cross_entropy_backward_mean_reduction() {
        // Two samples: gradient is divided by batch size
        let softmax = Tensor::new(&[1.0, 0.0, 1.0, 0.0], &[2, 2]);
        let grads = CrossEntropyBackward {
            softmax_output: softmax,
            targets: vec![0, 1],
        }
        .backward(&Tensor::from_slice(&[1.0]));

        // Sample 0 predicts its target exactly: zero gradient
        assert!((grads[0].data()[0]).abs() < 1e-6);
        // Sample 1: (softmax - one_hot) / 2 = ([1, -1]) / 2
        assert!((grads[0].data()[2] - 0.5).abs() < 1e-6);
        assert!((grads[0].data()[3] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_graph_aggregate_backward_transposes_edges() {
        // Single edge 0 -> 1 with weight 2.0, 1 feature per node
        let grads = GraphAggregateBackward {
            edge_src: vec![0],
            edge_tgt: vec![1],
            edge_weight: vec![2.0],
        }
        .backward(&Tensor::new(&[3.0, 5.0], &[2, 1]));

        // Only node 0 fed node 1, so it receives 2.0 * grad_out[1]
        assert_eq!(grads[0].data(), &[10.0, 0.0]);
    }

    #[test]
    fn test_dropout_backward_applies_mask() {
        let grads = DropoutBackward {
            mask: vec![0.0, 2.0],
        }
        .backward(&Tensor::from_slice(&[5.0, 5.0]));
        assert_eq!(grads[0].data(), &[0.0, 10.0]);
    }

    #[test]
    fn test_grad_fn_names() {
        assert_eq!(NegBackward.name(), "NegBackward");
        assert_eq!(TransposeBackward.name(), "TransposeBackward");
        assert_eq!(BroadcastAddBackward.name(), "BroadcastAddBackward");
    }
}
