//! Graph convolution layer.
//!
//! One layer of the two-layer graph convolutional classifier: a linear
//! transform of the node features followed by neighborhood aggregation
//! over a pre-normalized sparse adjacency. The layer stores the
//! adjacency triplets it was built with; the aggregation's backward
//! pass runs the transposed edge set.
//!
//! # References
//!
//! - Kipf, T. N., & Welling, M. (2017). Semi-supervised classification with
//!   graph convolutional networks. ICLR.

use std::sync::Arc;

use super::init::{xavier_uniform, zeros};
use super::module::Module;
use crate::autograd::grad_fn::GraphAggregateBackward;
use crate::autograd::{is_grad_enabled, with_graph, Tensor};
use crate::graph::AdjacencyMatrix;

/// Graph convolution: out = S · (X W) + b
///
/// `S` is the normalized adjacency captured at construction time.
/// Weight shape is `[in_features, out_features]`, so the transform is a
/// plain matmul without transposition.
#[derive(Clone)]
pub struct GraphConv {
    /// Weight matrix, shape: [in_features, out_features]
    weight: Tensor,

    /// Bias vector, shape: [out_features]
    bias: Option<Tensor>,

    in_features: usize,
    out_features: usize,

    /// Aggregation targets (adjacency row indices)
    edge_rows: Vec<usize>,

    /// Aggregation sources (adjacency column indices)
    edge_cols: Vec<usize>,

    /// Normalized edge weights
    edge_values: Vec<f32>,

    /// Number of nodes the adjacency covers
    num_nodes: usize,
}

impl GraphConv {
    /// Create a new graph convolution over a normalized adjacency.
    #[must_use]
    pub fn new(in_features: usize, out_features: usize, adj: &AdjacencyMatrix) -> Self {
        Self::with_seed(in_features, out_features, adj, None)
    }

    /// Create a graph convolution with a specific random seed.
    #[must_use]
    pub fn with_seed(
        in_features: usize,
        out_features: usize,
        adj: &AdjacencyMatrix,
        seed: Option<u64>,
    ) -> Self {
        let weight = xavier_uniform(&[in_features, out_features], in_features, out_features, seed)
            .requires_grad();
        let bias = zeros(&[out_features]).requires_grad();

        Self {
            weight,
            bias: Some(bias),
            in_features,
            out_features,
            edge_rows: adj.row_indices().to_vec(),
            edge_cols: adj.col_indices().to_vec(),
            edge_values: adj.values().to_vec(),
            num_nodes: adj.num_nodes(),
        }
    }

    /// Re-draw the weights in place.
    pub fn reset_parameters(&mut self, seed: Option<u64>) {
        self.weight = xavier_uniform(
            &[self.in_features, self.out_features],
            self.in_features,
            self.out_features,
            seed,
        )
        .requires_grad();
        if self.bias.is_some() {
            self.bias = Some(zeros(&[self.out_features]).requires_grad());
        }
    }

    /// Get the input feature dimension.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get the output feature dimension.
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Aggregate transformed features over the stored edges.
    fn aggregate(&self, h: &Tensor) -> Tensor {
        let (nodes, features) = (h.shape()[0], h.shape()[1]);
        assert_eq!(
            nodes, self.num_nodes,
            "Input rows {nodes} don't match {} graph nodes",
            self.num_nodes
        );

        let h_data = h.data();
        let mut data = vec![0.0f32; nodes * features];
        for ((&r, &c), &v) in self
            .edge_rows
            .iter()
            .zip(self.edge_cols.iter())
            .zip(self.edge_values.iter())
        {
            if v == 0.0 {
                continue;
            }
            let src = &h_data[c * features..(c + 1) * features];
            let dst = &mut data[r * features..(r + 1) * features];
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += v * s;
            }
        }

        let mut result = Tensor::new(&data, &[nodes, features]);

        if is_grad_enabled() && h.requires_grad_enabled() {
            result.requires_grad_(true);
            let grad_fn = Arc::new(GraphAggregateBackward {
                edge_src: self.edge_cols.clone(),
                edge_tgt: self.edge_rows.clone(),
                edge_weight: self.edge_values.clone(),
            });
            result.set_grad_fn(grad_fn.clone());

            with_graph(|graph| {
                graph.register_tensor(h.clone());
                graph.record(result.id(), grad_fn, vec![h.id()]);
            });
        }

        result
    }
}

impl Module for GraphConv {
    fn forward(&self, input: &Tensor) -> Tensor {
        let h = input.matmul(&self.weight);
        let aggregated = self.aggregate(&h);

        match &self.bias {
            Some(b) => aggregated.broadcast_add(b),
            None => aggregated,
        }
    }

    fn parameters(&self) -> Vec<&Tensor> {
        match &self.bias {
            Some(b) => vec![&self.weight, b],
            None => vec![&self.weight],
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match &mut self.bias {
            Some(b) => vec![&mut self.weight, b],
            None => vec![&mut self.weight],
        }
    }
}

impl std::fmt::Debug for GraphConv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConv")
            .field("in_features", &self.in_features)
            .field("out_features", &self.out_features)
            .field("num_nodes", &self.num_nodes)
            .field("nnz", &self.edge_values.len())
            .finish_non_exhaustive()
    }
}
