//! Model construction for semi-supervised node classification.
//!
//! Two architectures share one interface: SGC collapses graph convolution
//! into a feature pre-processing step and learns a single linear map, while
//! GCN applies two message-passing layers to the raw features at every
//! forward pass.
//!
//! # References
//!
//! - Wu, F., et al. (2019). Simplifying graph convolutional networks. ICML.
//! - Kipf, T. N., & Welling, M. (2017). Semi-supervised classification with
//!   graph convolutional networks. ICLR.

use std::fmt;
use std::str::FromStr;

use crate::autograd::Tensor;
use crate::error::{GrafoError, Result};
use crate::graph::AdjacencyMatrix;
use crate::nn::{Dropout, GraphConv, Linear, Module};

/// Model architecture selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelKind {
    /// Simple graph convolution: propagated features + linear classifier
    #[default]
    Sgc,
    /// Two-layer graph convolutional network
    Gcn,
}

impl ModelKind {
    /// Get architecture name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sgc => "SGC",
            Self::Gcn => "GCN",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelKind {
    type Err = GrafoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sgc" => Ok(Self::Sgc),
            "gcn" => Ok(Self::Gcn),
            _ => Err(GrafoError::UnknownModel {
                name: s.to_string(),
            }),
        }
    }
}

/// A node classifier with deep-copyable parameters.
///
/// Cloning copies all weights, so a clone taken mid-training is a
/// checkpoint: further optimizer steps on the original leave it untouched.
#[derive(Debug, Clone)]
pub enum NodeClassifier {
    /// Logistic regression over pre-propagated features
    Sgc(Linear),
    /// Two graph convolutions with ReLU and dropout in between
    Gcn {
        conv1: GraphConv,
        conv2: GraphConv,
        dropout: Dropout,
    },
}

impl NodeClassifier {
    /// Which architecture this classifier is.
    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        match self {
            Self::Sgc(_) => ModelKind::Sgc,
            Self::Gcn { .. } => ModelKind::Gcn,
        }
    }

    /// Re-draw all weights, optionally from a fixed seed.
    ///
    /// Used between repeated runs so each repeat starts from a fresh,
    /// reproducible initialization.
    pub fn reset_parameters(&mut self, seed: Option<u64>) {
        match self {
            Self::Sgc(linear) => linear.reset_parameters(seed),
            Self::Gcn {
                conv1,
                conv2,
                dropout,
            } => {
                conv1.reset_parameters(seed);
                conv2.reset_parameters(seed.map(|s| s.wrapping_add(1)));
                if let Some(s) = seed {
                    dropout.reseed(s.wrapping_add(2));
                }
            }
        }
    }
}

impl Module for NodeClassifier {
    fn forward(&self, input: &Tensor) -> Tensor {
        match self {
            Self::Sgc(linear) => linear.forward(input),
            Self::Gcn {
                conv1,
                conv2,
                dropout,
            } => {
                let hidden = conv1.forward(input).relu();
                let hidden = dropout.forward(&hidden);
                conv2.forward(&hidden)
            }
        }
    }

    fn parameters(&self) -> Vec<&Tensor> {
        match self {
            Self::Sgc(linear) => linear.parameters(),
            Self::Gcn { conv1, conv2, .. } => {
                let mut params = conv1.parameters();
                params.extend(conv2.parameters());
                params
            }
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match self {
            Self::Sgc(linear) => linear.parameters_mut(),
            Self::Gcn { conv1, conv2, .. } => {
                let mut params = conv1.parameters_mut();
                params.extend(conv2.parameters_mut());
                params
            }
        }
    }

    fn train(&mut self) {
        if let Self::Gcn { dropout, .. } = self {
            dropout.train();
        }
    }

    fn eval(&mut self) {
        if let Self::Gcn { dropout, .. } = self {
            dropout.eval();
        }
    }

    fn training(&self) -> bool {
        match self {
            Self::Sgc(_) => true,
            Self::Gcn { dropout, .. } => dropout.training(),
        }
    }
}

/// Build a classifier for the given architecture.
///
/// `hidden` and `dropout` configure the GCN's intermediate layer and are
/// ignored for SGC. The adjacency matrix must already be normalized; SGC
/// does not use it (propagation happens before training), while GCN stores
/// it inside each convolution layer.
///
/// # Errors
///
/// Returns [`GrafoError::InvalidHyperparameter`] if a GCN is requested
/// with `hidden == 0`.
pub fn build(
    kind: ModelKind,
    num_features: usize,
    num_classes: usize,
    hidden: usize,
    dropout: f32,
    adj: &AdjacencyMatrix,
    seed: Option<u64>,
) -> Result<NodeClassifier> {
    match kind {
        ModelKind::Sgc => Ok(NodeClassifier::Sgc(Linear::with_seed(
            num_features,
            num_classes,
            seed,
        ))),
        ModelKind::Gcn => {
            if hidden == 0 {
                return Err(GrafoError::invalid_hyperparameter(
                    "hidden",
                    hidden,
                    "a positive layer width for GCN",
                ));
            }
            let conv1 = GraphConv::with_seed(num_features, hidden, adj, seed);
            let conv2 = GraphConv::with_seed(
                hidden,
                num_classes,
                adj,
                seed.map(|s| s.wrapping_add(1)),
            );
            let dropout = match seed {
                Some(s) => Dropout::with_seed(dropout, s.wrapping_add(2)),
                None => Dropout::new(dropout),
            };
            Ok(NodeClassifier::Gcn {
                conv1,
                conv2,
                dropout,
            })
        }
    }
}
