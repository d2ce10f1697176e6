//! Sparse graph adjacency and normalization schemes.
//!
//! Citation graphs are stored in coordinate (COO) form: parallel row,
//! column, and value vectors plus a node count. The loader builds the
//! adjacency undirected, then normalizes it exactly once with the
//! configured scheme before any propagation runs.
//!
//! # References
//!
//! - Kipf, T. N., & Welling, M. (2017). Semi-supervised classification with
//!   graph convolutional networks. ICLR.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::GrafoError;
use crate::primitives::Matrix;

/// Adjacency normalization scheme.
///
/// `AugNormAdj` is the symmetric normalization of the self-loop-augmented
/// adjacency, D̃^-1/2 (A + I) D̃^-1/2, the standard choice for graph
/// convolutions. `NormAdj` skips the self loops. `AugRWalkAdj` is the
/// random-walk (row-stochastic) variant D̃^-1 (A + I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// D̃^-1/2 (A + I) D̃^-1/2
    #[default]
    AugNormAdj,
    /// D^-1/2 A D^-1/2 (no self loops)
    NormAdj,
    /// D̃^-1 (A + I)
    AugRWalkAdj,
}

impl FromStr for Normalization {
    type Err = GrafoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both CamelCase and kebab-case spellings
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "augnormadj" => Ok(Self::AugNormAdj),
            "normadj" => Ok(Self::NormAdj),
            "augrwalkadj" => Ok(Self::AugRWalkAdj),
            _ => Err(GrafoError::UnknownNormalization {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AugNormAdj => write!(f, "AugNormAdj"),
            Self::NormAdj => write!(f, "NormAdj"),
            Self::AugRWalkAdj => write!(f, "AugRWalkAdj"),
        }
    }
}

/// Sparse adjacency matrix in COO form.
///
/// Entry `(rows[k], cols[k], values[k])` is S[i, j]: the contribution of
/// node `j` to node `i` under one multiplication by S. Entries are kept
/// sorted by (row, col) so floating-point accumulation order is
/// deterministic across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    num_nodes: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f32>,
}

impl AdjacencyMatrix {
    /// Build an undirected binary adjacency from an edge list.
    ///
    /// Each pair is inserted in both directions with weight 1. Duplicate
    /// and self edges are discarded.
    ///
    /// # Panics
    ///
    /// Panics if an endpoint is out of bounds.
    #[must_use]
    pub fn from_edges(num_nodes: usize, edges: &[(usize, usize)]) -> Self {
        let mut unique: BTreeSet<(usize, usize)> = BTreeSet::new();
        for &(a, b) in edges {
            assert!(
                a < num_nodes && b < num_nodes,
                "Edge ({a}, {b}) out of bounds for {num_nodes} nodes"
            );
            if a == b {
                continue;
            }
            unique.insert((a, b));
            unique.insert((b, a));
        }

        let mut rows = Vec::with_capacity(unique.len());
        let mut cols = Vec::with_capacity(unique.len());
        for (r, c) in unique {
            rows.push(r);
            cols.push(c);
        }
        let values = vec![1.0; rows.len()];

        Self {
            num_nodes,
            rows,
            cols,
            values,
        }
    }

    /// Build directly from COO triplets.
    ///
    /// # Panics
    ///
    /// Panics if the triplet vectors disagree in length.
    #[must_use]
    pub fn from_coo(
        num_nodes: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Vec<f32>,
    ) -> Self {
        assert_eq!(rows.len(), cols.len(), "COO row/col length mismatch");
        assert_eq!(rows.len(), values.len(), "COO row/value length mismatch");
        Self {
            num_nodes,
            rows,
            cols,
            values,
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row indices of the stored entries.
    #[must_use]
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    /// Column indices of the stored entries.
    #[must_use]
    pub fn col_indices(&self) -> &[usize] {
        &self.cols
    }

    /// Values of the stored entries.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Iterate over `(row, col, value)` triplets.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.values.iter())
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Weighted degree of every node (row sums).
    #[must_use]
    pub fn degrees(&self) -> Vec<f32> {
        let mut deg = vec![0.0f32; self.num_nodes];
        for (&r, &v) in self.rows.iter().zip(self.values.iter()) {
            deg[r] += v;
        }
        deg
    }

    /// Return a copy with unit self loops appended.
    #[must_use]
    pub fn add_self_loops(&self) -> Self {
        let mut rows = self.rows.clone();
        let mut cols = self.cols.clone();
        let mut values = self.values.clone();
        for i in 0..self.num_nodes {
            rows.push(i);
            cols.push(i);
            values.push(1.0);
        }
        Self {
            num_nodes: self.num_nodes,
            rows,
            cols,
            values,
        }
    }

    /// Swap rows and columns.
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            num_nodes: self.num_nodes,
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            values: self.values.clone(),
        }
    }

    /// Normalize with the given scheme.
    ///
    /// Zero-degree nodes get a zero coefficient rather than a division
    /// by zero, so isolated nodes simply stop propagating.
    #[must_use]
    pub fn normalize(&self, scheme: Normalization) -> Self {
        match scheme {
            Normalization::AugNormAdj => self.add_self_loops().symmetric_normalize(),
            Normalization::NormAdj => self.symmetric_normalize(),
            Normalization::AugRWalkAdj => self.add_self_loops().row_normalize(),
        }
    }

    /// D^-1/2 A D^-1/2 over the stored entries.
    fn symmetric_normalize(&self) -> Self {
        let coeffs: Vec<f32> = self
            .degrees()
            .iter()
            .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect();

        let values: Vec<f32> = self
            .triplets()
            .map(|(r, c, v)| coeffs[r] * v * coeffs[c])
            .collect();

        Self {
            num_nodes: self.num_nodes,
            rows: self.rows.clone(),
            cols: self.cols.clone(),
            values,
        }
    }

    /// D^-1 A over the stored entries (rows sum to 1).
    fn row_normalize(&self) -> Self {
        let degrees = self.degrees();

        let values: Vec<f32> = self
            .triplets()
            .map(|(r, _, v)| if degrees[r] > 0.0 { v / degrees[r] } else { 0.0 })
            .collect();

        Self {
            num_nodes: self.num_nodes,
            rows: self.rows.clone(),
            cols: self.cols.clone(),
            values,
        }
    }

    /// Sparse-dense product S · X (parallel over rows when available).
    ///
    /// # Panics
    ///
    /// Panics if the feature row count doesn't match the node count.
    #[must_use]
    pub fn spmm(&self, x: &Matrix<f32>) -> Matrix<f32> {
        let (n_rows, n_cols) = x.shape();
        assert_eq!(
            n_rows, self.num_nodes,
            "Feature rows {n_rows} don't match {} nodes",
            self.num_nodes
        );

        let x_data = x.as_slice();
        let mut row_entries: Vec<Vec<(usize, f32)>> = vec![Vec::new(); self.num_nodes];
        for (r, c, v) in self.triplets() {
            if v != 0.0 {
                row_entries[r].push((c, v));
            }
        }

        let compute_row = |r: usize| -> Vec<f32> {
            let mut out = vec![0.0f32; n_cols];
            for &(c, v) in &row_entries[r] {
                let src = &x_data[c * n_cols..(c + 1) * n_cols];
                for (o, s) in out.iter_mut().zip(src.iter()) {
                    *o += v * s;
                }
            }
            out
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f32>> = (0..self.num_nodes)
            .into_par_iter()
            .map(compute_row)
            .collect();

        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f32>> = (0..self.num_nodes).map(compute_row).collect();

        let out: Vec<f32> = rows.into_iter().flatten().collect();
        Matrix::from_vec(self.num_nodes, n_cols, out)
            .unwrap_or_else(|_| Matrix::zeros(self.num_nodes, n_cols))
    }

    /// Materialize the dense matrix (tests only, O(n²) memory).
    #[must_use]
    pub fn to_dense(&self) -> Matrix<f32> {
        let mut dense = Matrix::zeros(self.num_nodes, self.num_nodes);
        for (r, c, v) in self.triplets() {
            let current = dense.get(r, c);
            dense.set(r, c, current + v);
        }
        dense
    }
}
