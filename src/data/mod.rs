//! Citation network dataset loading.
//!
//! Reads the planetoid-style on-disk layout: a `<name>.content` file with
//! one node per line (node id, feature columns, label string) and a
//! `<name>.cites` file with one edge per line. Produces a normalized
//! adjacency, row-normalized features, integer-encoded labels, and
//! train/validation/test partitions.
//!
//! # References
//!
//! - Sen, P., et al. (2008). Collective classification in network data.
//!   AI Magazine.
//! - Yang, Z., Cohen, W., & Salakhutdinov, R. (2016). Revisiting
//!   semi-supervised learning with graph embeddings. ICML.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::{GrafoError, Result};
use crate::graph::{AdjacencyMatrix, Normalization};
use crate::primitives::Matrix;

/// How many nodes go into each partition.
///
/// Training nodes are chosen per class in node order, validation takes the
/// next non-training nodes, and the test partition is the final block of
/// nodes in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSpec {
    /// Training nodes drawn from each class, in node order
    pub train_per_class: usize,
    /// Validation nodes taken from the remaining nodes, in node order
    pub val_size: usize,
    /// Test nodes taken from the end of the file
    pub test_size: usize,
}

impl SplitSpec {
    /// The standard split for citation benchmarks: 20 labeled nodes per
    /// class, 500 validation nodes, 1000 test nodes.
    #[must_use]
    pub const fn planetoid() -> Self {
        Self {
            train_per_class: 20,
            val_size: 500,
            test_size: 1000,
        }
    }
}

impl Default for SplitSpec {
    fn default() -> Self {
        Self::planetoid()
    }
}

/// A loaded citation graph ready for training.
#[derive(Debug, Clone)]
pub struct CitationDataset {
    /// Normalized adjacency matrix
    pub adj: AdjacencyMatrix,
    /// Row-normalized node features, [nodes, features]
    pub features: Matrix<f32>,
    /// Encoded class label per node
    pub labels: Vec<usize>,
    /// Training node indices
    pub idx_train: Vec<usize>,
    /// Validation node indices
    pub idx_val: Vec<usize>,
    /// Test node indices
    pub idx_test: Vec<usize>,
    /// Number of distinct classes
    pub num_classes: usize,
}

impl CitationDataset {
    /// Number of nodes in the graph.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.features.n_rows()
    }

    /// Width of the feature matrix.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.features.n_cols()
    }
}

/// Load a citation dataset from `<data_dir>/<name>/<name>.content` and
/// `<data_dir>/<name>/<name>.cites`.
///
/// Edges are made undirected, with duplicate and self edges removed, before
/// `normalization` is applied. Features are row-normalized. Labels are
/// encoded by sorting the distinct label strings.
///
/// # Arguments
///
/// * `name` - Dataset name, doubling as directory and file stem
/// * `data_dir` - Root directory holding one subdirectory per dataset
/// * `normalization` - Adjacency normalization scheme
/// * `split` - Partition sizes
///
/// # Errors
///
/// Returns an I/O error if either file is missing, and a format error for
/// malformed lines, inconsistent feature widths, unknown node ids in the
/// edge list, or a node count too small for the requested split.
pub fn load_citation(
    name: &str,
    data_dir: &Path,
    normalization: Normalization,
    split: &SplitSpec,
) -> Result<CitationDataset> {
    let dataset_dir = data_dir.join(name);
    let content = read_file(&dataset_dir.join(format!("{name}.content")))?;
    let cites = read_file(&dataset_dir.join(format!("{name}.cites")))?;

    let parsed = parse_content(name, &content)?;
    let edges = parse_cites(name, &cites, &parsed.id_index)?;

    let num_nodes = parsed.labels.len();
    let adj = AdjacencyMatrix::from_edges(num_nodes, &edges).normalize(normalization);

    let (classes, labels) = encode_labels(&parsed.labels);
    let (idx_train, idx_val, idx_test) = build_split(&labels, classes.len(), split)?;

    let features = Matrix::from_vec(num_nodes, parsed.width, parsed.features)
        .map_err(GrafoError::format)?
        .row_normalize();

    Ok(CitationDataset {
        adj,
        features,
        labels,
        idx_train,
        idx_val,
        idx_test,
        num_classes: classes.len(),
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        GrafoError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })
}

struct ParsedContent {
    id_index: HashMap<String, usize>,
    features: Vec<f32>,
    labels: Vec<String>,
    width: usize,
}

fn parse_content(name: &str, content: &str) -> Result<ParsedContent> {
    let mut id_index: HashMap<String, usize> = HashMap::new();
    let mut features: Vec<f32> = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    let mut width: Option<usize> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 3 {
            return Err(GrafoError::format(format!(
                "{name}.content line {line_no}: expected node id, features, and label, found {} fields",
                fields.len()
            )));
        }

        let feature_count = fields.len() - 2;
        match width {
            None => width = Some(feature_count),
            Some(w) if w != feature_count => {
                return Err(GrafoError::format(format!(
                    "{name}.content line {line_no}: expected {w} feature columns, found {feature_count}"
                )));
            }
            Some(_) => {}
        }

        let id = fields[0];
        if id_index.insert(id.to_string(), labels.len()).is_some() {
            return Err(GrafoError::format(format!(
                "{name}.content line {line_no}: duplicate node id {id}"
            )));
        }

        for field in &fields[1..fields.len() - 1] {
            let value: f32 = field.parse().map_err(|_| {
                GrafoError::format(format!(
                    "{name}.content line {line_no}: invalid feature value '{field}'"
                ))
            })?;
            features.push(value);
        }
        labels.push(fields[fields.len() - 1].to_string());
    }

    if labels.is_empty() {
        return Err(GrafoError::format(format!("{name}.content has no nodes")));
    }

    Ok(ParsedContent {
        id_index,
        features,
        labels,
        width: width.unwrap_or(0),
    })
}

fn parse_cites(
    name: &str,
    cites: &str,
    id_index: &HashMap<String, usize>,
) -> Result<Vec<(usize, usize)>> {
    let mut edges = Vec::new();

    for (idx, line) in cites.lines().enumerate() {
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 2 {
            return Err(GrafoError::format(format!(
                "{name}.cites line {line_no}: expected two node ids, found {} fields",
                fields.len()
            )));
        }

        let lookup = |id: &str| {
            id_index.get(id).copied().ok_or_else(|| {
                GrafoError::format(format!(
                    "{name}.cites line {line_no}: unknown node id {id}"
                ))
            })
        };
        edges.push((lookup(fields[0])?, lookup(fields[1])?));
    }

    Ok(edges)
}

/// Encode label strings as indices into the sorted set of distinct labels.
fn encode_labels(raw: &[String]) -> (Vec<String>, Vec<usize>) {
    let classes: Vec<String> = raw
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let positions: HashMap<&str, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let labels = raw.iter().map(|l| positions[l.as_str()]).collect();
    (classes, labels)
}

fn build_split(
    labels: &[usize],
    num_classes: usize,
    split: &SplitSpec,
) -> Result<(Vec<usize>, Vec<usize>, Vec<usize>)> {
    let num_nodes = labels.len();
    if split.test_size > num_nodes {
        return Err(GrafoError::format(format!(
            "test partition of {} nodes requested but the dataset has {num_nodes}",
            split.test_size
        )));
    }

    let mut taken = vec![0usize; num_classes];
    let mut in_train = vec![false; num_nodes];
    let mut idx_train = Vec::new();
    for (i, &class) in labels.iter().enumerate() {
        if taken[class] < split.train_per_class {
            taken[class] += 1;
            in_train[i] = true;
            idx_train.push(i);
        }
    }
    for (class, &count) in taken.iter().enumerate() {
        if count < split.train_per_class {
            return Err(GrafoError::format(format!(
                "class {class} has {count} nodes, need {} for training",
                split.train_per_class
            )));
        }
    }

    let mut idx_val = Vec::new();
    for (i, &trained) in in_train.iter().enumerate() {
        if idx_val.len() == split.val_size {
            break;
        }
        if !trained {
            idx_val.push(i);
        }
    }
    if idx_val.len() < split.val_size {
        return Err(GrafoError::format(format!(
            "validation partition of {} nodes requested but only {} non-training nodes exist",
            split.val_size,
            idx_val.len()
        )));
    }

    let test_start = num_nodes - split.test_size;
    let overlapping = idx_train
        .iter()
        .chain(idx_val.iter())
        .any(|&i| i >= test_start);
    if overlapping {
        return Err(GrafoError::format(format!(
            "{num_nodes} nodes cannot hold {} training and {} validation nodes disjoint from the final {} test nodes",
            idx_train.len(),
            split.val_size,
            split.test_size
        )));
    }
    let idx_test: Vec<usize> = (test_start..num_nodes).collect();

    Ok((idx_train, idx_val, idx_test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONTENT: &str = "\
paper0 1 0 0 ml
paper1 0 1 0 ml
paper2 0 0 1 db
paper3 1 1 0 db
";

    const CITES: &str = "\
paper0 paper1
paper1 paper2
paper2 paper3
paper0 paper0
paper1 paper0
";

    fn write_dataset(root: &Path, name: &str, content: &str, cites: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{name}.content")), content).unwrap();
        std::fs::write(dir.join(format!("{name}.cites")), cites).unwrap();
    }

    fn toy_split() -> SplitSpec {
        SplitSpec {
            train_per_class: 1,
            val_size: 1,
            test_size: 1,
        }
    }

    #[test]
    fn test_load_citation_toy_graph() {
        let tmp = TempDir::new().unwrap();
        write_dataset(tmp.path(), "mini", CONTENT, CITES);

        let dataset = load_citation(
            "mini",
            tmp.path(),
            Normalization::AugNormAdj,
            &toy_split(),
        )
        .unwrap();

        assert_eq!(dataset.num_nodes(), 4);
        assert_eq!(dataset.num_features(), 3);
        assert_eq!(dataset.num_classes, 2);

        // Classes sort as ["db", "ml"]
        assert_eq!(dataset.labels, vec![1, 1, 0, 0]);

        // First node of each class trains, next free node validates, the
        // final node tests
        assert_eq!(dataset.idx_train, vec![0, 2]);
        assert_eq!(dataset.idx_val, vec![1]);
        assert_eq!(dataset.idx_test, vec![3]);

        // Self edge dropped, duplicate collapsed: 3 undirected edges,
        // plus 4 self loops added by the normalization
        assert_eq!(dataset.adj.nnz(), 10);

        // Features are row-normalized
        assert!((dataset.features.get(3, 0) - 0.5).abs() < 1e-6);
        assert!((dataset.features.get(3, 1) - 0.5).abs() < 1e-6);
        assert_eq!(dataset.features.get(3, 2), 0.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_citation(
            "absent",
            tmp.path(),
            Normalization::AugNormAdj,
            &toy_split(),
        )
        .unwrap_err();
        assert!(matches!(err, GrafoError::Io(_)));
        assert!(err.to_string().contains("absent.content"));
    }

    #[test]
    fn test_bad_feature_value_reports_line() {
        let tmp = TempDir::new().unwrap();
        let content = "paper0 1 0 0 ml\npaper1 0 x 0 ml\n";
        write_dataset(tmp.path(), "mini", content, "");

        let err = load_citation(
            "mini",
            tmp.path(),
            Normalization::AugNormAdj,
            &toy_split(),
        )
        .unwrap_err();
        assert!(matches!(err, GrafoError::FormatError { .. }));
        assert!(err.to_string().contains("mini.content line 2"));
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_inconsistent_width_reports_line() {
        let tmp = TempDir::new().unwrap();
        let content = "paper0 1 0 0 ml\npaper1 0 1 0 ml\npaper2 0 0 1 1 db\n";
        write_dataset(tmp.path(), "mini", content, "");

        let err = load_citation(
            "mini",
            tmp.path(),
            Normalization::AugNormAdj,
            &toy_split(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("mini.content line 3"));
        assert!(err.to_string().contains("feature columns"));
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let tmp = TempDir::new().unwrap();
        let content = "paper0 1 0 0 ml\npaper0 0 1 0 db\n";
        write_dataset(tmp.path(), "mini", content, "");

        let err = load_citation(
            "mini",
            tmp.path(),
            Normalization::AugNormAdj,
            &toy_split(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate node id paper0"));
    }

    #[test]
    fn test_unknown_cites_id_reports_line() {
        let tmp = TempDir::new().unwrap();
        write_dataset(tmp.path(), "mini", CONTENT, "paper0 ghost\n");

        let err = load_citation(
            "mini",
            tmp.path(),
            Normalization::AugNormAdj,
            &toy_split(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("mini.cites line 1"));
        assert!(err.to_string().contains("unknown node id ghost"));
    }

    #[test]
    fn test_malformed_cites_line_rejected() {
        let tmp = TempDir::new().unwrap();
        write_dataset(tmp.path(), "mini", CONTENT, "paper0\n");

        let err = load_citation(
            "mini",
            tmp.path(),
            Normalization::AugNormAdj,
            &toy_split(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected two node ids"));
    }

    #[test]
    fn test_split_too_large_for_dataset() {
        let tmp = TempDir::new().unwrap();
        write_dataset(tmp.path(), "mini", CONTENT, CITES);

        let err = load_citation(
            "mini",
            tmp.path(),
            Normalization::AugNormAdj,
            &SplitSpec::planetoid(),
        )
        .unwrap_err();
        assert!(matches!(err, GrafoError::FormatError { .. }));
    }

    #[test]
    fn test_class_with_too_few_nodes_rejected() {
        let tmp = TempDir::new().unwrap();
        write_dataset(tmp.path(), "mini", CONTENT, CITES);

        let split = SplitSpec {
            train_per_class: 3,
            val_size: 1,
            test_size: 1,
        };
        let err =
            load_citation("mini", tmp.path(), Normalization::AugNormAdj, &split).unwrap_err();
        assert!(err.to_string().contains("need 3 for training"));
    }

    #[test]
    fn test_overlapping_partitions_rejected() {
        let tmp = TempDir::new().unwrap();
        write_dataset(tmp.path(), "mini", CONTENT, CITES);

        let split = SplitSpec {
            train_per_class: 1,
            val_size: 1,
            test_size: 4,
        };
        let err =
            load_citation("mini", tmp.path(), Normalization::AugNormAdj, &split).unwrap_err();
        assert!(err.to_string().contains("disjoint"));
    }
}
