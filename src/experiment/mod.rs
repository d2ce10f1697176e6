//! Repeat-and-aggregate experiment driver.
//!
//! One experiment is: load a citation dataset, propagate its features
//! through the normalized adjacency once, then repeatedly train a fresh
//! classifier on the propagated features and score it on the held-out test
//! partition. The report aggregates the accuracy series as
//! `mean +- population std`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::autograd::{clear_graph, no_grad, Tensor};
use crate::data::{self, SplitSpec};
use crate::error::{GrafoError, Result};
use crate::graph::Normalization;
use crate::metrics::{accuracy, argmax_rows};
use crate::models::{self, ModelKind, NodeClassifier};
use crate::nn::{Adam, CrossEntropyLoss, Module, Optimizer};
use crate::primitives::Matrix;
use crate::propagation;
use crate::random::RngContext;
use crate::tuning;

/// Everything one experiment needs, resolved up front.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Dataset name (directory and file stem under `data_dir`)
    pub dataset: String,
    /// Root directory of the dataset files
    pub data_dir: PathBuf,
    /// Architecture to train
    pub model: ModelKind,
    /// Base seed for the whole experiment
    pub seed: u64,
    /// Training epochs per repeat
    pub epochs: usize,
    /// Adam learning rate
    pub lr: f32,
    /// L2 weight decay, overridden by the tuning file when `tuned` is set
    pub weight_decay: f64,
    /// Hidden layer width (GCN only)
    pub hidden: usize,
    /// Dropout probability (GCN only)
    pub dropout: f32,
    /// Adjacency normalization scheme
    pub normalization: Normalization,
    /// Propagation steps folded into the features
    pub degree: usize,
    /// Fraction of the original features mixed back in per step
    pub alpha: f32,
    /// How many times to train and evaluate
    pub repeats: usize,
    /// Use the tuned weight decay from `tuning_dir`
    pub tuned: bool,
    /// Directory holding `SGC-tuning/<dataset>.json` files
    pub tuning_dir: PathBuf,
    /// Partition sizes
    pub split: SplitSpec,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: "cora".to_string(),
            data_dir: PathBuf::from("data"),
            model: ModelKind::Sgc,
            seed: 42,
            epochs: 100,
            lr: 0.2,
            weight_decay: 5e-6,
            hidden: 16,
            dropout: 0.5,
            normalization: Normalization::AugNormAdj,
            degree: 2,
            alpha: 0.0,
            repeats: 10,
            tuned: false,
            tuning_dir: PathBuf::from("."),
            split: SplitSpec::planetoid(),
        }
    }
}

/// Per-repeat training hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct TrainOptions {
    /// Number of epochs
    pub epochs: usize,
    /// Adam learning rate
    pub lr: f32,
    /// L2 weight decay
    pub weight_decay: f32,
}

/// Outcome of one training run.
#[derive(Debug)]
pub struct TrainReport {
    /// Deep copy of the model at its best validation loss, if any epoch
    /// improved on the sentinel
    pub best_model: Option<NodeClassifier>,
    /// Highest validation accuracy seen during training
    pub best_val_acc: f32,
    /// Wall-clock time spent in the epoch loop
    pub train_time: Duration,
}

/// One repeat's scores.
#[derive(Debug, Clone, Copy)]
pub struct RunRecord {
    /// Best validation accuracy of the repeat
    pub val_acc: f32,
    /// Test accuracy of the checkpointed (or final) model
    pub test_acc: f32,
    /// Training time of the repeat
    pub train_time: Duration,
}

/// Aggregated experiment results.
#[derive(Debug, Clone)]
pub struct ExperimentSummary {
    /// Weight decay actually used (tuned or configured)
    pub weight_decay: f64,
    /// Time spent propagating features
    pub precompute_time: Duration,
    /// Per-repeat scores, in order
    pub runs: Vec<RunRecord>,
    /// Mean test accuracy
    pub test_acc_mean: f32,
    /// Population standard deviation of test accuracy
    pub test_acc_std: f32,
    /// Mean validation accuracy
    pub val_acc_mean: f32,
    /// Population standard deviation of validation accuracy
    pub val_acc_std: f32,
}

/// Train a classifier, tracking the best validation loss.
///
/// Each epoch trains on `train_x`/`train_y`, then scores `val_x`/`val_y`
/// without gradients. Whenever the validation loss strictly improves, a
/// deep copy of the model is stored; `best_model` stays `None` if no epoch
/// beats the initial sentinel, and callers fall back to the final model.
pub fn train_classifier(
    model: &mut NodeClassifier,
    train_x: &Tensor,
    train_y: &[usize],
    val_x: &Tensor,
    val_y: &[usize],
    opts: &TrainOptions,
) -> TrainReport {
    let criterion = CrossEntropyLoss::new();
    let mut optimizer = Adam::new(model.parameters_mut(), opts.lr).weight_decay(opts.weight_decay);

    let train_targets = labels_to_tensor(train_y);
    let val_targets = labels_to_tensor(val_y);

    let mut best_val_acc = 0.0_f32;
    let mut best_val_loss = 100.0_f32;
    let mut best_model = None;

    let start = Instant::now();
    for epoch in 0..opts.epochs {
        model.train();
        clear_graph();
        optimizer.zero_grad();

        let logits = model.forward(train_x);
        let loss = criterion.forward(&logits, &train_targets);
        loss.backward();
        optimizer.step(&mut model.parameters_mut());

        model.eval();
        let (val_acc, val_loss) = no_grad(|| {
            let val_logits = model.forward(val_x);
            let val_acc = accuracy(&argmax_rows(&val_logits), val_y);
            let val_loss = criterion.forward(&val_logits, &val_targets).item();
            (val_acc, val_loss)
        });

        if val_acc > best_val_acc {
            best_val_acc = val_acc;
        }
        if val_loss < best_val_loss {
            best_val_loss = val_loss;
            best_model = Some(model.clone());
        }

        debug!(
            "epoch {epoch}: train_loss={:.4} val_acc={val_acc:.4} val_loss={val_loss:.4}",
            loss.item()
        );
    }

    TrainReport {
        best_model,
        best_val_acc,
        train_time: start.elapsed(),
    }
}

/// Accuracy of a model on a feature/label partition.
///
/// Runs in eval mode without recording gradients. The result is always in
/// [0.0, 1.0].
pub fn evaluate(model: &mut NodeClassifier, x: &Tensor, y: &[usize]) -> f32 {
    model.eval();
    let logits = no_grad(|| model.forward(x));
    accuracy(&argmax_rows(&logits), y)
}

/// Run the full experiment described by `config`.
///
/// Features are propagated once; each repeat re-initializes the model from
/// a fresh sub-seed, trains it, and evaluates the best checkpoint (or the
/// final model) on the test partition.
///
/// # Errors
///
/// Fails with a not-implemented error for tuned or untuned non-SGC
/// configurations, and propagates loader, tuning, and propagation errors.
pub fn run(config: &ExperimentConfig) -> Result<ExperimentSummary> {
    let weight_decay = if config.tuned {
        let wd = tuning::resolve(&config.tuning_dir, config.model, &config.dataset)?;
        info!("tuned weight decay for {}: {wd}", config.dataset);
        wd
    } else {
        config.weight_decay
    };

    if config.model != ModelKind::Sgc {
        return Err(GrafoError::NotImplemented {
            feature: format!("training pipeline for {}", config.model),
        });
    }

    let mut ctx = RngContext::new(config.seed);

    let dataset = data::load_citation(
        &config.dataset,
        &config.data_dir,
        config.normalization,
        &config.split,
    )?;
    info!(
        "loaded {}: {} nodes, {} features, {} classes",
        config.dataset,
        dataset.num_nodes(),
        dataset.num_features(),
        dataset.num_classes
    );

    let (propagated, precompute_time) = propagation::propagate(
        &dataset.features,
        &dataset.adj,
        config.degree,
        config.alpha,
    )?;
    info!(
        "propagated features {} times in {:.4}s",
        config.degree,
        precompute_time.as_secs_f64()
    );

    let mut model = models::build(
        config.model,
        dataset.num_features(),
        dataset.num_classes,
        config.hidden,
        config.dropout,
        &dataset.adj,
        Some(ctx.next_seed()),
    )?;

    let train_x = select_rows(&propagated, &dataset.idx_train);
    let val_x = select_rows(&propagated, &dataset.idx_val);
    let test_x = select_rows(&propagated, &dataset.idx_test);
    let train_y = select_labels(&dataset.labels, &dataset.idx_train);
    let val_y = select_labels(&dataset.labels, &dataset.idx_val);
    let test_y = select_labels(&dataset.labels, &dataset.idx_test);

    let opts = TrainOptions {
        epochs: config.epochs,
        lr: config.lr,
        weight_decay: weight_decay as f32,
    };

    let mut runs = Vec::with_capacity(config.repeats);
    for repeat in 0..config.repeats {
        model.reset_parameters(Some(ctx.next_seed()));
        let report = train_classifier(&mut model, &train_x, &train_y, &val_x, &val_y, &opts);

        let test_acc = match report.best_model {
            Some(mut best) => evaluate(&mut best, &test_x, &test_y),
            None => evaluate(&mut model, &test_x, &test_y),
        };

        debug!(
            "repeat {repeat}: val_acc={:.4} test_acc={test_acc:.4}",
            report.best_val_acc
        );
        runs.push(RunRecord {
            val_acc: report.best_val_acc,
            test_acc,
            train_time: report.train_time,
        });
    }

    let test_accs: Vec<f32> = runs.iter().map(|r| r.test_acc).collect();
    let val_accs: Vec<f32> = runs.iter().map(|r| r.val_acc).collect();
    let test_acc_mean = mean(&test_accs);
    let val_acc_mean = mean(&val_accs);

    Ok(ExperimentSummary {
        weight_decay,
        precompute_time,
        test_acc_std: population_std(&test_accs, test_acc_mean),
        val_acc_std: population_std(&val_accs, val_acc_mean),
        test_acc_mean,
        val_acc_mean,
        runs,
    })
}

/// Gather feature rows into a training tensor.
fn select_rows(features: &Matrix<f32>, indices: &[usize]) -> Tensor {
    let cols = features.n_cols();
    let src = features.as_slice();
    let mut data = Vec::with_capacity(indices.len() * cols);
    for &i in indices {
        data.extend_from_slice(&src[i * cols..(i + 1) * cols]);
    }
    Tensor::new(&data, &[indices.len(), cols])
}

fn select_labels(labels: &[usize], indices: &[usize]) -> Vec<usize> {
    indices.iter().map(|&i| labels[i]).collect()
}

/// Class indices as a 1D f32 tensor, the layout the loss expects.
fn labels_to_tensor(labels: &[usize]) -> Tensor {
    let data: Vec<f32> = labels.iter().map(|&l| l as f32).collect();
    Tensor::from_slice(&data)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population standard deviation (divides by n, not n - 1).
fn population_std(values: &[f32], mean: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyMatrix;

    fn separable_data() -> (Tensor, Vec<usize>) {
        let x = Tensor::new(
            &[1.0, 0.0, 0.9, 0.1, 0.0, 1.0, 0.1, 0.9],
            &[4, 2],
        );
        (x, vec![0, 0, 1, 1])
    }

    fn linear_model(seed: u64) -> NodeClassifier {
        let adj = AdjacencyMatrix::from_edges(4, &[]).normalize(Normalization::AugNormAdj);
        models::build(ModelKind::Sgc, 2, 2, 0, 0.0, &adj, Some(seed)).unwrap()
    }

    fn quick_opts(epochs: usize) -> TrainOptions {
        TrainOptions {
            epochs,
            lr: 0.5,
            weight_decay: 0.0,
        }
    }

    #[test]
    fn test_train_classifier_fits_separable_data() {
        let (x, y) = separable_data();
        let mut model = linear_model(42);

        let report = train_classifier(&mut model, &x, &y, &x, &y, &quick_opts(100));

        assert!(report.best_model.is_some());
        assert!((report.best_val_acc - 1.0).abs() < 1e-6);
        assert!((evaluate(&mut model, &x, &y) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_epochs_yields_no_checkpoint() {
        let (x, y) = separable_data();
        let mut model = linear_model(42);

        let report = train_classifier(&mut model, &x, &y, &x, &y, &quick_opts(0));
        assert!(report.best_model.is_none());
        assert_eq!(report.best_val_acc, 0.0);
    }

    #[test]
    fn test_checkpoint_unaffected_by_further_training() {
        let (x, y) = separable_data();
        let mut model = linear_model(42);

        let report = train_classifier(&mut model, &x, &y, &x, &y, &quick_opts(5));
        let best = report.best_model.unwrap();
        let frozen: Vec<f32> = best.parameters()[0].data().to_vec();

        let _ = train_classifier(&mut model, &x, &y, &x, &y, &quick_opts(20));

        assert_eq!(best.parameters()[0].data(), frozen.as_slice());
        assert_ne!(model.parameters()[0].data(), frozen.as_slice());
    }

    #[test]
    fn test_training_is_deterministic() {
        let (x, y) = separable_data();

        let mut a = linear_model(7);
        let mut b = linear_model(7);
        let _ = train_classifier(&mut a, &x, &y, &x, &y, &quick_opts(10));
        let _ = train_classifier(&mut b, &x, &y, &x, &y, &quick_opts(10));

        assert_eq!(a.parameters()[0].data(), b.parameters()[0].data());
        assert_eq!(a.parameters()[1].data(), b.parameters()[1].data());
    }

    #[test]
    fn test_evaluate_is_a_fraction() {
        let (x, y) = separable_data();
        let mut model = linear_model(3);

        let acc = evaluate(&mut model, &x, &y);
        assert!((0.0..=1.0).contains(&acc));
    }

    #[test]
    fn test_run_rejects_tuned_non_sgc_before_training() {
        let config = ExperimentConfig {
            model: ModelKind::Gcn,
            tuned: true,
            ..ExperimentConfig::default()
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(err, GrafoError::NotImplemented { .. }));
    }

    #[test]
    fn test_run_rejects_untuned_non_sgc() {
        let config = ExperimentConfig {
            model: ModelKind::Gcn,
            ..ExperimentConfig::default()
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(err, GrafoError::NotImplemented { .. }));
        assert!(err.to_string().contains("GCN"));
    }

    #[test]
    fn test_population_std_of_identical_series_is_zero() {
        let series = [0.8_f32; 5];
        assert_eq!(population_std(&series, mean(&series)), 0.0);
    }

    #[test]
    fn test_population_std_divides_by_n() {
        // Population std of [0, 1] is 0.5; the sample estimate would be ~0.707
        let series = [0.0_f32, 1.0];
        let m = mean(&series);
        assert!((m - 0.5).abs() < 1e-6);
        assert!((population_std(&series, m) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mean_of_empty_series_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std(&[], 0.0), 0.0);
    }

    #[test]
    fn test_select_rows_gathers_in_order() {
        let features =
            Matrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("valid matrix");
        let picked = select_rows(&features, &[2, 0]);
        assert_eq!(picked.shape(), &[2, 2]);
        assert_eq!(picked.data(), &[5.0, 6.0, 1.0, 2.0]);
    }
}
