//! Classification metrics for evaluating node classifiers.

use crate::autograd::Tensor;

/// Compute classification accuracy.
///
/// accuracy = `correct_predictions` / `total_predictions`
///
/// # Arguments
///
/// * `y_pred` - Predicted class labels
/// * `y_true` - True class labels
///
/// # Returns
///
/// Accuracy score between 0.0 and 1.0
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use grafo::metrics::accuracy;
///
/// let y_true = vec![0, 1, 2, 0];
/// let y_pred = vec![0, 1, 1, 0];
/// let acc = accuracy(&y_pred, &y_true);
/// assert!((acc - 0.75).abs() < 1e-6);
/// ```
#[must_use]
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();

    correct as f32 / y_true.len() as f32
}

/// Predicted class per row of a logit matrix.
///
/// Ties break toward the lower class index, so the result is deterministic
/// even for degenerate logits.
///
/// # Panics
///
/// Panics if the logits are not 2D.
#[must_use]
pub fn argmax_rows(logits: &Tensor) -> Vec<usize> {
    assert_eq!(logits.ndim(), 2, "Logits must be 2D [batch, classes]");

    let (batch, classes) = (logits.shape()[0], logits.shape()[1]);
    let data = logits.data();

    (0..batch)
        .map(|b| {
            let row = &data[b * classes..(b + 1) * classes];
            let mut best = 0;
            for (j, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}
