//! Tuned hyperparameter resolution.
//!
//! Hyperparameter searches store their winners as one JSON file per
//! dataset, e.g. `SGC-tuning/cora.json`:
//!
//! ```json
//! { "weight_decay": 1.3280236005502174e-05 }
//! ```
//!
//! Only SGC has a tuning grid; asking for tuned values with any other
//! model is reported as not implemented.

use std::path::Path;

use serde::Deserialize;

use crate::error::{GrafoError, Result};
use crate::models::ModelKind;

#[derive(Debug, Deserialize)]
struct TunedParams {
    weight_decay: f64,
}

/// Look up the tuned weight decay for a dataset.
///
/// # Errors
///
/// Returns a not-implemented error for non-SGC models, an I/O error if the
/// tuning file is missing, and a serialization error if it doesn't parse.
pub fn resolve(tuning_dir: &Path, model: ModelKind, dataset: &str) -> Result<f64> {
    if model != ModelKind::Sgc {
        return Err(GrafoError::NotImplemented {
            feature: format!("tuned weight decay for {model}"),
        });
    }

    let path = tuning_dir
        .join("SGC-tuning")
        .join(format!("{dataset}.json"));
    let json = std::fs::read_to_string(&path).map_err(|e| {
        GrafoError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })?;

    let params: TunedParams = serde_json::from_str(&json)?;
    Ok(params.weight_decay)
}
