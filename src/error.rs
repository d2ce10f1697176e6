//! Error types for grafo operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for grafo operations.
///
/// Covers configuration mistakes (unknown model or normalization names,
/// out-of-range hyperparameters), dataset problems (missing files, malformed
/// lines, invalid splits), and tensor shape misuse.
///
/// # Examples
///
/// ```
/// use grafo::error::GrafoError;
///
/// let err = GrafoError::UnknownModel {
///     name: "resnet".to_string(),
/// };
/// assert!(err.to_string().contains("unknown model"));
/// ```
#[derive(Debug)]
pub enum GrafoError {
    /// Requested behavior exists in the experiment surface but has no
    /// implementation for the given configuration.
    NotImplemented {
        /// What was requested
        feature: String,
    },

    /// Model name not recognized by the factory.
    UnknownModel {
        /// Name as given
        name: String,
    },

    /// Adjacency normalization scheme name not recognized.
    UnknownNormalization {
        /// Name as given
        name: String,
    },

    /// Matrix/tensor dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Invalid or corrupt dataset content.
    FormatError {
        /// Error description
        message: String,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for GrafoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrafoError::NotImplemented { feature } => {
                write!(f, "not implemented: {feature}")
            }
            GrafoError::UnknownModel { name } => {
                write!(f, "unknown model: {name}")
            }
            GrafoError::UnknownNormalization { name } => {
                write!(f, "unknown normalization: {name}")
            }
            GrafoError::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected}, got {actual}")
            }
            GrafoError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            GrafoError::Io(e) => write!(f, "I/O error: {e}"),
            GrafoError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            GrafoError::FormatError { message } => {
                write!(f, "invalid dataset format: {message}")
            }
            GrafoError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GrafoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrafoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GrafoError {
    fn from(err: std::io::Error) -> Self {
        GrafoError::Io(err)
    }
}

impl From<serde_json::Error> for GrafoError {
    fn from(err: serde_json::Error) -> Self {
        GrafoError::Serialization(err.to_string())
    }
}

impl From<&str> for GrafoError {
    fn from(msg: &str) -> Self {
        GrafoError::Other(msg.to_string())
    }
}

impl From<String> for GrafoError {
    fn from(msg: String) -> Self {
        GrafoError::Other(msg)
    }
}

impl GrafoError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create a dataset format error
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatError {
            message: message.into(),
        }
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_hyperparameter(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, GrafoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_display() {
        let err = GrafoError::NotImplemented {
            feature: "tuned weight decay for GCN".to_string(),
        };
        assert!(err.to_string().contains("not implemented"));
        assert!(err.to_string().contains("GCN"));
    }

    #[test]
    fn test_unknown_model_display() {
        let err = GrafoError::UnknownModel {
            name: "transformer".to_string(),
        };
        assert!(err.to_string().contains("unknown model"));
        assert!(err.to_string().contains("transformer"));
    }

    #[test]
    fn test_unknown_normalization_display() {
        let err = GrafoError::UnknownNormalization {
            name: "LeftNormAdj".to_string(),
        };
        assert!(err.to_string().contains("unknown normalization"));
        assert!(err.to_string().contains("LeftNormAdj"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = GrafoError::DimensionMismatch {
            expected: "2708x1433".to_string(),
            actual: "2708x1432".to_string(),
        };
        assert!(err.to_string().contains("dimension mismatch"));
        assert!(err.to_string().contains("2708x1433"));
        assert!(err.to_string().contains("2708x1432"));
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = GrafoError::InvalidHyperparameter {
            param: "alpha".to_string(),
            value: "1.5".to_string(),
            constraint: "[0, 1]".to_string(),
        };
        assert!(err.to_string().contains("invalid hyperparameter"));
        assert!(err.to_string().contains("alpha"));
        assert!(err.to_string().contains("1.5"));
        assert!(err.to_string().contains("[0, 1]"));
    }

    #[test]
    fn test_format_error_display() {
        let err = GrafoError::format("line 12: expected 1435 columns, found 3");
        assert!(err.to_string().contains("invalid dataset format"));
        assert!(err.to_string().contains("line 12"));
    }

    #[test]
    fn test_from_str() {
        let err: GrafoError = "test error".into();
        assert!(matches!(err, GrafoError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GrafoError = io_err.into();
        assert!(matches!(err, GrafoError::Io(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: GrafoError = bad.unwrap_err().into();
        assert!(matches!(err, GrafoError::Serialization(_)));
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = GrafoError::Io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_other() {
        use std::error::Error;
        let err = GrafoError::Other("test".to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_dimension_mismatch_helper() {
        let err = GrafoError::dimension_mismatch("rows", 100, 50);
        let msg = err.to_string();
        assert!(msg.contains("rows=100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn test_invalid_hyperparameter_helper() {
        let err = GrafoError::invalid_hyperparameter("hidden", 0, "> 0");
        let msg = err.to_string();
        assert!(msg.contains("hidden"));
        assert!(msg.contains("> 0"));
    }
}
