//! Structured errors for the spectral pipeline
//!
//! Every failure carries a machine-readable code and, where one exists, a
//! suggestion for the caller. Errors are plain values: library code returns
//! them and only the binary decides whether a failure ends the process.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const NUMERICAL_FAILURE: &str = "NUMERICAL_FAILURE";
    pub const RANK_DEFICIENCY: &str = "RANK_DEFICIENCY";
    pub const SHAPE_MISMATCH: &str = "SHAPE_MISMATCH";
    pub const DIMENSION_ERROR: &str = "DIMENSION_ERROR";
    pub const STALE_GRADIENT: &str = "STALE_GRADIENT";
    pub const DUPLICATE_PARAMETER: &str = "DUPLICATE_PARAMETER";
    pub const UNKNOWN_PARAMETER: &str = "UNKNOWN_PARAMETER";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
}

/// Rows × columns of a matrix or tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of elements
    pub const fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Error type shared by every Spectra crate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectraError {
    /// A factorization did not converge or produced an unusable result
    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    /// Covariance is degenerate, no principal directions exist
    #[error("Rank deficiency: {0}")]
    RankDeficiency(String),

    /// Operand shapes are incompatible for a graph operation
    #[error("Shape mismatch in {op}: {left} vs {right}")]
    ShapeMismatch {
        op: &'static str,
        left: Shape,
        right: Shape,
    },

    /// A requested dimension exceeds what is available
    #[error("Dimension error: {0}")]
    DimensionError(String),

    /// Gradient buffers were not zeroed before a differentiation pass
    #[error("Stale gradient: parameter '{parameter}' has a non-zero gradient buffer")]
    StaleGradient { parameter: String },

    #[error("Duplicate parameter: '{0}' already exists")]
    DuplicateParameter(String),

    #[error("Unknown parameter: '{0}'")]
    UnknownParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisting a report artifact failed
    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SpectraError {
    pub fn numerical(details: impl Into<String>) -> Self {
        Self::NumericalFailure(details.into())
    }

    pub fn rank_deficiency(details: impl Into<String>) -> Self {
        Self::RankDeficiency(details.into())
    }

    pub fn shape_mismatch(op: &'static str, left: Shape, right: Shape) -> Self {
        Self::ShapeMismatch { op, left, right }
    }

    pub fn dimension(details: impl Into<String>) -> Self {
        Self::DimensionError(details.into())
    }

    pub fn config(details: impl Into<String>) -> Self {
        Self::Config(details.into())
    }

    pub fn io(path: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    pub fn serialization(err: impl fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::NumericalFailure(_) => codes::NUMERICAL_FAILURE,
            Self::RankDeficiency(_) => codes::RANK_DEFICIENCY,
            Self::ShapeMismatch { .. } => codes::SHAPE_MISMATCH,
            Self::DimensionError(_) => codes::DIMENSION_ERROR,
            Self::StaleGradient { .. } => codes::STALE_GRADIENT,
            Self::DuplicateParameter(_) => codes::DUPLICATE_PARAMETER,
            Self::UnknownParameter(_) => codes::UNKNOWN_PARAMETER,
            Self::Config(_) => codes::CONFIG_ERROR,
            Self::Io { .. } => codes::IO_ERROR,
            Self::Serialization(_) => codes::SERIALIZATION_ERROR,
        }
    }

    /// Suggestion for fixing the error, if there is a useful one
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NumericalFailure(_) => {
                Some("Check the input matrix for non-finite or defective entries")
            }
            Self::RankDeficiency(_) => Some("Provide at least two rows with non-zero variance"),
            Self::ShapeMismatch { .. } => Some("Check operand shapes when building the graph"),
            Self::DimensionError(_) => Some("Request no more components than were fitted"),
            Self::StaleGradient { .. } => Some("Call zero() before each gradient pass"),
            Self::DuplicateParameter(_) => Some("Use a unique name per parameter"),
            Self::UnknownParameter(_) => None,
            Self::Config(_) => Some("Check the config file and command line flags"),
            Self::Io { .. } => Some("Check that the output directory exists and is writable"),
            Self::Serialization(_) => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

impl Serialize for SpectraError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
            suggestion: self.suggestion(),
        }
        .serialize(serializer)
    }
}

impl From<std::io::Error> for SpectraError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: "<unknown>".to_string(),
            message: err.to_string(),
        }
    }
}
