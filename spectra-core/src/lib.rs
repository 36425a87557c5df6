//! Spectra Core - Shared types
//!
//! This crate provides the types used throughout Spectra:
//! - `SpectraError`: Structured errors with stable codes
//! - `Shape`: Rows × columns of a matrix or tensor
//! - `tolerance`: Numeric tolerances shared by the solvers and their tests

mod error;

pub use error::{codes, Shape, SpectraError};

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, SpectraError>;

/// Numeric tolerances
pub mod tolerance {
    /// Relative residual allowed for `M·v ≈ λ·v`
    pub const EIGEN_RESIDUAL: f64 = 1e-8;
    /// Smallest singular value ratio before eigenvectors count as dependent
    pub const EIGENVECTOR_INDEPENDENCE: f64 = 1e-10;
    /// Variance below which a principal direction is considered empty
    pub const VARIANCE_FLOOR: f64 = 1e-12;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Result, Shape, SpectraError};
    pub use crate::error::codes;
}
