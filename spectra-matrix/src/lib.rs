//! Spectra Matrix - Spectral analysis and projection
//!
//! Provides the linear algebra half of the pipeline:
//! - Input matrix type with shape validation (`AdjacencyMatrix`)
//! - Right eigendecomposition with complex eigenvalues (`decompose`)
//! - Magnitude/phase geometry of eigen-components (`Polar`)
//! - Principal component fit and projection (`fit`, `project`)
//!
//! Built on nalgebra, f64 throughout.

mod types;
mod helpers;
mod eigen;
mod pca;

pub use types::{AdjacencyMatrix, Polar, REFERENCE_ADJACENCY};
pub use eigen::{decompose, EigenDecomposition, EigenPair, MAX_SOLVER_ITERATIONS};
pub use pca::{fit, project, PcaSummary, PrincipalComponents};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_pipeline() {
        let matrix = AdjacencyMatrix::reference();
        let eig = decompose(&matrix).unwrap();
        let real = eig.real_part();
        let pcs = fit(&real).unwrap();
        let points = project(&real, &pcs, 2).unwrap();

        assert_eq!(eig.len(), matrix.size());
        assert_eq!(points.nrows(), matrix.size());
        assert_eq!(points.ncols(), 2);
    }
}
