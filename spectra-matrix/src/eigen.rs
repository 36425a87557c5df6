//! Eigendecomposition of a real square matrix
//!
//! Symmetric input goes through `symmetric_eigen`, which keeps repeated
//! eigenvalues well separated into orthonormal vectors. Anything else is
//! factorized as a complex Schur form `M = Q·T·Qᴴ`; eigenvalues are read off
//! the diagonal of `T` and each right eigenvector is recovered by back
//! substitution on `T` and mapped back through `Q`.
//!
//! Every eigenvector has unit length with its largest-magnitude component
//! real and positive. Pairs are returned in solver order, not sorted.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use serde::Serialize;
use spectra_core::{tolerance, Result, SpectraError};
use tracing::{debug, warn};

use crate::helpers::{ensure_finite, is_symmetric, normalize_complex, normalize_real};
use crate::types::{AdjacencyMatrix, Polar};

/// Iteration bound for the Schur and symmetric QR sweeps
pub const MAX_SOLVER_ITERATIONS: usize = 10_000;

/// Eigenvalue/eigenvector pairs of an N×N matrix
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    values: Vec<Complex64>,
    /// Column j is the eigenvector paired with `values[j]`
    vectors: DMatrix<Complex64>,
}

/// One eigenvalue with its eigenvector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenPair {
    pub value: Complex64,
    pub vector: Vec<Complex64>,
}

impl EigenDecomposition {
    /// Number of eigenpairs (equal to N)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Complex64] {
        &self.values
    }

    /// N×N complex matrix whose columns are the eigenvectors
    pub fn vectors(&self) -> &DMatrix<Complex64> {
        &self.vectors
    }

    /// Eigenvector paired with eigenvalue `index`
    pub fn vector(&self, index: usize) -> Option<DVector<Complex64>> {
        (index < self.len()).then(|| self.vectors.column(index).clone_owned())
    }

    pub fn pairs(&self) -> Vec<EigenPair> {
        self.values
            .iter()
            .enumerate()
            .map(|(j, &value)| EigenPair {
                value,
                vector: self.vectors.column(j).iter().copied().collect(),
            })
            .collect()
    }

    /// Magnitude and phase of every eigenvalue
    pub fn value_polar(&self) -> Vec<Polar> {
        self.values.iter().map(|&z| Polar::from_complex(z)).collect()
    }

    /// Magnitude and phase of every eigenvector component, same layout as
    /// [`vectors`](Self::vectors)
    pub fn vector_polar(&self) -> DMatrix<Polar> {
        self.vectors.map(Polar::from_complex)
    }

    /// Real part of the eigenvector matrix
    pub fn real_part(&self) -> DMatrix<f64> {
        self.vectors.map(|z| z.re)
    }

    /// Largest `‖M·v − λ·v‖` over all pairs
    pub fn max_residual(&self, matrix: &AdjacencyMatrix) -> f64 {
        let m = matrix.as_dmatrix().map(|x| Complex64::new(x, 0.0));
        (0..self.len())
            .map(|j| {
                let v = self.vectors.column(j).clone_owned();
                (&m * &v - &v * self.values[j]).norm()
            })
            .fold(0.0, f64::max)
    }
}

/// Factorize `matrix` into right eigenpairs.
///
/// Fails with `NumericalFailure` when the input is not finite, the iteration
/// does not converge, the eigenvectors are linearly dependent (defective
/// input) or a pair misses `M·v ≈ λ·v`.
pub fn decompose(matrix: &AdjacencyMatrix) -> Result<EigenDecomposition> {
    let m = matrix.as_dmatrix();
    ensure_finite(m, "eigen")?;

    let decomposition = if is_symmetric(m, 0.0) {
        debug!(n = m.nrows(), "symmetric input, using symmetric eigensolver");
        decompose_symmetric(m)?
    } else {
        debug!(n = m.nrows(), "general input, using complex Schur form");
        decompose_general(m)?
    };

    check_independence(&decomposition.vectors)?;

    let scale = m.norm().max(1.0);
    let residual = decomposition.max_residual(matrix);
    if residual > tolerance::EIGEN_RESIDUAL * scale {
        return Err(SpectraError::numerical(format!(
            "eigen: residual {:.3e} exceeds tolerance",
            residual
        )));
    }

    Ok(decomposition)
}

fn decompose_symmetric(m: &DMatrix<f64>) -> Result<EigenDecomposition> {
    let eigen = m
        .clone()
        .try_symmetric_eigen(f64::EPSILON, MAX_SOLVER_ITERATIONS)
        .ok_or_else(|| SpectraError::numerical("eigen: symmetric QR iteration did not converge"))?;

    let n = m.nrows();
    let mut vectors = DMatrix::zeros(n, n);
    for j in 0..n {
        let mut v = eigen.eigenvectors.column(j).clone_owned();
        normalize_real(&mut v);
        vectors.set_column(j, &v.map(|x| Complex64::new(x, 0.0)));
    }

    Ok(EigenDecomposition {
        values: eigen.eigenvalues.iter().map(|&x| Complex64::new(x, 0.0)).collect(),
        vectors,
    })
}

fn decompose_general(m: &DMatrix<f64>) -> Result<EigenDecomposition> {
    let n = m.nrows();
    let complex = m.map(|x| Complex64::new(x, 0.0));
    let (q, t) = complex
        .try_schur(f64::EPSILON, MAX_SOLVER_ITERATIONS)
        .ok_or_else(|| SpectraError::numerical("eigen: Schur iteration did not converge"))?
        .unpack();

    let t_norm = t.iter().map(|z| z.norm()).fold(0.0, f64::max).max(1.0);
    for i in 1..n {
        if t[(i, i - 1)].norm() > tolerance::EIGEN_RESIDUAL * t_norm {
            return Err(SpectraError::numerical(
                "eigen: Schur factor is not triangular",
            ));
        }
    }

    let values: Vec<Complex64> = (0..n).map(|i| t[(i, i)]).collect();
    // Perturbation used in place of a vanishing pivot, as in LAPACK trevc
    let small = f64::EPSILON * t_norm;

    let mut vectors = DMatrix::zeros(n, n);
    for k in 0..n {
        let lambda = values[k];
        let mut y = DVector::<Complex64>::zeros(n);
        y[k] = Complex64::new(1.0, 0.0);

        for i in (0..k).rev() {
            let mut sum = Complex64::new(0.0, 0.0);
            for j in (i + 1)..=k {
                sum += t[(i, j)] * y[j];
            }
            let mut pivot = t[(i, i)] - lambda;
            if pivot.norm() < small {
                pivot = Complex64::new(small, 0.0);
            }
            y[i] = -sum / pivot;
        }

        let mut v = &q * y;
        normalize_complex(&mut v);
        vectors.set_column(k, &v);
    }

    Ok(EigenDecomposition { values, vectors })
}

fn check_independence(vectors: &DMatrix<Complex64>) -> Result<()> {
    let singular = vectors.clone().singular_values();
    let max = singular.iter().copied().fold(0.0, f64::max);
    let min = singular.iter().copied().fold(f64::INFINITY, f64::min);

    if max == 0.0 || min / max < tolerance::EIGENVECTOR_INDEPENDENCE {
        warn!(min, max, "eigenvector matrix is numerically singular");
        return Err(SpectraError::numerical(
            "eigen: eigenvectors are linearly dependent, matrix is not diagonalizable",
        ));
    }
    Ok(())
}
