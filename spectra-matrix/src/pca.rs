//! Principal component analysis
//!
//! Components are the eigenvectors of the sample covariance (divisor N−1) of
//! the mean-centered rows, sorted by decreasing variance. Projection is the
//! plain linear map `data · components[:, :k]`; it does not re-center.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use spectra_core::{tolerance, Result, SpectraError};
use tracing::debug;

use crate::eigen::MAX_SOLVER_ITERATIONS;
use crate::helpers::{ensure_finite, normalize_real};

/// Fitted principal directions
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponents {
    /// M×M, column i is the direction with the i-th largest variance
    directions: DMatrix<f64>,
    variances: Vec<f64>,
    means: DVector<f64>,
}

/// Summary of a fit, for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaSummary {
    pub explained_variance: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
    pub means: Vec<f64>,
}

impl PrincipalComponents {
    /// Number of components (equal to the column count of the fitted data)
    pub fn len(&self) -> usize {
        self.variances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variances.is_empty()
    }

    /// Orthonormal directions, one per column, by decreasing variance
    pub fn directions(&self) -> &DMatrix<f64> {
        &self.directions
    }

    pub fn direction(&self, index: usize) -> Option<DVector<f64>> {
        (index < self.len()).then(|| self.directions.column(index).clone_owned())
    }

    /// Variance along each direction, non-increasing
    pub fn explained_variance(&self) -> &[f64] {
        &self.variances
    }

    /// Share of total variance carried by each direction
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        let total: f64 = self.variances.iter().sum();
        self.variances.iter().map(|v| v / total).collect()
    }

    /// Column means removed before computing the covariance
    pub fn means(&self) -> &DVector<f64> {
        &self.means
    }

    pub fn summary(&self) -> PcaSummary {
        PcaSummary {
            explained_variance: self.variances.clone(),
            explained_variance_ratio: self.explained_variance_ratio(),
            means: self.means.iter().copied().collect(),
        }
    }

    /// Project `data` onto the first `k` directions
    pub fn project(&self, data: &DMatrix<f64>, k: usize) -> Result<DMatrix<f64>> {
        project(data, self, k)
    }
}

/// Fit principal components to the rows of `data` (N observations × M features).
///
/// Fails with `RankDeficiency` for fewer than two rows, no columns, or zero
/// variance in every direction.
pub fn fit(data: &DMatrix<f64>) -> Result<PrincipalComponents> {
    let (n, m) = data.shape();
    if n < 2 {
        return Err(SpectraError::rank_deficiency(format!(
            "pca: need at least 2 rows, got {}",
            n
        )));
    }
    if m == 0 {
        return Err(SpectraError::rank_deficiency("pca: data has no columns"));
    }
    ensure_finite(data, "pca")?;

    let means = DVector::from_fn(m, |j, _| data.column(j).mean());
    let mut centered = data.clone();
    for j in 0..m {
        let mean = means[j];
        centered.column_mut(j).add_scalar_mut(-mean);
    }
    let covariance = centered.transpose() * &centered / (n as f64 - 1.0);

    let eigen = covariance
        .try_symmetric_eigen(f64::EPSILON, MAX_SOLVER_ITERATIONS)
        .ok_or_else(|| SpectraError::numerical("pca: covariance eigensolver did not converge"))?;

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    // Round-off can leave tiny negative variances on flat directions
    let variances: Vec<f64> = order.iter().map(|&i| eigen.eigenvalues[i].max(0.0)).collect();
    if variances[0] <= tolerance::VARIANCE_FLOOR {
        return Err(SpectraError::rank_deficiency(
            "pca: covariance is zero in every direction",
        ));
    }

    let mut directions = DMatrix::zeros(m, m);
    for (col, &i) in order.iter().enumerate() {
        let mut v = eigen.eigenvectors.column(i).clone_owned();
        normalize_real(&mut v);
        directions.set_column(col, &v);
    }

    debug!(rows = n, cols = m, top_variance = variances[0], "fitted principal components");

    Ok(PrincipalComponents {
        directions,
        variances,
        means,
    })
}

/// `data · components[:, :k]`
///
/// Fails with `DimensionError` if `k` is zero or exceeds the number of
/// components, or if `data` has the wrong number of columns.
pub fn project(data: &DMatrix<f64>, components: &PrincipalComponents, k: usize) -> Result<DMatrix<f64>> {
    if k == 0 || k > components.len() {
        return Err(SpectraError::dimension(format!(
            "pca: k = {} outside 1..={}",
            k,
            components.len()
        )));
    }
    if data.ncols() != components.directions.nrows() {
        return Err(SpectraError::dimension(format!(
            "pca: data has {} columns, components have dimension {}",
            data.ncols(),
            components.directions.nrows()
        )));
    }
    Ok(data * components.directions.columns(0, k))
}
