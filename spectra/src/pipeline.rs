//! The analysis pipeline
//!
//! eigendecomposition → (optional) complex fit → PCA of the real part of the
//! eigenvectors → projection onto the leading components.

use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use spectra_core::Result;
use spectra_grad::{LinearFit, OptimizationTrace};
use spectra_matrix::{decompose, fit, AdjacencyMatrix, EigenDecomposition, PcaSummary, Polar, PrincipalComponents};
use tracing::{info, warn};

use crate::config::RunConfig;

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct Analysis {
    pub matrix: AdjacencyMatrix,
    pub eigen: EigenDecomposition,
    pub components: PrincipalComponents,
    /// N×k projection of the eigenvector rows
    pub projection: DMatrix<f64>,
    pub fit: Option<FitOutcome>,
}

/// Result of the complex fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitOutcome {
    pub trace: OptimizationTrace,
    pub weight_magnitudes: Vec<Vec<f64>>,
}

impl Analysis {
    /// First two projected coordinates of each row; a single component is
    /// paired with zero
    pub fn points(&self) -> Vec<(f64, f64)> {
        (0..self.projection.nrows())
            .map(|i| {
                let x = self.projection[(i, 0)];
                let y = if self.projection.ncols() > 1 {
                    self.projection[(i, 1)]
                } else {
                    0.0
                };
                (x, y)
            })
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        let vectors = self.eigen.vectors();
        let polar = self.eigen.vector_polar();
        let n = vectors.nrows();

        RunSummary {
            eigenvalues: self
                .eigen
                .values()
                .iter()
                .map(|&value| EigenvalueSummary {
                    value,
                    polar: Polar::from_complex(value),
                })
                .collect(),
            eigenvectors: (0..n).map(|i| vectors.row(i).iter().copied().collect()).collect(),
            eigenvector_polar: (0..n).map(|i| polar.row(i).iter().copied().collect()).collect(),
            pca: self.components.summary(),
            projection: (0..self.projection.nrows())
                .map(|i| self.projection.row(i).iter().copied().collect())
                .collect(),
            fit: self.fit.clone(),
        }
    }
}

/// Serializable view of an [`Analysis`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub eigenvalues: Vec<EigenvalueSummary>,
    /// Row-major eigenvector matrix, column j pairs with eigenvalue j
    pub eigenvectors: Vec<Vec<Complex64>>,
    pub eigenvector_polar: Vec<Vec<Polar>>,
    pub pca: PcaSummary,
    pub projection: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenvalueSummary {
    pub value: Complex64,
    #[serde(flatten)]
    pub polar: Polar,
}

/// Run the whole pipeline for `config`
pub fn analyze(config: &RunConfig) -> Result<Analysis> {
    config.validate()?;
    let matrix = config.matrix()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let eigen = decompose(&matrix)?;
    info!(size = matrix.size(), "eigendecomposition done");

    let fit_outcome = if config.neural {
        Some(train_fit(&eigen, &mut rng, config.learning_rate, config.iterations)?)
    } else {
        None
    };

    let real = eigen.real_part();
    let components = fit(&real)?;
    let projection = components.project(&real, config.components)?;
    info!(components = config.components, "projection done");

    Ok(Analysis {
        matrix,
        eigen,
        components,
        projection,
        fit: fit_outcome,
    })
}

/// Input and target of the fit: the first row of the eigenvector matrix and
/// that row scaled by the first eigenvalue
pub fn fit_data(eigen: &EigenDecomposition) -> (Vec<Complex64>, Vec<Complex64>) {
    let input: Vec<Complex64> = eigen.vectors().row(0).iter().copied().collect();
    let lambda = eigen.values()[0];
    let target = input.iter().map(|z| lambda * z).collect();
    (input, target)
}

/// Fit `A·X ≈ Y` on the spectral data, weights drawn from `rng`
pub fn train_fit<R: Rng + ?Sized>(
    eigen: &EigenDecomposition,
    rng: &mut R,
    learning_rate: f64,
    iterations: usize,
) -> Result<FitOutcome> {
    let (input, target) = fit_data(eigen);
    let mut model = LinearFit::build(rng, &input, &target)?;
    let trace = model.train(learning_rate, iterations)?;
    if let (Some(first), Some(last)) = (trace.first_cost(), trace.last_cost()) {
        if last >= first {
            warn!(first, last, "fit did not reduce the cost");
        }
    }
    Ok(FitOutcome {
        trace,
        weight_magnitudes: model.weight_magnitudes()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neural_config() -> RunConfig {
        RunConfig {
            neural: true,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_reference_run_without_fit() {
        let analysis = analyze(&RunConfig::default()).unwrap();
        assert_eq!(analysis.eigen.len(), 5);
        assert_eq!(analysis.projection.shape(), (5, 2));
        assert_eq!(analysis.points().len(), 5);
        assert!(analysis.fit.is_none());
    }

    #[test]
    fn test_reference_fit_reduces_cost() {
        let analysis = analyze(&neural_config()).unwrap();
        let fit = analysis.fit.unwrap();

        assert_eq!(fit.trace.len(), 128);
        assert!(fit.trace.last_cost().unwrap() < fit.trace.first_cost().unwrap());
        assert_eq!(fit.weight_magnitudes.len(), 5);
    }

    #[test]
    fn test_same_seed_same_costs() {
        let a = analyze(&neural_config()).unwrap().fit.unwrap().trace.costs();
        let b = analyze(&neural_config()).unwrap().fit.unwrap().trace.costs();
        assert_eq!(a, b);

        let other = RunConfig { seed: 2, ..neural_config() };
        let c = analyze(&other).unwrap().fit.unwrap().trace.costs();
        assert_ne!(a, c);
    }

    #[test]
    fn test_clipping_bound_holds_on_reference_run() {
        let analysis = analyze(&neural_config()).unwrap();
        for p in analysis.fit.unwrap().trace.points() {
            assert!(p.gradient_norm * p.scaling <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_fit_data_is_first_row() {
        let eigen = decompose(&AdjacencyMatrix::reference()).unwrap();
        let (input, target) = fit_data(&eigen);
        assert_eq!(input.len(), 5);
        assert_eq!(input[3], eigen.vectors()[(0, 3)]);
        assert_eq!(target[3], eigen.values()[0] * eigen.vectors()[(0, 3)]);
    }

    #[test]
    fn test_too_many_components() {
        let config = RunConfig { components: 6, ..RunConfig::default() };
        assert!(matches!(
            analyze(&config),
            Err(spectra_core::SpectraError::DimensionError(_))
        ));
    }

    #[test]
    fn test_summary_serializes() {
        let analysis = analyze(&neural_config()).unwrap();
        let json = serde_json::to_value(analysis.summary()).unwrap();
        assert_eq!(json["eigenvalues"].as_array().unwrap().len(), 5);
        assert!(json["eigenvalues"][0]["magnitude"].is_number());
        assert_eq!(json["fit"]["trace"]["points"].as_array().unwrap().len(), 128);
        assert_eq!(json["projection"][0].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_single_component_points() {
        let config = RunConfig { components: 1, ..RunConfig::default() };
        let analysis = analyze(&config).unwrap();
        assert!(analysis.points().iter().all(|&(_, y)| y == 0.0));
    }
}
