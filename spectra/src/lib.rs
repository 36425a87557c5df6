//! Spectra - Spectral geometry of adjacency matrices
//!
//! Decomposes a real square matrix into complex eigenpairs, projects the
//! eigenvectors onto their leading principal components and, optionally,
//! fits a complex linear map to the spectral data by gradient descent.

mod config;
mod pipeline;
mod render;
mod report;
mod writer;

pub use config::{
    RunConfig, DEFAULT_COMPONENTS, DEFAULT_ITERATIONS, DEFAULT_LEARNING_RATE, DEFAULT_SEED,
    OUTPUT_DIR_ENV,
};
pub use pipeline::{analyze, fit_data, train_fit, Analysis, EigenvalueSummary, FitOutcome, RunSummary};
pub use render::{
    axis_range, cost_plot, vectors_plot, PlotLabels, COST_LABELS, PLOT_SIZE, VECTORS_LABELS,
};
pub use report::write_report;
pub use writer::{write_points, write_points_to};

use std::fs;
use std::path::{Path, PathBuf};

use spectra_core::{Result, SpectraError};
use tracing::info;

pub const COST_PLOT: &str = "cost.png";
pub const VECTORS_PLOT: &str = "vectors.png";
pub const VECTORS_DATA: &str = "vectors.dat";

/// Main Spectra engine
#[derive(Debug, Clone, Default)]
pub struct Spectra {
    config: RunConfig,
}

impl Spectra {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn analyze(&self) -> Result<Analysis> {
        analyze(&self.config)
    }

    /// Analyze, then write every artifact into the configured output directory
    pub fn run(&self) -> Result<(Analysis, Vec<PathBuf>)> {
        let analysis = self.analyze()?;
        let written = write_outputs(&analysis, &self.config.output_dir)?;
        Ok((analysis, written))
    }
}

/// Write `vectors.dat`, `vectors.png` and, after a fit, `cost.png` into
/// `dir`. Returns the paths written.
pub fn write_outputs(analysis: &Analysis, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| SpectraError::io(dir.display(), e))?;
    let mut written = Vec::with_capacity(3);

    if let Some(fit) = &analysis.fit {
        let path = dir.join(COST_PLOT);
        cost_plot(&path, &fit.trace.costs())?;
        written.push(path);
    }

    let points = analysis.points();

    let path = dir.join(VECTORS_PLOT);
    vectors_plot(&path, &points)?;
    written.push(path);

    let path = dir.join(VECTORS_DATA);
    write_points(&path, &points)?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "outputs written");
    Ok(written)
}
