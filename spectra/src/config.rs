//! Run configuration
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! the `SPECTRA_OUTPUT_DIR` environment variable, then command line flags
//! (applied by the binary).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spectra_core::{Result, SpectraError};
use spectra_matrix::AdjacencyMatrix;

/// Environment variable overriding the output directory
pub const OUTPUT_DIR_ENV: &str = "SPECTRA_OUTPUT_DIR";

pub const DEFAULT_SEED: u64 = 1;
pub const DEFAULT_ITERATIONS: usize = 128;
pub const DEFAULT_LEARNING_RATE: f64 = 0.3;
pub const DEFAULT_COMPONENTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Seed for the weight initialisation
    pub seed: u64,
    pub iterations: usize,
    pub learning_rate: f64,
    /// Principal components kept by the projection
    pub components: usize,
    /// Directory receiving `cost.png`, `vectors.png` and `vectors.dat`
    pub output_dir: PathBuf,
    /// Run the complex fit after the spectral analysis
    pub neural: bool,
    /// Input matrix as rows; the reference adjacency matrix when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Vec<f64>>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            iterations: DEFAULT_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            components: DEFAULT_COMPONENTS,
            output_dir: PathBuf::from("."),
            neural: false,
            matrix: None,
        }
    }
}

impl RunConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SpectraError::config(format!("invalid config: {}", e)))
    }

    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SpectraError::io(path.display(), e))?;
        Self::from_json_str(&text)
    }

    /// Apply environment overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides through `lookup`
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(OUTPUT_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(SpectraError::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.iterations == 0 {
            return Err(SpectraError::config("iterations must be at least 1"));
        }
        if self.components == 0 {
            return Err(SpectraError::config("components must be at least 1"));
        }
        Ok(())
    }

    /// The configured input matrix
    pub fn matrix(&self) -> Result<AdjacencyMatrix> {
        match &self.matrix {
            Some(rows) => AdjacencyMatrix::from_rows(rows),
            None => Ok(AdjacencyMatrix::reference()),
        }
    }
}
