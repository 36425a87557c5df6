//! Linear map fitted with complex weights
//!
//! `A` (n×n, trainable) is fitted so that `A·X ≈ Y` for a fixed input column
//! `X` and target column `Y`, minimizing `Σ |Y − A·X|²`.

use num_complex::Complex64;
use rand::Rng;
use spectra_core::{Result, SpectraError};
use tracing::info;

use crate::graph::{Graph, NodeId};
use crate::optimizer::{GradientDescent, OptimizationTrace};
use crate::tensor::Parameter;

pub const WEIGHTS: &str = "A";
pub const INPUT: &str = "X";
pub const TARGET: &str = "Y";

/// Built graph of a linear fit, ready to train
#[derive(Debug, Clone)]
pub struct LinearFit {
    graph: Graph,
    size: usize,
    weights: NodeId,
    loss: NodeId,
}

impl LinearFit {
    /// Weights are drawn from `rng`, real and imaginary parts uniform in
    /// `[-1, 1)`; `input` and `target` must have the same length.
    pub fn build<R: Rng + ?Sized>(rng: &mut R, input: &[Complex64], target: &[Complex64]) -> Result<Self> {
        let n = input.len();
        if target.len() != n {
            return Err(SpectraError::dimension(format!(
                "linear fit: input has {} values, target has {}",
                n,
                target.len()
            )));
        }

        // Inputs first; the weights are found by id, not by position
        let mut graph = Graph::new();
        let x = graph.create_parameter(INPUT, n, 1)?;
        let y = graph.create_parameter(TARGET, n, 1)?;
        let weights = graph.create_parameter(WEIGHTS, n, n)?;

        graph.parameter_mut(weights)?.fill_uniform(rng, -1.0, 1.0);
        graph.parameter_mut(x)?.set_values(input)?;
        graph.parameter_mut(y)?.set_values(target)?;

        let product = graph.matmul(weights, x)?;
        let loss = graph.quadratic(y, product)?;

        Ok(Self { graph, size: n, weights, loss })
    }

    /// Run gradient descent on the weights only
    pub fn train(&mut self, learning_rate: f64, iterations: usize) -> Result<OptimizationTrace> {
        info!(learning_rate, iterations, size = self.size(), "training linear fit");
        GradientDescent::new(&mut self.graph, self.loss, &[self.weights], learning_rate, iterations)?.run()
    }

    /// Number of rows of `A`
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn loss(&self) -> NodeId {
        self.loss
    }

    pub fn weights(&self) -> Result<&Parameter> {
        self.graph.parameter(self.weights)
    }

    /// `|A[i][j]|`, one row per vector
    pub fn weight_magnitudes(&self) -> Result<Vec<Vec<f64>>> {
        let magnitudes = self.weights()?.value().magnitudes();
        Ok(magnitudes.chunks(self.size).map(<[f64]>::to_vec).collect())
    }

    /// Current `|cost|` without touching the gradient buffers
    pub fn cost(&self) -> Result<f64> {
        let value = self.graph.evaluate(self.loss)?;
        Ok(value.scalar().map(|z| z.norm()).unwrap_or(f64::NAN))
    }
}
