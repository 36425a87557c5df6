//! Gradient descent with global gradient-norm clipping
//!
//! The optimizer runs a fixed number of iterations and stops; there is no
//! convergence test. Each iteration zeroes the gradient buffers, runs one
//! gradient pass on the loss, clips the gradient of the trainable parameters
//! to the unit ball and takes a step.

use serde::Serialize;
use spectra_core::{Result, SpectraError};
use tracing::{debug, info};

use crate::graph::{Graph, NodeId};

/// Norm above which the gradient is rescaled
pub const DEFAULT_CLIP_NORM: f64 = 1.0;

/// Where the optimizer is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptimizerState {
    Init,
    /// Index of the next iteration to run
    Iterate(usize),
    Terminal,
}

/// One iteration of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracePoint {
    pub iteration: usize,
    /// `|cost|` evaluated before the update
    pub cost: f64,
    /// Gradient norm over the trainable parameters, before clipping
    pub gradient_norm: f64,
    /// Factor applied to the gradient, in `(0, 1]`
    pub scaling: f64,
}

/// Append-only record of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationTrace {
    points: Vec<TracePoint>,
}

impl OptimizationTrace {
    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn costs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.cost).collect()
    }

    pub fn first_cost(&self) -> Option<f64> {
        self.points.first().map(|p| p.cost)
    }

    pub fn last_cost(&self) -> Option<f64> {
        self.points.last().map(|p| p.cost)
    }

    fn push(&mut self, point: TracePoint) {
        self.points.push(point);
    }
}

/// Fixed-iteration gradient descent over a [`Graph`]
#[derive(Debug)]
pub struct GradientDescent<'g> {
    graph: &'g mut Graph,
    loss: NodeId,
    trainable: Vec<NodeId>,
    learning_rate: f64,
    iterations: usize,
    clip_norm: f64,
    state: OptimizerState,
    trace: OptimizationTrace,
}

impl<'g> GradientDescent<'g> {
    /// Every id in `trainable` must be a parameter and `loss` must be 1×1.
    /// Parameters not listed stay fixed even though they receive gradients.
    pub fn new(
        graph: &'g mut Graph,
        loss: NodeId,
        trainable: &[NodeId],
        learning_rate: f64,
        iterations: usize,
    ) -> Result<Self> {
        let shape = graph.shape(loss)?;
        if !shape.is_scalar() {
            return Err(SpectraError::shape_mismatch("loss", shape, spectra_core::Shape::new(1, 1)));
        }
        for &id in trainable {
            graph.parameter(id)?;
        }
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(SpectraError::config(format!(
                "learning rate must be positive and finite, got {}",
                learning_rate
            )));
        }

        Ok(Self {
            graph,
            loss,
            trainable: trainable.to_vec(),
            learning_rate,
            iterations,
            clip_norm: DEFAULT_CLIP_NORM,
            state: OptimizerState::Init,
            trace: OptimizationTrace::default(),
        })
    }

    pub fn state(&self) -> OptimizerState {
        self.state
    }

    pub fn trace(&self) -> &OptimizationTrace {
        &self.trace
    }

    /// Run one iteration. Returns `None` once the iteration budget is spent.
    pub fn step(&mut self) -> Result<Option<TracePoint>> {
        let iteration = match self.state {
            OptimizerState::Init => 0,
            OptimizerState::Iterate(next) => next,
            OptimizerState::Terminal => return Ok(None),
        };
        if iteration >= self.iterations {
            self.state = OptimizerState::Terminal;
            return Ok(None);
        }

        self.graph.zero();
        let cost = self.graph.gradient(self.loss)?;

        let mut sum = 0.0;
        for &id in &self.trainable {
            sum += self.graph.parameter(id)?.gradient().norm_sqr();
        }
        let gradient_norm = sum.sqrt();
        let scaling = if gradient_norm <= self.clip_norm {
            1.0
        } else {
            self.clip_norm / gradient_norm
        };

        let step = self.learning_rate * scaling;
        for &id in &self.trainable {
            self.graph.parameter_mut(id)?.descend(step);
        }

        let point = TracePoint {
            iteration,
            cost: cost.norm(),
            gradient_norm,
            scaling,
        };
        debug!(iteration, cost = point.cost, gradient_norm, scaling, "descent step");
        self.trace.push(point);

        self.state = if iteration + 1 >= self.iterations {
            OptimizerState::Terminal
        } else {
            OptimizerState::Iterate(iteration + 1)
        };
        Ok(Some(point))
    }

    /// Run every remaining iteration and hand back the trace
    pub fn run(mut self) -> Result<OptimizationTrace> {
        while self.step()?.is_some() {}
        info!(
            iterations = self.trace.len(),
            first_cost = ?self.trace.first_cost(),
            last_cost = ?self.trace.last_cost(),
            "gradient descent finished"
        );
        Ok(self.trace)
    }
}
