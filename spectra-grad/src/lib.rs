//! Spectra Grad - Complex-valued autodiff
//!
//! A deliberately small reverse-mode engine:
//! - `ComplexTensor` / `Parameter`: shaped complex storage with gradient buffers
//! - `Graph`: parameter leaves, `matmul` and `quadratic` nodes, nothing else
//! - `GradientDescent`: fixed-iteration descent with gradient-norm clipping
//! - `LinearFit`: the `A·X ≈ Y` model trained on spectral data
//!
//! Gradients follow the Wirtinger convention documented on [`graph`].

pub mod graph;
mod tensor;
mod optimizer;
mod model;

pub use graph::{Graph, Node, NodeId};
pub use tensor::{ComplexTensor, Parameter};
pub use optimizer::{
    GradientDescent, OptimizationTrace, OptimizerState, TracePoint, DEFAULT_CLIP_NORM,
};
pub use model::{LinearFit, INPUT, TARGET, WEIGHTS};
