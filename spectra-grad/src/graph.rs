//! Fixed-topology computation graph over complex tensors
//!
//! The graph knows three node kinds: parameter leaves, matrix products and a
//! quadratic loss. Nodes live in an arena and refer to their operands by
//! [`NodeId`]; operands are always created before the nodes that use them, so
//! arena order is a valid evaluation order.
//!
//! # Gradient convention
//!
//! For a real-valued loss `L` and a complex variable `z = a + ib`, the
//! gradient stored in a parameter's buffer is the Wirtinger form
//!
//! ```text
//! 2·conj(∂L/∂z) = 2·∂L/∂z̄ = ∂L/∂a + i·∂L/∂b
//! ```
//!
//! which is the steepest-ascent direction in the complex plane, so
//! `z -= η·gradient` descends. It is not the holomorphic derivative.
//!
//! # Zeroing contract
//!
//! [`Graph::gradient`] refuses to run while any gradient buffer is non-zero:
//! call [`Graph::zero`] before every pass. [`Graph::accumulate_gradient`] is
//! the only entry point that adds into existing buffers.

use std::collections::HashMap;

use num_complex::Complex64;
use spectra_core::{Result, Shape, SpectraError};
use tracing::trace;

use crate::tensor::{ComplexTensor, Parameter};

/// Handle to a node in a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The closed set of operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// Leaf, index into the parameter table
    Parameter(usize),
    /// `a × x`
    MatMul { a: NodeId, x: NodeId },
    /// `Σ |target − actual|²`, a 1×1 node
    Quadratic { target: NodeId, actual: NodeId },
}

/// Arena of nodes plus the parameters they reach
#[derive(Debug, Clone, Default)]
pub struct Graph {
    parameters: Vec<Parameter>,
    names: HashMap<String, usize>,
    nodes: Vec<Node>,
    shapes: Vec<Shape>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Construction ==========

    /// Allocate a zero-valued `rows × cols` parameter with a zero gradient
    /// buffer. Initial values go in through [`Graph::parameter_mut`].
    pub fn create_parameter(&mut self, name: &str, rows: usize, cols: usize) -> Result<NodeId> {
        let shape = Shape::new(rows, cols);
        if shape.is_empty() {
            return Err(SpectraError::shape_mismatch("parameter", shape, Shape::new(1, 1)));
        }
        if self.names.contains_key(name) {
            return Err(SpectraError::DuplicateParameter(name.to_string()));
        }

        let index = self.parameters.len();
        self.parameters.push(Parameter::new(name, shape));
        self.names.insert(name.to_string(), index);
        Ok(self.push(Node::Parameter(index), shape))
    }

    /// `a × x`; `cols(a)` must equal `rows(x)`
    pub fn matmul(&mut self, a: NodeId, x: NodeId) -> Result<NodeId> {
        let (sa, sx) = (self.shape(a)?, self.shape(x)?);
        if sa.cols != sx.rows {
            return Err(SpectraError::shape_mismatch("matmul", sa, sx));
        }
        Ok(self.push(Node::MatMul { a, x }, Shape::new(sa.rows, sx.cols)))
    }

    /// `Σ |target − actual|²`; both operands must have the same shape
    pub fn quadratic(&mut self, target: NodeId, actual: NodeId) -> Result<NodeId> {
        let (st, sa) = (self.shape(target)?, self.shape(actual)?);
        if st != sa {
            return Err(SpectraError::shape_mismatch("quadratic", st, sa));
        }
        Ok(self.push(Node::Quadratic { target, actual }, Shape::new(1, 1)))
    }

    fn push(&mut self, node: Node, shape: Shape) -> NodeId {
        self.nodes.push(node);
        self.shapes.push(shape);
        NodeId(self.nodes.len() - 1)
    }

    // ========== Access ==========

    pub fn node(&self, id: NodeId) -> Result<Node> {
        self.nodes
            .get(id.0)
            .copied()
            .ok_or_else(|| SpectraError::dimension(format!("graph: no node {}", id.0)))
    }

    pub fn shape(&self, id: NodeId) -> Result<Shape> {
        self.shapes
            .get(id.0)
            .copied()
            .ok_or_else(|| SpectraError::dimension(format!("graph: no node {}", id.0)))
    }

    /// Node of the parameter called `name`
    pub fn get(&self, name: &str) -> Option<NodeId> {
        let index = *self.names.get(name)?;
        self.nodes
            .iter()
            .position(|node| *node == Node::Parameter(index))
            .map(NodeId)
    }

    pub fn parameter(&self, id: NodeId) -> Result<&Parameter> {
        match self.node(id)? {
            Node::Parameter(index) => Ok(&self.parameters[index]),
            _ => Err(SpectraError::UnknownParameter(format!("node {}", id.0))),
        }
    }

    pub fn parameter_mut(&mut self, id: NodeId) -> Result<&mut Parameter> {
        match self.node(id)? {
            Node::Parameter(index) => Ok(&mut self.parameters[index]),
            _ => Err(SpectraError::UnknownParameter(format!("node {}", id.0))),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    // ========== Evaluation ==========

    /// Reset every parameter's gradient buffer to zero
    pub fn zero(&mut self) {
        for p in &mut self.parameters {
            p.zero_gradient();
        }
    }

    /// Forward pass only; gradient buffers are untouched
    pub fn evaluate(&self, root: NodeId) -> Result<ComplexTensor> {
        let reachable = self.reachable(root)?;
        let mut values = self.forward(&reachable);
        values[root.0]
            .take()
            .ok_or_else(|| SpectraError::dimension(format!("graph: node {} not evaluated", root.0)))
    }

    /// Evaluate the 1×1 node `root` and write the gradient of its value into
    /// the buffer of every parameter it reaches.
    ///
    /// Every gradient buffer must be zero on entry, otherwise this fails with
    /// `StaleGradient` and leaves the buffers alone. Returns the value of
    /// `root`.
    pub fn gradient(&mut self, root: NodeId) -> Result<Complex64> {
        if let Some(stale) = self.parameters.iter().find(|p| !p.gradient().is_zero()) {
            return Err(SpectraError::StaleGradient {
                parameter: stale.name().to_string(),
            });
        }
        self.accumulate_gradient(root)
    }

    /// Same as [`Graph::gradient`] but adds into whatever the buffers already
    /// hold. Two calls without [`Graph::zero`] in between leave twice the
    /// gradient behind.
    pub fn accumulate_gradient(&mut self, root: NodeId) -> Result<Complex64> {
        let shape = self.shape(root)?;
        if !shape.is_scalar() {
            return Err(SpectraError::shape_mismatch("gradient", shape, Shape::new(1, 1)));
        }

        let reachable = self.reachable(root)?;
        let values = self.forward(&reachable);
        let output = values[root.0]
            .as_ref()
            .and_then(ComplexTensor::scalar)
            .ok_or_else(|| SpectraError::dimension(format!("graph: node {} not evaluated", root.0)))?;

        self.backward(root, &reachable, &values);
        trace!(root = root.0, value = %output, "gradient pass");
        Ok(output)
    }

    /// Nodes that `root` depends on, itself included
    fn reachable(&self, root: NodeId) -> Result<Vec<bool>> {
        self.node(root)?;
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if seen[id.0] {
                continue;
            }
            seen[id.0] = true;
            match self.nodes[id.0] {
                Node::Parameter(_) => {}
                Node::MatMul { a, x } => stack.extend([a, x]),
                Node::Quadratic { target, actual } => stack.extend([target, actual]),
            }
        }
        Ok(seen)
    }

    fn forward(&self, reachable: &[bool]) -> Vec<Option<ComplexTensor>> {
        let mut values: Vec<Option<ComplexTensor>> = vec![None; self.nodes.len()];
        for index in 0..self.nodes.len() {
            if !reachable[index] {
                continue;
            }
            let node = self.nodes[index];
            let value = match node {
                Node::Parameter(p) => self.parameters[p].value().clone(),
                Node::MatMul { a, x } => {
                    let (a, x) = (operand(&values, a), operand(&values, x));
                    a.matmul(x)
                }
                Node::Quadratic { target, actual } => {
                    let (t, a) = (operand(&values, target), operand(&values, actual));
                    let sum: f64 = t
                        .as_slice()
                        .iter()
                        .zip(a.as_slice())
                        .map(|(t, a)| (t - a).norm_sqr())
                        .sum();
                    scalar(Complex64::new(sum, 0.0))
                }
            };
            values[index] = Some(value);
        }
        values
    }

    fn backward(&mut self, root: NodeId, reachable: &[bool], values: &[Option<ComplexTensor>]) {
        let mut adjoints: Vec<Option<ComplexTensor>> = vec![None; self.nodes.len()];
        adjoints[root.0] = Some(scalar(Complex64::new(1.0, 0.0)));

        for index in (0..=root.0).rev() {
            if !reachable[index] {
                continue;
            }
            let Some(upstream) = adjoints[index].take() else {
                continue;
            };

            let node = self.nodes[index];
            match node {
                Node::Parameter(p) => {
                    self.parameters[p].gradient_mut().add_assign(&upstream);
                }
                Node::MatMul { a, x } => {
                    let (va, vx) = (operand(values, a), operand(values, x));
                    // Y = A·X: G_A = G_Y·Xᴴ, G_X = Aᴴ·G_Y
                    accumulate(&mut adjoints, a, upstream.matmul(&vx.adjoint()));
                    accumulate(&mut adjoints, x, va.adjoint().matmul(&upstream));
                }
                Node::Quadratic { target, actual } => {
                    // The loss is real, so is its upstream adjoint
                    let g = upstream.as_slice()[0].re;
                    let (vt, va) = (operand(values, target), operand(values, actual));
                    let diff: Vec<Complex64> = va
                        .as_slice()
                        .iter()
                        .zip(vt.as_slice())
                        .map(|(a, t)| (a - t) * (2.0 * g))
                        .collect();
                    let shape = va.shape();
                    let d_actual = tensor(shape, diff.clone());
                    let d_target = tensor(shape, diff.into_iter().map(|z| -z).collect());
                    accumulate(&mut adjoints, actual, d_actual);
                    accumulate(&mut adjoints, target, d_target);
                }
            }
        }
    }
}

fn operand(values: &[Option<ComplexTensor>], id: NodeId) -> &ComplexTensor {
    // Operands precede their users and are reachable whenever the user is
    values[id.0]
        .as_ref()
        .unwrap_or_else(|| unreachable!("operand {} evaluated before use", id.0))
}

fn accumulate(adjoints: &mut [Option<ComplexTensor>], id: NodeId, delta: ComplexTensor) {
    if let Some(existing) = adjoints[id.0].as_mut() {
        existing.add_assign(&delta);
    } else {
        adjoints[id.0] = Some(delta);
    }
}

fn scalar(z: Complex64) -> ComplexTensor {
    tensor(Shape::new(1, 1), vec![z])
}

fn tensor(shape: Shape, data: Vec<Complex64>) -> ComplexTensor {
    ComplexTensor::from_vec(shape, data)
        .unwrap_or_else(|_| unreachable!("adjoint shape matches its operand"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    /// W (n×n), X (n×1), Y (n×1), loss = Σ|Y − W·X|², random values
    fn linear_graph(rng: &mut StdRng, n: usize) -> (Graph, NodeId, NodeId) {
        let mut g = Graph::new();
        let w = g.create_parameter("W", n, n).unwrap();
        let x = g.create_parameter("X", n, 1).unwrap();
        let y = g.create_parameter("Y", n, 1).unwrap();
        for id in [w, x, y] {
            g.parameter_mut(id).unwrap().fill_uniform(rng, -1.0, 1.0);
        }
        let wx = g.matmul(w, x).unwrap();
        let loss = g.quadratic(y, wx).unwrap();
        (g, w, loss)
    }

    fn loss_at(g: &Graph, loss: NodeId) -> f64 {
        g.evaluate(loss).unwrap().scalar().unwrap().re
    }

    #[test]
    fn test_create_parameter_rejects_duplicates() {
        let mut g = Graph::new();
        g.create_parameter("A", 2, 2).unwrap();
        assert!(matches!(
            g.create_parameter("A", 3, 3),
            Err(SpectraError::DuplicateParameter(_))
        ));
    }

    #[test]
    fn test_create_parameter_rejects_empty_shape() {
        let mut g = Graph::new();
        assert!(matches!(
            g.create_parameter("A", 0, 2),
            Err(SpectraError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_get_by_name() {
        let mut g = Graph::new();
        let a = g.create_parameter("A", 2, 2).unwrap();
        let x = g.create_parameter("X", 2, 1).unwrap();
        g.matmul(a, x).unwrap();

        assert_eq!(g.get("A"), Some(a));
        assert_eq!(g.get("X"), Some(x));
        assert_eq!(g.get("Y"), None);
        assert_eq!(g.parameter(x).unwrap().name(), "X");
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let mut g = Graph::new();
        let a = g.create_parameter("A", 2, 3).unwrap();
        let x = g.create_parameter("X", 2, 1).unwrap();
        let err = g.matmul(a, x).unwrap_err();
        assert_eq!(err.to_string(), "Shape mismatch in matmul: 2x3 vs 2x1");
    }

    #[test]
    fn test_quadratic_shape_mismatch() {
        let mut g = Graph::new();
        let y = g.create_parameter("Y", 3, 1).unwrap();
        let x = g.create_parameter("X", 1, 3).unwrap();
        assert!(matches!(g.quadratic(y, x), Err(SpectraError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_parameter_mut_rejects_operation_nodes() {
        let mut g = Graph::new();
        let a = g.create_parameter("A", 1, 1).unwrap();
        let b = g.create_parameter("B", 1, 1).unwrap();
        let ab = g.matmul(a, b).unwrap();
        assert!(matches!(g.parameter_mut(ab), Err(SpectraError::UnknownParameter(_))));
    }

    #[test]
    fn test_forward_values() {
        let mut g = Graph::new();
        let a = g.create_parameter("A", 2, 2).unwrap();
        let x = g.create_parameter("X", 2, 1).unwrap();
        let y = g.create_parameter("Y", 2, 1).unwrap();
        g.parameter_mut(a)
            .unwrap()
            .set_values(&[c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 1.0)])
            .unwrap();
        g.parameter_mut(x).unwrap().set_values(&[c(1.0, 0.0), c(1.0, 0.0)]).unwrap();
        g.parameter_mut(y).unwrap().set_values(&[c(0.0, 0.0), c(0.0, 0.0)]).unwrap();

        let ax = g.matmul(a, x).unwrap();
        let loss = g.quadratic(y, ax).unwrap();

        let product = g.evaluate(ax).unwrap();
        assert_eq!(product.as_slice(), &[c(1.0, 0.0), c(0.0, 1.0)]);
        assert_eq!(g.evaluate(loss).unwrap().scalar(), Some(c(2.0, 0.0)));
    }

    #[test]
    fn test_gradient_matches_closed_form() {
        // L = |y − w·x|² for scalars: G_w = 2(w·x − y)·conj(x)
        let mut g = Graph::new();
        let w = g.create_parameter("w", 1, 1).unwrap();
        let x = g.create_parameter("x", 1, 1).unwrap();
        let y = g.create_parameter("y", 1, 1).unwrap();
        g.parameter_mut(w).unwrap().set_values(&[c(1.0, 2.0)]).unwrap();
        g.parameter_mut(x).unwrap().set_values(&[c(0.5, -1.0)]).unwrap();
        g.parameter_mut(y).unwrap().set_values(&[c(2.0, 0.0)]).unwrap();
        let wx = g.matmul(w, x).unwrap();
        let loss = g.quadratic(y, wx).unwrap();

        g.zero();
        let value = g.gradient(loss).unwrap();

        let (wv, xv, yv) = (c(1.0, 2.0), c(0.5, -1.0), c(2.0, 0.0));
        let r = wv * xv - yv;
        assert!((value.re - r.norm_sqr()).abs() < 1e-12);
        assert_eq!(value.im, 0.0);

        let expected_w = r * xv.conj() * 2.0;
        let expected_y = -r * 2.0;
        assert!((g.parameter(w).unwrap().gradient().as_slice()[0] - expected_w).norm() < 1e-12);
        assert!((g.parameter(y).unwrap().gradient().as_slice()[0] - expected_y).norm() < 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let h = 1e-6;
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (mut g, w, loss) = linear_graph(&mut rng, 4);

            g.zero();
            g.gradient(loss).unwrap();
            let analytic = g.parameter(w).unwrap().gradient().clone();

            for _ in 0..6 {
                let k = rng.gen_range(0..16);
                let saved = g.parameter(w).unwrap().value().as_slice()[k];

                let mut probe = |delta: Complex64| {
                    g.parameter_mut(w).unwrap().values_mut()[k] = saved + delta;
                    let l = loss_at(&g, loss);
                    g.parameter_mut(w).unwrap().values_mut()[k] = saved;
                    l
                };
                let d_re = (probe(c(h, 0.0)) - probe(c(-h, 0.0))) / (2.0 * h);
                let d_im = (probe(c(0.0, h)) - probe(c(0.0, -h))) / (2.0 * h);

                let got = analytic.as_slice()[k];
                assert!((got.re - d_re).abs() < 1e-5, "seed {} re {} vs {}", seed, got.re, d_re);
                assert!((got.im - d_im).abs() < 1e-5, "seed {} im {} vs {}", seed, got.im, d_im);
            }
        }
    }

    #[test]
    fn test_gradient_reaches_input_parameter() {
        let h = 1e-6;
        let mut rng = StdRng::seed_from_u64(21);
        let (mut g, _, loss) = linear_graph(&mut rng, 3);
        let x = g.get("X").unwrap();

        g.zero();
        g.gradient(loss).unwrap();
        let got = g.parameter(x).unwrap().gradient().as_slice()[1];

        let saved = g.parameter(x).unwrap().value().as_slice()[1];
        let mut probe = |delta: Complex64| {
            g.parameter_mut(x).unwrap().values_mut()[1] = saved + delta;
            let l = loss_at(&g, loss);
            g.parameter_mut(x).unwrap().values_mut()[1] = saved;
            l
        };
        let d_re = (probe(c(h, 0.0)) - probe(c(-h, 0.0))) / (2.0 * h);
        let d_im = (probe(c(0.0, h)) - probe(c(0.0, -h))) / (2.0 * h);
        assert!((got.re - d_re).abs() < 1e-5);
        assert!((got.im - d_im).abs() < 1e-5);
    }

    #[test]
    fn test_gradient_requires_zeroed_buffers() {
        let mut rng = StdRng::seed_from_u64(1);
        let (mut g, _, loss) = linear_graph(&mut rng, 2);

        g.zero();
        g.gradient(loss).unwrap();
        assert!(matches!(g.gradient(loss), Err(SpectraError::StaleGradient { .. })));

        g.zero();
        assert!(g.gradient(loss).is_ok());
    }

    #[test]
    fn test_accumulate_gradient_adds_up() {
        let mut rng = StdRng::seed_from_u64(2);
        let (mut g, w, loss) = linear_graph(&mut rng, 2);

        g.zero();
        g.gradient(loss).unwrap();
        let once = g.parameter(w).unwrap().gradient().clone();
        g.accumulate_gradient(loss).unwrap();
        let twice = g.parameter(w).unwrap().gradient();

        for (a, b) in once.as_slice().iter().zip(twice.as_slice()) {
            assert!((a * 2.0 - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_gradient_requires_scalar_root() {
        let mut g = Graph::new();
        let a = g.create_parameter("A", 2, 2).unwrap();
        let x = g.create_parameter("X", 2, 1).unwrap();
        let ax = g.matmul(a, x).unwrap();
        assert!(matches!(g.gradient(ax), Err(SpectraError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_unreachable_parameter_keeps_zero_gradient() {
        let mut rng = StdRng::seed_from_u64(4);
        let (mut g, _, loss) = linear_graph(&mut rng, 2);
        let spare = g.create_parameter("spare", 2, 2).unwrap();
        g.parameter_mut(spare).unwrap().fill_uniform(&mut rng, -1.0, 1.0);

        g.zero();
        g.gradient(loss).unwrap();
        assert!(g.parameter(spare).unwrap().gradient().is_zero());
    }

    #[test]
    fn test_evaluate_leaves_buffers_alone() {
        let mut rng = StdRng::seed_from_u64(6);
        let (mut g, _, loss) = linear_graph(&mut rng, 3);
        g.zero();
        g.evaluate(loss).unwrap();
        assert!(g.parameters().iter().all(|p| p.gradient().is_zero()));
    }
}
