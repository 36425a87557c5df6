//! Complex tensors and named parameters

use num_complex::Complex64;
use num_traits::Zero;
use rand::Rng;
use spectra_core::{Result, Shape, SpectraError};

/// Row-major rows×cols block of complex values
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexTensor {
    shape: Shape,
    data: Vec<Complex64>,
}

impl ComplexTensor {
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![Complex64::zero(); shape.len()],
        }
    }

    /// Wrap row-major `data`, which must hold exactly `shape.len()` values
    pub fn from_vec(shape: Shape, data: Vec<Complex64>) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(SpectraError::dimension(format!(
                "tensor: {} values do not fill a {} tensor",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    pub fn cols(&self) -> usize {
        self.shape.cols
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Complex64> {
        if row < self.shape.rows && col < self.shape.cols {
            Some(self.data[row * self.shape.cols + col])
        } else {
            None
        }
    }

    /// Single value of a 1×1 tensor
    pub fn scalar(&self) -> Option<Complex64> {
        self.shape.is_scalar().then(|| self.data[0])
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|z| z.is_zero())
    }

    pub fn fill_zero(&mut self) {
        self.data.iter_mut().for_each(|z| *z = Complex64::zero());
    }

    /// `Σ |z|²` over all elements
    pub fn norm_sqr(&self) -> f64 {
        self.data.iter().map(|z| z.norm_sqr()).sum()
    }

    /// Element-wise magnitudes, row-major
    pub fn magnitudes(&self) -> Vec<f64> {
        self.data.iter().map(|z| z.norm()).collect()
    }

    /// `self × rhs`
    pub(crate) fn matmul(&self, rhs: &ComplexTensor) -> ComplexTensor {
        let (n, k, m) = (self.rows(), self.cols(), rhs.cols());
        let mut out = ComplexTensor::zeros(Shape::new(n, m));
        for i in 0..n {
            for p in 0..k {
                let a = self.data[i * k + p];
                for j in 0..m {
                    out.data[i * m + j] += a * rhs.data[p * m + j];
                }
            }
        }
        out
    }

    /// Conjugate transpose
    pub(crate) fn adjoint(&self) -> ComplexTensor {
        let (n, m) = (self.rows(), self.cols());
        let mut out = ComplexTensor::zeros(Shape::new(m, n));
        for i in 0..n {
            for j in 0..m {
                out.data[j * n + i] = self.data[i * m + j].conj();
            }
        }
        out
    }

    pub(crate) fn add_assign(&mut self, rhs: &ComplexTensor) {
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a += b;
        }
    }
}

/// Named trainable or fixed tensor with its gradient buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: ComplexTensor,
    gradient: ComplexTensor,
}

impl Parameter {
    pub(crate) fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            value: ComplexTensor::zeros(shape),
            gradient: ComplexTensor::zeros(shape),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.value.shape()
    }

    pub fn value(&self) -> &ComplexTensor {
        &self.value
    }

    /// Storage for initial values, row-major
    pub fn values_mut(&mut self) -> &mut [Complex64] {
        self.value.as_mut_slice()
    }

    /// Copy `values` into the tensor; the length must match the shape
    pub fn set_values(&mut self, values: &[Complex64]) -> Result<()> {
        if values.len() != self.value.shape().len() {
            return Err(SpectraError::dimension(format!(
                "parameter '{}': {} values do not fill a {} tensor",
                self.name,
                values.len(),
                self.value.shape()
            )));
        }
        self.value.as_mut_slice().copy_from_slice(values);
        Ok(())
    }

    /// Fill with values whose real and imaginary parts are each drawn
    /// uniformly from `[low, high)`
    pub fn fill_uniform<R: Rng + ?Sized>(&mut self, rng: &mut R, low: f64, high: f64) {
        for z in self.value.as_mut_slice() {
            let re = rng.gen_range(low..high);
            let im = rng.gen_range(low..high);
            *z = Complex64::new(re, im);
        }
    }

    pub fn gradient(&self) -> &ComplexTensor {
        &self.gradient
    }

    pub(crate) fn gradient_mut(&mut self) -> &mut ComplexTensor {
        &mut self.gradient
    }

    pub(crate) fn zero_gradient(&mut self) {
        self.gradient.fill_zero();
    }

    /// `value -= step * gradient`
    pub(crate) fn descend(&mut self, step: f64) {
        for (v, g) in self.value.as_mut_slice().iter_mut().zip(self.gradient.as_slice()) {
            *v -= g * step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(ComplexTensor::from_vec(Shape::new(2, 2), vec![c(1.0, 0.0); 3]).is_err());
        let t = ComplexTensor::from_vec(Shape::new(1, 2), vec![c(1.0, 0.0), c(0.0, 1.0)]).unwrap();
        assert_eq!(t.get(0, 1), Some(c(0.0, 1.0)));
        assert_eq!(t.get(1, 0), None);
    }

    #[test]
    fn test_matmul() {
        let a = ComplexTensor::from_vec(
            Shape::new(2, 2),
            vec![c(1.0, 0.0), c(0.0, 1.0), c(2.0, 0.0), c(0.0, 0.0)],
        )
        .unwrap();
        let x = ComplexTensor::from_vec(Shape::new(2, 1), vec![c(1.0, 1.0), c(0.0, 2.0)]).unwrap();
        let y = a.matmul(&x);

        assert_eq!(y.shape(), Shape::new(2, 1));
        // 1·(1+i) + i·2i = -1 + i
        assert_eq!(y.get(0, 0), Some(c(-1.0, 1.0)));
        assert_eq!(y.get(1, 0), Some(c(2.0, 2.0)));
    }

    #[test]
    fn test_adjoint() {
        let a = ComplexTensor::from_vec(Shape::new(1, 2), vec![c(1.0, 2.0), c(3.0, -4.0)]).unwrap();
        let h = a.adjoint();
        assert_eq!(h.shape(), Shape::new(2, 1));
        assert_eq!(h.get(0, 0), Some(c(1.0, -2.0)));
        assert_eq!(h.get(1, 0), Some(c(3.0, 4.0)));
    }

    #[test]
    fn test_norm_and_magnitudes() {
        let t = ComplexTensor::from_vec(Shape::new(1, 2), vec![c(3.0, 4.0), c(0.0, 1.0)]).unwrap();
        assert_eq!(t.norm_sqr(), 26.0);
        assert_eq!(t.magnitudes(), vec![5.0, 1.0]);
    }

    #[test]
    fn test_parameter_starts_zeroed() {
        let p = Parameter::new("A", Shape::new(3, 2));
        assert!(p.value().is_zero());
        assert!(p.gradient().is_zero());
        assert_eq!(p.shape(), Shape::new(3, 2));
    }

    #[test]
    fn test_fill_uniform_is_seeded() {
        let mut a = Parameter::new("A", Shape::new(2, 2));
        let mut b = Parameter::new("B", Shape::new(2, 2));
        a.fill_uniform(&mut StdRng::seed_from_u64(9), -1.0, 1.0);
        b.fill_uniform(&mut StdRng::seed_from_u64(9), -1.0, 1.0);

        assert_eq!(a.value(), b.value());
        for z in a.value().as_slice() {
            assert!((-1.0..1.0).contains(&z.re));
            assert!((-1.0..1.0).contains(&z.im));
        }
    }

    #[test]
    fn test_set_values_checks_length() {
        let mut p = Parameter::new("X", Shape::new(2, 1));
        assert!(p.set_values(&[c(1.0, 0.0)]).is_err());
        p.set_values(&[c(1.0, 0.0), c(2.0, 0.0)]).unwrap();
        assert_eq!(p.value().get(1, 0), Some(c(2.0, 0.0)));
    }
}
