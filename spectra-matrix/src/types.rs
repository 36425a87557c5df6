//! Core matrix types

use std::f64::consts::PI;
use std::fmt;

use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use spectra_core::{Result, SpectraError};

use crate::helpers::ensure_finite;

/// Adjacency matrix of the graph used by the reference run
pub const REFERENCE_ADJACENCY: [[f64; 5]; 5] = [
    [0.0, 1.0, 0.0, 1.0, 1.0],
    [1.0, 0.0, 1.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0, 1.0],
    [1.0, 0.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0, 1.0, 1.0],
];

/// Square real input matrix (N ≥ 2), immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    data: DMatrix<f64>,
}

impl AdjacencyMatrix {
    /// Create from nested rows, validating that the result is square
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(SpectraError::dimension("matrix: empty data"));
        }

        let n = rows.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(SpectraError::dimension(format!(
                    "matrix: row {} has {} columns, expected {} for a square matrix",
                    i,
                    row.len(),
                    n
                )));
            }
        }

        Self::from_dmatrix(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }

    /// Create from nalgebra DMatrix; entries must be finite
    pub fn from_dmatrix(data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() != data.ncols() {
            return Err(SpectraError::dimension(format!(
                "matrix: expected a square matrix, got {}x{}",
                data.nrows(),
                data.ncols()
            )));
        }
        if data.nrows() < 2 {
            return Err(SpectraError::dimension(format!(
                "matrix: size must be at least 2, got {}",
                data.nrows()
            )));
        }
        ensure_finite(&data, "matrix")?;
        Ok(Self { data })
    }

    /// The 5×5 reference adjacency matrix
    pub fn reference() -> Self {
        Self {
            data: DMatrix::from_fn(5, 5, |i, j| REFERENCE_ADJACENCY[i][j]),
        }
    }

    /// Number of rows (and columns)
    pub fn size(&self) -> usize {
        self.data.nrows()
    }

    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

impl fmt::Display for AdjacencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.data.nrows() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for j in 0..self.data.ncols() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.data[(i, j)])?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

/// Magnitude and phase of a complex number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Polar {
    /// `sqrt(re² + im²)`, never negative
    pub magnitude: f64,
    /// `atan2(im, re)` in `(-π, π]`
    pub phase: f64,
}

impl Polar {
    pub fn from_complex(z: Complex64) -> Self {
        let mut phase = z.im.atan2(z.re);
        // atan2(-0.0, x < 0) lands on -π, which is outside the half-open range
        if phase <= -PI {
            phase = PI;
        }
        Self {
            magnitude: z.re.hypot(z.im),
            phase,
        }
    }
}

impl From<Complex64> for Polar {
    fn from(z: Complex64) -> Self {
        Self::from_complex(z)
    }
}

impl fmt::Display for Polar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.magnitude, self.phase)
    }
}
