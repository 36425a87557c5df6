//! Helper functions for the decompositions

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use spectra_core::{Result, SpectraError};

/// Fail with a numerical error if any entry is NaN or infinite
pub fn ensure_finite(m: &DMatrix<f64>, what: &str) -> Result<()> {
    if let Some((index, value)) = m.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        let (row, col) = (index % m.nrows(), index / m.nrows());
        return Err(SpectraError::numerical(format!(
            "{}: entry ({}, {}) is not finite ({})",
            what, row, col, value
        )));
    }
    Ok(())
}

/// Symmetry check with an absolute tolerance
pub fn is_symmetric(m: &DMatrix<f64>, eps: f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    for i in 0..m.nrows() {
        for j in (i + 1)..m.ncols() {
            if (m[(i, j)] - m[(j, i)]).abs() > eps {
                return false;
            }
        }
    }
    true
}

/// Scale a complex vector to unit length and rotate it so that its
/// largest-magnitude component is real and positive.
///
/// A zero vector is returned unchanged.
pub fn normalize_complex(v: &mut DVector<Complex64>) {
    let norm = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
    if norm == 0.0 {
        return;
    }

    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.norm().total_cmp(&b.norm()))
        .unwrap_or(Complex64::new(1.0, 0.0));
    // pivot / |pivot| is the unit phase to remove
    let rotation = pivot.conj() / pivot.norm() / norm;
    for z in v.iter_mut() {
        *z *= rotation;
    }
}

/// Same convention as [`normalize_complex`] for a real vector: unit length,
/// largest-magnitude component positive.
pub fn normalize_real(v: &mut DVector<f64>) {
    let norm = v.norm();
    if norm == 0.0 {
        return;
    }
    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(1.0);
    let scale = pivot.signum() / norm;
    *v *= scale;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite() {
        let ok = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert!(ensure_finite(&ok, "test").is_ok());

        let bad = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, f64::NAN, 4.0]);
        let err = ensure_finite(&bad, "test").unwrap_err();
        assert!(err.to_string().contains("(1, 0)"));
    }

    #[test]
    fn test_is_symmetric() {
        let sym = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let asym = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 1.0]);
        assert!(is_symmetric(&sym, 1e-12));
        assert!(!is_symmetric(&asym, 1e-12));
    }

    #[test]
    fn test_normalize_complex() {
        let mut v = DVector::from_vec(vec![
            Complex64::new(0.0, 3.0),
            Complex64::new(0.0, -1.0),
        ]);
        normalize_complex(&mut v);

        let norm: f64 = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(v[0].im.abs() < 1e-12);
        assert!(v[0].re > 0.0);
        assert!((v[1].re + 1.0 / 10f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_real_sign() {
        let mut v = DVector::from_vec(vec![1.0, -4.0]);
        normalize_real(&mut v);
        assert!((v.norm() - 1.0).abs() < 1e-12);
        assert!(v[1] > 0.0);
    }
}
