//! Plain-text point dump

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use spectra_core::{Result, SpectraError};

/// Write one `x y` line per point, six decimals each. The file is created or
/// truncated.
pub fn write_points(path: &Path, points: &[(f64, f64)]) -> Result<()> {
    let file = File::create(path).map_err(|e| SpectraError::io(path.display(), e))?;
    let mut out = BufWriter::new(file);
    write_points_to(&mut out, points).map_err(|e| SpectraError::io(path.display(), e))?;
    out.flush().map_err(|e| SpectraError::io(path.display(), e))
}

pub fn write_points_to<W: Write>(out: &mut W, points: &[(f64, f64)]) -> std::io::Result<()> {
    for (x, y) in points {
        writeln!(out, "{:.6} {:.6}", x, y)?;
    }
    Ok(())
}
