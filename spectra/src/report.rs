//! Console report of a run

use std::io::{self, Write};

use crate::pipeline::Analysis;

/// Human-readable report: eigenvalues, eigenvectors (cartesian and polar),
/// the fit history when present, and the projected points
pub fn write_report<W: Write>(out: &mut W, analysis: &Analysis) -> io::Result<()> {
    let eigen = &analysis.eigen;
    let n = eigen.len();

    writeln!(out, "eigenvalues")?;
    for (value, polar) in eigen.values().iter().zip(eigen.value_polar()) {
        writeln!(out, "  {:>10.6} {:>+10.6}i  {}", value.re, value.im, polar)?;
    }

    writeln!(out, "eigenvectors")?;
    let vectors = eigen.vectors();
    for i in 0..n {
        write!(out, " ")?;
        for j in 0..n {
            let z = vectors[(i, j)];
            write!(out, " {:>9.6}{:+.6}i", z.re, z.im)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "eigenvectors (magnitude, phase)")?;
    let polar = eigen.vector_polar();
    for i in 0..n {
        write!(out, " ")?;
        for j in 0..n {
            write!(out, " {}", polar[(i, j)])?;
        }
        writeln!(out)?;
    }

    if let Some(fit) = &analysis.fit {
        writeln!(out, "fit cost")?;
        for p in fit.trace.points() {
            writeln!(out, "  {:>4} {:.6}", p.iteration, p.cost)?;
        }
        writeln!(out, "weight magnitudes")?;
        for row in &fit.weight_magnitudes {
            let cells: Vec<String> = row.iter().map(|m| format!("{:.6}", m)).collect();
            writeln!(out, "  {}", cells.join(" "))?;
        }
    }

    writeln!(out, "projection")?;
    for (x, y) in analysis.points() {
        writeln!(out, "  {:.6} {:.6}", x, y)?;
    }
    Ok(())
}
