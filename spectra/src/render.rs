//! Scatter plots of the cost history and the projected eigenvectors

use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;
use spectra_core::{Result, SpectraError};
use tracing::debug;

/// Side of the square plots, in pixels
pub const PLOT_SIZE: u32 = 800;

/// Caption and axis descriptions of a plot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotLabels {
    pub title: &'static str,
    pub x: &'static str,
    pub y: &'static str,
}

pub const COST_LABELS: PlotLabels = PlotLabels {
    title: "epochs vs cost",
    x: "epochs",
    y: "cost",
};

pub const VECTORS_LABELS: PlotLabels = PlotLabels {
    title: "x vs y",
    x: "x",
    y: "y",
};

const COST_RADIUS: i32 = 1;
const VECTOR_RADIUS: i32 = 3;

/// Cost against epoch index
pub fn cost_plot(path: &Path, costs: &[f64]) -> Result<()> {
    let points: Vec<(f64, f64)> = costs.iter().enumerate().map(|(i, &c)| (i as f64, c)).collect();
    scatter(path, COST_LABELS, &points, COST_RADIUS)
}

/// Projected eigenvector rows on the first two components
pub fn vectors_plot(path: &Path, points: &[(f64, f64)]) -> Result<()> {
    scatter(path, VECTORS_LABELS, points, VECTOR_RADIUS)
}

/// Padded axis range covering `values`; a degenerate range is widened by one
/// unit each side
pub fn axis_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if min > max {
        return -1.0..1.0;
    }
    let span = max - min;
    if span < f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = span * 0.05;
    (min - pad)..(max + pad)
}

fn scatter(path: &Path, labels: PlotLabels, points: &[(f64, f64)], radius: i32) -> Result<()> {
    let plot_err = |e: &dyn std::fmt::Display| SpectraError::io(path.display(), e);

    let root = BitMapBackend::new(path, (PLOT_SIZE, PLOT_SIZE)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;

    {
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(labels.title, ("sans-serif", 24.0))
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d(
                axis_range(points.iter().map(|p| p.0)),
                axis_range(points.iter().map(|p| p.1)),
            )
            .map_err(|e| plot_err(&e))?;

        chart
            .configure_mesh()
            .x_desc(labels.x)
            .y_desc(labels.y)
            .disable_mesh()
            .draw()
            .map_err(|e| plot_err(&e))?;

        chart
            .draw_series(
                points
                    .iter()
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .map(|&p| Circle::new(p, radius, BLUE.filled())),
            )
            .map_err(|e| plot_err(&e))?;
    }

    root.present().map_err(|e| plot_err(&e))?;
    debug!(path = %path.display(), points = points.len(), "plot written");
    Ok(())
}
