//! Horizontal bar chart of the leading importances, written as SVG.

use std::path::Path;

use plotters::prelude::*;

use super::importance::FeatureImportance;
use crate::errors::{Error, Result};
use crate::io;

const WIDTH: u32 = 900;
const ROW_HEIGHT: u32 = 32;
const CAPTION: &str = "Feature importance (permutation)";

fn render_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Draw the first `top` entries of a ranked importance list, largest bar
/// at the top. Failures are [`Error::Render`].
pub fn render_importance_chart(path: &Path, ranked: &[FeatureImportance], top: usize) -> Result<()> {
    let bars = &ranked[..top.min(ranked.len())];
    if bars.is_empty() {
        return Err(Error::Render("no importances to plot".into()));
    }
    io::ensure_parent_dir(path).map_err(render_err)?;

    let n = bars.len() as i32;
    let height = 120 + ROW_HEIGHT * bars.len() as u32;
    let (x_min, x_max) = value_range(bars);
    let label_width = bars.iter().map(|b| b.feature.len()).max().unwrap_or(0) as u32 * 8 + 16;

    let root = SVGBackend::new(path, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(CAPTION, ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(label_width)
        .build_cartesian_2d(x_min..x_max, (0..n).into_segmented())
        .map_err(render_err)?;

    // Row 0 is the bottom of the chart.
    let label_for = |row: i32| {
        usize::try_from(n - 1 - row)
            .ok()
            .and_then(|i| bars.get(i))
            .map(|b| b.feature.clone())
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(bars.len())
        .y_label_formatter(&|v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(row) => label_for(*row),
            _ => String::new(),
        })
        .x_desc("mean accuracy drop")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(bars.iter().enumerate().map(|(i, bar)| {
            let row = n - 1 - i as i32;
            let mut rect = Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(row)),
                    (bar.mean, SegmentValue::Exact(row + 1)),
                ],
                RGBColor(70, 110, 180).filled(),
            );
            rect.set_margin(4, 4, 0, 0);
            rect
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// X range covering zero and every bar, padded so bars never touch an edge.
fn value_range(bars: &[FeatureImportance]) -> (f64, f64) {
    let lo = bars.iter().map(|b| b.mean).fold(0.0f64, f64::min);
    let hi = bars.iter().map(|b| b.mean).fold(0.0f64, f64::max);
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - if lo < 0.0 { pad } else { 0.0 }, hi + pad)
}
