use crate::error::DetrendError;
use crate::types::ArrayView1f;

use itertools::Itertools;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use std::path::Path;

fn plot_error(e: impl std::fmt::Display) -> DetrendError {
    DetrendError::Plot(e.to_string())
}

fn range<'a>(values: impl Iterator<Item = &'a f64>) -> Result<std::ops::Range<f64>, DetrendError> {
    let (min, max) = values
        .copied()
        .minmax_by(f64::total_cmp)
        .into_option()
        .ok_or_else(|| plot_error("nothing to plot"))?;
    let pad = 0.05 * (max - min).max(f64::EPSILON);
    Ok((min - pad)..(max + pad))
}

/// Render the raw flux and its GP trend to a PNG file
pub(super) fn plot_trend(
    path: &Path,
    t: ArrayView1f,
    flux: ArrayView1f,
    trend: ArrayView1f,
) -> Result<(), DetrendError> {
    let root = BitMapBackend::new(path, (1024, 512)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(range(t.iter())?, range(flux.iter().chain(trend.iter()))?)
        .map_err(plot_error)?;
    chart
        .configure_mesh()
        .x_desc("time")
        .y_desc("flux")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(
            t.iter().copied().zip(flux.iter().copied()),
            &BLUE,
        ))
        .map_err(plot_error)?;
    chart
        .draw_series(LineSeries::new(
            t.iter().copied().zip(trend.iter().copied()),
            &RED,
        ))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)
}
