//! Profile visualization.
//!
//! Renders a profile's mean and standard-deviation curves against the
//! bin-center coordinate as a PNG using the plotters library.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::processors::profile::Profile;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plotting error: {0}")]
    PlottingError(String),

    #[error("nothing to plot: profile has no drawable bins")]
    EmptyProfile,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
const DEFAULT_WIDTH: u32 = 1280;

/// Default plot height in pixels.
const DEFAULT_HEIGHT: u32 = 960;

/// Mean curve color (blue).
const MEAN_COLOR: RGBColor = RGBColor(55, 126, 184);

/// Standard deviation curve color (orange).
const STDDEV_COLOR: RGBColor = RGBColor(255, 127, 0);

/// Plot a finalized profile's mean and stddev curves and save as PNG.
///
/// Empty bins are skipped; with `log_axes` both axes are logarithmic
/// (matching the usual radial-velocity-profile presentation) and
/// non-positive values are additionally dropped since they have no log
/// coordinate.
pub fn plot_profile(output_path: &Path, profile: &Profile, log_axes: bool) -> Result<()> {
    let keep: Vec<usize> = (0..profile.n_bins())
        .filter(|&i| !profile.is_bin_empty(i))
        .collect();

    let x: Vec<f64> = keep.iter().map(|&i| profile.x[i]).collect();
    let mean: Vec<f64> = keep.iter().map(|&i| profile.mean[i]).collect();
    let stddev: Vec<f64> = keep.iter().map(|&i| profile.stddev[i]).collect();

    plot_profile_series(output_path, &x, &mean, &stddev, log_axes)
}

/// Plot mean and stddev series against `x` and save as PNG.
///
/// This is the backend for both [`plot_profile`] and standalone plotting
/// of a profile CSV read back from disk.
pub fn plot_profile_series(
    output_path: &Path,
    x: &[f64],
    mean: &[f64],
    stddev: &[f64],
    log_axes: bool,
) -> Result<()> {
    let mean_series = collect_series(x, mean, log_axes);
    let stddev_series = collect_series(x, stddev, log_axes);

    if mean_series.is_empty() && stddev_series.is_empty() {
        return Err(VisualizationError::EmptyProfile);
    }

    let (x_range, y_range) = series_bounds(&mean_series, &stddev_series, log_axes);

    let root =
        BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    if log_axes {
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(x_range.log_scale(), y_range.log_scale())
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .draw()
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

        chart
            .draw_series(LineSeries::new(mean_series, &MEAN_COLOR))
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
        chart
            .draw_series(LineSeries::new(stddev_series, &STDDEV_COLOR))
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
    } else {
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .draw()
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

        chart
            .draw_series(LineSeries::new(mean_series, &MEAN_COLOR))
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
        chart
            .draw_series(LineSeries::new(stddev_series, &STDDEV_COLOR))
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
    }

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Pair x with y, dropping non-finite points and, for log axes,
/// non-positive ones.
fn collect_series(x: &[f64], y: &[f64], log_axes: bool) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y.iter())
        .filter(|(&xi, &yi)| {
            let finite = xi.is_finite() && yi.is_finite();
            if log_axes {
                finite && xi > 0.0 && yi > 0.0
            } else {
                finite
            }
        })
        .map(|(&xi, &yi)| (xi, yi))
        .collect()
}

/// Padded x/y ranges covering both series.
///
/// Degenerate (single-value) ranges are widened; on log axes the widening
/// is multiplicative so the range stays positive.
fn series_bounds(
    mean: &[(f64, f64)],
    stddev: &[(f64, f64)],
    log_axes: bool,
) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let mut x_min = f64::MAX;
    let mut x_max = f64::MIN;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;

    for &(x, y) in mean.iter().chain(stddev.iter()) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    let widen = |min: &mut f64, max: &mut f64| {
        if (*max - *min).abs() < f64::EPSILON {
            if log_axes {
                *min /= 2.0;
                *max *= 2.0;
            } else {
                *min -= 1.0;
                *max += 1.0;
            }
        }
    };
    widen(&mut x_min, &mut x_max);
    widen(&mut y_min, &mut y_max);

    (x_min..x_max, y_min..y_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::profile::{BinEdges, BinSpacing, ProfileAccumulator};
    use tempfile::TempDir;

    #[test]
    fn test_plot_profile_writes_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("profile.png");

        let edges = BinEdges::new(0.0, 10.0, 4, BinSpacing::Linear).unwrap();
        let mut acc = ProfileAccumulator::new(edges);
        acc.accumulate(1.0, 10.0, 1.0);
        acc.accumulate(3.0, 20.0, 1.0);
        acc.accumulate(3.2, 30.0, 1.0);
        acc.accumulate(9.0, 15.0, 1.0);
        let profile = acc.finalize().unwrap();

        plot_profile(&path, &profile, false).unwrap();
        assert!(path.exists());
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_plot_profile_log_axes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("profile_log.png");

        let edges = BinEdges::new(0.1, 1000.0, 8, BinSpacing::Log).unwrap();
        let mut acc = ProfileAccumulator::new(edges);
        for i in 1..=8 {
            let r = 0.2 * 3.0f64.powi(i);
            acc.accumulate(r, 100.0 / r, 1.0);
            acc.accumulate(r, 150.0 / r, 1.0);
        }
        let profile = acc.finalize().unwrap();

        plot_profile(&path, &profile, true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_plot_empty_series_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.png");

        let err = plot_profile_series(&path, &[], &[], &[], false).unwrap_err();
        assert!(matches!(err, VisualizationError::EmptyProfile));
    }

    #[test]
    fn test_log_axes_drop_nonpositive_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log_filtered.png");

        // Zero stddev entries must not break log rendering
        let x = vec![1.0, 10.0, 100.0];
        let mean = vec![5.0, 3.0, 2.0];
        let stddev = vec![0.0, 1.0, 0.5];

        plot_profile_series(&path, &x, &mean, &stddev, true).unwrap();
        assert!(path.exists());
    }
}
