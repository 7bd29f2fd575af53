//! plot.rs — confidence-region rendering.
//!
//! Filled CL bands on a scan grid, Delta(-2logL) colormap scatters with a
//! colorbar, and the 3-D consistency scatter. All output is PNG via the
//! bitmap backend.

use std::fs;
use std::path::Path;

use plotters::prelude::*;

use crate::error::{FitError, Result};
use crate::scan::GridAxis;

/// CL thresholds in Delta(-2logL) for two fitted parameters.
pub const CL68: f64 = 2.30;
pub const CL95: f64 = 5.99;
pub const CL997: f64 = 11.83;

/// Band colors: 68% red, 95% orange, 99.7% yellow.
pub const BAND_COLORS: [RGBColor; 3] = [
    RGBColor(255, 51, 0),
    RGBColor(255, 165, 0),
    RGBColor(255, 255, 0),
];

fn perr(e: impl std::fmt::Display) -> FitError {
    FitError::Plot(e.to_string())
}

/// Overlay curve: officially-published contour points.
#[derive(Clone, Debug)]
pub struct Overlay {
    pub points: Vec<(f64, f64)>,
    pub label: String,
}

/// Read one-point-per-line overlay files; comma, tab or space separated.
pub fn read_overlay_points(path: impl AsRef<Path>) -> Result<Vec<(f64, f64)>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| FitError::io(path, e))?;
    let mut points = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = if line.contains(',') {
            line.split(',').collect()
        } else if line.contains('\t') {
            line.split('\t').collect()
        } else {
            line.split_whitespace().collect()
        };
        if fields.len() < 2 {
            return Err(FitError::Overlay {
                path: path.to_path_buf(),
                reason: format!("line {}: expected two columns", lineno + 1),
            });
        }
        let parse = |tok: &str| {
            tok.trim().parse::<f64>().map_err(|_| FitError::Overlay {
                path: path.to_path_buf(),
                reason: format!("line {}: bad value {tok:?}", lineno + 1),
            })
        };
        points.push((parse(fields[0])?, parse(fields[1])?));
    }
    Ok(points)
}

/// Scan points carried into a plot: (x, y, Delta(-2logL)).
pub struct GridValues {
    pub x_axis: GridAxis,
    pub y_axis: GridAxis,
    pub points: Vec<(f64, f64, f64)>,
}

impl GridValues {
    /// Build from table rows, subtracting the finite minimum of `z_col`.
    pub fn from_rows(x_axis: GridAxis, y_axis: GridAxis, rows: &[Vec<f64>], z_col: usize) -> Self {
        let zmin = rows
            .iter()
            .map(|r| r[z_col])
            .filter(|z| z.is_finite())
            .fold(f64::INFINITY, f64::min);
        let points = rows
            .iter()
            .map(|r| (r[0], r[1], r[z_col] - zmin))
            .collect();
        Self {
            x_axis,
            y_axis,
            points,
        }
    }
}

/// Configuration of a CL-band plot.
pub struct BandPlot<'a> {
    pub caption: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Number of bands to fill (2 or 3).
    pub bands: usize,
    pub best_fit: Option<(f64, f64)>,
    /// The SM point marker.
    pub sm_marker: Option<(f64, f64)>,
    pub overlays: Vec<Overlay>,
    /// The official best fit, drawn as a small filled dot.
    pub official_best: Option<(f64, f64)>,
}

/// Render filled CL bands over the scan grid.
pub fn cl_band_plot(out_path: &Path, grid: &GridValues, cfg: &BandPlot<'_>) -> Result<()> {
    let root = BitMapBackend::new(out_path, (900, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(perr)?;

    let (xa, ya) = (&grid.x_axis, &grid.y_axis);
    let mut chart = ChartBuilder::on(&root)
        .caption(cfg.caption, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(xa.min..xa.max, ya.min..ya.max)
        .map_err(perr)?;

    chart
        .configure_mesh()
        .x_desc(cfg.x_label)
        .y_desc(cfg.y_label)
        .x_labels(8)
        .y_labels(8)
        .axis_desc_style(("sans-serif", 20))
        .draw()
        .map_err(perr)?;

    // Filled cells, outermost band first so tighter bands paint on top.
    let hx = 0.5 * xa.span() / (xa.n - 1) as f64;
    let hy = 0.5 * ya.span() / (ya.n - 1) as f64;
    let thresholds = [CL68, CL95, CL997];
    let bands = cfg.bands.min(3);
    for band in (0..bands).rev() {
        let cells = grid.points.iter().filter(|&&(_, _, d)| {
            d.is_finite() && d < thresholds[band] && (band == 0 || d >= thresholds[band - 1])
        });
        chart
            .draw_series(cells.map(|&(x, y, _)| {
                Rectangle::new([(x - hx, y - hy), (x + hx, y + hy)], BAND_COLORS[band].filled())
            }))
            .map_err(perr)?;
    }

    for overlay in &cfg.overlays {
        chart
            .draw_series(
                overlay
                    .points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 2, BLUE.filled())),
            )
            .map_err(perr)?
            .label(overlay.label.clone())
            .legend(|(x, y)| Circle::new((x + 10, y), 2, BLUE.filled()));
    }
    if let Some((x, y)) = cfg.official_best {
        chart
            .draw_series(std::iter::once(Circle::new((x, y), 3, BLUE.filled())))
            .map_err(perr)?;
    }
    if let Some((x, y)) = cfg.best_fit {
        chart
            .draw_series(std::iter::once(Circle::new(
                (x, y),
                5,
                WHITE.filled().stroke_width(1),
            )))
            .map_err(perr)?
            .label("best fit")
            .legend(|(x, y)| Circle::new((x + 10, y), 4, BLACK.stroke_width(1)));
    }
    if let Some((x, y)) = cfg.sm_marker {
        chart
            .draw_series(std::iter::once(Cross::new((x, y), 6, BLACK.stroke_width(2))))
            .map_err(perr)?
            .label("SM")
            .legend(|(x, y)| Cross::new((x + 10, y), 5, BLACK.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(perr)?;

    root.present().map_err(perr)?;
    Ok(())
}

/// Jet colormap, reversed: small values red, large values blue.
fn jet_r(t: f64) -> RGBColor {
    let t = 1.0 - t.clamp(0.0, 1.0);
    let chan = |x: f64| (255.0 * (1.5 - x.abs()).clamp(0.0, 1.0)) as u8;
    RGBColor(chan(4.0 * t - 3.0), chan(4.0 * t - 2.0), chan(4.0 * t - 1.0))
}

/// Configuration of a colormap scatter.
pub struct ScatterMap<'a> {
    pub caption: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Colormap saturation value for Delta(-2logL).
    pub vmax: f64,
    pub best_fit: Option<(f64, f64)>,
}

/// Render a Delta(-2logL) colormap scatter with a colorbar.
pub fn scatter_map_plot(out_path: &Path, grid: &GridValues, cfg: &ScatterMap<'_>) -> Result<()> {
    let root = BitMapBackend::new(out_path, (1000, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(perr)?;
    let (main, bar) = root.split_horizontally(880);

    let (xa, ya) = (&grid.x_axis, &grid.y_axis);
    let mut chart = ChartBuilder::on(&main)
        .caption(cfg.caption, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(xa.min..xa.max, ya.min..ya.max)
        .map_err(perr)?;

    chart
        .configure_mesh()
        .x_desc(cfg.x_label)
        .y_desc(cfg.y_label)
        .x_labels(8)
        .y_labels(8)
        .axis_desc_style(("sans-serif", 20))
        .draw()
        .map_err(perr)?;

    let finite = grid.points.iter().filter(|&&(_, _, d)| d.is_finite());
    chart
        .draw_series(
            finite.map(|&(x, y, d)| Circle::new((x, y), 3, jet_r(d / cfg.vmax).filled())),
        )
        .map_err(perr)?;

    if let Some((x, y)) = cfg.best_fit {
        chart
            .draw_series(std::iter::once(Cross::new((x, y), 7, BLACK.stroke_width(2))))
            .map_err(perr)?
            .label("best fit")
            .legend(|(x, y)| Cross::new((x + 10, y), 5, BLACK.stroke_width(2)));
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(perr)?;
    }

    // Colorbar: gradient strip with its own value axis.
    let mut colorbar = ChartBuilder::on(&bar)
        .margin(15)
        .margin_left(0)
        .y_label_area_size(40)
        .set_label_area_size(LabelAreaPosition::Right, 40)
        .build_cartesian_2d(0.0..1.0, 0.0..cfg.vmax)
        .map_err(perr)?;
    colorbar
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_desc("Delta(-2logL)")
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(perr)?;
    const STRIPES: usize = 128;
    colorbar
        .draw_series((0..STRIPES).map(|i| {
            let lo = cfg.vmax * i as f64 / STRIPES as f64;
            let hi = cfg.vmax * (i + 1) as f64 / STRIPES as f64;
            Rectangle::new([(0.0, lo), (1.0, hi)], jet_r(lo / cfg.vmax).filled())
        }))
        .map_err(perr)?;

    root.present().map_err(perr)?;
    Ok(())
}

/// Render the 3-D consistency scatter: allowed points colored, excluded grey.
pub fn scatter3d_plot(
    out_path: &Path,
    points: &[(f64, f64, f64, bool)],
    ranges: (GridAxis, GridAxis, GridAxis),
    caption: &str,
) -> Result<()> {
    let root = BitMapBackend::new(out_path, (1000, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(perr)?;

    let (xa, ya, za) = ranges;
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 22))
        .margin(20)
        .build_cartesian_3d(xa.min..xa.max, ya.min..ya.max, za.min..za.max)
        .map_err(perr)?;
    chart.with_projection(|mut pb| {
        pb.yaw = 0.7;
        pb.pitch = 0.3;
        pb.scale = 0.8;
        pb.into_matrix()
    });
    chart.configure_axes().draw().map_err(perr)?;

    chart
        .draw_series(points.iter().filter(|p| p.3).map(|&(x, y, z, _)| {
            Circle::new((x, y, z), 2, RGBColor(31, 119, 180).filled())
        }))
        .map_err(perr)?
        .label("allowed")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, RGBColor(31, 119, 180).filled()));
    chart
        .draw_series(
            points
                .iter()
                .filter(|p| !p.3)
                .map(|&(x, y, z, _)| Circle::new((x, y, z), 1, RGBColor(180, 180, 180).mix(0.4).filled())),
        )
        .map_err(perr)?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(perr)?;

    root.present().map_err(perr)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "higgsfit_plot_test_{}_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos(),
            name
        ));
        p
    }

    #[test]
    fn overlay_reader_accepts_csv_and_tsv() {
        let csv = unique_path("overlay.csv");
        std::fs::write(&csv, "1.0,2.0\n# comment\n1.1,2.1\n").unwrap();
        let pts = read_overlay_points(&csv).unwrap();
        assert_eq!(pts.len(), 2);
        assert!((pts[1].0 - 1.1).abs() < 1e-12);
        let _ = std::fs::remove_file(&csv);

        let tsv = unique_path("overlay.txt");
        std::fs::write(&tsv, "0.9\t1.4\n1.0\t1.5\n").unwrap();
        let pts = read_overlay_points(&tsv).unwrap();
        assert_eq!(pts[1], (1.0, 1.5));
        let _ = std::fs::remove_file(&tsv);
    }

    #[test]
    fn overlay_reader_rejects_short_lines() {
        let path = unique_path("short.csv");
        std::fs::write(&path, "1.0\n").unwrap();
        assert!(read_overlay_points(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn grid_values_subtract_the_finite_minimum() {
        let rows = vec![
            vec![0.0, 0.0, 12.0],
            vec![0.0, 1.0, f64::NAN],
            vec![1.0, 0.0, 10.0],
        ];
        let grid = GridValues::from_rows(
            GridAxis::new(0.0, 1.0, 2),
            GridAxis::new(0.0, 1.0, 2),
            &rows,
            2,
        );
        assert!((grid.points[0].2 - 2.0).abs() < 1e-12);
        assert!(grid.points[1].2.is_nan());
        assert!(grid.points[2].2.abs() < 1e-12);
    }

    #[test]
    fn jet_r_endpoints() {
        let low = jet_r(0.0);
        let high = jet_r(1.0);
        assert!(low.0 > 200 && low.2 < 60, "low end should be red: {low:?}");
        assert!(high.2 > 120 && high.0 < 60, "high end should be blue: {high:?}");
    }

    #[test]
    fn band_plot_writes_a_png() {
        let path = unique_path("bands.png");
        let xa = GridAxis::new(0.8, 1.2, 5);
        let ya = GridAxis::new(0.6, 1.6, 5);
        let mut points = Vec::new();
        for x in xa.values() {
            for y in ya.values() {
                let d = 30.0 * ((x - 1.0).powi(2) + 0.3 * (y - 1.1).powi(2));
                points.push((x, y, d));
            }
        }
        let grid = GridValues {
            x_axis: xa,
            y_axis: ya,
            points,
        };
        cl_band_plot(
            &path,
            &grid,
            &BandPlot {
                caption: "test bands",
                x_label: "CV",
                y_label: "CF",
                bands: 3,
                best_fit: Some((1.0, 1.1)),
                sm_marker: Some((1.0, 1.0)),
                overlays: Vec::new(),
                official_best: None,
            },
        )
        .unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
