use std::error::Error;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use super::{least_squares, ChartKind, Figure, Series, XAxis};
use crate::config::RenderConfig;
use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Off-screen PNG rendering
// ---------------------------------------------------------------------------

const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;

/// The bundled font, registered once per process so rendering never depends
/// on what the host has installed.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok {
        Ok(())
    } else {
        Err(ReportError::Render("bundled font could not be loaded".into()))
    }
}

/// Render `figure` to a PNG at `path`.
///
/// A table with nothing to plot still produces an image: the title over a
/// "no data" notice.
pub fn save_png(figure: &Figure, path: &Path, config: &RenderConfig) -> Result<()> {
    ensure_font()?;
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    draw(figure, &root)
        .and_then(|_| root.present().map_err(Into::into))
        .map_err(|e| ReportError::Render(format!("{}: {e}", path.display())))
}

fn draw(figure: &Figure, root: &Area<'_>) -> DrawResult<()> {
    root.fill(&WHITE)?;
    let area = root.titled(&figure.spec.title, (FONT_FAMILY, 28).into_font())?;

    let series = figure.series();
    if series.iter().all(|s| s.points.is_empty()) {
        let (w, h) = area.dim_in_pixel();
        area.draw(&Text::new(
            "no data",
            (w as i32 / 2 - 30, h as i32 / 2),
            (FONT_FAMILY, 20).into_font(),
        ))?;
        return Ok(());
    }

    let axis = figure.x_axis();
    match figure.spec.kind {
        ChartKind::Regression => draw_regression(figure, &area, &axis, &series),
        ChartKind::Bar => draw_bars(figure, &area, &axis, &series),
    }
}

/// One panel per hue: the means as points and their least-squares line.
fn draw_regression(
    figure: &Figure,
    area: &Area<'_>,
    axis: &XAxis,
    series: &[Series],
) -> DrawResult<()> {
    let x_range = x_bounds(axis, series);
    let y_range = padded(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)), false);
    let panels = area.split_evenly((1, series.len()));
    let label_x = |x: &f64| format_x(axis, *x);

    for (panel, s) in panels.iter().zip(series) {
        let color = rgb(s.color);
        let mut builder = ChartBuilder::on(panel);
        builder
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(56);
        if let (Some(hue), Some(label)) = (&figure.spec.hue, &s.label) {
            builder.caption(format!("{hue} = {label}"), (FONT_FAMILY, 18).into_font());
        }
        let mut chart = builder.build_cartesian_2d(x_range.clone(), y_range.clone())?;

        {
            let mut mesh = chart.configure_mesh();
            mesh.x_desc(figure.spec.x.as_str())
                .y_desc(figure.spec.y.as_str());
            if let XAxis::Categorical(labels) = axis {
                mesh.x_labels(labels.len());
            }
            mesh.x_label_formatter(&label_x).draw()?;
        }

        chart.draw_series(
            s.points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
        )?;
        if let Some((slope, intercept)) = least_squares(&s.points) {
            let ends = [x_range.start, x_range.end].map(|x| (x, slope * x + intercept));
            chart.draw_series(LineSeries::new(ends, color.stroke_width(2)))?;
        }
    }
    Ok(())
}

/// Grouped bars: one slot per category, one bar per hue inside the slot.
fn draw_bars(figure: &Figure, area: &Area<'_>, axis: &XAxis, series: &[Series]) -> DrawResult<()> {
    let x_range = x_bounds(axis, series);
    let y_range = padded(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)), true);
    let categories = match axis {
        XAxis::Categorical(labels) => labels.len(),
        XAxis::Numeric => 0,
    };

    let label_x = |x: &f64| format_x(axis, *x);

    let mut chart = ChartBuilder::on(area)
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(figure.spec.x.as_str())
        .y_desc(figure.spec.y.as_str())
        .x_labels(categories.max(1))
        .x_label_formatter(&label_x)
        .draw()?;

    let width = 0.8 / series.len() as f64;
    for (j, s) in series.iter().enumerate() {
        let offset = -0.4 + j as f64 * width;
        // Without a hue every bar gets its own colour.
        let single = series.len() == 1 && s.label.is_none();
        let palette = figure.spec.palette;
        let anno = chart.draw_series(s.points.iter().map(|&(x, y)| {
            let color = if single {
                rgb(palette.color(x as usize, categories))
            } else {
                rgb(s.color)
            };
            Rectangle::new([(x + offset, 0.0), (x + offset + width, y)], color.filled())
        }))?;
        if let Some(label) = &s.label {
            let color = rgb(s.color);
            anno.label(label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }

    if series.iter().any(|s| s.label.is_some()) {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }
    Ok(())
}

fn rgb([r, g, b]: [u8; 3]) -> RGBColor {
    RGBColor(r, g, b)
}

fn x_bounds(axis: &XAxis, series: &[Series]) -> Range<f64> {
    match axis {
        XAxis::Categorical(labels) => -0.5..(labels.len() as f64 - 0.5),
        XAxis::Numeric => padded(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)), false),
    }
}

/// Data range with 5% headroom; bars always include zero.
fn padded(values: impl Iterator<Item = f64>, from_zero: bool) -> Range<f64> {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if from_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    let lo = if from_zero && lo == 0.0 { 0.0 } else { lo - pad };
    lo..(hi + pad)
}

fn format_x(axis: &XAxis, x: f64) -> String {
    match axis {
        XAxis::Numeric => {
            if x.fract().abs() < 1e-9 {
                format!("{x:.0}")
            } else {
                format!("{x:.1}")
            }
        }
        XAxis::Categorical(labels) => {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels
                .get(idx as usize)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }
    }
}
