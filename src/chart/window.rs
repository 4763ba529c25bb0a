use std::path::{Path, PathBuf};

use eframe::egui::{self, Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

use super::{least_squares, ChartKind, Figure, Series, XAxis};
use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Presenting a chart to the user
// ---------------------------------------------------------------------------

/// Shows a rendered chart and blocks the calling thread until the user
/// dismisses it.
pub trait Presenter {
    fn present(&self, figure: &Figure, image: &Path) -> Result<()>;
}

/// Native window: an interactive plot of the figure plus a tab with the PNG
/// exactly as it was saved.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowPresenter;

impl Presenter for WindowPresenter {
    fn present(&self, figure: &Figure, image: &Path) -> Result<()> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1100.0, 760.0])
                .with_min_inner_size([480.0, 320.0]),
            ..Default::default()
        };
        let app = ChartWindow::new(figure.clone(), image);

        eframe::run_native(
            &figure.spec.title,
            options,
            Box::new(move |cc| {
                // Install image loaders so the saved PNG can be shown.
                egui_extras::install_image_loaders(&cc.egui_ctx);
                Ok(Box::new(app))
            }),
        )
        .map_err(|e| ReportError::Window(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Interactive,
    Saved,
}

struct ChartWindow {
    figure: Figure,
    series: Vec<Series>,
    axis: XAxis,
    image_uri: String,
    tab: Tab,
}

impl ChartWindow {
    fn new(figure: Figure, image: &Path) -> Self {
        let absolute: PathBuf = std::fs::canonicalize(image).unwrap_or_else(|_| image.to_path_buf());
        Self {
            series: figure.series(),
            axis: figure.x_axis(),
            figure,
            image_uri: format!("file://{}", absolute.display()),
            tab: Tab::Interactive,
        }
    }

    fn category_name(&self, x: f64) -> Option<String> {
        match &self.axis {
            XAxis::Categorical(labels) => labels.get(x.round() as usize).map(|v| v.to_string()),
            XAxis::Numeric => None,
        }
    }

    fn plot(&self, ui: &mut Ui) {
        if self.series.iter().all(|s| s.points.is_empty()) {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("No data left after filtering");
            });
            return;
        }

        let spec = &self.figure.spec;
        let bar_width = 0.8 / self.series.len() as f64;

        Plot::new("chart_plot")
            .legend(Legend::default())
            .x_axis_label(spec.x.as_str())
            .y_axis_label(spec.y.as_str())
            .allow_boxed_zoom(true)
            .allow_drag(true)
            .allow_scroll(true)
            .allow_zoom(true)
            .show(ui, |plot_ui| {
                for (j, s) in self.series.iter().enumerate() {
                    let [r, g, b] = s.color;
                    let color = Color32::from_rgb(r, g, b);
                    let name = s.label.clone().unwrap_or_else(|| spec.y.clone());

                    match spec.kind {
                        ChartKind::Regression => {
                            let points: PlotPoints =
                                s.points.iter().map(|&(x, y)| [x, y]).collect();
                            plot_ui.points(Points::new(points).name(&name).color(color).radius(4.0));

                            if let Some((slope, intercept)) = least_squares(&s.points) {
                                let (lo, hi) = s.points.iter().fold(
                                    (f64::INFINITY, f64::NEG_INFINITY),
                                    |(lo, hi), p| (lo.min(p.0), hi.max(p.0)),
                                );
                                let fit: PlotPoints = [lo, hi]
                                    .iter()
                                    .map(|&x| [x, slope * x + intercept])
                                    .collect();
                                plot_ui.line(Line::new(fit).name(&name).color(color).width(2.0));
                            }
                        }
                        ChartKind::Bar => {
                            let offset = -0.4 + bar_width * (j as f64 + 0.5);
                            let bars: Vec<Bar> = s
                                .points
                                .iter()
                                .map(|&(x, y)| {
                                    let bar = Bar::new(x + offset, y).width(bar_width);
                                    match self.category_name(x) {
                                        Some(label) => bar.name(label),
                                        None => bar,
                                    }
                                })
                                .collect();
                            plot_ui.bar_chart(BarChart::new(bars).name(&name).color(color));
                        }
                    }
                }
            });
    }
}

impl eframe::App for ChartWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: title + view switch ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui: &mut Ui| {
                ui.strong(&self.figure.spec.title);
                ui.separator();
                ui.selectable_value(&mut self.tab, Tab::Interactive, "Interactive");
                ui.selectable_value(&mut self.tab, Tab::Saved, "Saved image");
            });
        });

        // ---- Central panel: chart ----
        egui::CentralPanel::default().show(ctx, |ui| match self.tab {
            Tab::Interactive => self.plot(ui),
            Tab::Saved => {
                ui.add(egui::Image::new(self.image_uri.as_str()).shrink_to_fit());
            }
        });
    }
}
