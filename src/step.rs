//! The report step contract and the generic step every bundled report uses.
//!
//! A step answers one or more questions over the shared dataset. Each
//! question runs the same sequence:
//!
//! ```text
//!  filter ─► aggregate ─► chart ─► img/<name>.png ─► tab/<name>.csv ─► tab/<name>.md (best effort)
//!                                      │
//!                                      ├─► show: present and block, figure stays open for the runner
//!                                      └─► otherwise: figure released immediately
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::chart::render;
use crate::chart::window::{Presenter, WindowPresenter};
use crate::chart::{ChartHandle, ChartSpec, ChartStyle, FigureManager};
use crate::config::RenderConfig;
use crate::data::aggregate::AggregationSpec;
use crate::data::filter::{Binning, RowFilter};
use crate::data::model::Dataset;
use crate::error::{ReportError, Result};
use crate::export::{self, OutputLayout, TableExporter};
use crate::launch;

// ---------------------------------------------------------------------------
// Invocation context
// ---------------------------------------------------------------------------

/// Presentation flags forwarded to every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOptions {
    /// Present each chart and block until it is dismissed.
    pub show: bool,
    /// Also hand each saved image to the system viewer (best effort).
    pub open_after: bool,
}

/// Collaborators shared by all steps of a run: where files go, the open
/// figures, and how charts are rendered, exported and presented.
pub struct Session {
    layout: OutputLayout,
    figures: FigureManager,
    render: RenderConfig,
    text_exporter: Box<dyn TableExporter>,
    presenter: Box<dyn Presenter>,
    launcher: fn(&Path) -> bool,
}

impl Session {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        let render = RenderConfig::default();
        Self {
            layout: OutputLayout::new(output_root),
            figures: FigureManager::new(),
            text_exporter: export::exporter_for(render.text_table),
            render,
            presenter: Box::new(WindowPresenter),
            launcher: launch::open_in_viewer,
        }
    }

    /// Use `render`, including its secondary table format.
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.text_exporter = export::exporter_for(render.text_table);
        self.render = render;
        self
    }

    pub fn with_text_exporter(mut self, exporter: Box<dyn TableExporter>) -> Self {
        self.text_exporter = exporter;
        self
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_launcher(mut self, launcher: fn(&Path) -> bool) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn figures(&self) -> &FigureManager {
        &self.figures
    }

    pub fn figures_mut(&mut self) -> &mut FigureManager {
        &mut self.figures
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Files and chart produced for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub chart: ChartHandle,
    pub image: PathBuf,
    pub table_csv: PathBuf,
    /// `None` when the secondary export failed.
    pub table_text: Option<PathBuf>,
}

impl Artifact {
    /// Labelled paths that exist, in output order.
    pub fn paths(&self) -> Vec<(&'static str, &Path)> {
        let mut out = vec![
            ("image", self.image.as_path()),
            ("table_csv", self.table_csv.as_path()),
        ];
        if let Some(text) = &self.table_text {
            out.push(("table_text", text.as_path()));
        }
        out
    }
}

/// What one step invocation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub step: String,
    pub artifacts: Vec<Artifact>,
}

impl Manifest {
    pub fn new(step: &str) -> Self {
        Self {
            step: step.to_string(),
            artifacts: Vec::new(),
        }
    }

    pub fn charts(&self) -> Vec<&ChartHandle> {
        self.artifacts.iter().map(|a| &a.chart).collect()
    }

    /// Image and table files written.
    pub fn file_count(&self) -> usize {
        self.artifacts.iter().map(|a| a.paths().len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Step contract
// ---------------------------------------------------------------------------

pub trait Step {
    /// Stable, user-facing name.
    fn name(&self) -> &str;

    /// Base names of every artifact the step writes; must be unique across a
    /// registry.
    fn artifact_names(&self) -> Vec<String>;

    fn run(&self, dataset: &Dataset, session: &mut Session, options: StepOptions)
        -> Result<Manifest>;
}

/// One analytical question: a group-by-mean and how to chart it.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub artifact: String,
    pub aggregation: AggregationSpec,
    pub style: ChartStyle,
}

/// The generic report step: optional derived column, a row filter, then one
/// artifact set per question.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStep {
    name: String,
    filter: RowFilter,
    binning: Option<Binning>,
    questions: Vec<Question>,
}

impl ReportStep {
    pub fn new(name: &str, filter: RowFilter) -> Self {
        Self {
            name: name.to_string(),
            filter,
            binning: None,
            questions: Vec::new(),
        }
    }

    /// Derive a binned column on a private copy before filtering.
    pub fn with_binning(mut self, binning: Binning) -> Self {
        self.binning = Some(binning);
        self
    }

    pub fn question(mut self, artifact: &str, aggregation: AggregationSpec, style: ChartStyle) -> Self {
        self.questions.push(Question {
            artifact: artifact.to_string(),
            aggregation,
            style,
        });
        self
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Columns the input dataset must provide. A binned column is produced by
    /// the step itself, so its source is required instead.
    pub fn required_columns(&self) -> Vec<&str> {
        let derived = self.binning.as_ref().map(|b| b.target.as_str());
        let mut cols: BTreeSet<&str> = BTreeSet::new();
        cols.extend(self.binning.as_ref().map(|b| b.source.as_str()));
        cols.extend(self.filter.columns().into_iter().filter(|c| Some(*c) != derived));
        for q in &self.questions {
            cols.extend(q.aggregation.columns().into_iter().filter(|c| Some(*c) != derived));
        }
        cols.into_iter().collect()
    }

    fn answer(
        &self,
        question: &Question,
        data: &Dataset,
        rows: &[usize],
        session: &mut Session,
        options: StepOptions,
    ) -> Result<Artifact> {
        let table = question.aggregation.apply(data, rows)?;
        let spec = ChartSpec::bind(&question.artifact, question.style, &table);
        let chart = session.figures.create(spec, table);

        let (image, table_csv, table_text) = match persist(session, &chart, &question.artifact) {
            Ok(paths) => paths,
            Err(e) => {
                session.figures.close(&chart);
                return Err(e);
            }
        };

        if options.show {
            // Stays open after the window closes; the runner releases it.
            if let Some(figure) = session.figures.get(&chart) {
                session.presenter.present(figure, &image)?;
            }
        } else {
            session.figures.close(&chart);
        }

        if options.open_after && !(session.launcher)(&image) {
            log::debug!("{}: no viewer for {}", question.artifact, image.display());
        }

        Ok(Artifact {
            name: question.artifact.clone(),
            chart,
            image,
            table_csv,
            table_text,
        })
    }
}

/// Write the image, the CSV and (best effort) the text table for an open
/// figure.
fn persist(
    session: &Session,
    chart: &ChartHandle,
    artifact: &str,
) -> Result<(PathBuf, PathBuf, Option<PathBuf>)> {
    let figure = session
        .figures
        .get(chart)
        .ok_or_else(|| ReportError::Render(format!("figure for {artifact} is no longer open")))?;

    let image = session.layout.image_path(artifact);
    render::save_png(figure, &image, &session.render)?;

    let table_csv = session.layout.csv_path(artifact);
    figure.table.write_csv(&table_csv)?;

    let table_text = export::export_text(
        session.text_exporter.as_ref(),
        &figure.table,
        &session.layout,
        artifact,
    );
    Ok((image, table_csv, table_text))
}

impl Step for ReportStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn artifact_names(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.artifact.clone()).collect()
    }

    fn run(
        &self,
        dataset: &Dataset,
        session: &mut Session,
        options: StepOptions,
    ) -> Result<Manifest> {
        session.layout.ensure_dirs()?;
        dataset.require_columns(&self.required_columns())?;

        let derived;
        let data = match &self.binning {
            Some(binning) => {
                derived = binning.apply(dataset)?;
                &derived
            }
            None => dataset,
        };

        let rows = self.filter.apply(data)?;
        log::debug!(
            "{}: {} of {} rows pass the filter",
            self.name,
            rows.len(),
            data.len()
        );

        let mut manifest = Manifest::new(&self.name);
        for question in &self.questions {
            let artifact = self.answer(question, data, &rows, session, options)?;
            manifest.artifacts.push(artifact);
        }
        Ok(manifest)
    }
}
