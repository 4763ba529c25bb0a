use std::path::{Path, PathBuf};

use arrow::datatypes::DataType;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow::util::pretty::pretty_format_batches;

use crate::config::TextTableFormat;
use crate::data::aggregate::AggregatedTable;
use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Output layout
// ---------------------------------------------------------------------------

/// `{root}/img` for images, `{root}/tab` for tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join("img")
    }

    pub fn table_dir(&self) -> PathBuf {
        self.root.join("tab")
    }

    /// Create both subdirectories. Safe to call repeatedly.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.image_dir(), self.table_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&dir, e))?;
        }
        Ok(())
    }

    pub fn image_path(&self, artifact: &str) -> PathBuf {
        self.image_dir().join(format!("{artifact}.png"))
    }

    pub fn csv_path(&self, artifact: &str) -> PathBuf {
        self.table_dir().join(format!("{artifact}.csv"))
    }

    pub fn text_path(&self, artifact: &str, extension: &str) -> PathBuf {
        self.table_dir().join(format!("{artifact}.{extension}"))
    }
}

// ---------------------------------------------------------------------------
// Secondary text-table exporters
// ---------------------------------------------------------------------------

/// A lightweight text rendering of an aggregated table, written next to the
/// CSV. Failures here never fail a report.
pub trait TableExporter {
    /// File extension without the dot.
    fn extension(&self) -> &str;

    fn export(&self, table: &AggregatedTable, path: &Path) -> Result<()>;
}

/// Pipe table; numeric columns right-aligned.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownExporter;

impl MarkdownExporter {
    pub fn render(table: &AggregatedTable) -> Result<String> {
        let batch = table.to_record_batch()?;
        let options = FormatOptions::default().with_null("");
        let schema = batch.schema();

        let header: Vec<String> = schema.fields().iter().map(|f| escape_cell(f.name())).collect();
        let align: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| match f.data_type() {
                DataType::Int64 | DataType::Float64 => "---:",
                _ => ":---",
            })
            .collect();

        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut out = format!("| {} |\n|{}|\n", header.join(" | "), align.join("|"));
        for row in 0..batch.num_rows() {
            let cells: Vec<String> = formatters
                .iter()
                .map(|f| escape_cell(&f.value(row).to_string()))
                .collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        Ok(out)
    }
}

/// A literal `|` would start a new column.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

impl TableExporter for MarkdownExporter {
    fn extension(&self) -> &str {
        "md"
    }

    fn export(&self, table: &AggregatedTable, path: &Path) -> Result<()> {
        let text = Self::render(table)?;
        std::fs::write(path, text).map_err(|e| ReportError::io(path, e))
    }
}

/// Boxed plain-text table from arrow's pretty printer.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiExporter;

impl TableExporter for AsciiExporter {
    fn extension(&self) -> &str {
        "txt"
    }

    fn export(&self, table: &AggregatedTable, path: &Path) -> Result<()> {
        let batch = table.to_record_batch()?;
        let text = pretty_format_batches(&[batch])?.to_string();
        std::fs::write(path, text + "\n").map_err(|e| ReportError::io(path, e))
    }
}

pub fn exporter_for(format: TextTableFormat) -> Box<dyn TableExporter> {
    match format {
        TextTableFormat::Markdown => Box::new(MarkdownExporter),
        TextTableFormat::Ascii => Box::new(AsciiExporter),
    }
}

/// Write the secondary table, returning its path, or `None` if the exporter
/// failed.
pub fn export_text(
    exporter: &dyn TableExporter,
    table: &AggregatedTable,
    layout: &OutputLayout,
    artifact: &str,
) -> Option<PathBuf> {
    let path = layout.text_path(artifact, exporter.extension());
    match exporter.export(table, &path) {
        Ok(()) => Some(path),
        Err(e) => {
            log::warn!("{artifact}: text table export skipped: {e}");
            None
        }
    }
}
