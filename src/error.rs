use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a report run.
///
/// Best-effort work (secondary table export, launching a viewer) never
/// produces one of these; it reports absence through its return type instead.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("unknown step '{name}' (available: {available})")]
    UnknownStep { name: String, available: String },

    #[error("step selection '{0}' names no steps")]
    EmptySelection(String),

    #[error("step '{0}' is registered more than once")]
    DuplicateStep(String),

    #[error("artifact name '{artifact}' is produced by both '{first}' and '{second}'")]
    ArtifactCollision {
        artifact: String,
        first: String,
        second: String,
    },

    #[error("column '{0}' not found in dataset")]
    ColumnNotFound(String),

    #[error("column '{column}' holds non-numeric value '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("malformed table: {0}")]
    MalformedTable(String),

    #[error("invalid binning for '{column}': {reason}")]
    InvalidBinning { column: String, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("chart window failed: {0}")]
    Window(String),

    #[error("failed to load dataset: {0:#}")]
    Dataset(#[from] anyhow::Error),

    #[error("step '{name}' failed: {source}")]
    Step {
        name: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
