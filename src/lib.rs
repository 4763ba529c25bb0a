//! Reproducible fitness and health reports.
//!
//! A run loads one dataset, resolves a selection of named report steps and
//! runs them in order. Every step filters rows, aggregates a metric by one or
//! two keys, renders a chart and exports the aggregated table:
//!
//! ```text
//!  load_file ──► Dataset ──► Runner ──► Step (filter → aggregate → chart → export)
//!                              │                       │
//!                              │                       ▼
//!                              │                   Manifest ──► stdout, manifest.json
//!                              ▼
//!                     FigureManager::close_all after every step
//! ```

pub mod catalog;
pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod launch;
pub mod registry;
pub mod runner;
pub mod step;

pub use config::{Catalog, RenderConfig, RunConfig, TextTableFormat};
pub use error::{ReportError, Result};
pub use registry::StepRegistry;
pub use runner::{run_pipeline, RunReport, Runner};
pub use step::{Manifest, ReportStep, Session, Step, StepOptions};
