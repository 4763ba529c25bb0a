use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Rendering / export settings
// ---------------------------------------------------------------------------

/// Format of the secondary, best-effort table export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTableFormat {
    /// Pipe table, `.md`.
    #[default]
    Markdown,
    /// Boxed plain-text table, `.txt`.
    Ascii,
}

/// How artifacts look. Every field has a default so a JSON file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    pub text_table: TextTableFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            text_table: TextTableFormat::Markdown,
        }
    }
}

impl RenderConfig {
    /// Load from a JSON file such as `{"width": 1600, "text_table": "ascii"}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        let config: RenderConfig = serde_json::from_str(&text)?;
        if config.width == 0 || config.height == 0 {
            return Err(ReportError::Render(format!(
                "image size must be non-zero, got {}x{}",
                config.width, config.height
            )));
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Whole-run settings
// ---------------------------------------------------------------------------

/// Which bundled step set a run draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    /// Gym session dataset (age, HRR, workout type, ...).
    #[default]
    Gym,
    /// Health survey dataset (stress, smoking, vo2max, ...).
    Health,
}

/// Everything a report run needs, independent of how it was parsed.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data: PathBuf,
    pub out: PathBuf,
    /// `"all"` or a comma-separated list of step names.
    pub steps: String,
    pub show: bool,
    pub open_after: bool,
    pub catalog: Catalog,
    pub render: RenderConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/set.csv"),
            out: PathBuf::from("out"),
            steps: "all".to_string(),
            show: false,
            open_after: false,
            catalog: Catalog::Gym,
            render: RenderConfig::default(),
        }
    }
}
