//! Run settings: input and output directories and chart sizes, read from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VizError};

/// Directories and chart settings for a run, read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizConfig {
    #[serde(default = "VizConfig::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "VizConfig::default_charts_dir")]
    pub charts_dir: PathBuf,
    #[serde(default = "VizConfig::default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "VizConfig::default_rendered_dir")]
    pub rendered_dir: PathBuf,
    #[serde(default = "VizConfig::default_panel_size")]
    pub panel_size: [u32; 2],
    #[serde(default = "VizConfig::default_grid_cell_size")]
    pub grid_cell_size: u32,
    #[serde(default = "VizConfig::default_render_png")]
    pub render_png: bool,
    #[serde(default)]
    pub export_csv: bool,
}

impl VizConfig {
    fn default_data_dir() -> PathBuf {
        "data".into()
    }
    fn default_charts_dir() -> PathBuf {
        "charts".into()
    }
    fn default_models_dir() -> PathBuf {
        "pgms-json".into()
    }
    fn default_rendered_dir() -> PathBuf {
        "pgms-rendered".into()
    }
    fn default_panel_size() -> [u32; 2] {
        [640, 480]
    }
    fn default_grid_cell_size() -> u32 {
        400
    }
    fn default_render_png() -> bool {
        true
    }

    /// Reads `path`, falling back to the defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| VizError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
            .map_err(|e| VizError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VizError::Config(e.to_string()))
    }
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            charts_dir: Self::default_charts_dir(),
            models_dir: Self::default_models_dir(),
            rendered_dir: Self::default_rendered_dir(),
            panel_size: Self::default_panel_size(),
            grid_cell_size: Self::default_grid_cell_size(),
            render_png: Self::default_render_png(),
            export_csv: false,
        }
    }
}
