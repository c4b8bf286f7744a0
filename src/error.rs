//! Error type shared by the chart and factor-graph pipelines.
//!
//! Every variant describes why a single dataset or model was skipped. None of them aborts a batch run;
//! the composers collect them into their report instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("unsupported sample shape: {0}")]
    UnsupportedSampleShape(String),

    #[error("degenerate importance weights: {0}")]
    DegenerateWeights(String),

    #[error("malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("invalid graph description: {0}")]
    GraphDescriptionError(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VizError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps any plotters drawing error.
    pub fn render<E: std::fmt::Display>(e: E) -> Self {
        Self::Render(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VizError>;
