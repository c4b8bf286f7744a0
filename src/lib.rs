//! Diagnostic charts for weighted posterior samples and factor-graph renderings of models.

pub mod classify;
pub mod config;
pub mod error;
pub mod factor_graph;
pub mod grid;
pub mod io;
pub mod panel;
pub mod render;
pub mod samples;
pub mod source;
pub mod stats;
pub mod weights;
