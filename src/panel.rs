/*!
Composes one chart per dataset plus a shared grid figure.

For every dataset, in alphabetical order of its label, the composer runs
classification → weight normalization → estimation and hands the resulting [`Panel`] to a
[`ChartSink`] twice: once on its own, and once placed into the next cell of a [`PanelGrid`]. Cells
are filled row-major (`row = i / side`, `col = i % side`). A dataset that fails at any step is
reported in the [`RenderReport`] and leaves its cell empty; the rest of the batch carries on.

# Examples

```rust
use infer_viz::panel::{compose, RecordingSink};
use infer_viz::source::MemorySource;

let source = MemorySource::new()
    .with("coin", "[true, false, true]")
    .with("height", r#"{"has_weights": false, "data": [1.0, 2.0, 2.0, 3.0]}"#)
    .with("broken", r#"["a", "b"]"#);
let mut sink = RecordingSink::default();

let report = compose(&source, &mut sink)?;
assert_eq!(report.rendered, ["coin", "height"]);
assert_eq!(report.skipped.len(), 1);
assert_eq!(sink.grids[0].1.layout().side(), 2);
# Ok::<(), infer_viz::error::VizError>(())
```
*/

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::classify::{classify, SampleKind};
use crate::error::{Result, VizError};
use crate::grid::GridLayout;
use crate::samples::Dataset;
use crate::source::{DocumentSource, NamedDocument};
use crate::stats::{estimate, EstimatorResult};
use crate::weights::{effective_sample_size, normalize_log_weights};

/// File stem of the shared grid figure.
pub const GRID_NAME: &str = "all";

/// A statistic ready to be drawn, titled with its dataset label.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub kind: SampleKind,
    pub result: EstimatorResult,
}

/// The shared figure: `side × side` cells, each holding at most one panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelGrid {
    layout: GridLayout,
    cells: Vec<Option<Panel>>,
}

impl PanelGrid {
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            cells: vec![None; layout.n_cells()],
        }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Puts `panel` into the cell of the `index`-th dataset.
    pub fn place(&mut self, index: usize, panel: Panel) -> Result<()> {
        let cell = self.cells.get_mut(index).ok_or_else(|| {
            VizError::Render(format!(
                "panel {index} does not fit a {0}x{0} grid",
                self.layout.side()
            ))
        })?;
        *cell = Some(panel);
        Ok(())
    }

    /// Panel at `(row, col)`, if that cell was filled.
    pub fn get(&self, row: usize, col: usize) -> Option<&Panel> {
        if row >= self.layout.side() || col >= self.layout.side() {
            return None;
        }
        self.cells[row * self.layout.side() + col].as_ref()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Option<Panel>] {
        &self.cells
    }
}

/// Persists rendered charts. Each call owns its drawing resources for exactly its own duration.
pub trait ChartSink {
    /// Saves the single-panel chart of one dataset under `stem`.
    fn save_panel(&mut self, stem: &str, panel: &Panel) -> Result<()>;

    /// Saves the combined grid figure under `name`.
    fn save_grid(&mut self, name: &str, grid: &PanelGrid) -> Result<()>;
}

/// A sink that only remembers what it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub panels: Vec<(String, Panel)>,
    pub grids: Vec<(String, PanelGrid)>,
}

impl ChartSink for RecordingSink {
    fn save_panel(&mut self, stem: &str, panel: &Panel) -> Result<()> {
        self.panels.push((stem.to_owned(), panel.clone()));
        Ok(())
    }

    fn save_grid(&mut self, name: &str, grid: &PanelGrid) -> Result<()> {
        self.grids.push((name.to_owned(), grid.clone()));
        Ok(())
    }
}

/// An item that could not be rendered and why.
#[derive(Debug)]
pub struct Skipped {
    pub label: String,
    pub error: VizError,
}

/// Outcome of a batch run. Partial success is the normal case.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub rendered: Vec<String>,
    pub skipped: Vec<Skipped>,
}

impl RenderReport {
    pub(crate) fn skip(&mut self, label: &str, error: VizError) {
        warn!("Skipping {label}: {error}");
        self.skipped.push(Skipped {
            label: label.to_owned(),
            error,
        });
    }
}

/// Classifies, weights and estimates one dataset.
pub fn build_panel(dataset: &Dataset) -> Result<Panel> {
    let kind = classify(&dataset.batch)?;
    let samples = kind.extract(&dataset.batch)?;
    let weights = normalize_log_weights(dataset.log_weights.as_deref(), dataset.batch.len())?;
    if dataset.log_weights.is_some() {
        info!(
            "{}: {} weighted samples, effective sample size {:.1}",
            dataset.label,
            weights.len(),
            effective_sample_size(weights.view())
        );
    }
    debug!("{}: classified as {kind}", dataset.label);
    let result = estimate(&samples, weights.view())?;
    Ok(Panel {
        title: dataset.label.clone(),
        kind,
        result,
    })
}

/// Renders every dataset of `source` into `sink`; see the module docs.
///
/// Only a failure to enumerate the source is returned as an error.
pub fn compose<S, K>(source: &S, sink: &mut K) -> Result<RenderReport>
where
    S: DocumentSource + ?Sized,
    K: ChartSink + ?Sized,
{
    compose_inner(source, sink, None)
}

/// Like [`compose`], with a progress bar over the datasets.
pub fn compose_with_progress<S, K>(source: &S, sink: &mut K) -> Result<RenderReport>
where
    S: DocumentSource + ?Sized,
    K: ChartSink + ?Sized,
{
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map_err(|e| VizError::Render(e.to_string()))?
            .progress_chars("##-"),
    );
    pb.set_prefix("Charts");
    let report = compose_inner(source, sink, Some(&pb))?;
    pb.finish_with_message("Done!");
    Ok(report)
}

fn compose_inner<S, K>(source: &S, sink: &mut K, pb: Option<&ProgressBar>) -> Result<RenderReport>
where
    S: DocumentSource + ?Sized,
    K: ChartSink + ?Sized,
{
    let mut docs = source.documents()?;
    docs.sort_by(|a, b| a.label.cmp(&b.label));

    let layout = GridLayout::for_items(docs.len());
    info!(
        "{} plot(s) on a {}x{} grid.",
        docs.len(),
        layout.side(),
        layout.side()
    );
    if let Some(pb) = pb {
        pb.set_length(docs.len() as u64);
    }

    let mut grid = PanelGrid::new(layout);
    let mut report = RenderReport::default();
    for (i, doc) in docs.into_iter().enumerate() {
        let label = doc.label.clone();
        match render_one(doc, i, sink, &mut grid) {
            Ok(()) => report.rendered.push(label),
            Err(e) => report.skip(&label, e),
        }
        if let Some(pb) = pb {
            pb.inc(1);
        }
    }

    if layout.is_empty() {
        warn!("No datasets found, not saving {GRID_NAME}");
    } else if let Err(e) = sink.save_grid(GRID_NAME, &grid) {
        report.skip(GRID_NAME, e);
    }
    Ok(report)
}

fn render_one<K: ChartSink + ?Sized>(
    doc: NamedDocument,
    index: usize,
    sink: &mut K,
    grid: &mut PanelGrid,
) -> Result<()> {
    info!("{: <10} {}", "Reading", doc.label);
    let raw = doc.read()?;
    let dataset = Dataset::from_json(doc.label, &raw)?;
    info!("{: <10} {}", "Plotting", dataset.label);
    let panel = build_panel(&dataset)?;
    sink.save_panel(&dataset.label, &panel)?;
    grid.place(index, panel)
}
