//! Draws panels with `plotters` and saves them as PNG files.

use std::fs;
use std::path::PathBuf;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use crate::error::{Result, VizError};
use crate::panel::{ChartSink, Panel, PanelGrid};
use crate::stats::{self, EstimatorResult};

/// Maps `t` in `[0, 1]` onto an approximation of the viridis colormap.
fn viridis(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let r = (0.267 + t * (0.329 - 0.267 + t * (0.984 - 0.329))) * 255.0;
    let g = (0.005 + t * (0.569 - 0.005 + t * (0.906 - 0.569))) * 255.0;
    let b = (0.329 + t * (0.758 - 0.329 - t * (0.758 - 0.121))) * 255.0;
    RGBColor(
        r.clamp(0.0, 255.0) as u8,
        g.clamp(0.0, 255.0) as u8,
        b.clamp(0.0, 255.0) as u8,
    )
}

/// Draws one panel (title, axes, statistic) onto `area`.
pub fn draw_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &Panel) -> Result<()> {
    let (x_desc, y_desc) = panel.result.axis_labels();
    match &panel.result {
        EstimatorResult::Histogram(hist) => draw_histogram(area, &panel.title, hist, x_desc, y_desc),
        EstimatorResult::BooleanHistogram(hist) => {
            draw_bool_histogram(area, &panel.title, hist, x_desc, y_desc)
        }
        EstimatorResult::Histogram2D(hist) => {
            draw_histogram_2d(area, &panel.title, hist, x_desc, y_desc)
        }
        EstimatorResult::Occupancy(occ) => draw_occupancy(area, &panel.title, occ, x_desc, y_desc),
    }
}

fn bar_top(densities: &ndarray::Array1<f64>) -> f64 {
    densities.iter().copied().fold(0.0f64, f64::max).max(1e-6) * 1.1
}

fn draw_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    hist: &stats::Histogram,
    x_desc: &str,
    y_desc: &str,
) -> Result<()> {
    let n = hist.n_bins();
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(hist.edges[0]..hist.edges[n], 0.0..bar_top(&hist.densities))
        .map_err(VizError::render)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(VizError::render)?;

    let bars = hist
        .edges
        .iter()
        .zip(hist.edges.iter().skip(1))
        .zip(hist.densities.iter())
        .map(|((&x0, &x1), &d)| Rectangle::new([(x0, 0.0), (x1, d)], BLUE.mix(0.6).filled()));
    chart.draw_series(bars).map_err(VizError::render)?;
    Ok(())
}

fn draw_bool_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    hist: &stats::Histogram,
    x_desc: &str,
    y_desc: &str,
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..2u32).into_segmented(), 0.0..bar_top(&hist.densities))
        .map_err(VizError::render)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(0) => "false".to_string(),
            SegmentValue::CenterOf(1) => "true".to_string(),
            _ => String::new(),
        })
        .draw()
        .map_err(VizError::render)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.6).filled())
                .margin(0)
                .data(hist.densities.iter().enumerate().map(|(i, &d)| (i as u32, d))),
        )
        .map_err(VizError::render)?;
    Ok(())
}

fn draw_histogram_2d<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    hist: &stats::Histogram2D,
    x_desc: &str,
    y_desc: &str,
) -> Result<()> {
    let nx = hist.x_edges.len() - 1;
    let ny = hist.y_edges.len() - 1;
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(
            hist.x_edges[0]..hist.x_edges[nx],
            hist.y_edges[0]..hist.y_edges[ny],
        )
        .map_err(VizError::render)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(VizError::render)?;

    // Color scale runs from zero to the fullest cell.
    let peak = hist.mass.iter().copied().fold(0.0f64, f64::max);
    let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
    let cells = hist.mass.indexed_iter().map(|((i, j), &m)| {
        Rectangle::new(
            [
                (hist.x_edges[i], hist.y_edges[j]),
                (hist.x_edges[i + 1], hist.y_edges[j + 1]),
            ],
            viridis(m * scale).filled(),
        )
    });
    chart.draw_series(cells).map_err(VizError::render)?;
    Ok(())
}

fn draw_occupancy<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    occ: &stats::OccupancyMatrix,
    x_desc: &str,
    y_desc: &str,
) -> Result<()> {
    let (n_states, n_iter) = (occ.n_states(), occ.n_iterations());
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..n_iter, 0..n_states)
        .map_err(VizError::render)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .y_labels(n_states + 1)
        .draw()
        .map_err(VizError::render)?;

    // Fixed 0..1 intensity scale so panels are comparable.
    let cells = occ.occupancy.indexed_iter().map(|((s, t), &p)| {
        Rectangle::new([(t, s), (t + 1, s + 1)], viridis(p).filled())
    });
    chart.draw_series(cells).map_err(VizError::render)?;
    Ok(())
}

/// Writes `<dir>/<stem>.png` for every panel and the grid.
#[derive(Debug, Clone)]
pub struct BitmapChartSink {
    dir: PathBuf,
    panel_size: (u32, u32),
    cell_size: u32,
    export_csv: bool,
}

impl BitmapChartSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            panel_size: (640, 480),
            cell_size: 400,
            export_csv: false,
        }
    }

    pub fn panel_size(mut self, width: u32, height: u32) -> Self {
        self.panel_size = (width, height);
        self
    }

    /// Edge length of one square cell of the grid figure.
    pub fn cell_size(mut self, size: u32) -> Self {
        self.cell_size = size;
        self
    }

    /// Also write each panel's statistic as `<stem>.csv` (needs the `csv` feature).
    pub fn export_csv(mut self, enabled: bool) -> Self {
        self.export_csv = enabled;
        self
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.png"))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| VizError::io(&self.dir, e))
    }

    #[cfg(feature = "csv")]
    fn write_csv(&self, stem: &str, panel: &Panel) -> Result<()> {
        if self.export_csv {
            let path = self.dir.join(format!("{stem}.csv"));
            crate::io::csv::save_estimate_csv(&panel.result, &path)?;
        }
        Ok(())
    }

    #[cfg(not(feature = "csv"))]
    fn write_csv(&self, _stem: &str, _panel: &Panel) -> Result<()> {
        if self.export_csv {
            tracing::warn!("CSV export requested but the `csv` feature is disabled");
        }
        Ok(())
    }
}

impl ChartSink for BitmapChartSink {
    fn save_panel(&mut self, stem: &str, panel: &Panel) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path_for(stem);
        {
            let root = BitMapBackend::new(&path, self.panel_size).into_drawing_area();
            root.fill(&WHITE).map_err(VizError::render)?;
            draw_panel(&root, panel)?;
            root.present().map_err(VizError::render)?;
        }
        debug!("Saved {}", path.display());
        self.write_csv(stem, panel)
    }

    fn save_grid(&mut self, name: &str, grid: &PanelGrid) -> Result<()> {
        self.ensure_dir()?;
        let side = grid.layout().side();
        let path = self.path_for(name);
        let edge = self.cell_size * side as u32;
        let root = BitMapBackend::new(&path, (edge, edge)).into_drawing_area();
        root.fill(&WHITE).map_err(VizError::render)?;

        let areas = root.split_evenly((side, side));
        for (area, cell) in areas.iter().zip(grid.cells()) {
            if let Some(panel) = cell {
                draw_panel(area, panel)?;
            }
        }
        root.present().map_err(VizError::render)?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(viridis(0.0), RGBColor(68, 1, 83));
        assert_eq!(viridis(-3.0), viridis(0.0));
        assert_eq!(viridis(f64::NAN), viridis(0.0));
        let top = viridis(1.0);
        assert!(top.0 > 200 && top.1 > 200, "{top:?}");
    }

    #[test]
    fn test_paths_use_stem() {
        let sink = BitmapChartSink::new("charts");
        assert_eq!(sink.path_for("hmm"), Path::new("charts/hmm.png"));
        assert_eq!(sink.path_for("all"), Path::new("charts/all.png"));
        assert_eq!(sink.path_for("a.run1"), Path::new("charts/a.run1.png"));
    }
}
