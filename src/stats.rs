//! Weighted empirical-distribution estimators, one per [`SampleKind`](crate::classify::SampleKind).
//!
//! All estimators take weights that are already normalized (see
//! [`normalize_log_weights`](crate::weights::normalize_log_weights)).

use ndarray::prelude::*;
use ndarray_stats::errors::MinMaxError;
use ndarray_stats::QuantileExt;

use crate::classify::TypedSamples;
use crate::error::{Result, VizError};

/// Number of bins of the scalar histogram.
pub const SCALAR_BINS: usize = 45;
/// Number of bins per axis of the pair histogram.
pub const PAIR_BINS: usize = 50;
/// Fixed domain of both pair components, shared by every dataset so panels line up.
pub const PAIR_RANGE: (f64, f64) = (-5.0, 5.0);
/// Largest number of distinct states an occupancy matrix may have.
pub const MAX_STATES: usize = 1024;

/// Bin edges and the weighted density of each bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Array1<f64>,     // n_bins + 1
    pub densities: Array1<f64>, // n_bins
}

impl Histogram {
    pub fn n_bins(&self) -> usize {
        self.densities.len()
    }

    pub fn widths(&self) -> Array1<f64> {
        &self.edges.slice(s![1..]) - &self.edges.slice(s![..-1])
    }

    /// Area under the bars; one for any histogram built from normalized weights.
    pub fn total_mass(&self) -> f64 {
        (&self.densities * &self.widths()).sum()
    }
}

/// Weighted mass on a regular 2-D grid; `mass[[i, j]]` covers `x_edges[i]..x_edges[i + 1]` and
/// `y_edges[j]..y_edges[j + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    pub x_edges: Array1<f64>,
    pub y_edges: Array1<f64>,
    pub mass: Array2<f64>,
}

impl Histogram2D {
    /// Mass divided by cell area and by the mass that fell inside the domain.
    pub fn density(&self) -> Array2<f64> {
        let inside = self.mass.sum();
        if inside <= 0.0 {
            return Array2::zeros(self.mass.raw_dim());
        }
        let dx = self.x_edges[1] - self.x_edges[0];
        let dy = self.y_edges[1] - self.y_edges[0];
        &self.mass / (inside * dx * dy)
    }
}

/// Weighted share of samples in each state at each iteration, shape `[n_states, n_iterations]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyMatrix {
    pub occupancy: Array2<f64>,
}

impl OccupancyMatrix {
    pub fn n_states(&self) -> usize {
        self.occupancy.nrows()
    }

    pub fn n_iterations(&self) -> usize {
        self.occupancy.ncols()
    }
}

/// The statistic of one dataset, ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorResult {
    Histogram(Histogram),
    /// Two unit-width bins: `false` on `[0, 1)`, `true` on `[1, 2]`.
    BooleanHistogram(Histogram),
    Histogram2D(Histogram2D),
    Occupancy(OccupancyMatrix),
}

impl EstimatorResult {
    /// `(x, y)` axis descriptions.
    pub fn axis_labels(&self) -> (&'static str, &'static str) {
        match self {
            EstimatorResult::Histogram(_) | EstimatorResult::BooleanHistogram(_) => {
                ("Value", "Mass")
            }
            EstimatorResult::Histogram2D(_) => ("x1", "x2"),
            EstimatorResult::Occupancy(_) => ("iteration", "state"),
        }
    }
}

/// Runs the estimator matching the shape of `samples`.
pub fn estimate(samples: &TypedSamples, weights: ArrayView1<f64>) -> Result<EstimatorResult> {
    let n = match samples {
        TypedSamples::Scalars(v) => v.len(),
        TypedSamples::Booleans(v) => v.len(),
        TypedSamples::Pairs(v) => v.nrows(),
        TypedSamples::States(v) => v.nrows(),
    };
    if n != weights.len() {
        return Err(VizError::MalformedDataset(format!(
            "{} weights for {} samples",
            weights.len(),
            n
        )));
    }

    let result = match samples {
        TypedSamples::Scalars(values) => {
            EstimatorResult::Histogram(weighted_histogram(values.view(), weights, SCALAR_BINS)?)
        }
        TypedSamples::Booleans(values) => {
            EstimatorResult::BooleanHistogram(weighted_bool_histogram(values, weights))
        }
        TypedSamples::Pairs(pairs) => EstimatorResult::Histogram2D(weighted_histogram_2d(
            pairs.view(),
            weights,
            PAIR_BINS,
            [PAIR_RANGE, PAIR_RANGE],
        )),
        TypedSamples::States(states) => {
            EstimatorResult::Occupancy(occupancy_matrix(states.view(), weights)?)
        }
    };
    Ok(result)
}

/// Index of the bin of `x` among `n_bins` equal bins on `[lo, hi]`, the last bin closed on the right.
fn bin_index(x: f64, lo: f64, hi: f64, n_bins: usize) -> Option<usize> {
    if !(lo..=hi).contains(&x) {
        return None;
    }
    let idx = ((x - lo) / (hi - lo) * n_bins as f64) as usize;
    Some(idx.min(n_bins - 1))
}

/// Weighted density histogram with `n_bins` equal bins spanning the data.
///
/// A constant sample gets the range `[x - 0.5, x + 0.5]`.
pub fn weighted_histogram(
    values: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    n_bins: usize,
) -> Result<Histogram> {
    let bad_range =
        |e: MinMaxError| VizError::MalformedDataset(format!("cannot determine histogram range: {e}"));
    let mut lo = *values.min().map_err(bad_range)?;
    let mut hi = *values.max().map_err(bad_range)?;
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(VizError::MalformedDataset(format!(
            "histogram range [{lo}, {hi}] is not finite"
        )));
    }
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    if !(hi - lo).is_finite() {
        return Err(VizError::MalformedDataset(format!(
            "histogram range [{lo}, {hi}] is too wide to bin"
        )));
    }

    let edges = Array1::linspace(lo, hi, n_bins + 1);
    let mut mass = Array1::<f64>::zeros(n_bins);
    for (&x, &w) in values.iter().zip(weights.iter()) {
        if let Some(b) = bin_index(x, lo, hi, n_bins) {
            mass[b] += w;
        }
    }

    let width = (hi - lo) / n_bins as f64;
    let total = mass.sum();
    let densities = if total > 0.0 {
        mass / (total * width)
    } else {
        mass
    };
    Ok(Histogram { edges, densities })
}

/// Weighted two-bin histogram of boolean samples.
pub fn weighted_bool_histogram(values: &[bool], weights: ArrayView1<f64>) -> Histogram {
    let mut mass = Array1::<f64>::zeros(2);
    for (&b, &w) in values.iter().zip(weights.iter()) {
        mass[usize::from(b)] += w;
    }
    let total = mass.sum();
    if total > 0.0 {
        mass /= total;
    }
    Histogram {
        edges: array![0.0, 1.0, 2.0],
        densities: mass,
    }
}

/// Weighted mass of `pairs` (one row per sample) on a `bins × bins` grid over `range`.
///
/// Samples outside the domain are dropped.
pub fn weighted_histogram_2d(
    pairs: ArrayView2<f64>,
    weights: ArrayView1<f64>,
    bins: usize,
    range: [(f64, f64); 2],
) -> Histogram2D {
    let [(x_lo, x_hi), (y_lo, y_hi)] = range;
    let mut mass = Array2::<f64>::zeros((bins, bins));
    for (row, &w) in pairs.axis_iter(Axis(0)).zip(weights.iter()) {
        let cell = (
            bin_index(row[0], x_lo, x_hi, bins),
            bin_index(row[1], y_lo, y_hi, bins),
        );
        if let (Some(i), Some(j)) = cell {
            mass[[i, j]] += w;
        }
    }
    Histogram2D {
        x_edges: Array1::linspace(x_lo, x_hi, bins + 1),
        y_edges: Array1::linspace(y_lo, y_hi, bins + 1),
        mass,
    }
}

/// Weighted state occupancy per iteration.
///
/// `states` has one row per sample and one column per iteration. Entry `[s, t]` of the result is the
/// summed weight of the samples that are in state `s` at iteration `t`, clamped into `[0, 1]`.
///
/// States must be below [`MAX_STATES`].
pub fn occupancy_matrix(
    states: ArrayView2<usize>,
    weights: ArrayView1<f64>,
) -> Result<OccupancyMatrix> {
    let n_states = match states.iter().copied().max() {
        None => 0,
        Some(m) if m < MAX_STATES => m + 1,
        Some(m) => {
            return Err(VizError::MalformedDataset(format!(
                "state {m} exceeds the limit of {MAX_STATES} states"
            )))
        }
    };
    let mut occupancy = Array2::<f64>::zeros((n_states, states.ncols()));
    for (sample, &w) in states.axis_iter(Axis(0)).zip(weights.iter()) {
        for (t, &s) in sample.iter().enumerate() {
            occupancy[[s, t]] += w;
        }
    }
    occupancy.mapv_inplace(|p| p.clamp(0.0, 1.0));
    Ok(OccupancyMatrix { occupancy })
}
