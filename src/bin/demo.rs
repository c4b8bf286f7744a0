//! Synthesizes one dataset of every supported shape plus a small model, then charts and renders them.
//!
//! Output lands in `<tmp>/infer-viz-demo/{charts,pgms-rendered}`.

use infer_viz::factor_graph::{render_graphs, DotGraphSink};
use infer_viz::panel::{compose_with_progress, RenderReport};
use infer_viz::render::BitmapChartSink;
use infer_viz::source::DirectorySource;

use rand::distributions::{Bernoulli, Distribution};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde_json::{json, Value};
use std::error::Error;
use std::fs;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const N_SAMPLES: usize = 2_000;
const HMM_PATHS: usize = 300;
const HMM_STEPS: usize = 25;
const SEED: u64 = 42;

/// Log-density of `N(mean, sd)` at `x`, up to the normalizing constant.
fn normal_log_kernel(x: f64, mean: f64, sd: f64) -> f64 {
    -0.5 * ((x - mean) / sd).powi(2)
}

/// Prior `N(0, 2)`, likelihood of one observation `y = 1.2` with noise 0.5.
fn weighted_gaussian(rng: &mut SmallRng) -> Result<Value, Box<dyn Error>> {
    let prior = Normal::new(0.0, 2.0)?;
    let data: Vec<Value> = (0..N_SAMPLES)
        .map(|_| {
            let mu = prior.sample(rng);
            json!([mu, normal_log_kernel(1.2, mu, 0.5)])
        })
        .collect();
    Ok(json!({"has_weights": true, "data": data}))
}

/// Coin bias drawn from the prior, flips weighted by three observed heads.
fn weighted_coin(rng: &mut SmallRng) -> Value {
    let data: Vec<Value> = (0..N_SAMPLES)
        .map(|_| {
            let p: f64 = rng.gen_range(0.01..0.99);
            let heads = rng.gen_bool(p);
            json!([heads, 3.0 * p.ln()])
        })
        .collect();
    json!({"has_weights": true, "data": data})
}

fn gaussian_2d(rng: &mut SmallRng) -> Result<Value, Box<dyn Error>> {
    let noise = Normal::new(0.0, 1.0)?;
    let data: Vec<Value> = (0..N_SAMPLES)
        .map(|_| {
            let x1: f64 = noise.sample(rng);
            let x2 = 0.8 * x1 + 0.6 * noise.sample(rng);
            json!([x1, x2])
        })
        .collect();
    Ok(json!(data))
}

/// Two-state chain that switches with probability 0.1 per step.
fn hmm_paths(rng: &mut SmallRng) -> Result<Value, Box<dyn Error>> {
    let switch = Bernoulli::new(0.1)?;
    let paths: Vec<Value> = (0..HMM_PATHS)
        .map(|_| {
            let mut state = usize::from(rng.gen_bool(0.5));
            let path: Vec<usize> = (0..HMM_STEPS)
                .map(|_| {
                    if switch.sample(rng) {
                        state = 1 - state;
                    }
                    state
                })
                .collect();
            json!(path)
        })
        .collect();
    Ok(json!(paths))
}

fn linear_regression_model() -> Value {
    json!([
        {},
        {
            "V": ["slope", "bias", "y1", "y2"],
            "P": {
                "slope": ["sample*", ["normal", 0.0, 10.0]],
                "bias": ["sample*", ["normal", 0.0, 10.0]],
                "y1": ["observe*", ["normal", ["+", ["*", "slope", 1.0], "bias"], 1.0]],
                "y2": ["observe*", ["normal", ["+", ["*", "slope", 2.0], "bias"], 1.0]]
            },
            "A": {"slope": ["y1", "y2"], "bias": ["y1", "y2"]},
            "Y": {"y1": 2.1, "y2": 3.9}
        }
    ])
}

fn write_json(dir: &Path, name: &str, value: &Value) -> Result<(), Box<dyn Error>> {
    fs::write(dir.join(name), serde_json::to_string(value)?)?;
    Ok(())
}

fn summarize(what: &str, report: &RenderReport) {
    println!(
        "{what}: {} rendered, {} skipped",
        report.rendered.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  {}: {}", skipped.label, skipped.error);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let root = std::env::temp_dir().join("infer-viz-demo");
    let data_dir = root.join("data");
    let models_dir = root.join("pgms-json");
    fs::create_dir_all(&data_dir)?;
    fs::create_dir_all(&models_dir)?;

    let mut rng = SmallRng::seed_from_u64(SEED);
    write_json(&data_dir, "1_gaussian.json", &weighted_gaussian(&mut rng)?)?;
    write_json(&data_dir, "2_coin.json", &weighted_coin(&mut rng))?;
    write_json(&data_dir, "3_gaussian2d.json", &gaussian_2d(&mut rng)?)?;
    write_json(&data_dir, "4_hmm.json", &hmm_paths(&mut rng)?)?;
    write_json(&models_dir, "regression.json", &linear_regression_model())?;
    info!("Wrote demo inputs to {}", root.display());

    let mut charts = BitmapChartSink::new(root.join("charts"));
    let report = compose_with_progress(&DirectorySource::new(&data_dir), &mut charts)?;
    summarize("Charts", &report);

    let mut graphs = DotGraphSink::new(root.join("pgms-rendered"));
    let report = render_graphs(&DirectorySource::new(&models_dir), &mut graphs)?;
    summarize("Graphs", &report);

    println!("Output written to {}", root.display());
    Ok(())
}
