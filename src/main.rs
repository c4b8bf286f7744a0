//! infer-viz CLI: charts for sample files and renderings of model graphs.

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use infer_viz::config::VizConfig;
use infer_viz::factor_graph::{render_graphs, DotGraphSink};
use infer_viz::panel::{compose, compose_with_progress, RenderReport};
use infer_viz::render::BitmapChartSink;
use infer_viz::source::DirectorySource;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "infer-viz")]
#[command(version)]
#[command(about = "Charts for weighted posterior samples and factor graphs of probabilistic programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "infer-viz.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ChartArgs {
    /// Directory of sample files, one dataset per file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output directory for the PNG charts
    #[arg(long)]
    charts_dir: Option<PathBuf>,

    /// Show a progress bar instead of per-dataset log lines
    #[arg(long)]
    progress: bool,
}

#[derive(Args)]
struct GraphArgs {
    /// Directory of model description files
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Output directory for the rendered graphs
    #[arg(long)]
    rendered_dir: Option<PathBuf>,

    /// Only write DOT files, do not call Graphviz
    #[arg(long)]
    no_png: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plot every dataset and the combined grid
    Charts(ChartArgs),

    /// Render the factor graph of every model description
    Graphs(GraphArgs),

    /// Run both pipelines
    All {
        #[command(flatten)]
        charts: ChartArgs,
        #[command(flatten)]
        graphs: GraphArgs,
    },
}

fn setup_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run_charts(config: &VizConfig, args: ChartArgs) -> Result<RenderReport, Box<dyn Error>> {
    let data_dir = args.data_dir.unwrap_or_else(|| config.data_dir.clone());
    let charts_dir = args.charts_dir.unwrap_or_else(|| config.charts_dir.clone());
    info!("Charts: {} -> {}", data_dir.display(), charts_dir.display());

    let source = DirectorySource::new(data_dir);
    let [width, height] = config.panel_size;
    let mut sink = BitmapChartSink::new(charts_dir)
        .panel_size(width, height)
        .cell_size(config.grid_cell_size)
        .export_csv(config.export_csv);
    let report = if args.progress {
        compose_with_progress(&source, &mut sink)?
    } else {
        compose(&source, &mut sink)?
    };
    Ok(report)
}

fn run_graphs(config: &VizConfig, args: GraphArgs) -> Result<RenderReport, Box<dyn Error>> {
    let models_dir = args.models_dir.unwrap_or_else(|| config.models_dir.clone());
    let rendered_dir = args
        .rendered_dir
        .unwrap_or_else(|| config.rendered_dir.clone());
    info!(
        "Graphs: {} -> {}",
        models_dir.display(),
        rendered_dir.display()
    );

    let source = DirectorySource::new(models_dir);
    let mut sink = DotGraphSink::new(rendered_dir).render_png(config.render_png && !args.no_png);
    Ok(render_graphs(&source, &mut sink)?)
}

fn print_summary(what: &str, report: &RenderReport) {
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
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let config = VizConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Charts(args) => print_summary("Charts", &run_charts(&config, args)?),
        Commands::Graphs(args) => print_summary("Graphs", &run_graphs(&config, args)?),
        Commands::All { charts, graphs } => {
            print_summary("Charts", &run_charts(&config, charts)?);
            print_summary("Graphs", &run_graphs(&config, graphs)?);
        }
    }
    Ok(())
}
