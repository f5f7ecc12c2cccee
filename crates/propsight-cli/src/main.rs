//! Propsight CLI: analyze a proposal corpus, then render charts from it.

mod analyze;
mod display;
mod viz;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "propsight", version, about = "Batch analysis of AI system proposals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full classification pipeline.
    Analyze(AnalyzeArgs),
    /// Render interactive HTML charts from a completed analysis.
    Visualize(VisualizeArgs),
}

#[derive(clap::Args)]
pub struct AnalyzeArgs {
    /// Analyze only a random sample of N proposals.
    #[arg(long)]
    pub sample: Option<usize>,

    /// Skip extraction and reuse the raw proposals snapshot.
    #[arg(long)]
    pub skip_extract: bool,

    /// Skip business clustering and reuse the existing snapshot.
    #[arg(long)]
    pub skip_business: bool,

    /// Skip architecture classification and reuse the existing snapshot.
    #[arg(long)]
    pub skip_architecture: bool,

    /// Skip implementation complexity classification and reuse the existing snapshot.
    #[arg(long)]
    pub skip_implementation: bool,

    /// Validate the environment and exit.
    #[arg(long)]
    pub validate: bool,

    /// Root of the proposal data checkout (contains companies/).
    #[arg(long, env = "PROPSIGHT_DATA_DIR", default_value = "../proposal-data")]
    pub data_dir: PathBuf,

    /// Directory for JSON/CSV snapshots.
    #[arg(long, default_value = "outputs")]
    pub out_dir: PathBuf,
}

#[derive(clap::Args)]
pub struct VisualizeArgs {
    /// Render only one chart.
    #[arg(long, value_enum)]
    pub only: Option<Chart>,

    /// Directory holding the analysis snapshots.
    #[arg(long, default_value = "outputs")]
    pub out_dir: PathBuf,

    /// Directory for rendered HTML charts.
    #[arg(long, default_value = "visualizations")]
    pub viz_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Chart {
    Dashboard,
    Treemap,
    Sunburst,
    Network,
    Heatmap,
    Architecture,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    match Cli::parse().command {
        Command::Analyze(args) => analyze::run(args).await,
        Command::Visualize(args) => viz::run(&args),
    }
}
