use chrono::NaiveDate;
use clap::{Parser, Subcommand, Args};
use crate::models::AnalysisMode;

#[derive(Parser)]
#[command(name = "costscope", version, about = "Cloud cost, usage and optimization analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an analysis locally and print the consolidated report
    Analyze(AnalyzeArgs),
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Query a run's progress on a running server
    Status(StatusArgs),
    /// Print the latest published report from the database
    Latest(LatestArgs),
    /// List the service catalog
    Services(ServicesArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    /// Comma-separated service ids, or "all"
    #[arg(short, long, default_value = "all")]
    pub services: String,

    /// Comma-separated region ids (defaults to the configured regions)
    #[arg(short, long, value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Analyze the last N days
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub days: Option<u32>,

    /// Window start (inclusive), YYYY-MM-DD
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// Window end (exclusive), YYYY-MM-DD
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// full, costs-only, recommendations-only
    #[arg(long)]
    pub mode: Option<AnalysisMode>,

    /// Collector fixture JSON (overrides collector.fixture)
    #[arg(long)]
    pub fixture: Option<String>,

    /// Maximum collector calls in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Write the persisted report JSON to this path
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write a markdown summary to this path
    #[arg(long)]
    pub markdown: Option<String>,

    /// Print the persisted report JSON instead of the summary
    #[arg(long)]
    pub json: bool,

    /// SQLite database path (overrides storage.database)
    #[arg(long)]
    pub db: Option<String>,

    /// Keep the report in memory only
    #[arg(long, conflicts_with = "db")]
    pub no_store: bool,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen address
    #[arg(long)]
    pub host: Option<String>,

    /// SQLite database path (overrides storage.database)
    #[arg(long)]
    pub db: Option<String>,

    /// Max concurrent analyses
    #[arg(long)]
    pub max_runs: Option<usize>,
}

#[derive(Args, Clone)]
pub struct StatusArgs {
    /// Run ID to query
    pub run_id: String,

    /// Server base URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Continuously poll until the run finishes
    #[arg(long)]
    pub follow: bool,

    /// Poll interval in seconds
    #[arg(long, default_value = "2")]
    pub interval: u64,
}

#[derive(Args, Clone)]
pub struct LatestArgs {
    /// SQLite database path (overrides storage.database)
    #[arg(long)]
    pub db: Option<String>,

    /// Print the persisted JSON document
    #[arg(long, conflicts_with = "markdown")]
    pub json: bool,

    /// Print a markdown summary
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Args, Clone)]
pub struct ServicesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
