use clap::Parser;
use costscope::cli::{self, Cli, Commands};
use costscope::errors::CostscopeError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            CostscopeError::Config(_) | CostscopeError::Yaml(_) => 2,
            CostscopeError::InvalidRequest(_) => 3,
            CostscopeError::NoDataAvailable(_) => 4,
            CostscopeError::StoreUnavailable(_) | CostscopeError::Database(_) => 5,
            CostscopeError::Cancelled(_) => 130,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run(args: Cli) -> Result<(), CostscopeError> {
    let Cli { command, config, quiet, .. } = args;
    match command {
        Commands::Analyze(args) => {
            let config = cli::load_config(config.as_deref()).await?;
            cli::analyze::handle_analyze(args, config, quiet).await
        }
        Commands::Serve(args) => {
            let config = cli::load_config(config.as_deref()).await?;
            cli::serve::handle_serve(args, config).await
        }
        Commands::Latest(args) => {
            let config = cli::load_config(config.as_deref()).await?;
            cli::latest::handle_latest(args, config).await
        }
        Commands::Services(args) => {
            let config = cli::load_config(config.as_deref()).await?;
            cli::services::handle_services(args, config).await
        }
        Commands::Status(args) => cli::status::handle_status(args).await,
        Commands::Validate(args) => cli::validate::handle_validate(args).await,
    }
}
