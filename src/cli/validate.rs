use std::path::PathBuf;
use crate::cli::commands::ValidateArgs;
use crate::config::parse_config;
use crate::errors::CostscopeError;
use crate::pipeline::EngineConfig;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), CostscopeError> {
    let path = PathBuf::from(&args.config);
    let config = parse_config(&path).await?;
    let engine = EngineConfig::from_config(&config);
    println!("Configuration is valid: {}", args.config);
    println!(
        "  concurrency {} | currency {} | {} services | {} retry attempts",
        engine.concurrency,
        engine.currency,
        engine.catalog.len(),
        engine.retry.max_attempts,
    );
    Ok(())
}
