pub mod analyze;
pub mod commands;
pub mod latest;
pub mod progress;
pub mod serve;
pub mod services;
pub mod status;
pub mod validate;

use std::path::PathBuf;
use crate::config::{parse_config, CostscopeConfig};
use crate::errors::CostscopeError;

pub use commands::{Cli, Commands};

/// Load `--config` when given, otherwise run on defaults.
pub async fn load_config(path: Option<&str>) -> Result<CostscopeConfig, CostscopeError> {
    match path {
        Some(path) => parse_config(&PathBuf::from(path)).await,
        None => Ok(CostscopeConfig::default()),
    }
}
