use crate::cli::commands::ServeArgs;
use crate::config::{CostscopeConfig, ServerConfig, StorageConfig};
use crate::errors::CostscopeError;
use crate::api;
use tracing::info;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

pub async fn handle_serve(args: ServeArgs, mut config: CostscopeConfig) -> Result<(), CostscopeError> {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    if let Some(max_runs) = args.max_runs {
        server.max_concurrent_runs = Some(max_runs);
    }
    let host = args.host.or_else(|| server.host.clone()).unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args.port.or(server.port).unwrap_or(DEFAULT_PORT);
    if let Some(db) = args.db {
        config.storage.get_or_insert_with(StorageConfig::default).database = Some(db);
    }

    info!(host = %host, port, database = %config.database_path().display(), "Starting API server");

    let state = api::create_app_state(&config)?;
    let app = api::build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| CostscopeError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
