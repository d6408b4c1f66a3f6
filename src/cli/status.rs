use std::time::Duration;
use console::style;
use crate::cli::commands::StatusArgs;
use crate::cli::progress::format_elapsed;
use crate::errors::CostscopeError;
use crate::models::RunStatus;
use tracing::debug;

pub async fn handle_status(args: StatusArgs) -> Result<(), CostscopeError> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/analyses/{}/status", args.server.trim_end_matches('/'), args.run_id);
    debug!(url = %url, "Querying run status");

    loop {
        let resp = client.get(&url).send().await
            .map_err(|e| CostscopeError::Network(format!("Failed to query run: {}", e)))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CostscopeError::RunNotFound(args.run_id.clone()));
        }

        let status: serde_json::Value = resp.json().await
            .map_err(|e| CostscopeError::Network(format!("Invalid response: {}", e)))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print_status(&status);
        }

        let run_status = status["status"]
            .as_str()
            .and_then(|s| s.parse::<RunStatus>().ok());
        let finished = run_status.map(|s| s.is_terminal()).unwrap_or(true);
        if !args.follow || finished {
            break;
        }

        tokio::time::sleep(Duration::from_secs(args.interval.max(1))).await;
    }

    Ok(())
}

fn print_status(status: &serde_json::Value) {
    let state = status["status"].as_str().unwrap_or("unknown");
    let styled = match state {
        "succeeded" => style(state).green(),
        "partial" => style(state).yellow(),
        "failed" | "cancelled" => style(state).red(),
        _ => style(state).cyan(),
    };
    println!("Status: {}", styled);
    if let Some(phase) = status["phase"].as_str() {
        println!("Phase: {}", phase);
    }
    println!(
        "Partitions: {}/{} ({} failed)",
        status["partitions_completed"].as_u64().unwrap_or(0),
        status["partitions_total"].as_u64().unwrap_or(0),
        status["partitions_failed"].as_u64().unwrap_or(0),
    );
    println!("Elapsed: {}", format_elapsed(status["elapsed_ms"].as_u64().unwrap_or(0)));
    if let Some(error) = status["error"].as_str() {
        println!("Error: {}", style(error).red());
    }
}
