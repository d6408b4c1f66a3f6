use std::path::PathBuf;
use crate::cli::commands::LatestArgs;
use crate::config::CostscopeConfig;
use crate::db::{Database, ReportStore};
use crate::errors::CostscopeError;
use crate::reporting::{format_report_markdown, format_report_terminal};

pub async fn handle_latest(args: LatestArgs, config: CostscopeConfig) -> Result<(), CostscopeError> {
    let path = args.db.map(PathBuf::from).unwrap_or_else(|| config.database_path());
    let db = Database::new(&path)?;

    let Some(stored) = db.latest()? else {
        return Err(CostscopeError::NoDataAvailable(format!(
            "no report has been published to {}",
            path.display()
        )));
    };

    if args.json {
        let document: serde_json::Value = serde_json::from_str(&stored.document_json)?;
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else if args.markdown {
        println!("{}", format_report_markdown(&stored.report));
    } else {
        println!("{}", format_report_terminal(&stored.report));
        println!(
            "Version {} | published {} | sha256 {}",
            stored.key.version,
            stored.published_at.format("%Y-%m-%d %H:%M:%S UTC"),
            stored.key.content_hash,
        );
    }
    Ok(())
}
