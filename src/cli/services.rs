use console::style;
use serde_json::json;
use crate::cli::commands::ServicesArgs;
use crate::collectors::service_definition;
use crate::config::CostscopeConfig;
use crate::errors::CostscopeError;
use crate::pipeline::EngineConfig;

pub async fn handle_services(args: ServicesArgs, config: CostscopeConfig) -> Result<(), CostscopeError> {
    let engine = EngineConfig::from_config(&config);
    let catalog = engine.catalog.ids();

    if args.json {
        let services: Vec<_> = catalog
            .iter()
            .map(|id| {
                let definition = service_definition(id);
                json!({
                    "id": id,
                    "name": definition.map(|d| d.display_name),
                    "category": definition.map(|d| d.category),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&services)?);
        return Ok(());
    }

    println!("{}", style(format!("{} services", catalog.len())).bold());
    for id in catalog {
        match service_definition(id) {
            Some(definition) => println!(
                "  {:<18} {:<32} {}",
                style(id).cyan(),
                definition.display_name,
                style(format!("{:?}", definition.category).to_lowercase()).dim(),
            ),
            None => println!("  {:<18} {}", style(id).cyan(), style("(custom)").dim()),
        }
    }
    Ok(())
}
