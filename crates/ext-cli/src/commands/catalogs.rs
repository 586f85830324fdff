//! `extresolve catalogs`

use colored::Colorize;
use ext_resolve::{Availability, CatalogSource};
use serde_json::json;

use crate::context::{Context, parse_selector};
use crate::error::Result;

/// List configured catalogs matching the selector, unavailable ones included.
pub async fn run_catalogs(ctx: &Context, selector: Option<&str>, json: bool) -> Result<()> {
    let selector = parse_selector(selector)?;
    let mut catalogs = ctx.source.list_catalogs(&selector).await?;
    catalogs.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        let entries: Vec<serde_json::Value> = catalogs
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "priority": c.priority,
                    "available": c.is_available(),
                    "labels": c.labels,
                    "path": ctx.config.catalog(&c.name).map(|cfg| ctx.config.catalog_path(cfg)),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if catalogs.is_empty() {
        println!("{}", "No catalogs match.".yellow());
        return Ok(());
    }
    println!("{}", "Catalogs".bold());
    for c in &catalogs {
        let status = match c.availability {
            Availability::Available => "available".green(),
            Availability::Unavailable => "unavailable".red(),
        };
        let labels: Vec<String> = c.labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!(
            "  {:<20} priority {:<4} {} {}",
            c.name.cyan(),
            c.priority,
            status,
            labels.join(",").dimmed()
        );
    }
    Ok(())
}
