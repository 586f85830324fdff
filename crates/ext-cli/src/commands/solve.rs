//! `extresolve solve`

use colored::Colorize;
use ext_resolve::{CatalogWalker, PackageRequest, collect_pool, solve_packages};
use serde_json::json;

use crate::context::{Context, parse_selector};
use crate::error::Result;

pub async fn run_solve(
    ctx: &Context,
    packages: &[String],
    channel: Option<&str>,
    selector: Option<&str>,
    json: bool,
) -> Result<()> {
    let selector = parse_selector(selector)?;
    let mut requests = Vec::with_capacity(packages.len());
    for package in packages {
        let mut request: PackageRequest = package.parse()?;
        if let Some(channel) = channel {
            request = request.with_channel(channel);
        }
        requests.push(request);
    }

    let walker = CatalogWalker::new(ctx.source.as_ref(), &ctx.cancel)
        .with_fetch_timeout(Some(ctx.config.fetch_timeout()));
    let pool = collect_pool(&walker, &selector).await?;
    tracing::debug!(bundles = pool.len(), "Collected candidate pool");

    let selected = solve_packages(requests, pool, &ctx.config.solver())?;

    if json {
        let entries: Vec<serde_json::Value> = selected
            .iter()
            .map(|p| {
                json!({
                    "bundle": p.bundle.name(),
                    "package": p.bundle.package_name().ok(),
                    "version": p.bundle.version().ok().map(|v| v.to_string()),
                    "catalog": p.catalog,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", "Selected bundles".bold());
    for p in &selected {
        let version = p
            .bundle
            .version()
            .map(|v| v.to_string())
            .unwrap_or_default();
        println!(
            "  {:<24} {:<10} {}",
            p.bundle.name().green(),
            version,
            p.catalog.dimmed()
        );
    }
    Ok(())
}
