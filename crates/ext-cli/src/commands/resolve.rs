//! `extresolve resolve`

use colored::Colorize;
use ext_catalog::BundleMetadata;
use ext_resolve::{Resolution, ResolutionRequest, Resolver, UpgradePolicy};
use serde_json::json;

use crate::context::{Context, parse_selector};
use crate::error::Result;

/// Arguments of the resolve command.
#[derive(Debug, Default)]
pub struct ResolveArgs {
    pub package: String,
    pub version_range: Option<String>,
    pub channel: Option<String>,
    pub selector: Option<String>,
    pub installed: Option<BundleMetadata>,
    pub ignore_upgrade_constraints: bool,
    pub semver_upgrades: bool,
    pub json: bool,
}

pub async fn run_resolve(ctx: &Context, args: ResolveArgs) -> Result<()> {
    let policy = if args.ignore_upgrade_constraints {
        UpgradePolicy::Ignore
    } else if args.semver_upgrades {
        UpgradePolicy::Semver
    } else {
        ctx.config.defaults.upgrade_policy
    };
    let mut request = ResolutionRequest::new(&args.package)
        .with_selector(parse_selector(args.selector.as_deref())?)
        .with_upgrade_policy(policy);
    if let Some(range) = &args.version_range {
        request = request.with_version_range(range);
    }
    if let Some(channel) = &args.channel {
        request = request.with_channel(channel);
    }

    let resolution = ctx
        .resolver()
        .resolve(&request, args.installed.as_ref(), &ctx.cancel)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&resolution))?);
    } else {
        print_resolution(&resolution);
    }
    Ok(())
}

fn to_json(resolution: &Resolution) -> serde_json::Value {
    json!({
        "bundle": resolution.bundle.name(),
        "package": resolution.bundle.package_name().ok(),
        "version": resolution.version.to_string(),
        "catalog": resolution.catalog,
        "image": resolution.bundle.bundle_path().ok(),
        "deprecated": resolution.is_deprecated(),
        "deprecations": deprecation_messages(resolution),
    })
}

fn print_resolution(resolution: &Resolution) {
    println!(
        "{} {} {} (catalog {})",
        "Resolved".green().bold(),
        resolution.bundle.name().cyan(),
        resolution.version,
        resolution.catalog
    );
    if let Ok(image) = resolution.bundle.bundle_path() {
        println!("  {} {}", "image:".dimmed(), image);
    }
    for message in deprecation_messages(resolution) {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }
}

/// Deprecation notices that apply to the resolved bundle.
fn deprecation_messages(resolution: &Resolution) -> Vec<String> {
    let Some(deprecation) = &resolution.deprecation else {
        return Vec::new();
    };
    let channel = resolution.bundle.channel_name().ok();
    let entries = [
        deprecation.package_entry(),
        channel.and_then(|c| deprecation.channel_entry(c)),
        deprecation.bundle_entry(resolution.bundle.name()),
    ];
    entries
        .into_iter()
        .flatten()
        .map(|e| e.message.clone())
        .collect()
}
