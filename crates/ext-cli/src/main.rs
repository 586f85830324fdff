//! Extension resolver CLI
//!
//! Resolves packages to bundles across the catalogs listed in a resolver
//! configuration file.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use ext_catalog::BundleMetadata;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use commands::ResolveArgs;
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let Some(command) = cli.command else {
        println!("{} extension resolver", "extresolve".green().bold());
        println!();
        println!("Run {} for available commands.", "extresolve --help".cyan());
        return Ok(());
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let ctx = Context::load(cli.config.as_deref())?;
        ctx.cancel_on_interrupt();
        execute_command(&ctx, command).await
    })
}

async fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Resolve {
            package,
            version_range,
            channel,
            selector,
            installed_name,
            installed_version,
            ignore_upgrade_constraints,
            semver_upgrades,
            json,
        } => {
            let installed = match (installed_name, installed_version) {
                (Some(name), Some(version)) => Some(BundleMetadata { name, version }),
                _ => None,
            };
            let args = ResolveArgs {
                package,
                version_range,
                channel,
                selector,
                installed,
                ignore_upgrade_constraints,
                semver_upgrades,
                json,
            };
            commands::run_resolve(ctx, args).await
        }
        Commands::Solve {
            packages,
            channel,
            selector,
            json,
        } => {
            commands::run_solve(ctx, &packages, channel.as_deref(), selector.as_deref(), json)
                .await
        }
        Commands::Catalogs { selector, json } => {
            commands::run_catalogs(ctx, selector.as_deref(), json).await
        }
    }
}
