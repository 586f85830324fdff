//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resolve extension bundles against configured catalogs
#[derive(Parser, Debug)]
#[command(name = "extresolve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "EXTRESOLVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve one package to a single bundle
    ///
    /// Examples:
    ///   extresolve resolve foo
    ///   extresolve resolve foo --version ">=1.2.0 <2.0.0" --channel stable
    ///   extresolve resolve foo --installed-name foo.v1.0.0 --installed-version 1.0.0
    Resolve {
        /// Package name
        package: String,

        /// Version range the bundle must satisfy
        #[arg(long = "version")]
        version_range: Option<String>,

        /// Channel the bundle must belong to
        #[arg(long)]
        channel: Option<String>,

        /// Catalog label selector, e.g. "tier=community,env!=dev"
        #[arg(short, long)]
        selector: Option<String>,

        /// Name of the currently installed bundle
        #[arg(long, requires = "installed_version")]
        installed_name: Option<String>,

        /// Version of the currently installed bundle
        #[arg(long, requires = "installed_name")]
        installed_version: Option<String>,

        /// Allow upgrades that do not follow channel upgrade edges
        #[arg(long, conflicts_with = "semver_upgrades")]
        ignore_upgrade_constraints: bool,

        /// Upgrade within the installed version's caret range instead of
        /// following channel upgrade edges
        #[arg(long)]
        semver_upgrades: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Jointly solve several packages and their dependencies
    ///
    /// Examples:
    ///   extresolve solve app
    ///   extresolve solve app "db@<2.0.0"
    Solve {
        /// Packages as `name` or `name@range`
        #[arg(required = true)]
        packages: Vec<String>,

        /// Channel every requested package must come from
        #[arg(long)]
        channel: Option<String>,

        /// Catalog label selector
        #[arg(short, long)]
        selector: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List configured catalogs
    Catalogs {
        /// Catalog label selector
        #[arg(short, long)]
        selector: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
