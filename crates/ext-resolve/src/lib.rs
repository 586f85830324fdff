//! Extension bundle resolution.
//!
//! Resolves a package request to one bundle across every catalog matching a
//! label selector, or jointly solves several package requests with their
//! dependencies through [`ext_solver`].
//!
//! # Modules
//!
//! - [`catalog`]: catalog metadata and the [`CatalogSource`] seam
//! - [`source`]: in-memory and on-disk catalog sources
//! - [`walker`]: visits matching catalogs with timeouts and cancellation
//! - [`resolver`]: single-package resolution ([`CatalogResolver`])
//! - [`registry`]: resolvers keyed by source type
//! - [`variables`]: solver variables for multi-package requests
//! - [`config`]: TOML configuration of catalogs and defaults

pub mod catalog;
pub mod config;
pub mod error;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod selector;
pub mod source;
pub mod variables;
pub mod walker;

pub use catalog::{Availability, Catalog, CatalogSource};
pub use config::{CatalogConfig, Defaults, ResolverConfig};
pub use error::{Error, ResolutionError, Result};
pub use registry::ResolverRegistry;
pub use request::{ResolutionRequest, SOURCE_TYPE_CATALOG, UpgradePolicy};
pub use resolver::{CatalogResolver, CatalogStat, Resolution, Resolver, Validation};
pub use selector::{LabelSelector, SelectorOperator, SelectorRequirement};
pub use source::{DirectoryCatalogSource, MemoryCatalogSource};
pub use variables::{
    MultiPackageVariableSource, PackageRequest, PoolBundle, collect_pool, solve_packages,
};
pub use walker::CatalogWalker;

pub use tokio_util::sync::CancellationToken;
