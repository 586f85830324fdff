//! Configuration and catalog sources shared by every command.

use std::path::Path;
use std::sync::Arc;

use ext_resolve::{
    CancellationToken, CatalogResolver, DirectoryCatalogSource, LabelSelector, ResolverConfig,
};

use crate::error::{CliError, Result};

/// Loaded configuration, its catalog source and a cancellation token wired
/// to Ctrl-C.
pub struct Context {
    pub config: ResolverConfig,
    pub source: Arc<DirectoryCatalogSource>,
    pub cancel: CancellationToken,
}

impl Context {
    /// Load from `path`, or from the platform location when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => ResolverConfig::load(path)?,
            None => ResolverConfig::load_default()?,
        };
        let source = Arc::new(DirectoryCatalogSource::from_config(&config));
        Ok(Self {
            config,
            source,
            cancel: CancellationToken::new(),
        })
    }

    /// Cancel outstanding work when the process receives Ctrl-C.
    pub fn cancel_on_interrupt(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Interrupted, cancelling resolution");
                cancel.cancel();
            }
        });
    }

    pub fn resolver(&self) -> CatalogResolver {
        CatalogResolver::new(self.source.clone()).with_fetch_timeout(self.config.fetch_timeout())
    }
}

/// Parse an optional textual selector; absent means every catalog.
pub fn parse_selector(selector: Option<&str>) -> Result<LabelSelector> {
    match selector {
        Some(text) => text
            .parse()
            .map_err(|e: ext_resolve::Error| CliError::user(e.to_string())),
        None => Ok(LabelSelector::everything()),
    }
}
