//! Walks the catalogs matching a selector, one package at a time.
//!
//! Catalogs are visited in name order so that logs and error messages are
//! reproducible. Unavailable catalogs are skipped. Every collaborator call
//! races the cancellation token and, for fetches, the configured timeout.

use std::future::Future;
use std::time::Duration;

use ext_catalog::PackageContent;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, CatalogSource};
use crate::error::{Error, Result};
use crate::selector::LabelSelector;

pub struct CatalogWalker<'a> {
    source: &'a dyn CatalogSource,
    fetch_timeout: Option<Duration>,
    cancel: &'a CancellationToken,
}

impl<'a> CatalogWalker<'a> {
    pub fn new(source: &'a dyn CatalogSource, cancel: &'a CancellationToken) -> Self {
        Self {
            source,
            fetch_timeout: None,
            cancel,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Available catalogs matching `selector`, sorted by name.
    pub async fn catalogs(&self, selector: &LabelSelector) -> Result<Vec<Catalog>> {
        let listed = self
            .cancellable(self.source.list_catalogs(selector))
            .await?
            .map_err(|e| Error::ListCatalogs {
                source: Box::new(e),
            })?;

        let mut catalogs: Vec<Catalog> = listed
            .into_iter()
            .filter(|c| {
                if !c.is_available() {
                    tracing::info!(
                        catalog = %c.name,
                        "Excluding catalog from resolution since it is unavailable"
                    );
                }
                c.is_available()
            })
            .collect();
        catalogs.sort_by(|a, b| a.name.cmp(&b.name));

        let names: Vec<&str> = catalogs.iter().map(|c| c.name.as_str()).collect();
        tracing::info!(catalogs = ?names, "Using catalogs for resolution");
        Ok(catalogs)
    }

    /// Fetch `package` from each catalog and hand the content to `visit`.
    ///
    /// A fetch failure aborts the walk, naming the catalog.
    pub async fn walk<F>(&self, selector: &LabelSelector, package: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&Catalog, PackageContent) -> Result<()>,
    {
        for catalog in self.catalogs(selector).await? {
            let content = self.fetch(&catalog, package).await?;
            visit(&catalog, content)?;
        }
        Ok(())
    }

    /// Fetch one package from one catalog, honoring timeout and cancellation.
    pub async fn fetch(&self, catalog: &Catalog, package: &str) -> Result<PackageContent> {
        let fetch = self.source.package_content(catalog, package);
        let fetched = match self.fetch_timeout {
            Some(timeout) => self
                .cancellable(tokio::time::timeout(timeout, fetch))
                .await?
                .map_err(|_| Error::FetchTimeout {
                    catalog: catalog.name.clone(),
                    package: package.to_string(),
                    timeout,
                })?,
            None => self.cancellable(fetch).await?,
        };
        fetched.map_err(|e| Error::FetchPackage {
            catalog: catalog.name.clone(),
            package: package.to_string(),
            source: Box::new(e),
        })
    }

    /// Package names held by one catalog.
    pub async fn package_names(&self, catalog: &Catalog) -> Result<Vec<String>> {
        self.cancellable(self.source.package_names(catalog))
            .await?
            .map_err(|e| Error::FetchPackage {
                catalog: catalog.name.clone(),
                package: "*".to_string(),
                source: Box::new(e),
            })
    }

    async fn cancellable<T>(&self, work: impl Future<Output = T>) -> Result<T> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            out = work => Ok(out),
        }
    }
}
