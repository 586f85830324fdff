use std::collections::BTreeMap;

use async_trait::async_trait;
use ext_catalog::{DeclarativeConfig, PackageContent};

use crate::Result;
use crate::catalog::{Catalog, CatalogSource};
use crate::error::Error;
use crate::selector::LabelSelector;

/// Catalogs held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalogSource {
    catalogs: BTreeMap<String, (Catalog, DeclarativeConfig)>,
}

impl MemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a catalog and its documents.
    pub fn insert(&mut self, catalog: Catalog, content: DeclarativeConfig) {
        self.catalogs
            .insert(catalog.name.clone(), (catalog, content));
    }

    pub fn with_catalog(mut self, catalog: Catalog, content: DeclarativeConfig) -> Self {
        self.insert(catalog, content);
        self
    }

    fn content(&self, catalog: &Catalog) -> Result<&DeclarativeConfig> {
        self.catalogs
            .get(&catalog.name)
            .map(|(_, content)| content)
            .ok_or_else(|| Error::CatalogNotFound(catalog.name.clone()))
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalogSource {
    async fn list_catalogs(&self, selector: &LabelSelector) -> Result<Vec<Catalog>> {
        Ok(self
            .catalogs
            .values()
            .map(|(catalog, _)| catalog)
            .filter(|c| selector.matches(&c.labels))
            .cloned()
            .collect())
    }

    async fn package_content(&self, catalog: &Catalog, package: &str) -> Result<PackageContent> {
        Ok(self.content(catalog)?.package_content(package))
    }

    async fn package_names(&self, catalog: &Catalog) -> Result<Vec<String>> {
        Ok(self.content(catalog)?.package_names())
    }
}
