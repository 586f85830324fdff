//! Catalogs and the collaborator that serves their content.

use std::collections::BTreeMap;

use async_trait::async_trait;
use ext_catalog::PackageContent;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::selector::LabelSelector;

/// Whether a catalog takes part in resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[default]
    Available,
    Unavailable,
}

/// A named source of package content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Higher priority wins ties between catalogs.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub availability: Availability,
}

impl Catalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            priority: 0,
            availability: Availability::Available,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}

/// Lists catalogs and serves package-scoped content from them.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Catalogs whose labels match `selector`, in any order.
    async fn list_catalogs(&self, selector: &LabelSelector) -> Result<Vec<Catalog>>;

    /// Everything `catalog` holds for `package`; empty when it has none.
    async fn package_content(&self, catalog: &Catalog, package: &str) -> Result<PackageContent>;

    /// Names of every package `catalog` holds, sorted.
    async fn package_names(&self, catalog: &Catalog) -> Result<Vec<String>>;
}
