//! Catalogs read from JSON-stream or YAML files on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use ext_catalog::{DeclarativeConfig, PackageContent};

use crate::Result;
use crate::catalog::{Catalog, CatalogSource};
use crate::config::ResolverConfig;
use crate::error::Error;
use crate::selector::LabelSelector;

/// Serves catalogs from files or directories of files.
///
/// A catalog path may name a single `.json`/`.yaml`/`.yml` file or a
/// directory; directories are read non-recursively in file name order and
/// files with other extensions are skipped. Parsed content is cached per
/// catalog for the lifetime of the source.
#[derive(Debug, Default)]
pub struct DirectoryCatalogSource {
    catalogs: Vec<(Catalog, PathBuf)>,
    cache: Mutex<HashMap<String, Arc<DeclarativeConfig>>>,
}

impl DirectoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        config
            .catalogs
            .iter()
            .fold(Self::new(), |source, c| {
                source.with_catalog(c.catalog(), config.catalog_path(c))
            })
    }

    pub fn with_catalog(mut self, catalog: Catalog, path: impl Into<PathBuf>) -> Self {
        self.catalogs.push((catalog, path.into()));
        self
    }

    async fn load(&self, catalog: &Catalog) -> Result<Arc<DeclarativeConfig>> {
        if let Some(hit) = self.cached(&catalog.name) {
            return Ok(hit);
        }
        let path = self
            .catalogs
            .iter()
            .find(|(c, _)| c.name == catalog.name)
            .map(|(_, path)| path)
            .ok_or_else(|| Error::CatalogNotFound(catalog.name.clone()))?;

        let content = Arc::new(read_catalog(path).await?);
        tracing::debug!(
            catalog = %catalog.name,
            path = %path.display(),
            packages = content.packages.len(),
            bundles = content.bundles.len(),
            "Loaded catalog"
        );
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(catalog.name.clone(), Arc::clone(&content));
        Ok(content)
    }

    fn cached(&self, name: &str) -> Option<Arc<DeclarativeConfig>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl CatalogSource for DirectoryCatalogSource {
    async fn list_catalogs(&self, selector: &LabelSelector) -> Result<Vec<Catalog>> {
        Ok(self
            .catalogs
            .iter()
            .map(|(catalog, _)| catalog)
            .filter(|c| selector.matches(&c.labels))
            .cloned()
            .collect())
    }

    async fn package_content(&self, catalog: &Catalog, package: &str) -> Result<PackageContent> {
        Ok(self.load(catalog).await?.package_content(package))
    }

    async fn package_names(&self, catalog: &Catalog) -> Result<Vec<String>> {
        Ok(self.load(catalog).await?.package_names())
    }
}

enum Format {
    JsonStream,
    Yaml,
}

fn format_of(path: &Path) -> Option<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Some(Format::JsonStream),
        Some("yaml" | "yml") => Some(Format::Yaml),
        _ => None,
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn read_catalog(path: &Path) -> Result<DeclarativeConfig> {
    let metadata = tokio::fs::metadata(path).await.map_err(io_error(path))?;
    if !metadata.is_dir() {
        let format = format_of(path).ok_or_else(|| Error::UnsupportedCatalogFile {
            path: path.to_path_buf(),
        })?;
        return read_file(path, format).await;
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await.map_err(io_error(path))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(path))? {
        let file = entry.path();
        match format_of(&file) {
            Some(format) => files.push((file, format)),
            None => tracing::debug!(path = %file.display(), "Skipping non-catalog file"),
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut config = DeclarativeConfig::default();
    for (file, format) in files {
        config.merge(read_file(&file, format).await?);
    }
    Ok(config)
}

async fn read_file(path: &Path, format: Format) -> Result<DeclarativeConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(io_error(path))?;
    let parsed = match format {
        Format::JsonStream => DeclarativeConfig::from_json_stream(&content),
        Format::Yaml => DeclarativeConfig::from_yaml_stream(&content),
    };
    parsed.map_err(|source| Error::CatalogContent {
        path: path.to_path_buf(),
        source,
    })
}
