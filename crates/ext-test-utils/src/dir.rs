//! [`CatalogDir`]: catalogs and configuration on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::catalog::CatalogBuilder;

/// A temporary directory holding catalog files and a `config.toml`.
///
/// # Example
///
/// ```rust
/// use ext_test_utils::{BundleBuilder, CatalogBuilder, CatalogDir};
///
/// let mut dir = CatalogDir::new();
/// dir.add_catalog(
///     "hub",
///     0,
///     &CatalogBuilder::new().bundle(BundleBuilder::new("foo", "foo.v1", "1.0.0")),
/// );
/// let config = dir.write_config();
/// assert!(config.exists());
/// ```
pub struct CatalogDir {
    temp_dir: TempDir,
    entries: Vec<String>,
}

impl Default for CatalogDir {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
            entries: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `catalogs/<name>.json` and list it in the config.
    pub fn add_catalog(&mut self, name: &str, priority: i32, content: &CatalogBuilder) -> PathBuf {
        let relative = format!("catalogs/{name}.json");
        let path = self.write_file(&relative, &content.to_json_stream());
        self.entries.push(format!(
            "[[catalogs]]\nname = \"{name}\"\npath = \"{relative}\"\npriority = {priority}\n"
        ));
        path
    }

    /// List a catalog entry verbatim, e.g. to add labels or availability.
    pub fn add_catalog_entry(&mut self, toml: &str) {
        self.entries.push(toml.to_string());
    }

    /// Write `content` at `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write `config.toml` listing every added catalog.
    pub fn write_config(&self) -> PathBuf {
        self.write_file("config.toml", &self.entries.join("\n"))
    }

    /// Write `config.toml` with a `[defaults]` table ahead of the catalogs.
    pub fn write_config_with_defaults(&self, defaults: &str) -> PathBuf {
        let content = format!("[defaults]\n{defaults}\n\n{}", self.entries.join("\n"));
        self.write_file("config.toml", &content)
    }
}
