//! Resolver configuration.
//!
//! A TOML file lists the catalogs to resolve against and the defaults
//! applied to every request:
//!
//! ```toml
//! [defaults]
//! upgrade_policy = "Enforce"   # or "Ignore", "Semver"
//! fetch_timeout_secs = 30
//! max_solver_steps = 100000
//!
//! [[catalogs]]
//! name = "operatorhub"
//! path = "catalogs/operatorhub.json"
//! priority = 0
//! availability = "Available"
//! labels = { tier = "community" }
//! ```
//!
//! Catalog paths are relative to the directory holding the file. Without an
//! explicit path the file is looked up at
//! `<config dir>/ext-resolver/config.toml`, where the config dir is
//! platform-specific (`dirs::config_dir()`).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ext_solver::Solver;
use serde::{Deserialize, Serialize};

use crate::catalog::{Availability, Catalog};
use crate::error::{Error, Result};
use crate::request::UpgradePolicy;

pub const CONFIG_DIR_NAME: &str = "ext-resolver";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Defaults applied to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub upgrade_policy: UpgradePolicy,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Solver step bound; unbounded when absent.
    #[serde(default)]
    pub max_solver_steps: Option<usize>,
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            upgrade_policy: UpgradePolicy::default(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_solver_steps: None,
        }
    }
}

/// One configured catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    /// Catalog file or directory.
    pub path: PathBuf,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl CatalogConfig {
    pub fn catalog(&self) -> Catalog {
        Catalog {
            name: self.name.clone(),
            labels: self.labels.clone(),
            priority: self.priority,
            availability: self.availability,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub catalogs: Vec<CatalogConfig>,
    /// Directory relative catalog paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ResolverConfig {
    /// Platform location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the platform location.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path().ok_or_else(|| Error::ConfigNotFound {
            path: PathBuf::from(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
        })?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let config = Self::parse(&content, path, base_dir)?;
        tracing::debug!(
            path = %path.display(),
            catalogs = config.catalogs.len(),
            "Loaded resolver configuration"
        );
        Ok(config)
    }

    /// Parse TOML `content`; `origin` names the file in errors.
    pub fn parse(content: &str, origin: &Path, base_dir: PathBuf) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(|e| Error::InvalidConfig {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.base_dir = base_dir;

        let mut seen = BTreeSet::new();
        for catalog in &config.catalogs {
            if !seen.insert(catalog.name.as_str()) {
                return Err(Error::InvalidConfig {
                    path: origin.to_path_buf(),
                    message: format!("duplicate catalog name {:?}", catalog.name),
                });
            }
        }
        Ok(config)
    }

    pub fn catalog(&self, name: &str) -> Option<&CatalogConfig> {
        self.catalogs.iter().find(|c| c.name == name)
    }

    /// Absolute location of a catalog's content.
    pub fn catalog_path(&self, catalog: &CatalogConfig) -> PathBuf {
        if catalog.path.is_absolute() {
            catalog.path.clone()
        } else {
            self.base_dir.join(&catalog.path)
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.fetch_timeout_secs)
    }

    pub fn solver(&self) -> Solver {
        match self.defaults.max_solver_steps {
            Some(steps) => Solver::new().with_max_steps(steps),
            None => Solver::new(),
        }
    }
}
