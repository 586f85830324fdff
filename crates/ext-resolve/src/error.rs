//! Error types for ext-resolve

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("desired version range {range:?} is invalid: {source}")]
    InvalidVersionRange {
        range: String,
        #[source]
        source: ext_catalog::Error,
    },

    #[error("desired catalog selector is invalid: {reason}")]
    InvalidSelector { reason: String },

    #[error("error listing catalogs: {source}")]
    ListCatalogs {
        #[source]
        source: Box<Error>,
    },

    #[error("error getting package {package:?} from catalog {catalog:?}: {source}")]
    FetchPackage {
        catalog: String,
        package: String,
        #[source]
        source: Box<Error>,
    },

    #[error("timed out after {timeout:?} getting package {package:?} from catalog {catalog:?}")]
    FetchTimeout {
        catalog: String,
        package: String,
        timeout: Duration,
    },

    #[error("resolution cancelled")]
    Cancelled,

    #[error("error finding upgrade edges: {0}")]
    UpgradeEdges(#[source] ext_catalog::Error),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("error getting resolved bundle version for bundle {bundle:?}: {source}")]
    BundleVersion {
        bundle: String,
        #[source]
        source: ext_catalog::Error,
    },

    #[error("validating bundle {bundle:?}: {reason}")]
    Validation { bundle: String, reason: String },

    #[error("unknown source type {0:?}")]
    UnknownSourceType(String),

    #[error("catalog {0:?} not found")]
    CatalogNotFound(String),

    #[error("unsupported catalog file {path}: expected .json, .yaml or .yml")]
    UnsupportedCatalogFile { path: PathBuf },

    #[error("invalid catalog content in {path}: {source}")]
    CatalogContent {
        path: PathBuf,
        #[source]
        source: ext_catalog::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error(transparent)]
    Catalog(#[from] ext_catalog::Error),

    #[error(transparent)]
    Solver(#[from] ext_solver::Error),
}

/// Resolution produced no single winner.
///
/// The message names what was asked for, so it reads the same whichever
/// catalogs took part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    pub package: String,
    pub version_range: Option<String>,
    pub channel: Option<String>,
    /// Version of the installed bundle, when upgrading.
    pub installed_version: Option<String>,
    /// Catalogs that contributed equally ranked candidates; empty on no match.
    pub catalogs: Vec<String>,
}

impl ResolutionError {
    pub fn no_match(
        package: impl Into<String>,
        version_range: Option<&str>,
        channel: Option<&str>,
        installed_version: Option<&str>,
    ) -> Self {
        Self {
            package: package.into(),
            version_range: version_range.map(str::to_string),
            channel: channel.map(str::to_string),
            installed_version: installed_version.map(str::to_string),
            catalogs: Vec::new(),
        }
    }

    /// Candidates from several catalogs with nothing left to break the tie.
    pub fn ambiguous(mut self, mut catalogs: Vec<String>) -> Self {
        catalogs.sort();
        self.catalogs = catalogs;
        self
    }

    pub fn is_ambiguous(&self) -> bool {
        self.catalogs.len() > 1
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(installed) = &self.installed_version {
            write!(f, "error upgrading from currently installed version {installed:?}: ")?;
        }
        if self.is_ambiguous() {
            write!(f, "found bundles for package {:?}", self.package)?;
        } else {
            write!(f, "no package {:?}", self.package)?;
        }
        if let Some(range) = &self.version_range {
            write!(f, " matching version {range:?}")?;
        }
        if let Some(channel) = &self.channel {
            write!(f, " in channel {channel:?}")?;
        }
        if self.is_ambiguous() {
            write!(
                f,
                " in multiple catalogs with the same priority {:?}",
                self.catalogs
            )
        } else {
            f.write_str(" found")
        }
    }
}

impl std::error::Error for ResolutionError {}
