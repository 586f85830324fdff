//! Decoded, memoized view over a bundle entity.
//!
//! Each accessor decodes its property through [`crate::property`] the first
//! time it is called and caches the outcome (value or error) in a
//! [`OnceLock`]. Concurrent callers block on the same initializer, so a field
//! is decoded at most once per entity and readers only ever see a finished
//! value.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::property::{
    self, ChannelEntryProperty, ChannelProperty, Gvk, PackageProperty, PackageRequiredProperty,
    Presence,
};
use crate::version::VersionRange;

/// Package name and parsed version of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: Version,
}

/// Name and version of a bundle, as recorded for an installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub name: String,
    pub version: String,
}

/// A dependency on another package, with its range already parsed.
#[derive(Debug, Clone)]
pub struct PackageRequirement {
    pub package_name: String,
    pub range: VersionRange,
}

#[derive(Debug)]
pub struct BundleEntity {
    entity: Entity,
    package: OnceLock<Result<PackageInfo>>,
    channel: OnceLock<Result<ChannelProperty>>,
    channel_entry: OnceLock<Result<ChannelEntryProperty>>,
    provided_gvks: OnceLock<Result<Vec<Gvk>>>,
    required_gvks: OnceLock<Result<Vec<Gvk>>>,
    required_packages: OnceLock<Result<Vec<PackageRequirement>>>,
    bundle_path: OnceLock<Result<String>>,
    media_type: OnceLock<Result<String>>,
    decodes: AtomicUsize,
}

impl BundleEntity {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            package: OnceLock::new(),
            channel: OnceLock::new(),
            channel_entry: OnceLock::new(),
            provided_gvks: OnceLock::new(),
            required_gvks: OnceLock::new(),
            required_packages: OnceLock::new(),
            bundle_path: OnceLock::new(),
            media_type: OnceLock::new(),
            decodes: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.entity.id
    }

    /// Bundle name; the entity identifier.
    pub fn name(&self) -> &str {
        self.entity.id.as_str()
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Name and version string, when the package property decodes.
    pub fn metadata(&self) -> Result<BundleMetadata> {
        Ok(BundleMetadata {
            name: self.name().to_string(),
            version: self.version()?.to_string(),
        })
    }

    /// Number of property decodes performed so far on this entity.
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }

    pub fn package(&self) -> Result<&PackageInfo> {
        cached(&self.package, || self.decode_package())
    }

    pub fn package_name(&self) -> Result<&str> {
        self.package().map(|p| p.name.as_str())
    }

    pub fn version(&self) -> Result<&Version> {
        self.package().map(|p| &p.version)
    }

    pub fn channel(&self) -> Result<&ChannelProperty> {
        cached(&self.channel, || self.decode(property::TYPE_CHANNEL, Presence::Required))
    }

    pub fn channel_name(&self) -> Result<&str> {
        self.channel().map(|c| c.channel_name.as_str())
    }

    pub fn channel_priority(&self) -> Result<i64> {
        self.channel().map(|c| c.priority)
    }

    /// Upgrade edges the bundle declares; empty when the property is absent.
    pub fn channel_entry(&self) -> Result<&ChannelEntryProperty> {
        cached(&self.channel_entry, || {
            self.decode(property::TYPE_CHANNEL_ENTRY, Presence::Optional)
        })
    }

    pub fn replaces(&self) -> Result<&str> {
        self.channel_entry().map(|e| e.replaces.as_str())
    }

    pub fn provided_gvks(&self) -> Result<&[Gvk]> {
        cached(&self.provided_gvks, || {
            self.decode(property::TYPE_GVK, Presence::Optional)
        })
        .map(Vec::as_slice)
    }

    pub fn required_gvks(&self) -> Result<&[Gvk]> {
        cached(&self.required_gvks, || {
            self.decode(property::TYPE_GVK_REQUIRED, Presence::Optional)
        })
        .map(Vec::as_slice)
    }

    pub fn required_packages(&self) -> Result<&[PackageRequirement]> {
        cached(&self.required_packages, || self.decode_required_packages()).map(Vec::as_slice)
    }

    /// Content reference (image or path) of the bundle.
    pub fn bundle_path(&self) -> Result<&str> {
        cached(&self.bundle_path, || {
            self.decode(property::TYPE_BUNDLE_PATH, Presence::Required)
        })
        .map(String::as_str)
    }

    /// Media type tag; empty when the property is absent.
    pub fn media_type(&self) -> Result<&str> {
        cached(&self.media_type, || {
            self.decode(property::TYPE_MEDIA_TYPE, Presence::Optional)
        })
        .map(String::as_str)
    }

    fn decode<T>(&self, property_type: &str, presence: Presence) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        self.decodes.fetch_add(1, Ordering::Relaxed);
        property::get(&self.entity, property_type, presence)
    }

    fn decode_package(&self) -> Result<PackageInfo> {
        let pkg: PackageProperty = self.decode(property::TYPE_PACKAGE, Presence::Required)?;
        let version = Version::parse(&pkg.version).map_err(|e| Error::InvalidVersion {
            entity: self.entity.id.to_string(),
            version: pkg.version.clone(),
            reason: e.to_string(),
        })?;
        Ok(PackageInfo {
            name: pkg.package_name,
            version,
        })
    }

    fn decode_required_packages(&self) -> Result<Vec<PackageRequirement>> {
        let required: Vec<PackageRequiredProperty> =
            self.decode(property::TYPE_PACKAGE_REQUIRED, Presence::Optional)?;
        required
            .into_iter()
            .map(|req| {
                let range = VersionRange::parse(&req.version_range).map_err(|e| {
                    Error::InvalidRequiredPackageRange {
                        entity: self.entity.id.to_string(),
                        package: req.package_name.clone(),
                        range: req.version_range.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(PackageRequirement {
                    package_name: req.package_name,
                    range,
                })
            })
            .collect()
    }
}

impl From<Entity> for BundleEntity {
    fn from(entity: Entity) -> Self {
        Self::new(entity)
    }
}

fn cached<'a, T>(cell: &'a OnceLock<Result<T>>, init: impl FnOnce() -> Result<T>) -> Result<&'a T> {
    cell.get_or_init(init).as_ref().map_err(Clone::clone)
}
