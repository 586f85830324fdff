//! Catalog model for extension resolution.
//!
//! This crate provides the entity model shared by the resolver and the
//! solver: typed decoding of entity properties, memoized bundle views,
//! file-based catalog content, version ranges, bundle predicates and the
//! canonical candidate ordering.

pub mod bundle;
pub mod compare;
pub mod content;
pub mod entity;
pub mod error;
pub mod predicate;
pub mod property;
pub mod version;

pub use bundle::{BundleEntity, BundleMetadata, PackageInfo, PackageRequirement};
pub use compare::{
    SortKey, by_channel_and_version, by_deprecation, less_than, sort_bundles, sort_key,
    sort_key_in_channel,
};
pub use content::{
    Channel, ChannelEntry, DeclarativeConfig, Deprecation, DeprecationEntry, Package,
    PackageContent,
};
pub use entity::{Entity, EntityId};
pub use error::{Error, Result};
pub use predicate::{Predicate, filter};
pub use property::{ChannelProperty, Gvk};
pub use version::VersionRange;
