//! Builders for declarative catalog content.
//!
//! # Example
//!
//! ```rust
//! use ext_test_utils::{BundleBuilder, CatalogBuilder, ChannelBuilder};
//!
//! let content = CatalogBuilder::new()
//!     .package("foo", "stable")
//!     .channel(ChannelBuilder::new("foo", "stable").entry("foo.v1.0.0").replacing("foo.v2.0.0", "foo.v1.0.0"))
//!     .bundle(BundleBuilder::new("foo", "foo.v1.0.0", "1.0.0"))
//!     .bundle(BundleBuilder::new("foo", "foo.v2.0.0", "2.0.0"))
//!     .build();
//! assert_eq!(content.package_content("foo").bundles.len(), 2);
//! ```

use std::sync::Arc;

use ext_catalog::content::{
    BundleDocument, PackageScopedReference, PropertyDocument, SCHEMA_BUNDLE, SCHEMA_CHANNEL,
    SCHEMA_DEPRECATIONS, SCHEMA_PACKAGE,
};
use ext_catalog::{
    BundleEntity, Channel, ChannelEntry, DeclarativeConfig, Deprecation, DeprecationEntry, Entity,
    Package, property,
};
use serde::Serialize;
use serde_json::{Value, json};

/// Accumulates catalog documents.
#[derive(Debug, Default, Clone)]
pub struct CatalogBuilder {
    config: DeclarativeConfig,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package(mut self, name: &str, default_channel: &str) -> Self {
        self.config.packages.push(Package {
            name: name.to_string(),
            default_channel: default_channel.to_string(),
            description: String::new(),
        });
        self
    }

    pub fn channel(mut self, channel: ChannelBuilder) -> Self {
        self.config.channels.push(channel.build());
        self
    }

    pub fn bundle(mut self, bundle: BundleBuilder) -> Self {
        self.config.bundles.push(bundle.build());
        self
    }

    /// Mark a bundle of `package` deprecated.
    pub fn deprecate_bundle(self, package: &str, bundle: &str, message: &str) -> Self {
        self.deprecate(package, SCHEMA_BUNDLE, bundle, message)
    }

    /// Mark a whole package deprecated.
    pub fn deprecate_package(self, package: &str, message: &str) -> Self {
        self.deprecate(package, SCHEMA_PACKAGE, "", message)
    }

    fn deprecate(mut self, package: &str, schema: &str, name: &str, message: &str) -> Self {
        let entry = DeprecationEntry {
            reference: PackageScopedReference {
                schema: schema.to_string(),
                name: name.to_string(),
            },
            message: message.to_string(),
        };
        match self
            .config
            .deprecations
            .iter_mut()
            .find(|d| d.package == package)
        {
            Some(existing) => existing.entries.push(entry),
            None => self.config.deprecations.push(Deprecation {
                package: package.to_string(),
                entries: vec![entry],
            }),
        }
        self
    }

    pub fn build(self) -> DeclarativeConfig {
        self.config
    }

    /// The documents as a newline separated JSON stream.
    pub fn to_json_stream(&self) -> String {
        let c = &self.config;
        let docs = c
            .packages
            .iter()
            .map(|d| tagged(SCHEMA_PACKAGE, d))
            .chain(c.channels.iter().map(|d| tagged(SCHEMA_CHANNEL, d)))
            .chain(c.bundles.iter().map(|d| tagged(SCHEMA_BUNDLE, d)))
            .chain(c.deprecations.iter().map(|d| tagged(SCHEMA_DEPRECATIONS, d)));
        docs.map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
    }
}

fn tagged(schema: &str, doc: &impl Serialize) -> Value {
    let mut value = serde_json::to_value(doc).unwrap();
    value["schema"] = Value::String(schema.to_string());
    value
}

/// One channel of a package.
#[derive(Debug, Clone)]
pub struct ChannelBuilder {
    channel: Channel,
}

impl ChannelBuilder {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            channel: Channel {
                name: name.to_string(),
                package: package.to_string(),
                priority: 0,
                entries: Vec::new(),
            },
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.channel.priority = priority;
        self
    }

    /// An entry with no upgrade edges.
    pub fn entry(self, name: &str) -> Self {
        self.entry_with(ChannelEntry {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// An entry replacing `replaces`.
    pub fn replacing(self, name: &str, replaces: &str) -> Self {
        self.entry_with(ChannelEntry {
            name: name.to_string(),
            replaces: replaces.to_string(),
            ..Default::default()
        })
    }

    pub fn entry_with(mut self, entry: ChannelEntry) -> Self {
        self.channel.entries.push(entry);
        self
    }

    pub fn build(self) -> Channel {
        self.channel
    }
}

/// One bundle document.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    doc: BundleDocument,
}

impl BundleBuilder {
    pub fn new(package: &str, name: &str, version: &str) -> Self {
        Self {
            doc: BundleDocument {
                name: name.to_string(),
                package: package.to_string(),
                image: format!("registry.example.com/{package}:{version}"),
                properties: vec![PropertyDocument {
                    property_type: property::TYPE_PACKAGE.to_string(),
                    value: json!({ "packageName": package, "version": version }),
                }],
            },
        }
    }

    pub fn image(mut self, image: &str) -> Self {
        self.doc.image = image.to_string();
        self
    }

    pub fn property(mut self, property_type: &str, value: Value) -> Self {
        self.doc.properties.push(PropertyDocument {
            property_type: property_type.to_string(),
            value,
        });
        self
    }

    pub fn requires_package(self, package: &str, range: &str) -> Self {
        self.property(
            property::TYPE_PACKAGE_REQUIRED,
            json!({ "packageName": package, "versionRange": range }),
        )
    }

    pub fn provides_gvk(self, group: &str, version: &str, kind: &str) -> Self {
        self.property(
            property::TYPE_GVK,
            json!({ "group": group, "version": version, "kind": kind }),
        )
    }

    pub fn requires_gvk(self, group: &str, version: &str, kind: &str) -> Self {
        self.property(
            property::TYPE_GVK_REQUIRED,
            json!({ "group": group, "version": version, "kind": kind }),
        )
    }

    pub fn build(self) -> BundleDocument {
        self.doc
    }
}

/// A standalone bundle entity in `channel`, for tests that skip catalogs.
pub fn bundle_entity(package: &str, name: &str, version: &str, channel: &str) -> Arc<BundleEntity> {
    let entity = Entity::new(name, Default::default())
        .with_property(
            property::TYPE_PACKAGE,
            json!({ "packageName": package, "version": version }).to_string(),
        )
        .with_property(
            property::TYPE_CHANNEL,
            json!({ "channelName": channel }).to_string(),
        );
    Arc::new(BundleEntity::new(entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_stream_parses_back() {
        let builder = CatalogBuilder::new()
            .package("foo", "stable")
            .channel(ChannelBuilder::new("foo", "stable").entry("foo.v1"))
            .bundle(BundleBuilder::new("foo", "foo.v1", "1.0.0"))
            .deprecate_bundle("foo", "foo.v1", "use foo.v2");
        let parsed = DeclarativeConfig::from_json_stream(&builder.to_json_stream()).unwrap();
        let content = parsed.package_content("foo");
        assert_eq!(content.bundles.len(), 1);
        assert_eq!(content.bundles[0].channel_name().unwrap(), "stable");
        assert!(content.deprecation().unwrap().is_bundle_deprecated("foo.v1"));
    }
}
