//! Declarative catalog content.
//!
//! Catalogs publish a stream of schema-tagged documents (`olm.package`,
//! `olm.channel`, `olm.bundle`, `olm.deprecations`). [`DeclarativeConfig`]
//! holds those documents as parsed; [`DeclarativeConfig::package_content`]
//! narrows them to one package and turns bundle documents into shared
//! [`BundleEntity`] values ready for filtering.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundle::BundleEntity;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::property::{self, ChannelEntryProperty, ChannelProperty};

pub const SCHEMA_PACKAGE: &str = "olm.package";
pub const SCHEMA_CHANNEL: &str = "olm.channel";
pub const SCHEMA_BUNDLE: &str = "olm.bundle";
pub const SCHEMA_DEPRECATIONS: &str = "olm.deprecations";

/// Property types that may appear several times on one bundle document and
/// are folded into a JSON array on the entity.
const LIST_PROPERTY_TYPES: &[&str] = &[
    property::TYPE_GVK,
    property::TYPE_GVK_REQUIRED,
    property::TYPE_PACKAGE_REQUIRED,
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(rename = "defaultChannel", default)]
    pub default_channel: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A named upgrade track within a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub package: String,
    /// Lower is preferred; absent means 0.
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub entries: Vec<ChannelEntry>,
}

impl Channel {
    pub fn entry(&self, bundle_name: &str) -> Option<&ChannelEntry> {
        self.entries.iter().find(|e| e.name == bundle_name)
    }

    pub fn contains(&self, bundle_name: &str) -> bool {
        self.entry(bundle_name).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replaces: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    #[serde(rename = "skipRange", default, skip_serializing_if = "String::is_empty")]
    pub skip_range: String,
}

/// Reference to an object inside a package, by schema and name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageScopedReference {
    pub schema: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationEntry {
    pub reference: PackageScopedReference,
    #[serde(default)]
    pub message: String,
}

/// Deprecation record of one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    pub package: String,
    #[serde(default)]
    pub entries: Vec<DeprecationEntry>,
}

impl Deprecation {
    /// Whether the named bundle is listed as deprecated.
    pub fn is_bundle_deprecated(&self, bundle_name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.reference.schema == SCHEMA_BUNDLE && e.reference.name == bundle_name)
    }

    /// The entry deprecating the whole package, if any.
    pub fn package_entry(&self) -> Option<&DeprecationEntry> {
        self.entries
            .iter()
            .find(|e| e.reference.schema == SCHEMA_PACKAGE)
    }

    /// The entry deprecating the named channel, if any.
    pub fn channel_entry(&self, channel_name: &str) -> Option<&DeprecationEntry> {
        self.entries
            .iter()
            .find(|e| e.reference.schema == SCHEMA_CHANNEL && e.reference.name == channel_name)
    }

    /// The entry deprecating the named bundle, if any.
    pub fn bundle_entry(&self, bundle_name: &str) -> Option<&DeprecationEntry> {
        self.entries
            .iter()
            .find(|e| e.reference.schema == SCHEMA_BUNDLE && e.reference.name == bundle_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDocument {
    #[serde(rename = "type")]
    pub property_type: String,
    pub value: Value,
}

/// A bundle as published in the catalog stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleDocument {
    pub name: String,
    pub package: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
}

/// Everything one catalog says about one package.
#[derive(Debug, Clone, Default)]
pub struct PackageContent {
    pub package: Option<Package>,
    pub channels: Vec<Channel>,
    pub bundles: Vec<Arc<BundleEntity>>,
    pub deprecations: Vec<Deprecation>,
}

impl PackageContent {
    pub fn is_empty(&self) -> bool {
        self.package.is_none()
            && self.channels.is_empty()
            && self.bundles.is_empty()
            && self.deprecations.is_empty()
    }

    /// First deprecation record of the package.
    pub fn deprecation(&self) -> Option<&Deprecation> {
        self.deprecations.first()
    }
}

/// Parsed catalog documents, kept per schema.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeConfig {
    pub packages: Vec<Package>,
    pub channels: Vec<Channel>,
    pub bundles: Vec<BundleDocument>,
    pub deprecations: Vec<Deprecation>,
}

impl DeclarativeConfig {
    /// Parse a stream of concatenated JSON documents.
    pub fn from_json_stream(input: &str) -> Result<Self> {
        let mut config = Self::default();
        for doc in serde_json::Deserializer::from_str(input).into_iter::<Value>() {
            let doc = doc.map_err(|e| Error::ContentParse {
                reason: e.to_string(),
            })?;
            config.push_document(doc)?;
        }
        Ok(config)
    }

    /// Parse a multi-document YAML stream.
    pub fn from_yaml_stream(input: &str) -> Result<Self> {
        let mut config = Self::default();
        for doc in serde_yaml::Deserializer::from_str(input) {
            let doc = Value::deserialize(doc).map_err(|e| Error::ContentParse {
                reason: e.to_string(),
            })?;
            if doc.is_null() {
                continue;
            }
            config.push_document(doc)?;
        }
        Ok(config)
    }

    /// Add one schema-tagged document. Documents of other schemas are skipped.
    pub fn push_document(&mut self, doc: Value) -> Result<()> {
        let Some(schema) = doc.get("schema").and_then(Value::as_str) else {
            tracing::warn!("Skipping catalog document without a schema");
            return Ok(());
        };
        let schema = schema.to_string();
        let parse_err = |e: serde_json::Error| Error::ContentParse {
            reason: format!("{schema} document: {e}"),
        };
        match schema.as_str() {
            SCHEMA_PACKAGE => self.packages.push(serde_json::from_value(doc).map_err(parse_err)?),
            SCHEMA_CHANNEL => self.channels.push(serde_json::from_value(doc).map_err(parse_err)?),
            SCHEMA_BUNDLE => self.bundles.push(serde_json::from_value(doc).map_err(parse_err)?),
            SCHEMA_DEPRECATIONS => {
                self.deprecations
                    .push(serde_json::from_value(doc).map_err(parse_err)?)
            }
            other => tracing::debug!(schema = other, "Ignoring catalog document"),
        }
        Ok(())
    }

    /// Append every document of `other`.
    pub fn merge(&mut self, other: DeclarativeConfig) {
        self.packages.extend(other.packages);
        self.channels.extend(other.channels);
        self.bundles.extend(other.bundles);
        self.deprecations.extend(other.deprecations);
    }

    /// Names of all packages mentioned by any document, sorted.
    pub fn package_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .packages
            .iter()
            .map(|p| p.name.clone())
            .chain(self.channels.iter().map(|c| c.package.clone()))
            .chain(self.bundles.iter().map(|b| b.package.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Narrow the documents to one package and build its bundle entities.
    pub fn package_content(&self, package_name: &str) -> PackageContent {
        let channels: Vec<Channel> = self
            .channels
            .iter()
            .filter(|c| c.package == package_name)
            .cloned()
            .collect();
        let bundles = self
            .bundles
            .iter()
            .filter(|b| b.package == package_name)
            .map(|b| Arc::new(BundleEntity::new(bundle_entity(b, &channels))))
            .collect();
        PackageContent {
            package: self.packages.iter().find(|p| p.name == package_name).cloned(),
            channels,
            bundles,
            deprecations: self
                .deprecations
                .iter()
                .filter(|d| d.package == package_name)
                .cloned()
                .collect(),
        }
    }
}

/// Fold a bundle document's property list into an entity property map.
///
/// The image becomes `olm.bundle.path` and, when the bundle does not declare
/// them itself, `olm.channel` and `olm.bundle.channelEntry` are derived from
/// the most preferred channel (lowest priority, then name) that lists it.
fn bundle_entity(doc: &BundleDocument, channels: &[Channel]) -> Entity {
    let mut singles: BTreeMap<String, String> = BTreeMap::new();
    let mut lists: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for prop in &doc.properties {
        if LIST_PROPERTY_TYPES.contains(&prop.property_type.as_str()) {
            let items = lists.entry(prop.property_type.clone()).or_default();
            match &prop.value {
                Value::Array(values) => items.extend(values.iter().cloned()),
                value => items.push(value.clone()),
            }
        } else {
            singles.insert(prop.property_type.clone(), prop.value.to_string());
        }
    }
    for (property_type, items) in lists {
        singles.insert(property_type, Value::Array(items).to_string());
    }

    if !doc.image.is_empty() {
        singles
            .entry(property::TYPE_BUNDLE_PATH.to_string())
            .or_insert_with(|| Value::String(doc.image.clone()).to_string());
    }

    let preferred = channels
        .iter()
        .filter_map(|c| c.entry(&doc.name).map(|e| (c, e)))
        .min_by(|(a, _), (b, _)| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
    if let Some((channel, entry)) = preferred {
        if !singles.contains_key(property::TYPE_CHANNEL) {
            let prop = ChannelProperty {
                channel_name: channel.name.clone(),
                priority: channel.priority,
            };
            if let Ok(json) = serde_json::to_string(&prop) {
                singles.insert(property::TYPE_CHANNEL.to_string(), json);
            }
        }
        if !singles.contains_key(property::TYPE_CHANNEL_ENTRY) {
            let prop = ChannelEntryProperty {
                replaces: entry.replaces.clone(),
                skips: entry.skips.clone(),
                skip_range: entry.skip_range.clone(),
            };
            if let Ok(json) = serde_json::to_string(&prop) {
                singles.insert(property::TYPE_CHANNEL_ENTRY.to_string(), json);
            }
        }
    }

    Entity::new(doc.name.clone(), singles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STREAM: &str = r#"
{"schema":"olm.package","name":"foo","defaultChannel":"stable"}
{"schema":"olm.channel","name":"stable","package":"foo","entries":[
  {"name":"foo.v1"},{"name":"foo.v2","replaces":"foo.v1"}]}
{"schema":"olm.channel","name":"beta","package":"foo","priority":1,"entries":[
  {"name":"foo.v2"},{"name":"foo.v3","replaces":"foo.v2","skips":["foo.v1"]}]}
{"schema":"olm.bundle","name":"foo.v1","package":"foo","image":"quay.io/foo:v1",
 "properties":[{"type":"olm.package","value":{"packageName":"foo","version":"1.0.0"}},
               {"type":"olm.gvk","value":{"group":"foo.io","version":"v1","kind":"Foo"}},
               {"type":"olm.gvk","value":{"group":"foo.io","version":"v1","kind":"Bar"}}]}
{"schema":"olm.bundle","name":"foo.v2","package":"foo","image":"quay.io/foo:v2",
 "properties":[{"type":"olm.package","value":{"packageName":"foo","version":"2.0.0"}}]}
{"schema":"olm.bundle","name":"foo.v3","package":"foo","image":"quay.io/foo:v3",
 "properties":[{"type":"olm.package","value":{"packageName":"foo","version":"3.0.0"}}]}
{"schema":"olm.deprecations","package":"foo","entries":[
  {"reference":{"schema":"olm.bundle","name":"foo.v1"},"message":"use v2"}]}
{"schema":"olm.bundle","name":"bar.v1","package":"bar",
 "properties":[{"type":"olm.package","value":{"packageName":"bar","version":"1.0.0"}}]}
{"schema":"acme.custom","anything":true}
"#;

    #[test]
    fn test_json_stream_by_schema() {
        let config = DeclarativeConfig::from_json_stream(STREAM).unwrap();
        assert_eq!(config.packages.len(), 1);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.bundles.len(), 4);
        assert_eq!(config.deprecations.len(), 1);
        assert_eq!(config.package_names(), vec!["bar", "foo"]);
    }

    #[test]
    fn test_package_content_narrows_to_package() {
        let config = DeclarativeConfig::from_json_stream(STREAM).unwrap();
        let content = config.package_content("foo");
        assert_eq!(content.package.as_ref().unwrap().default_channel, "stable");
        assert_eq!(content.channels.len(), 2);
        assert_eq!(content.bundles.len(), 3);
        assert!(content.deprecation().unwrap().is_bundle_deprecated("foo.v1"));
        assert!(config.package_content("missing").is_empty());
    }

    #[test]
    fn test_bundle_entity_derived_properties() {
        let config = DeclarativeConfig::from_json_stream(STREAM).unwrap();
        let content = config.package_content("foo");
        let v1 = &content.bundles[0];
        assert_eq!(v1.bundle_path().unwrap(), "quay.io/foo:v1");
        assert_eq!(v1.provided_gvks().unwrap().len(), 2);
        assert_eq!(v1.channel_name().unwrap(), "stable");

        // foo.v2 is in stable (priority 0) and beta (priority 1): stable wins.
        let v2 = &content.bundles[1];
        assert_eq!(v2.channel_name().unwrap(), "stable");
        assert_eq!(v2.replaces().unwrap(), "foo.v1");

        let v3 = &content.bundles[2];
        assert_eq!(v3.channel_name().unwrap(), "beta");
        assert_eq!(v3.channel_priority().unwrap(), 1);
        assert_eq!(v3.channel_entry().unwrap().skips, vec!["foo.v1"]);
    }

    #[test]
    fn test_yaml_stream() {
        let yaml = r#"
---
schema: olm.package
name: foo
defaultChannel: stable
---
schema: olm.bundle
name: foo.v1
package: foo
image: quay.io/foo:v1
properties:
  - type: olm.package
    value:
      packageName: foo
      version: 1.0.0
"#;
        let config = DeclarativeConfig::from_yaml_stream(yaml).unwrap();
        let content = config.package_content("foo");
        assert_eq!(content.bundles.len(), 1);
        assert_eq!(
            content.bundles[0].version().unwrap(),
            &semver::Version::new(1, 0, 0)
        );
    }

    #[test]
    fn test_malformed_known_schema_is_error() {
        let err = DeclarativeConfig::from_json_stream(r#"{"schema":"olm.channel","name":1}"#)
            .unwrap_err();
        assert!(matches!(err, Error::ContentParse { .. }));
    }

    #[test]
    fn test_deprecation_lookups() {
        let deprecation = Deprecation {
            package: "foo".into(),
            entries: vec![
                DeprecationEntry {
                    reference: PackageScopedReference {
                        schema: SCHEMA_PACKAGE.into(),
                        name: String::new(),
                    },
                    message: "foo is going away".into(),
                },
                DeprecationEntry {
                    reference: PackageScopedReference {
                        schema: SCHEMA_CHANNEL.into(),
                        name: "alpha".into(),
                    },
                    message: "alpha is closed".into(),
                },
            ],
        };
        assert_eq!(
            deprecation.package_entry().unwrap().message,
            "foo is going away"
        );
        assert!(deprecation.channel_entry("alpha").is_some());
        assert!(deprecation.channel_entry("stable").is_none());
        assert!(!deprecation.is_bundle_deprecated("foo.v1"));
    }
}
