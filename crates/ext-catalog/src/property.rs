//! Property codec.
//!
//! Entities store each property as a JSON string keyed by its type. [`get`]
//! looks a property up and decodes it into a typed value, distinguishing an
//! absent optional property (default value, no error) from a malformed one.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{Error, Result};

pub const TYPE_PACKAGE: &str = "olm.package";
pub const TYPE_CHANNEL: &str = "olm.channel";
pub const TYPE_GVK: &str = "olm.gvk";
pub const TYPE_GVK_REQUIRED: &str = "olm.gvk.required";
pub const TYPE_PACKAGE_REQUIRED: &str = "olm.package.required";
pub const TYPE_BUNDLE_PATH: &str = "olm.bundle.path";
pub const TYPE_CHANNEL_ENTRY: &str = "olm.bundle.channelEntry";
pub const TYPE_MEDIA_TYPE: &str = "olm.bundle.mediatype";

pub const MEDIA_TYPE_PLAIN: &str = "plain+v0";
pub const MEDIA_TYPE_REGISTRY: &str = "registry+v1";

/// Whether a property must be present on the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// `olm.package`: the package a bundle belongs to and its version string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageProperty {
    #[serde(rename = "packageName")]
    pub package_name: String,
    #[serde(default)]
    pub version: String,
}

/// `olm.channel`: channel membership and its priority (lower is preferred).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelProperty {
    #[serde(rename = "channelName")]
    pub channel_name: String,
    #[serde(default)]
    pub priority: i64,
}

/// `olm.bundle.channelEntry`: upgrade edges declared by the bundle itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntryProperty {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replaces: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    #[serde(default, rename = "skipRange", skip_serializing_if = "String::is_empty")]
    pub skip_range: String,
}

/// A capability descriptor: group, version and kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gvk {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"group:"{}" version:"{}" kind:"{}""#,
            self.group, self.version, self.kind
        )
    }
}

/// `olm.package.required`: a dependency on another package within a range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequiredProperty {
    #[serde(rename = "packageName")]
    pub package_name: String,
    #[serde(rename = "versionRange", default)]
    pub version_range: String,
}

/// Look up `property_type` on `entity` and decode it into `T`.
///
/// An absent [`Presence::Optional`] property yields `T::default()`.
pub fn get<T>(entity: &Entity, property_type: &str, presence: Presence) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match get_optional(entity, property_type)? {
        Some(value) => Ok(value),
        None if presence == Presence::Required => Err(Error::MissingProperty {
            entity: entity.id.to_string(),
            property_type: property_type.to_string(),
        }),
        None => Ok(T::default()),
    }
}

/// Like [`get`] but reports absence as `None` instead of a default value.
pub fn get_optional<T>(entity: &Entity, property_type: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let Some(raw) = entity.property(property_type) else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| Error::PropertyParse {
            entity: entity.id.to_string(),
            property_type: property_type.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entity(props: &[(&str, &str)]) -> Entity {
        let properties = props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>();
        Entity::new("test", properties)
    }

    #[test]
    fn test_required_present() {
        let e = entity(&[(TYPE_PACKAGE, r#"{"packageName":"foo","version":"1.0.0"}"#)]);
        let pkg: PackageProperty = get(&e, TYPE_PACKAGE, Presence::Required).unwrap();
        assert_eq!(pkg.package_name, "foo");
        assert_eq!(pkg.version, "1.0.0");
    }

    #[test]
    fn test_required_missing_names_type_and_entity() {
        let e = entity(&[]);
        let err = get::<PackageProperty>(&e, TYPE_PACKAGE, Presence::Required).unwrap_err();
        assert_eq!(
            err,
            Error::MissingProperty {
                entity: "test".into(),
                property_type: TYPE_PACKAGE.into()
            }
        );
    }

    #[test]
    fn test_optional_missing_is_default() {
        let e = entity(&[]);
        let gvks: Vec<Gvk> = get(&e, TYPE_GVK, Presence::Optional).unwrap();
        assert!(gvks.is_empty());
        assert_eq!(get_optional::<Vec<Gvk>>(&e, TYPE_GVK).unwrap(), None);
    }

    #[test]
    fn test_malformed_is_parse_error_with_raw_value() {
        let e = entity(&[(TYPE_CHANNEL_ENTRY, r#"{"replaces"}"#)]);
        let err = get::<ChannelEntryProperty>(&e, TYPE_CHANNEL_ENTRY, Presence::Optional)
            .unwrap_err();
        match err {
            Error::PropertyParse {
                property_type,
                value,
                ..
            } => {
                assert_eq!(property_type, TYPE_CHANNEL_ENTRY);
                assert_eq!(value, r#"{"replaces"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_gvk_display() {
        let gvk = Gvk::new("foo.io", "v1", "Foo");
        assert_eq!(gvk.to_string(), r#"group:"foo.io" version:"v1" kind:"Foo""#);
    }
}
