//! Immutable catalog entities.
//!
//! An [`Entity`] is the raw record a catalog hands us: an identifier plus an
//! unordered map from property type (`olm.package`, `olm.channel`, ...) to a
//! JSON-encoded value. Entities are never mutated once built; typed views are
//! layered on top by [`crate::bundle::BundleEntity`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a catalog entity, unique within one catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A catalog record: identifier plus JSON-encoded properties keyed by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub properties: BTreeMap<String, String>,
}

impl Entity {
    /// Create an entity from an identifier and its property map.
    pub fn new(id: impl Into<EntityId>, properties: BTreeMap<String, String>) -> Self {
        Self {
            id: id.into(),
            properties,
        }
    }

    /// Builder-style helper that sets one property's raw JSON value.
    pub fn with_property(mut self, property_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(property_type.into(), value.into());
        self
    }

    /// Raw JSON value of a property, if the entity declares it.
    pub fn property(&self, property_type: &str) -> Option<&str> {
        self.properties.get(property_type).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_property_sets_raw_value() {
        let entity = Entity::new("foo.v1", BTreeMap::new())
            .with_property("olm.bundle.path", r#""quay.io/foo@sha256:abc""#);
        assert_eq!(entity.id.as_str(), "foo.v1");
        assert_eq!(
            entity.property("olm.bundle.path"),
            Some(r#""quay.io/foo@sha256:abc""#)
        );
        assert_eq!(entity.property("olm.package"), None);
    }

    #[test]
    fn test_entity_id_display_and_order() {
        let a = EntityId::from("a");
        let b = EntityId::from("b".to_string());
        assert!(a < b);
        assert_eq!(a.to_string(), "a");
    }
}
