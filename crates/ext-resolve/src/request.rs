//! What a caller asks the resolver for.

use serde::{Deserialize, Serialize};

use crate::selector::LabelSelector;

/// Source type served by [`crate::CatalogResolver`].
pub const SOURCE_TYPE_CATALOG: &str = "Catalog";

/// How upgrades from an installed bundle are constrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradePolicy {
    /// Only successors of the installed bundle are candidates.
    #[default]
    Enforce,
    /// Any bundle may replace the installed one.
    Ignore,
    /// Only versions in the installed bundle's caret range are candidates,
    /// whatever the channels' upgrade edges say.
    Semver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub selector: LabelSelector,
    #[serde(default)]
    pub upgrade_policy: UpgradePolicy,
    #[serde(default = "default_source_type")]
    pub source_type: String,
}

fn default_source_type() -> String {
    SOURCE_TYPE_CATALOG.to_string()
}

impl ResolutionRequest {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            version_range: None,
            channel: None,
            selector: LabelSelector::default(),
            upgrade_policy: UpgradePolicy::default(),
            source_type: default_source_type(),
        }
    }

    /// Constrain the version; an empty range means unconstrained.
    pub fn with_version_range(mut self, range: impl Into<String>) -> Self {
        let range = range.into();
        self.version_range = (!range.trim().is_empty()).then_some(range);
        self
    }

    /// Constrain the channel; an empty name means any channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        let channel = channel.into();
        self.channel = (!channel.is_empty()).then_some(channel);
        self
    }

    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_upgrade_policy(mut self, policy: UpgradePolicy) -> Self {
        self.upgrade_policy = policy;
        self
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    pub(crate) fn version_range(&self) -> Option<&str> {
        self.version_range.as_deref().filter(|r| !r.trim().is_empty())
    }

    pub(crate) fn channel(&self) -> Option<&str> {
        self.channel.as_deref().filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_constraints_are_absent() {
        let request = ResolutionRequest::new("foo")
            .with_version_range("  ")
            .with_channel("");
        assert_eq!(request.version_range(), None);
        assert_eq!(request.channel(), None);
        assert_eq!(request.source_type, SOURCE_TYPE_CATALOG);
    }

    #[test]
    fn test_deserialize_semver_policy() {
        let request: ResolutionRequest =
            serde_json::from_str(r#"{"packageName":"foo","upgradePolicy":"Semver"}"#).unwrap();
        assert_eq!(request.upgrade_policy, UpgradePolicy::Semver);
    }

    #[test]
    fn test_deserialize_defaults() {
        let request: ResolutionRequest =
            serde_json::from_str(r#"{"packageName":"foo","channel":"stable"}"#).unwrap();
        assert_eq!(request.package_name, "foo");
        assert_eq!(request.channel(), Some("stable"));
        assert_eq!(request.upgrade_policy, UpgradePolicy::Enforce);
        assert!(request.selector.is_empty());
    }
}
