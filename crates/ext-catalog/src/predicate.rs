//! Predicate library.
//!
//! A [`Predicate`] is a boolean test over a [`BundleEntity`]. Predicates are
//! plain data so callers can log which one rejected a candidate. Evaluation
//! never fails: a property that does not decode simply does not match.
//!
//! # Example
//!
//! ```
//! use ext_catalog::predicate::Predicate;
//! use ext_catalog::version::VersionRange;
//!
//! let wanted = Predicate::and([
//!     Predicate::PackageName("foo".into()),
//!     Predicate::InVersionRange(VersionRange::parse(">=1.0.0").unwrap()),
//! ]);
//! assert_eq!(wanted.to_string(), r#"(package "foo" AND version in ">=1.0.0")"#);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use semver::Version;

use crate::bundle::{BundleEntity, BundleMetadata};
use crate::content::{Channel, ChannelEntry};
use crate::error::{Error, Result};
use crate::property::Gvk;
use crate::version::VersionRange;

#[derive(Debug, Clone)]
pub enum Predicate {
    /// The bundle belongs to this package.
    PackageName(String),
    /// The bundle's own `olm.channel` property names this channel.
    InChannel(String),
    /// The bundle is listed by at least one of the given channels.
    InAnyChannel(ChannelMembership),
    /// The bundle's version lies in the range.
    InVersionRange(VersionRange),
    /// The bundle provides this capability.
    ProvidesGvk(Gvk),
    /// The bundle's content reference equals this value.
    BundlePath(String),
    /// The bundle's channel entry replaces this bundle.
    Replaces(String),
    /// The bundle is a valid upgrade from an installed bundle.
    SuccessorOf(Successors),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction; an empty conjunction matches everything.
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::And(predicates.into_iter().collect())
    }

    /// Disjunction; an empty disjunction matches nothing.
    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Or(predicates.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate) -> Self {
        Self::Not(Box::new(predicate))
    }

    /// Membership in any of `channels`, judged by their entry lists.
    pub fn in_any_channel<'a>(channels: impl IntoIterator<Item = &'a Channel>) -> Self {
        Self::InAnyChannel(ChannelMembership::new(channels))
    }

    /// Upgrade targets reachable from `installed` within `channels`.
    /// `bundles` supplies the versions that skip ranges are checked against.
    pub fn successor_of(
        installed: &BundleMetadata,
        channels: &[Channel],
        bundles: &[Arc<BundleEntity>],
    ) -> Result<Self> {
        Successors::new(installed, channels, bundles).map(Self::SuccessorOf)
    }

    /// Versions in the caret range of `installed` (same major version, or
    /// same minor below 1.0.0), regardless of channel edges. The installed
    /// version itself matches.
    pub fn semver_successor_of(installed: &BundleMetadata) -> Result<Self> {
        let version = installed_version(installed)?;
        VersionRange::parse(&format!("^{version}")).map(Self::InVersionRange)
    }

    pub fn evaluate(&self, bundle: &BundleEntity) -> bool {
        match self {
            Self::PackageName(name) => bundle.package_name().is_ok_and(|p| p == name),
            Self::InChannel(name) => bundle.channel_name().is_ok_and(|c| c == name),
            Self::InAnyChannel(membership) => membership.contains(bundle.name()),
            Self::InVersionRange(range) => bundle.version().is_ok_and(|v| range.contains(v)),
            Self::ProvidesGvk(gvk) => bundle
                .provided_gvks()
                .is_ok_and(|provided| provided.contains(gvk)),
            Self::BundlePath(path) => bundle.bundle_path().is_ok_and(|p| p == path),
            Self::Replaces(name) => bundle.replaces().is_ok_and(|r| r == name),
            Self::SuccessorOf(successors) => successors.matches(bundle),
            Self::And(all) => all.iter().all(|p| p.evaluate(bundle)),
            Self::Or(any) => any.iter().any(|p| p.evaluate(bundle)),
            Self::Not(inner) => !inner.evaluate(bundle),
        }
    }

    /// The innermost predicate responsible for rejecting `bundle`, or `None`
    /// when the bundle matches.
    pub fn rejection(&self, bundle: &BundleEntity) -> Option<&Predicate> {
        if self.evaluate(bundle) {
            return None;
        }
        match self {
            Self::And(all) => all
                .iter()
                .find_map(|p| p.rejection(bundle))
                .or(Some(self)),
            _ => Some(self),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PackageName(name) => write!(f, "package {name:?}"),
            Self::InChannel(name) => write!(f, "channel {name:?}"),
            Self::InAnyChannel(membership) => write!(f, "in channels {:?}", membership.channels),
            Self::InVersionRange(range) => write!(f, "version in {:?}", range.as_str()),
            Self::ProvidesGvk(gvk) => write!(f, "provides {gvk}"),
            Self::BundlePath(path) => write!(f, "bundle path {path:?}"),
            Self::Replaces(name) => write!(f, "replaces {name:?}"),
            Self::SuccessorOf(s) => {
                write!(f, "successor of {:?} ({})", s.installed, s.installed_version)
            }
            Self::And(all) => join(f, all, " AND ", "true"),
            Self::Or(any) => join(f, any, " OR ", "false"),
            Self::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: &[Predicate], sep: &str, empty: &str) -> fmt::Result {
    if items.is_empty() {
        return f.write_str(empty);
    }
    f.write_str("(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(")")
}

/// Bundle names listed by a set of channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelMembership {
    channels: Vec<String>,
    bundles: BTreeSet<String>,
}

impl ChannelMembership {
    pub fn new<'a>(channels: impl IntoIterator<Item = &'a Channel>) -> Self {
        let mut membership = Self::default();
        for channel in channels {
            membership.channels.push(channel.name.clone());
            membership
                .bundles
                .extend(channel.entries.iter().map(|e| e.name.clone()));
        }
        membership
    }

    pub fn contains(&self, bundle_name: &str) -> bool {
        self.bundles.contains(bundle_name)
    }
}

/// Bundles that are valid upgrades from an installed bundle.
///
/// An entry is a direct successor of a bundle when it replaces or skips it,
/// or when its skip range contains that bundle's version. Successors are the
/// transitive closure of that relation, computed separately inside each
/// channel: edges from different channels are never chained together. The
/// installed version itself always matches so that re-resolving an
/// up-to-date extension is not an error.
#[derive(Debug, Clone)]
pub struct Successors {
    installed: String,
    installed_version: Version,
    names: BTreeSet<String>,
}

impl Successors {
    /// `bundles` maps entry names to versions for skip-range checks; entries
    /// without a decodable bundle only take part through replaces and skips.
    pub fn new(
        installed: &BundleMetadata,
        channels: &[Channel],
        bundles: &[Arc<BundleEntity>],
    ) -> Result<Self> {
        let installed_version = installed_version(installed)?;
        let mut versions: BTreeMap<&str, &Version> = bundles
            .iter()
            .filter_map(|b| b.version().ok().map(|v| (b.name(), v)))
            .collect();
        versions.insert(installed.name.as_str(), &installed_version);

        let mut names = BTreeSet::new();
        for channel in channels {
            names.extend(channel_successors(channel, &installed.name, &versions));
        }
        tracing::debug!(
            installed = %installed.name,
            successors = ?names,
            "Computed upgrade successors"
        );

        Ok(Self {
            installed: installed.name.clone(),
            installed_version,
            names,
        })
    }

    pub fn matches(&self, bundle: &BundleEntity) -> bool {
        self.names.contains(bundle.name())
            || bundle.version().is_ok_and(|v| v == &self.installed_version)
    }

    /// Successor bundle names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

fn installed_version(installed: &BundleMetadata) -> Result<Version> {
    Version::parse(&installed.version).map_err(|e| Error::InvalidVersion {
        entity: installed.name.clone(),
        version: installed.version.clone(),
        reason: e.to_string(),
    })
}

/// Fixed point of the direct-successor relation inside one channel.
fn channel_successors(
    channel: &Channel,
    installed: &str,
    versions: &BTreeMap<&str, &Version>,
) -> BTreeSet<String> {
    // unparsable skip ranges contribute no edges
    let ranges: Vec<Option<VersionRange>> = channel
        .entries
        .iter()
        .map(|e| {
            (!e.skip_range.is_empty())
                .then(|| VersionRange::parse(&e.skip_range).ok())
                .flatten()
        })
        .collect();

    let mut reached: BTreeSet<&str> = BTreeSet::from([installed]);
    loop {
        let before = reached.len();
        for (entry, range) in channel.entries.iter().zip(&ranges) {
            if !reached.contains(entry.name.as_str())
                && is_direct_successor(entry, range.as_ref(), &reached, versions)
            {
                reached.insert(entry.name.as_str());
            }
        }
        if reached.len() == before {
            break;
        }
    }
    reached.remove(installed);
    reached.into_iter().map(str::to_string).collect()
}

fn is_direct_successor(
    entry: &ChannelEntry,
    skip_range: Option<&VersionRange>,
    reached: &BTreeSet<&str>,
    versions: &BTreeMap<&str, &Version>,
) -> bool {
    if reached.contains(entry.replaces.as_str()) {
        return true;
    }
    if entry.skips.iter().any(|s| reached.contains(s.as_str())) {
        return true;
    }
    skip_range.is_some_and(|range| {
        reached
            .iter()
            .filter_map(|name| versions.get(name))
            .any(|v| range.contains(v))
    })
}

/// Return the bundles matching `predicate`, leaving the input untouched.
pub fn filter(bundles: &[Arc<BundleEntity>], predicate: &Predicate) -> Vec<Arc<BundleEntity>> {
    bundles
        .iter()
        .filter(|b| predicate.evaluate(b))
        .cloned()
        .collect()
}
