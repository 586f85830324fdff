//! Candidate ordering.
//!
//! Bundles rank by package name (ascending), then channel priority and name
//! (ascending), then version (descending). At each step a bundle whose
//! property fails to decode ranks after one that decodes; when both fail the
//! remaining steps are skipped and the entity identifier decides. The
//! identifier also breaks exact ties, so the order is total.
//!
//! The comparison is expressed as a [`SortKey`] so it can drive
//! `sort_by_cached_key` as well as pairwise comparisons.

use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

use semver::Version;

use crate::bundle::BundleEntity;
use crate::content::Deprecation;
use crate::entity::EntityId;
use crate::property::ChannelProperty;

/// One comparison step: decoded values rank before missing ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Step<T> {
    Known(T),
    Missing,
}

/// Precomputed ordering key of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    package: Step<String>,
    channel: Step<(i64, String)>,
    version: Step<Reverse<Version>>,
    id: EntityId,
}

/// Build the ordering key of `bundle`.
pub fn sort_key(bundle: &BundleEntity) -> SortKey {
    let channel = bundle
        .channel()
        .ok()
        .map(|c| (c.priority, c.channel_name.clone()));
    key_with_channel(bundle, channel)
}

/// Ordering key of `bundle` as a member of `channel`, whichever channel its
/// own `olm.channel` property names.
pub fn sort_key_in_channel(bundle: &BundleEntity, channel: &ChannelProperty) -> SortKey {
    key_with_channel(
        bundle,
        Some((channel.priority, channel.channel_name.clone())),
    )
}

fn key_with_channel(bundle: &BundleEntity, channel: Option<(i64, String)>) -> SortKey {
    let mut failed = false;
    let package = step(&mut failed, bundle.package_name().ok().map(str::to_string));
    let channel = step(&mut failed, channel);
    let version = step(&mut failed, bundle.version().ok().map(|v| Reverse(v.clone())));

    SortKey {
        package,
        channel,
        version,
        id: bundle.id().clone(),
    }
}

/// Once a step has failed every later step is treated as missing.
fn step<T>(failed: &mut bool, value: Option<T>) -> Step<T> {
    match value {
        Some(v) if !*failed => Step::Known(v),
        _ => {
            *failed = true;
            Step::Missing
        }
    }
}

/// Total order over bundles: package, channel, version (descending).
pub fn by_channel_and_version(a: &BundleEntity, b: &BundleEntity) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

/// Strict "sorts before" relation of [`by_channel_and_version`].
pub fn less_than(a: &BundleEntity, b: &BundleEntity) -> bool {
    by_channel_and_version(a, b) == Ordering::Less
}

/// Sort bundles in place by [`by_channel_and_version`].
pub fn sort_bundles(bundles: &mut [Arc<BundleEntity>]) {
    bundles.sort_by_cached_key(|b| sort_key(b));
}

/// Comparator that ranks bundles deprecated by `deprecation` after the rest.
pub fn by_deprecation(
    deprecation: &Deprecation,
) -> impl Fn(&BundleEntity, &BundleEntity) -> Ordering + '_ {
    move |a, b| {
        let a_dep = deprecation.is_bundle_deprecated(a.name());
        let b_dep = deprecation.is_bundle_deprecated(b.name());
        a_dep.cmp(&b_dep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::property;
    use std::collections::BTreeMap;

    fn bundle(id: &str, props: &[(&str, &str)]) -> Arc<BundleEntity> {
        let properties = props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>();
        Arc::new(BundleEntity::new(Entity::new(id, properties)))
    }

    fn pkg(name: &str, version: &str) -> String {
        format!(r#"{{"packageName":"{name}","version":"{version}"}}"#)
    }

    fn chan(name: &str, priority: i64) -> String {
        format!(r#"{{"channelName":"{name}","priority":{priority}}}"#)
    }

    fn ids(bundles: &[Arc<BundleEntity>]) -> Vec<&str> {
        bundles.iter().map(|b| b.name()).collect()
    }

    #[test]
    fn test_sort_by_package_name() {
        let mut bundles = vec![
            bundle("test2", &[(property::TYPE_PACKAGE, &pkg("package2", "1.0.0"))]),
            bundle("test3", &[(property::TYPE_PACKAGE, &pkg("package3", "1.0.0"))]),
            bundle("test1", &[(property::TYPE_PACKAGE, &pkg("package1", "1.0.0"))]),
        ];
        sort_bundles(&mut bundles);
        assert_eq!(ids(&bundles), vec!["test1", "test2", "test3"]);
    }

    #[test]
    fn test_sort_by_channel_name() {
        let mut bundles = vec![
            bundle(
                "test2",
                &[
                    (property::TYPE_PACKAGE, &pkg("package", "1.0.0")),
                    (property::TYPE_CHANNEL, &chan("stableB", 0)),
                ],
            ),
            bundle(
                "test3",
                &[
                    (property::TYPE_PACKAGE, &pkg("package", "1.0.0")),
                    (property::TYPE_CHANNEL, &chan("stableC", 0)),
                ],
            ),
            bundle(
                "test1",
                &[
                    (property::TYPE_PACKAGE, &pkg("package", "1.0.0")),
                    (property::TYPE_CHANNEL, &chan("stableA", 0)),
                ],
            ),
        ];
        sort_bundles(&mut bundles);
        assert_eq!(ids(&bundles), vec!["test1", "test2", "test3"]);
    }

    #[test]
    fn test_sort_by_version_descending() {
        let stable = chan("stable", 0);
        let mut bundles = vec![
            bundle("test2", &[(property::TYPE_PACKAGE, &pkg("p", "2.0.0")), (property::TYPE_CHANNEL, &stable)]),
            bundle("test3", &[(property::TYPE_PACKAGE, &pkg("p", "3.0.0")), (property::TYPE_CHANNEL, &stable)]),
            bundle("test1", &[(property::TYPE_PACKAGE, &pkg("p", "1.0.0")), (property::TYPE_CHANNEL, &stable)]),
        ];
        sort_bundles(&mut bundles);
        assert_eq!(ids(&bundles), vec!["test3", "test2", "test1"]);
    }

    #[test]
    fn test_channel_priority_before_version() {
        let beta = chan("beta", 1);
        let stable = chan("stable", 0);
        let mut bundles = vec![
            bundle("test2", &[(property::TYPE_PACKAGE, &pkg("p", "1.0.0")), (property::TYPE_CHANNEL, &stable)]),
            bundle("test3", &[(property::TYPE_PACKAGE, &pkg("p", "2.0.0")), (property::TYPE_CHANNEL, &beta)]),
            bundle("test1", &[(property::TYPE_PACKAGE, &pkg("p", "1.0.0")), (property::TYPE_CHANNEL, &beta)]),
            bundle("test4", &[(property::TYPE_PACKAGE, &pkg("p", "3.0.0")), (property::TYPE_CHANNEL, &beta)]),
        ];
        sort_bundles(&mut bundles);
        assert_eq!(ids(&bundles), vec!["test2", "test4", "test3", "test1"]);
    }

    #[test]
    fn test_missing_properties_sort_last() {
        let stable = chan("stable", 0);
        let mut bundles = vec![
            bundle("test2", &[(property::TYPE_PACKAGE, r#"{"packageName":"a"}"#), (property::TYPE_CHANNEL, &stable)]),
            bundle("test3", &[(property::TYPE_PACKAGE, &pkg("a", "3.0.0")), (property::TYPE_CHANNEL, &stable)]),
            bundle("test1", &[(property::TYPE_PACKAGE, &pkg("a", "1.0.0")), (property::TYPE_CHANNEL, &stable)]),
            bundle("test4", &[(property::TYPE_PACKAGE, &pkg("b", "3.0.0")), (property::TYPE_CHANNEL, &stable)]),
            bundle("test5", &[]),
        ];
        sort_bundles(&mut bundles);
        assert_eq!(ids(&bundles), vec!["test3", "test1", "test4", "test2", "test5"]);
    }

    #[test]
    fn test_requested_channel_overrides_own_label() {
        // v2 is labelled with the preferred stable channel, v3 only with beta
        let mut bundles = vec![
            bundle("foo.v2", &[(property::TYPE_PACKAGE, &pkg("foo", "2.0.0")), (property::TYPE_CHANNEL, &chan("stable", 0))]),
            bundle("foo.v3", &[(property::TYPE_PACKAGE, &pkg("foo", "3.0.0")), (property::TYPE_CHANNEL, &chan("beta", 1))]),
        ];
        sort_bundles(&mut bundles);
        assert_eq!(ids(&bundles), vec!["foo.v2", "foo.v3"]);

        let beta = ChannelProperty {
            channel_name: "beta".into(),
            priority: 1,
        };
        bundles.sort_by_cached_key(|b| sort_key_in_channel(b, &beta));
        assert_eq!(ids(&bundles), vec!["foo.v3", "foo.v2"]);
    }

    #[test]
    fn test_both_missing_falls_back_to_id() {
        let a = bundle("b-entity", &[]);
        let b = bundle("a-entity", &[]);
        assert!(less_than(&b, &a));
        assert!(!less_than(&a, &b));
        assert_eq!(by_channel_and_version(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_by_deprecation_ranks_deprecated_last() {
        let deprecation: Deprecation = serde_json::from_str(
            r#"{"package":"p","entries":[{"reference":{"schema":"olm.bundle","name":"old"}}]}"#,
        )
        .unwrap();
        let old = bundle("old", &[]);
        let new = bundle("new", &[]);
        let cmp = by_deprecation(&deprecation);
        assert_eq!(cmp(old.as_ref(), new.as_ref()), Ordering::Greater);
        assert_eq!(cmp(new.as_ref(), old.as_ref()), Ordering::Less);
        assert_eq!(cmp(new.as_ref(), new.as_ref()), Ordering::Equal);
    }
}
