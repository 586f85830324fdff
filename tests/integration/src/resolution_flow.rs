//! End-to-end resolution across crates
//!
//! Exercises the complete flow: config file -> directory catalogs (JSON
//! streams and YAML documents) -> registry dispatch -> resolution, and the
//! same catalogs feeding the multi-package solver.

use std::sync::Arc;

use ext_catalog::BundleMetadata;
use ext_resolve::{
    CancellationToken, CatalogResolver, CatalogWalker, DirectoryCatalogSource, LabelSelector,
    PackageRequest, ResolutionRequest, ResolverConfig, ResolverRegistry, SOURCE_TYPE_CATALOG,
    UpgradePolicy, collect_pool, solve_packages,
};
use ext_test_utils::{BundleBuilder, CatalogBuilder, CatalogDir, ChannelBuilder};
use pretty_assertions::assert_eq;

const COMMUNITY_YAML: &str = r#"
schema: olm.package
name: etcd
defaultChannel: stable
---
schema: olm.channel
name: stable
package: etcd
entries:
  - name: etcd.v0.9.0
  - name: etcd.v0.9.2
    replaces: etcd.v0.9.0
---
schema: olm.bundle
name: etcd.v0.9.0
package: etcd
image: quay.io/community/etcd:v0.9.0
properties:
  - type: olm.package
    value:
      packageName: etcd
      version: 0.9.0
---
schema: olm.bundle
name: etcd.v0.9.2
package: etcd
image: quay.io/community/etcd:v0.9.2
properties:
  - type: olm.package
    value:
      packageName: etcd
      version: 0.9.2
  - type: olm.gvk
    value:
      group: etcd.database.coreos.com
      version: v1beta2
      kind: EtcdCluster
"#;

fn certified() -> CatalogBuilder {
    CatalogBuilder::new()
        .package("etcd", "stable")
        .channel(
            ChannelBuilder::new("etcd", "stable")
                .entry("etcd.v0.9.0")
                .replacing("etcd.v0.9.2", "etcd.v0.9.0")
                .replacing("etcd.v1.0.0", "etcd.v0.9.2"),
        )
        .channel(
            ChannelBuilder::new("app", "stable")
                .entry("app.v1.0.0"),
        )
        .bundle(BundleBuilder::new("etcd", "etcd.v0.9.0", "0.9.0"))
        .bundle(
            BundleBuilder::new("etcd", "etcd.v0.9.2", "0.9.2")
                .provides_gvk("etcd.database.coreos.com", "v1beta2", "EtcdCluster"),
        )
        .bundle(
            BundleBuilder::new("etcd", "etcd.v1.0.0", "1.0.0")
                .provides_gvk("etcd.database.coreos.com", "v1beta2", "EtcdCluster"),
        )
        .bundle(
            BundleBuilder::new("app", "app.v1.0.0", "1.0.0")
                .requires_gvk("etcd.database.coreos.com", "v1beta2", "EtcdCluster"),
        )
        .deprecate_bundle("etcd", "etcd.v1.0.0", "etcd.v1.0.0 has a data loss bug")
}

/// `certified` (JSON, priority 0) and `community` (YAML directory, priority 0,
/// labelled tier=community).
fn catalogs() -> (CatalogDir, ResolverConfig) {
    let mut dir = CatalogDir::new();
    dir.add_catalog("certified", 0, &certified());
    dir.write_file("community/etcd.yaml", COMMUNITY_YAML);
    dir.write_file("community/README.txt", "not a catalog");
    dir.add_catalog_entry(
        "[[catalogs]]\nname = \"community\"\npath = \"community\"\nlabels = { tier = \"community\" }\n",
    );
    let path = dir.write_config_with_defaults("fetch_timeout_secs = 10");
    let config = ResolverConfig::load(&path).unwrap();
    (dir, config)
}

fn registry(config: &ResolverConfig) -> ResolverRegistry {
    let source = Arc::new(DirectoryCatalogSource::from_config(config));
    let resolver = CatalogResolver::new(source).with_fetch_timeout(config.fetch_timeout());
    let mut registry = ResolverRegistry::new();
    registry.register(SOURCE_TYPE_CATALOG, Arc::new(resolver));
    registry
}

#[tokio::test]
async fn test_deprecated_head_falls_back_then_ties_across_catalogs() {
    let (_dir, config) = catalogs();
    let registry = registry(&config);

    // certified's best non-deprecated bundle is 0.9.2, as is community's
    let err = registry
        .resolve(&ResolutionRequest::new("etcd"), None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"found bundles for package "etcd" in multiple catalogs with the same priority ["certified", "community"]"#
    );
}

#[tokio::test]
async fn test_selector_picks_single_catalog() {
    let (_dir, config) = catalogs();
    let registry = registry(&config);
    let request = ResolutionRequest::new("etcd")
        .with_selector("tier=community".parse().unwrap());

    let resolution = registry
        .resolve(&request, None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resolution.catalog, "community");
    assert_eq!(resolution.bundle.name(), "etcd.v0.9.2");
    assert_eq!(
        resolution.bundle.bundle_path().unwrap(),
        "quay.io/community/etcd:v0.9.2"
    );
}

#[tokio::test]
async fn test_pinned_range_reaches_deprecated_bundle() {
    let (_dir, config) = catalogs();
    let registry = registry(&config);
    let request = ResolutionRequest::new("etcd").with_version_range(">=1.0.0");

    let resolution = registry
        .resolve(&request, None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resolution.bundle.name(), "etcd.v1.0.0");
    assert!(resolution.is_deprecated());
    assert_eq!(
        resolution
            .deprecation
            .as_ref()
            .and_then(|d| d.bundle_entry("etcd.v1.0.0"))
            .map(|e| e.message.as_str()),
        Some("etcd.v1.0.0 has a data loss bug")
    );
}

#[tokio::test]
async fn test_upgrade_from_installed_stays_on_channel_graph() {
    let (_dir, config) = catalogs();
    let registry = registry(&config);
    let installed = BundleMetadata {
        name: "etcd.v0.9.2".into(),
        version: "0.9.2".into(),
    };
    let request = ResolutionRequest::new("etcd")
        .with_selector(LabelSelector::everything().with_expression(
            "tier",
            ext_resolve::SelectorOperator::DoesNotExist,
            Vec::<String>::new(),
        ))
        .with_upgrade_policy(UpgradePolicy::Enforce);

    let resolution = registry
        .resolve(&request, Some(&installed), &CancellationToken::new())
        .await
        .unwrap();
    // 1.0.0 replaces 0.9.2 but is deprecated, so 0.9.2 itself wins
    assert_eq!(resolution.bundle.name(), "etcd.v0.9.2");
}

#[tokio::test]
async fn test_solver_uses_same_catalogs() {
    let (_dir, config) = catalogs();
    let source = DirectoryCatalogSource::from_config(&config);
    let cancel = CancellationToken::new();
    let walker = CatalogWalker::new(&source, &cancel).with_fetch_timeout(Some(config.fetch_timeout()));
    let pool = collect_pool(&walker, &LabelSelector::everything())
        .await
        .unwrap();

    let selected = solve_packages(vec![PackageRequest::new("app")], pool, &config.solver()).unwrap();
    let picked: Vec<String> = selected
        .iter()
        .map(|p| format!("{}@{}", p.bundle.name(), p.catalog))
        .collect();
    // the deprecated 1.0.0 ranks last; of the two 0.9.2 providers the first
    // catalog by name wins
    assert_eq!(picked, vec!["app.v1.0.0@certified", "etcd.v0.9.2@certified"]);
}
