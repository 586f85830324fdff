//! Multi-package solving over catalog pools.

use ext_resolve::{
    CancellationToken, Catalog, CatalogWalker, LabelSelector, MemoryCatalogSource,
    PackageRequest, collect_pool, solve_packages,
};
use ext_solver::Solver;
use ext_test_utils::{BundleBuilder, CatalogBuilder, ChannelBuilder};
use pretty_assertions::assert_eq;

fn operator_hub() -> CatalogBuilder {
    CatalogBuilder::new()
        .channel(
            ChannelBuilder::new("app", "stable")
                .entry("app.v1")
                .replacing("app.v2", "app.v1"),
        )
        .channel(ChannelBuilder::new("db", "stable").entry("db.v1").replacing("db.v2", "db.v1"))
        .channel(ChannelBuilder::new("cache", "stable").entry("cache.v1"))
        .bundle(BundleBuilder::new("app", "app.v1", "1.0.0").requires_package("db", "<2.0.0"))
        .bundle(
            BundleBuilder::new("app", "app.v2", "2.0.0")
                .requires_package("db", ">=2.0.0")
                .requires_gvk("cache.io", "v1", "Cache"),
        )
        .bundle(BundleBuilder::new("db", "db.v1", "1.0.0"))
        .bundle(BundleBuilder::new("db", "db.v2", "2.0.0"))
        .bundle(BundleBuilder::new("cache", "cache.v1", "1.0.0").provides_gvk("cache.io", "v1", "Cache"))
}

async fn pool(source: &MemoryCatalogSource) -> Vec<ext_resolve::PoolBundle> {
    let cancel = CancellationToken::new();
    let walker = CatalogWalker::new(source, &cancel);
    collect_pool(&walker, &LabelSelector::everything())
        .await
        .unwrap()
}

fn selected(bundles: &[ext_resolve::PoolBundle]) -> Vec<String> {
    bundles
        .iter()
        .map(|p| format!("{}@{}", p.bundle.name(), p.catalog))
        .collect()
}

#[tokio::test]
async fn test_solves_dependencies_across_packages() {
    let source = MemoryCatalogSource::new().with_catalog(Catalog::new("hub"), operator_hub().build());
    let pool = pool(&source).await;
    assert_eq!(pool.len(), 5);

    let result = solve_packages(vec![PackageRequest::new("app")], pool, &Solver::new()).unwrap();
    assert_eq!(selected(&result), vec!["app.v2@hub", "cache.v1@hub", "db.v2@hub"]);
}

#[tokio::test]
async fn test_pinned_dependency_forces_older_app() {
    let source = MemoryCatalogSource::new().with_catalog(Catalog::new("hub"), operator_hub().build());
    let requests = vec![
        PackageRequest::new("app"),
        PackageRequest::new("db").with_version_range("<2.0.0"),
    ];
    let result = solve_packages(requests, pool(&source).await, &Solver::new()).unwrap();
    assert_eq!(selected(&result), vec!["app.v1@hub", "db.v1@hub"]);
}

#[tokio::test]
async fn test_missing_gvk_provider_falls_back() {
    let content = CatalogBuilder::new()
        .bundle(BundleBuilder::new("app", "app.v1", "1.0.0"))
        .bundle(BundleBuilder::new("app", "app.v2", "2.0.0").requires_gvk("cache.io", "v1", "Cache"))
        .channel(
            ChannelBuilder::new("app", "stable")
                .entry("app.v1")
                .replacing("app.v2", "app.v1"),
        )
        .build();
    let source = MemoryCatalogSource::new().with_catalog(Catalog::new("hub"), content);
    let result =
        solve_packages(vec![PackageRequest::new("app")], pool(&source).await, &Solver::new())
            .unwrap();
    assert_eq!(selected(&result), vec!["app.v1@hub"]);
}

#[tokio::test]
async fn test_same_package_in_two_catalogs_picks_one() {
    let source = MemoryCatalogSource::new()
        .with_catalog(Catalog::new("a"), operator_hub().build())
        .with_catalog(Catalog::new("b"), operator_hub().build());
    let result =
        solve_packages(vec![PackageRequest::new("db")], pool(&source).await, &Solver::new())
            .unwrap();
    assert_eq!(selected(&result), vec!["db.v2@a"]);
}

#[tokio::test]
async fn test_search_bound_is_enforced() {
    let source = MemoryCatalogSource::new().with_catalog(Catalog::new("hub"), operator_hub().build());
    let err = solve_packages(
        vec![PackageRequest::new("app")],
        pool(&source).await,
        &Solver::new().with_max_steps(1),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ext_resolve::Error::Solver(ext_solver::Error::SearchLimitExceeded { limit: 1 })
    ));
}

#[tokio::test]
async fn test_channel_request_uses_channel_entries() {
    // db.v2 is labelled with stable, the preferred channel, but beta lists it
    let content = CatalogBuilder::new()
        .channel(ChannelBuilder::new("db", "stable").entry("db.v1").replacing("db.v2", "db.v1"))
        .channel(
            ChannelBuilder::new("db", "beta")
                .priority(1)
                .entry("db.v2")
                .replacing("db.v3", "db.v2"),
        )
        .bundle(BundleBuilder::new("db", "db.v1", "1.0.0"))
        .bundle(BundleBuilder::new("db", "db.v2", "2.0.0"))
        .bundle(BundleBuilder::new("db", "db.v3", "3.0.0"))
        .build();
    let source = MemoryCatalogSource::new().with_catalog(Catalog::new("hub"), content);

    let beta = solve_packages(
        vec![PackageRequest::new("db").with_channel("beta")],
        pool(&source).await,
        &Solver::new(),
    )
    .unwrap();
    assert_eq!(selected(&beta), vec!["db.v3@hub"]);

    let pinned = solve_packages(
        vec![PackageRequest::new("db").with_channel("beta").with_version_range("<3.0.0")],
        pool(&source).await,
        &Solver::new(),
    )
    .unwrap();
    assert_eq!(selected(&pinned), vec!["db.v2@hub"]);
}
