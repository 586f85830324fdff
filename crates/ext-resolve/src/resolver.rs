//! Single-package resolution across catalogs.
//!
//! For every catalog the walker visits, the package's bundles are narrowed
//! by channel, version range and, when upgrading, the successor relation of
//! the request's [`UpgradePolicy`]. The survivors are ranked with deprecated
//! bundles last, then by the bundle ordering of [`ext_catalog::compare`]
//! with the channel step taken from the requested channel, if any. The head
//! becomes that catalog's candidate.
//!
//! Candidates from different catalogs are arbitrated as they arrive: a
//! deprecated candidate never displaces a non-deprecated one, and a
//! non-deprecated candidate clears every deprecated one collected so far.
//! Whatever remains is ranked by catalog priority; anything other than a
//! single winner is a [`ResolutionError`].

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ext_catalog::{
    BundleEntity, BundleMetadata, Channel, ChannelProperty, Deprecation, Predicate, SortKey,
    VersionRange, by_deprecation, filter, sort_key, sort_key_in_channel,
};
use semver::Version;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogSource;
use crate::error::{Error, ResolutionError, Result};
use crate::request::{ResolutionRequest, UpgradePolicy};
use crate::walker::CatalogWalker;

/// The winning bundle of a resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub bundle: Arc<BundleEntity>,
    pub version: Version,
    /// Catalog the bundle came from.
    pub catalog: String,
    /// Deprecation record of the package in that catalog, if any.
    pub deprecation: Option<Deprecation>,
}

impl Resolution {
    pub fn is_deprecated(&self) -> bool {
        self.deprecation
            .as_ref()
            .is_some_and(|d| d.is_bundle_deprecated(self.bundle.name()))
    }
}

/// A resolution strategy for one kind of source.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        request: &ResolutionRequest,
        installed: Option<&BundleMetadata>,
        cancel: &CancellationToken,
    ) -> Result<Resolution>;
}

/// Check run against the winning bundle; `Err` carries the reason.
pub type Validation = Box<dyn Fn(&BundleEntity) -> std::result::Result<(), String> + Send + Sync>;

/// Per-catalog outcome, logged after every resolution.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStat {
    pub catalog_name: String,
    pub package_found: bool,
    pub total_bundles: usize,
    pub matched_bundles: usize,
}

struct Candidate {
    bundle: Arc<BundleEntity>,
    catalog: String,
    priority: i32,
    deprecation: Option<Deprecation>,
    deprecated: bool,
}

/// Resolves a package against the catalogs served by a [`CatalogSource`].
pub struct CatalogResolver {
    source: Arc<dyn CatalogSource>,
    fetch_timeout: Option<Duration>,
    validations: Vec<Validation>,
}

impl CatalogResolver {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            fetch_timeout: None,
            validations: Vec::new(),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Add a check the winning bundle must pass.
    pub fn with_validation<F>(mut self, validation: F) -> Self
    where
        F: Fn(&BundleEntity) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validations.push(Box::new(validation));
        self
    }

    async fn resolve_inner(
        &self,
        request: &ResolutionRequest,
        installed: Option<&BundleMetadata>,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        let package = request.package_name.as_str();
        let range = request
            .version_range()
            .map(|raw| {
                VersionRange::parse(raw).map_err(|source| Error::InvalidVersionRange {
                    range: raw.to_string(),
                    source,
                })
            })
            .transpose()?;
        request.selector.validate()?;

        let semver_successors = match (installed, request.upgrade_policy) {
            (Some(installed), UpgradePolicy::Semver) => Some(
                Predicate::semver_successor_of(installed).map_err(Error::UpgradeEdges)?,
            ),
            _ => None,
        };
        let successor_seed = match (installed, request.upgrade_policy) {
            (Some(installed), UpgradePolicy::Enforce) => Some(installed),
            _ => None,
        };

        let mut stats: Vec<CatalogStat> = Vec::new();
        let mut accepted: Vec<Candidate> = Vec::new();

        let walker = CatalogWalker::new(self.source.as_ref(), cancel)
            .with_fetch_timeout(self.fetch_timeout);
        walker
            .walk(&request.selector, package, |catalog, content| {
                let mut stat = CatalogStat {
                    catalog_name: catalog.name.clone(),
                    ..Default::default()
                };
                if content.is_empty() {
                    stats.push(stat);
                    return Ok(());
                }
                stat.package_found = true;
                stat.total_bundles = content.bundles.len();

                let mut predicates = Vec::new();
                let mut scope: Option<ChannelProperty> = None;
                if let Some(channel) = request.channel() {
                    let channels: Vec<&Channel> =
                        content.channels.iter().filter(|c| c.name == channel).collect();
                    scope = channels.first().map(|c| ChannelProperty {
                        channel_name: c.name.clone(),
                        priority: c.priority,
                    });
                    predicates.push(Predicate::in_any_channel(channels));
                }
                if let Some(range) = &range {
                    predicates.push(Predicate::InVersionRange(range.clone()));
                }
                if let Some(installed) = successor_seed {
                    predicates.push(
                        Predicate::successor_of(installed, &content.channels, &content.bundles)
                            .map_err(Error::UpgradeEdges)?,
                    );
                }
                if let Some(semver) = &semver_successors {
                    predicates.push(semver.clone());
                }
                let chain = Predicate::and(predicates);

                let mut matches = filter(&content.bundles, &chain);
                stat.matched_bundles = matches.len();
                stats.push(stat);
                for bundle in content.bundles.iter() {
                    if let Some(rejected_by) = chain.rejection(bundle) {
                        tracing::debug!(
                            catalog = %catalog.name,
                            bundle = bundle.name(),
                            %rejected_by,
                            "Bundle filtered out"
                        );
                    }
                }
                if matches.is_empty() {
                    return Ok(());
                }

                let deprecation = content.deprecation().cloned();
                matches.sort_by_cached_key(|b| ranking_key(b, scope.as_ref()));
                if let Some(deprecation) = &deprecation {
                    // stable, so the ranking holds within each group
                    let by_dep = by_deprecation(deprecation);
                    matches.sort_by(|a, b| by_dep(a.as_ref(), b.as_ref()));
                }

                let bundle = Arc::clone(&matches[0]);
                let deprecated = deprecation
                    .as_ref()
                    .is_some_and(|d| d.is_bundle_deprecated(bundle.name()));
                arbitrate(
                    &mut accepted,
                    Candidate {
                        bundle,
                        catalog: catalog.name.clone(),
                        priority: catalog.priority,
                        deprecation,
                        deprecated,
                    },
                );
                Ok(())
            })
            .await?;

        let winner = match pick_by_priority(accepted) {
            Ok(winner) => winner,
            Err(catalogs) => {
                tracing::info!(stats = %render_stats(&stats), "Resolution failed");
                let err = ResolutionError::no_match(
                    package,
                    request.version_range(),
                    request.channel(),
                    installed.map(|i| i.version.as_str()),
                );
                return Err(err.ambiguous(catalogs).into());
            }
        };

        let version = winner
            .bundle
            .version()
            .map_err(|source| Error::BundleVersion {
                bundle: winner.bundle.name().to_string(),
                source,
            })?
            .clone();

        for validation in &self.validations {
            validation(&winner.bundle).map_err(|reason| Error::Validation {
                bundle: winner.bundle.name().to_string(),
                reason,
            })?;
        }

        tracing::debug!(stats = %render_stats(&stats), "Resolution succeeded");
        Ok(Resolution {
            bundle: winner.bundle,
            version,
            catalog: winner.catalog,
            deprecation: winner.deprecation,
        })
    }
}

#[async_trait]
impl Resolver for CatalogResolver {
    async fn resolve(
        &self,
        request: &ResolutionRequest,
        installed: Option<&BundleMetadata>,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        self.resolve_inner(request, installed, cancel).await
    }
}

/// Ordering key of a candidate; a requested channel replaces the bundle's
/// own channel label.
fn ranking_key(bundle: &BundleEntity, channel: Option<&ChannelProperty>) -> SortKey {
    match channel {
        Some(channel) => sort_key_in_channel(bundle, channel),
        None => sort_key(bundle),
    }
}

/// Fold one catalog's candidate into the accepted set.
fn arbitrate(accepted: &mut Vec<Candidate>, candidate: Candidate) {
    if let Some(prior) = accepted.last() {
        match (candidate.deprecated, prior.deprecated) {
            (true, false) => {
                tracing::debug!(
                    catalog = %candidate.catalog,
                    bundle = candidate.bundle.name(),
                    "Skipping deprecated candidate"
                );
                return;
            }
            (false, true) => accepted.clear(),
            _ => {}
        }
    }
    accepted.push(candidate);
}

/// The single winner after priority ranking, or the catalogs left tied
/// (empty when nothing matched).
fn pick_by_priority(mut accepted: Vec<Candidate>) -> std::result::Result<Candidate, Vec<String>> {
    accepted.sort_by(|a, b| b.priority.cmp(&a.priority));
    let decisive = match accepted.as_slice() {
        [_] => true,
        [first, second, ..] => first.priority.cmp(&second.priority) != Ordering::Equal,
        [] => false,
    };
    if decisive {
        accepted.truncate(1);
        if let Some(winner) = accepted.pop() {
            return Ok(winner);
        }
    }
    Err(accepted.into_iter().map(|c| c.catalog).collect())
}

fn render_stats(stats: &[CatalogStat]) -> String {
    serde_json::to_string(stats).unwrap_or_default()
}
