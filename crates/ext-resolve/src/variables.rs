//! Joint resolution of several packages through the constraint solver.
//!
//! [`MultiPackageVariableSource`] turns required packages and a pool of
//! candidate bundles into solver variables:
//!
//! - one `required package <name>` variable per request, mandatory and
//!   depending on the bundles that match it;
//! - one variable per bundle reachable from those matches, depending on the
//!   providers of each package and GVK it requires;
//! - one uniqueness variable per package and per provided GVK, allowing at
//!   most one of their bundles.
//!
//! Every list of candidates follows the pool order, which is the bundle
//! ordering of [`ext_catalog::compare`] with deprecated bundles last, so the
//! solver prefers the same bundle the single-package resolver would. A
//! request naming a channel matches the bundles that channel lists and ranks
//! them as members of that channel.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ext_catalog::{
    BundleEntity, ChannelProperty, Gvk, PackageContent, Predicate, SortKey, VersionRange,
    sort_key, sort_key_in_channel,
};
use ext_solver::{Constraint, Identifier, Solver, Variable};

use crate::error::{Error, ResolutionError, Result};
use crate::selector::LabelSelector;
use crate::walker::CatalogWalker;

/// One package the caller wants installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub package_name: String,
    pub version_range: Option<String>,
    pub channel: Option<String>,
}

impl PackageRequest {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            version_range: None,
            channel: None,
        }
    }

    pub fn with_version_range(mut self, range: impl Into<String>) -> Self {
        self.version_range = Some(range.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// `name` or `name@range`.
impl FromStr for PackageRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('@') {
            Some((name, range)) if !range.trim().is_empty() => {
                Ok(Self::new(name.trim()).with_version_range(range.trim()))
            }
            Some((name, _)) => Ok(Self::new(name.trim())),
            None => Ok(Self::new(s.trim())),
        }
    }
}

impl fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.package_name)?;
        if let Some(range) = &self.version_range {
            write!(f, "@{range}")?;
        }
        Ok(())
    }
}

/// A candidate bundle and the catalog offering it.
#[derive(Debug, Clone)]
pub struct PoolBundle {
    pub catalog: String,
    pub bundle: Arc<BundleEntity>,
    /// Channels of the catalog that list the bundle.
    pub channels: Vec<ChannelProperty>,
    /// Whether the catalog's deprecation record lists the bundle.
    pub deprecated: bool,
}

impl PoolBundle {
    pub fn new(catalog: impl Into<String>, bundle: Arc<BundleEntity>) -> Self {
        Self {
            catalog: catalog.into(),
            bundle,
            channels: Vec::new(),
            deprecated: false,
        }
    }

    pub fn with_channel(mut self, name: impl Into<String>, priority: i64) -> Self {
        self.channels.push(ChannelProperty {
            channel_name: name.into(),
            priority,
        });
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Pool entries for every bundle of one catalog's package content.
    pub fn from_content(catalog: &str, content: &PackageContent) -> Vec<Self> {
        let deprecation = content.deprecation();
        content
            .bundles
            .iter()
            .map(|bundle| {
                let name = bundle.name();
                let mut entry = Self::new(catalog, Arc::clone(bundle)).with_deprecated(
                    deprecation.is_some_and(|d| d.is_bundle_deprecated(name)),
                );
                for channel in content.channels.iter().filter(|c| c.contains(name)) {
                    entry = entry.with_channel(channel.name.clone(), channel.priority);
                }
                entry
            })
            .collect()
    }

    /// The listing channel called `name`, if any.
    pub fn membership(&self, name: &str) -> Option<&ChannelProperty> {
        self.channels.iter().find(|c| c.channel_name == name)
    }

    /// `<bundle>-<package>-<catalog>`; unique across catalogs.
    pub fn variable_id(&self) -> Identifier {
        let package = self.bundle.package_name().unwrap_or_default();
        Identifier::new(format!("{}-{}-{}", self.bundle.name(), package, self.catalog))
    }
}

pub struct MultiPackageVariableSource {
    requests: Vec<PackageRequest>,
    pool: Vec<PoolBundle>,
}

impl MultiPackageVariableSource {
    /// Bundles whose package or version does not decode are left out of the
    /// pool; duplicates of an earlier bundle are dropped.
    pub fn new(requests: Vec<PackageRequest>, pool: Vec<PoolBundle>) -> Self {
        let mut seen = HashSet::new();
        let mut pool: Vec<PoolBundle> = pool
            .into_iter()
            .filter(|p| match p.bundle.version() {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(
                        catalog = %p.catalog,
                        bundle = p.bundle.name(),
                        error = %e,
                        "Leaving undecodable bundle out of the pool"
                    );
                    false
                }
            })
            .filter(|p| seen.insert(p.variable_id()))
            .collect();
        pool.sort_by_cached_key(|p| (p.deprecated, sort_key(&p.bundle)));
        Self { requests, pool }
    }

    pub fn pool(&self) -> &[PoolBundle] {
        &self.pool
    }

    pub fn variables(&self) -> Result<Vec<Variable>> {
        let mut variables = Vec::new();
        let mut queue: VecDeque<usize> = VecDeque::new();

        for request in &self.requests {
            let predicate = request_predicate(request)?;
            let matches = self.request_matches(request, &predicate);
            if matches.is_empty() {
                return Err(ResolutionError::no_match(
                    &request.package_name,
                    request.version_range.as_deref(),
                    request.channel.as_deref(),
                    None,
                )
                .into());
            }
            queue.extend(matches.iter().copied());
            variables.push(
                Variable::new(format!("required package {}", request.package_name))
                    .with(Constraint::mandatory())
                    .with(Constraint::dependency(self.ids(&matches))),
            );
        }

        let mut reached = vec![false; self.pool.len()];
        let mut bundle_variables: BTreeMap<usize, Variable> = BTreeMap::new();
        while let Some(i) = queue.pop_front() {
            if std::mem::replace(&mut reached[i], true) {
                continue;
            }
            let (variable, dependencies) = self.bundle_variable(i);
            queue.extend(dependencies);
            bundle_variables.insert(i, variable);
        }
        variables.extend(bundle_variables.into_values());

        let reached: Vec<usize> = (0..self.pool.len()).filter(|&i| reached[i]).collect();
        variables.extend(self.uniqueness(&reached));
        tracing::debug!(
            requests = self.requests.len(),
            bundles = reached.len(),
            variables = variables.len(),
            "Built solver variables"
        );
        Ok(variables)
    }

    /// The variable of pool bundle `i` and the pool positions it may need.
    fn bundle_variable(&self, i: usize) -> (Variable, Vec<usize>) {
        let entry = &self.pool[i];
        let id = entry.variable_id();
        let mut variable = Variable::new(id.clone());
        let mut dependencies = Vec::new();

        match entry.bundle.required_packages() {
            Ok(requirements) => {
                for req in requirements {
                    let providers = self.matching(|b| {
                        b.package_name().is_ok_and(|p| p == req.package_name)
                            && b.version().is_ok_and(|v| req.range.contains(v))
                    });
                    variable.push(
                        Constraint::dependency(self.ids(&providers)).pretty(format!(
                            "{id} requires package {:?} with version range {:?}",
                            req.package_name,
                            req.range.as_str()
                        )),
                    );
                    dependencies.extend(providers);
                }
            }
            Err(e) => variable.push(
                Constraint::prohibited().pretty(format!("{id} has invalid package requirements: {e}")),
            ),
        }

        match entry.bundle.required_gvks() {
            Ok(gvks) => {
                for gvk in gvks {
                    let providers = self.providers_of(gvk);
                    variable.push(
                        Constraint::dependency(self.ids(&providers))
                            .pretty(format!("{id} requires {gvk}")),
                    );
                    dependencies.extend(providers);
                }
            }
            Err(e) => variable.push(
                Constraint::prohibited().pretty(format!("{id} has invalid GVK requirements: {e}")),
            ),
        }

        (variable, dependencies)
    }

    fn uniqueness(&self, reached: &[usize]) -> Vec<Variable> {
        let mut by_package: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut by_gvk: BTreeMap<&Gvk, Vec<usize>> = BTreeMap::new();
        for &i in reached {
            let bundle = &self.pool[i].bundle;
            if let Ok(package) = bundle.package_name() {
                by_package.entry(package).or_default().push(i);
            }
            for gvk in bundle.provided_gvks().unwrap_or_default() {
                by_gvk.entry(gvk).or_default().push(i);
            }
        }

        let packages = by_package.into_iter().map(|(package, members)| {
            Variable::new(format!("{package} package uniqueness"))
                .with(Constraint::at_most(1, self.ids(&members)))
        });
        let gvks = by_gvk.into_iter().map(|(gvk, members)| {
            Variable::new(format!("{gvk} gvk uniqueness"))
                .with(Constraint::at_most(1, self.ids(&members)))
        });
        packages.chain(gvks).collect()
    }

    /// Pool positions matching one request. Without a channel they follow the
    /// pool order; with one they are ranked as members of that channel.
    fn request_matches(&self, request: &PackageRequest, predicate: &Predicate) -> Vec<usize> {
        let Some(channel) = request.channel.as_deref() else {
            return self.matching(|b| predicate.evaluate(b));
        };
        let mut scoped: Vec<((bool, SortKey), usize)> = self
            .pool
            .iter()
            .enumerate()
            .filter(|(_, p)| predicate.evaluate(&p.bundle))
            .filter_map(|(i, p)| {
                let member = p.membership(channel)?;
                Some(((p.deprecated, sort_key_in_channel(&p.bundle, member)), i))
            })
            .collect();
        scoped.sort();
        scoped.into_iter().map(|(_, i)| i).collect()
    }

    fn matching(&self, keep: impl Fn(&BundleEntity) -> bool) -> Vec<usize> {
        (0..self.pool.len())
            .filter(|&i| keep(&self.pool[i].bundle))
            .collect()
    }

    fn providers_of(&self, gvk: &Gvk) -> Vec<usize> {
        self.matching(|b| b.provided_gvks().is_ok_and(|provided| provided.contains(gvk)))
    }

    fn ids(&self, positions: &[usize]) -> Vec<Identifier> {
        positions.iter().map(|&i| self.pool[i].variable_id()).collect()
    }
}

fn request_predicate(request: &PackageRequest) -> Result<Predicate> {
    let mut predicates = vec![Predicate::PackageName(request.package_name.clone())];
    if let Some(raw) = &request.version_range {
        let range = VersionRange::parse(raw).map_err(|source| Error::InvalidVersionRange {
            range: raw.clone(),
            source,
        })?;
        predicates.push(Predicate::InVersionRange(range));
    }
    Ok(Predicate::and(predicates))
}

/// Solve `requests` against `pool`; the selection follows the bundle ordering.
pub fn solve_packages(
    requests: Vec<PackageRequest>,
    pool: Vec<PoolBundle>,
    solver: &Solver,
) -> Result<Vec<PoolBundle>> {
    let source = MultiPackageVariableSource::new(requests, pool);
    let variables = source.variables()?;
    let solution = solver.solve(&variables)?;

    let selected: Vec<PoolBundle> = source
        .pool
        .into_iter()
        .filter(|p| solution.contains(&p.variable_id()))
        .collect();
    tracing::debug!(selected = selected.len(), "Packages solved");
    Ok(selected)
}

/// Every bundle of every available catalog matching `selector`.
pub async fn collect_pool(
    walker: &CatalogWalker<'_>,
    selector: &LabelSelector,
) -> Result<Vec<PoolBundle>> {
    let mut pool = Vec::new();
    for catalog in walker.catalogs(selector).await? {
        for package in walker.package_names(&catalog).await? {
            let content = walker.fetch(&catalog, &package).await?;
            pool.extend(PoolBundle::from_content(&catalog.name, &content));
        }
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ext_catalog::{Entity, property};
    use pretty_assertions::assert_eq;

    fn bundle(catalog: &str, name: &str, package: &str, version: &str) -> (PoolBundle, Entity) {
        let entity = Entity::new(name, Default::default())
            .with_property(
                property::TYPE_PACKAGE,
                format!(r#"{{"packageName":"{package}","version":"{version}"}}"#),
            )
            .with_property(property::TYPE_CHANNEL, r#"{"channelName":"stable"}"#);
        (
            PoolBundle::new(catalog, Arc::new(BundleEntity::new(entity.clone()))),
            entity,
        )
    }

    fn pool_entry(catalog: &str, entity: Entity) -> PoolBundle {
        PoolBundle::new(catalog, Arc::new(BundleEntity::new(entity)))
    }

    fn names(selected: &[PoolBundle]) -> Vec<&str> {
        selected.iter().map(|p| p.bundle.name()).collect()
    }

    #[test]
    fn test_parse_package_request() {
        let plain: PackageRequest = "foo".parse().unwrap();
        assert_eq!(plain, PackageRequest::new("foo"));
        let ranged: PackageRequest = "foo@>=1.0.0 <2.0.0".parse().unwrap();
        assert_eq!(ranged.version_range.as_deref(), Some(">=1.0.0 <2.0.0"));
        assert_eq!(ranged.to_string(), "foo@>=1.0.0 <2.0.0");
    }

    #[test]
    fn test_variable_id() {
        let (entry, _) = bundle("hub", "foo.v1", "foo", "1.0.0");
        assert_eq!(entry.variable_id().as_str(), "foo.v1-foo-hub");
    }

    #[test]
    fn test_picks_highest_version() {
        let pool = vec![
            bundle("hub", "foo.v1", "foo", "1.0.0").0,
            bundle("hub", "foo.v2", "foo", "2.0.0").0,
        ];
        let selected = solve_packages(vec![PackageRequest::new("foo")], pool, &Solver::new()).unwrap();
        assert_eq!(names(&selected), vec!["foo.v2"]);
    }

    #[test]
    fn test_required_package_pulled_in() {
        let (_, foo) = bundle("hub", "foo.v1", "foo", "1.0.0");
        let foo = foo.with_property(
            property::TYPE_PACKAGE_REQUIRED,
            r#"[{"packageName":"bar","versionRange":"<2.0.0"}]"#,
        );
        let pool = vec![
            pool_entry("hub", foo),
            bundle("hub", "bar.v1", "bar", "1.0.0").0,
            bundle("hub", "bar.v2", "bar", "2.0.0").0,
            bundle("hub", "baz.v1", "baz", "1.0.0").0,
        ];
        let selected = solve_packages(vec![PackageRequest::new("foo")], pool, &Solver::new()).unwrap();
        assert_eq!(names(&selected), vec!["bar.v1", "foo.v1"]);
    }

    #[test]
    fn test_gvk_requirement_pulled_in() {
        let (_, app) = bundle("hub", "app.v1", "app", "1.0.0");
        let app = app.with_property(
            property::TYPE_GVK_REQUIRED,
            r#"[{"group":"db.io","version":"v1","kind":"Database"}]"#,
        );
        let (_, db) = bundle("hub", "db.v1", "db", "1.0.0");
        let db = db.with_property(
            property::TYPE_GVK,
            r#"[{"group":"db.io","version":"v1","kind":"Database"}]"#,
        );
        let pool = vec![pool_entry("hub", app), pool_entry("hub", db)];
        let selected = solve_packages(vec![PackageRequest::new("app")], pool, &Solver::new()).unwrap();
        assert_eq!(names(&selected), vec!["app.v1", "db.v1"]);
    }

    #[test]
    fn test_unsatisfiable_requirement_falls_back() {
        // foo.v2 needs a bar that does not exist, so foo.v1 is chosen
        let (_, foo2) = bundle("hub", "foo.v2", "foo", "2.0.0");
        let foo2 = foo2.with_property(
            property::TYPE_PACKAGE_REQUIRED,
            r#"[{"packageName":"bar","versionRange":">=1.0.0"}]"#,
        );
        let pool = vec![pool_entry("hub", foo2), bundle("hub", "foo.v1", "foo", "1.0.0").0];
        let selected = solve_packages(vec![PackageRequest::new("foo")], pool, &Solver::new()).unwrap();
        assert_eq!(names(&selected), vec!["foo.v1"]);
    }

    #[test]
    fn test_conflicting_requests_are_unsatisfiable() {
        let (_, foo) = bundle("hub", "foo.v1", "foo", "1.0.0");
        let foo = foo.with_property(
            property::TYPE_PACKAGE_REQUIRED,
            r#"[{"packageName":"bar","versionRange":"<2.0.0"}]"#,
        );
        let pool = vec![
            pool_entry("hub", foo),
            bundle("hub", "bar.v1", "bar", "1.0.0").0,
            bundle("hub", "bar.v2", "bar", "2.0.0").0,
        ];
        let requests = vec![
            PackageRequest::new("foo"),
            PackageRequest::new("bar").with_version_range(">=2.0.0"),
        ];
        let err = solve_packages(requests, pool, &Solver::new()).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("constraints not satisfiable: "), "{message}");
        assert!(
            message.contains("bar package uniqueness permits at most 1 of bar.v1-bar-hub, bar.v2-bar-hub"),
            "{message}"
        );
    }

    #[test]
    fn test_request_without_match() {
        let pool = vec![bundle("hub", "foo.v1", "foo", "1.0.0").0];
        let err = solve_packages(
            vec![PackageRequest::new("foo").with_version_range(">=3.0.0")],
            pool,
            &Solver::new(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"no package "foo" matching version ">=3.0.0" found"#
        );
    }

    #[test]
    fn test_undecodable_bundles_left_out() {
        let broken = Entity::new("foo.broken", Default::default())
            .with_property(property::TYPE_PACKAGE, r#"{"packageName":"foo"}"#);
        let pool = vec![pool_entry("hub", broken), bundle("hub", "foo.v1", "foo", "1.0.0").0];
        let source = MultiPackageVariableSource::new(vec![PackageRequest::new("foo")], pool);
        assert_eq!(source.pool().len(), 1);
    }

    #[test]
    fn test_channel_request_matches_listed_bundles() {
        // foo.v2 carries the stable label but beta lists it too
        let pool = vec![
            bundle("hub", "foo.v1", "foo", "1.0.0").0.with_channel("stable", 0),
            bundle("hub", "foo.v2", "foo", "2.0.0")
                .0
                .with_channel("stable", 0)
                .with_channel("beta", 1),
        ];
        let selected = solve_packages(
            vec![PackageRequest::new("foo").with_channel("beta")],
            pool,
            &Solver::new(),
        )
        .unwrap();
        assert_eq!(names(&selected), vec!["foo.v2"]);
    }

    #[test]
    fn test_channel_request_prefers_channel_head() {
        let (_, v3) = bundle("hub", "foo.v3", "foo", "3.0.0");
        let v3 = v3.with_property(property::TYPE_CHANNEL, r#"{"channelName":"beta","priority":1}"#);
        let pool = vec![
            bundle("hub", "foo.v1", "foo", "1.0.0").0.with_channel("stable", 0),
            bundle("hub", "foo.v2", "foo", "2.0.0")
                .0
                .with_channel("stable", 0)
                .with_channel("beta", 1),
            pool_entry("hub", v3).with_channel("beta", 1),
        ];
        let beta = solve_packages(
            vec![PackageRequest::new("foo").with_channel("beta")],
            pool.clone(),
            &Solver::new(),
        )
        .unwrap();
        assert_eq!(names(&beta), vec!["foo.v3"]);

        let any = solve_packages(vec![PackageRequest::new("foo")], pool, &Solver::new()).unwrap();
        assert_eq!(names(&any), vec!["foo.v2"]);
    }

    #[test]
    fn test_channel_request_without_listing() {
        let pool = vec![bundle("hub", "foo.v1", "foo", "1.0.0").0.with_channel("stable", 0)];
        let err = solve_packages(
            vec![PackageRequest::new("foo").with_channel("beta")],
            pool,
            &Solver::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), r#"no package "foo" in channel "beta" found"#);
    }

    #[test]
    fn test_deprecated_bundles_rank_last() {
        let pool = vec![
            bundle("hub", "foo.v1", "foo", "1.0.0").0,
            bundle("hub", "foo.v2", "foo", "2.0.0").0.with_deprecated(true),
        ];
        let selected = solve_packages(vec![PackageRequest::new("foo")], pool, &Solver::new()).unwrap();
        assert_eq!(names(&selected), vec!["foo.v1"]);
    }

    #[test]
    fn test_pool_from_content() {
        use ext_test_utils::{BundleBuilder, CatalogBuilder, ChannelBuilder};

        let config = CatalogBuilder::new()
            .channel(ChannelBuilder::new("foo", "stable").entry("foo.v1"))
            .channel(ChannelBuilder::new("foo", "beta").priority(1).entry("foo.v1").entry("foo.v2"))
            .bundle(BundleBuilder::new("foo", "foo.v1", "1.0.0"))
            .bundle(BundleBuilder::new("foo", "foo.v2", "2.0.0"))
            .deprecate_bundle("foo", "foo.v2", "broken")
            .build();
        let pool = PoolBundle::from_content("hub", &config.package_content("foo"));
        let summary: Vec<(&str, Vec<&str>, bool)> = pool
            .iter()
            .map(|p| {
                let channels = p.channels.iter().map(|c| c.channel_name.as_str()).collect();
                (p.bundle.name(), channels, p.deprecated)
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("foo.v1", vec!["stable", "beta"], false),
                ("foo.v2", vec!["beta"], true),
            ]
        );
    }

    #[test]
    fn test_same_bundle_in_two_catalogs_gets_two_variables() {
        let pool = vec![
            bundle("a", "foo.v1", "foo", "1.0.0").0,
            bundle("b", "foo.v1", "foo", "1.0.0").0,
            bundle("a", "foo.v1", "foo", "1.0.0").0,
        ];
        let source = MultiPackageVariableSource::new(vec![PackageRequest::new("foo")], pool);
        let ids: Vec<String> = source.pool().iter().map(|p| p.variable_id().to_string()).collect();
        assert_eq!(ids, vec!["foo.v1-foo-a", "foo.v1-foo-b"]);
    }
}
