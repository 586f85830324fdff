//! Resolver strategies keyed by source type.

use std::collections::BTreeMap;
use std::sync::Arc;

use ext_catalog::BundleMetadata;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::request::ResolutionRequest;
use crate::resolver::{Resolution, Resolver};

/// Dispatches a request to the resolver registered for its source type.
#[derive(Default, Clone)]
pub struct ResolverRegistry {
    resolvers: BTreeMap<String, Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resolver` for `source_type`, replacing any previous one.
    pub fn register(&mut self, source_type: impl Into<String>, resolver: Arc<dyn Resolver>) {
        self.resolvers.insert(source_type.into(), resolver);
    }

    pub fn get(&self, source_type: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers.get(source_type)
    }

    pub fn source_types(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
        installed: Option<&BundleMetadata>,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        let resolver = self
            .get(&request.source_type)
            .ok_or_else(|| Error::UnknownSourceType(request.source_type.clone()))?;
        tracing::debug!(
            source_type = %request.source_type,
            package = %request.package_name,
            "Dispatching resolution"
        );
        resolver.resolve(request, installed, cancel).await
    }
}
