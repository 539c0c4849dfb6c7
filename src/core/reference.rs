//! Display-title resolution for referenced documents
//!
//! A list of sales carries `branch_id` values; the response also shows each
//! branch's name. [`EntityFetcher`] hides the concrete type of the referenced
//! resource so the shaper can look titles up by plural name.

use crate::core::entity::Data;
use crate::core::service::DataService;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Trait for fetching display titles without knowing the concrete type
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    /// Titles for the given ids. Ids that do not resolve are absent from the map.
    async fn titles(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>>;
}

/// [`EntityFetcher`] backed by a typed [`DataService`]
pub struct DataServiceFetcher<T: Data> {
    service: Arc<dyn DataService<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Data> DataServiceFetcher<T> {
    pub fn new(service: Arc<dyn DataService<T>>) -> Self {
        Self {
            service,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Data> EntityFetcher for DataServiceFetcher<T> {
    async fn titles(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        let docs = self.service.get_many(ids).await?;
        Ok(docs
            .into_iter()
            .map(|doc| (doc.id(), doc.display_title()))
            .collect())
    }
}

/// Fetchers for every referenceable resource, keyed by plural name
#[derive(Clone, Default)]
pub struct ReferenceDirectory {
    fetchers: HashMap<String, Arc<dyn EntityFetcher>>,
}

impl ReferenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plural: impl Into<String>, fetcher: Arc<dyn EntityFetcher>) {
        self.fetchers.insert(plural.into(), fetcher);
    }

    pub fn contains(&self, plural: &str) -> bool {
        self.fetchers.contains_key(plural)
    }

    /// Resolve titles for `ids` of the `plural` resource.
    ///
    /// Never fails: an unknown resource or a failed lookup yields an empty map
    /// so the affected documents fall back to the placeholder title.
    pub async fn resolve(&self, plural: &str, ids: &[Uuid]) -> HashMap<Uuid, String> {
        if ids.is_empty() {
            return HashMap::new();
        }
        let Some(fetcher) = self.fetchers.get(plural) else {
            tracing::debug!(resource = plural, "no fetcher registered for referenced resource");
            return HashMap::new();
        };
        match fetcher.titles(ids).await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!(resource = plural, error = %e, "title lookup failed, using placeholders");
                HashMap::new()
            }
        }
    }
}
