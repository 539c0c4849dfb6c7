//! In-memory implementation of DataService for testing and development

use crate::core::descriptor::{SortDirection, SortOrder};
use crate::core::field::FieldValue;
use crate::core::filter::Filter;
use crate::core::summary::Summary;
use crate::core::{Data, DataService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory data service implementation
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Every read evaluates the [`Filter`] against all stored documents.
#[derive(Clone)]
pub struct InMemoryDataService<T: Data> {
    entities: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Data> InMemoryDataService<T> {
    /// Create a new, empty in-memory data service
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a service holding the given documents
    pub fn with_entities(entities: impl IntoIterator<Item = T>) -> Self {
        let map = entities.into_iter().map(|e| (e.id(), e)).collect();
        Self {
            entities: Arc::new(RwLock::new(map)),
        }
    }

    pub fn len(&self) -> Result<usize> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(entities.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Matching documents in sort order
    fn matching(&self, filter: &Filter, sort: Option<&SortOrder>) -> Result<Vec<T>> {
        let matcher = filter
            .matcher()
            .map_err(|e| anyhow!("Invalid search pattern: {}", e))?;
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut docs: Vec<T> = entities
            .values()
            .filter(|doc| matcher.matches(*doc))
            .cloned()
            .collect();

        if let Some(sort) = sort {
            docs.sort_by(|a, b| compare(a, b, sort));
        }
        Ok(docs)
    }
}

impl<T: Data> Default for InMemoryDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Order by the sort field, then by id so equal keys stay deterministic
fn compare<T: Data>(a: &T, b: &T, sort: &SortOrder) -> Ordering {
    let left = a.field_value(&sort.field).unwrap_or(FieldValue::Null);
    let right = b.field_value(&sort.field).unwrap_or(FieldValue::Null);
    let by_field = match sort.direction {
        SortDirection::Asc => left.sort_cmp(&right),
        SortDirection::Desc => right.sort_cmp(&left),
    };
    by_field.then_with(|| a.id().cmp(&b.id()))
}

#[async_trait]
impl<T: Data> DataService<T> for InMemoryDataService<T> {
    async fn create(&self, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        entities.insert(entity.id(), entity.clone());

        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities.get(id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(ids.iter().filter_map(|id| entities.get(id).cloned()).collect())
    }

    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        entities
            .get_mut(id)
            .ok_or_else(|| anyhow!("Entity not found"))?;

        entities.insert(*id, entity.clone());

        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        entities.remove(id);

        Ok(())
    }

    async fn find_page(
        &self,
        filter: &Filter,
        sort: &SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>> {
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .matching(filter, Some(sort))?
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        Ok(self.matching(filter, None)?.len() as u64)
    }

    async fn summarize(&self, filter: &Filter, sum_fields: &[String]) -> Result<Summary> {
        Ok(Summary::over(self.matching(filter, None)?.iter(), sum_fields))
    }
}
