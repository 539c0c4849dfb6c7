//! Service trait for listable data

use crate::core::Data;
use crate::core::descriptor::SortOrder;
use crate::core::filter::Filter;
use crate::core::summary::Summary;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Service trait for managing listable documents
///
/// Implementations provide basic CRUD plus the three read operations a list
/// request fans out to: a page of matches, the total match count and the
/// summary row. All three receive the same [`Filter`].
/// The pipeline is agnostic to the underlying storage mechanism.
#[async_trait]
pub trait DataService<T: Data>: Send + Sync {
    /// Create a new document
    async fn create(&self, entity: T) -> Result<T>;

    /// Get a document by ID
    async fn get(&self, id: &Uuid) -> Result<Option<T>>;

    /// Get every document whose id is in `ids`. Unknown ids are skipped.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<T>>;

    /// Update an existing document
    async fn update(&self, id: &Uuid, entity: T) -> Result<T>;

    /// Delete a document
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// One page of matching documents, sorted with the id as tiebreak
    async fn find_page(
        &self,
        filter: &Filter,
        sort: &SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>>;

    /// Number of matching documents
    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Count and per-field sums over every matching document
    async fn summarize(&self, filter: &Filter, sum_fields: &[String]) -> Result<Summary>;
}

/// A page of results together with its pagination metadata
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub is_next: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            is_next: false,
        }
    }
}
