//! Shared test harness for storage and pipeline testing
//!
//! Provides deterministic ERP fixtures (branches and purchases with
//! second-precision timestamps, so they survive every backend unchanged),
//! plus `DataService` wrappers that count or fail data access.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

pub mod data_service_tests;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tally::core::auth::Session;
use tally::core::descriptor::SortOrder;
use tally::core::field::FieldValue;
use tally::core::filter::Filter;
use tally::core::summary::Summary;
use tally::core::{Data, DataService};
use tally::entities::{Branch, Purchase, Sale};
use tally::storage::InMemoryDataService;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 10:00 UTC on the given day of January 2024
pub fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
}

pub fn branch(name: &str) -> Branch {
    Branch::new(
        "active".to_string(),
        name.to_string(),
        format!("{} street", name),
        "555-0100".to_string(),
    )
    .with_created_at(jan(1))
}

/// A purchase dated and created on `day` of January 2024
pub fn purchase(reference: &str, branch_id: Option<Uuid>, grand_total: f64, day: u32) -> Purchase {
    Purchase::new(
        "received".to_string(),
        reference.to_string(),
        None,
        "Acme Supplies".to_string(),
        branch_id,
        jan(day),
        grand_total,
        grand_total,
        0.0,
        "paid".to_string(),
    )
    .with_created_at(jan(day))
}

pub fn sale(reference: &str, branch_id: Option<Uuid>, grand_total: f64, due: f64, day: u32) -> Sale {
    Sale::new(
        "completed".to_string(),
        reference.to_string(),
        None,
        "Walk-in".to_string(),
        branch_id,
        None,
        jan(day),
        grand_total,
        grand_total - due,
        due,
        if due > 0.0 { "due" } else { "paid" }.to_string(),
    )
    .with_created_at(jan(day))
}

/// Twelve purchases on days 1..=12: three in `b1` (days 2, 5, 9), the rest in
/// `b2`. References alternate between `INV-2024-NNNN` and `po-2023-NNNN`.
pub fn twelve_purchases(b1: Uuid, b2: Uuid) -> Vec<Purchase> {
    (1..=12u32)
        .map(|day| {
            let branch = if [2, 5, 9].contains(&day) { b1 } else { b2 };
            let reference = if day % 2 == 0 {
                format!("INV-2024-{:04}", day)
            } else {
                format!("po-2023-{:04}", day)
            };
            purchase(&reference, Some(branch), f64::from(day) * 10.0, day)
        })
        .collect()
}

pub fn admin() -> Session {
    Session::new(Uuid::new_v4(), "admin")
}

pub fn branch_user(branch_id: Uuid) -> Session {
    Session::new(Uuid::new_v4(), "branch").with_branch(branch_id)
}

// ---------------------------------------------------------------------------
// Instrumented services
// ---------------------------------------------------------------------------

/// Wraps an in-memory service and counts every read
#[derive(Clone)]
pub struct CountingDataService<T: Data> {
    inner: InMemoryDataService<T>,
    reads: Arc<AtomicUsize>,
}

impl<T: Data> CountingDataService<T> {
    pub fn new(entities: impl IntoIterator<Item = T>) -> Self {
        Self {
            inner: InMemoryDataService::with_entities(entities),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

impl CountingDataService<Purchase> {
    /// Look a purchase up without counting the read
    pub async fn find_one_by_reference(&self, reference: &str) -> Purchase {
        let filter = Filter::Eq {
            field: "reference".to_string(),
            value: FieldValue::String(reference.to_string()),
        };
        self.inner
            .find_page(&filter, &SortOrder::default(), 0, 1)
            .await
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("no purchase with reference {}", reference))
    }
}

#[async_trait]
impl<T: Data> DataService<T> for CountingDataService<T> {
    async fn create(&self, entity: T) -> Result<T> {
        self.inner.create(entity).await
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        self.hit();
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<T>> {
        self.hit();
        self.inner.get_many(ids).await
    }

    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        self.inner.update(id, entity).await
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn find_page(
        &self,
        filter: &Filter,
        sort: &SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>> {
        self.hit();
        self.inner.find_page(filter, sort, skip, limit).await
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.hit();
        self.inner.count(filter).await
    }

    async fn summarize(&self, filter: &Filter, sum_fields: &[String]) -> Result<Summary> {
        self.hit();
        self.inner.summarize(filter, sum_fields).await
    }
}

/// A store whose reads always fail with an internal-looking message
pub struct FailingDataService;

pub const INTERNAL_FAILURE: &str = "connection refused by 10.1.2.3:27017";

#[async_trait]
impl<T: Data> DataService<T> for FailingDataService {
    async fn create(&self, entity: T) -> Result<T> {
        Ok(entity)
    }

    async fn get(&self, _id: &Uuid) -> Result<Option<T>> {
        Err(anyhow!(INTERNAL_FAILURE))
    }

    async fn get_many(&self, _ids: &[Uuid]) -> Result<Vec<T>> {
        Err(anyhow!(INTERNAL_FAILURE))
    }

    async fn update(&self, _id: &Uuid, entity: T) -> Result<T> {
        Ok(entity)
    }

    async fn delete(&self, _id: &Uuid) -> Result<()> {
        Ok(())
    }

    async fn find_page(&self, _: &Filter, _: &SortOrder, _: u64, _: u64) -> Result<Vec<T>> {
        Err(anyhow!(INTERNAL_FAILURE))
    }

    async fn count(&self, _: &Filter) -> Result<u64> {
        Err(anyhow!(INTERNAL_FAILURE))
    }

    async fn summarize(&self, _: &Filter, _: &[String]) -> Result<Summary> {
        Err(anyhow!(INTERNAL_FAILURE))
    }
}

// ---------------------------------------------------------------------------
// Assertion helpers
// ---------------------------------------------------------------------------

/// Assert that a list contains exactly `n` items.
pub fn assert_count<T>(list: &[T], expected: usize) {
    assert_eq!(
        list.len(),
        expected,
        "Expected {} items, got {}",
        expected,
        list.len()
    );
}

pub fn references(purchases: &[Purchase]) -> Vec<&str> {
    purchases.iter().map(|p| p.reference.as_str()).collect()
}
