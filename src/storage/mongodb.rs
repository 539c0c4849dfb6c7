//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides `MongoDataService<T>` backed by a MongoDB database via
//! `mongodb::Database`.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! tally-rs = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Storage model
//!
//! Each `MongoDataService<T>` operates on a collection named after
//! `T::resource_name()` (e.g., "sales", "purchases").
//!
//! # Serialization strategy
//!
//! Documents are serialized via `serde_json::Value` as an intermediate format,
//! then converted to BSON. UUIDs are stored as strings. Timestamp fields are
//! stored as native BSON dates so `dateRange` bounds and date sorts are
//! evaluated by the server; BSON dates keep millisecond precision. The `id`
//! field is mapped to MongoDB's `_id` convention.
//!
//! # Filters
//!
//! A [`Filter`] is translated into a MongoDB query document: free-text
//! matches become `$regex` with the escaped needle and the `i` option, date
//! ranges become `$gte`/`$lte`. Summaries run as a single `$group` aggregation.

use crate::core::descriptor::{SortDirection, SortOrder};
use crate::core::error::StorageError;
use crate::core::field::FieldValue;
use crate::core::filter::Filter;
use crate::core::summary::Summary;
use crate::core::{Data, DataService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::ErrorKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

const BACKEND: &str = "MongoDB";

/// Classify a driver error so the failure keeps its backend and kind.
fn driver_error(action: String, err: mongodb::error::Error) -> anyhow::Error {
    let storage = match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => StorageError::Unavailable {
            backend: BACKEND.to_string(),
        },
        ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::Authentication { .. } => StorageError::ConnectionError {
            backend: BACKEND.to_string(),
            message: format!("{}: {}", action, err),
        },
        _ => StorageError::QueryError {
            backend: BACKEND.to_string(),
            message: format!("{}: {}", action, err),
        },
    };
    storage.into()
}

/// The driver sends `skip` as a signed 64-bit integer.
fn bson_skip(skip: u64) -> u64 {
    skip.min(i64::MAX as u64)
}

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document,
/// renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: serde_json::Value) -> Result<Document> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| anyhow!("Failed to convert JSON to BSON: {}", e))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(anyhow!("Expected BSON document, got non-object")),
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value,
/// renaming `_id` → `id` and rendering BSON dates as RFC 3339 strings.
fn document_to_json(mut doc: Document) -> serde_json::Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    let dates: Vec<(String, String)> = doc
        .iter()
        .filter_map(|(key, value)| match value {
            Bson::DateTime(at) => at.try_to_rfc3339_string().ok().map(|s| (key.clone(), s)),
            _ => None,
        })
        .collect();
    for (key, rendered) in dates {
        doc.insert(key, Bson::String(rendered));
    }

    Bson::Document(doc).into_relaxed_extjson()
}

/// Convert a UUID to its BSON string representation for queries.
fn uuid_bson(id: &Uuid) -> Bson {
    Bson::String(id.to_string())
}

fn date_bson(at: &DateTime<Utc>) -> Bson {
    Bson::DateTime(mongodb::bson::DateTime::from_millis(at.timestamp_millis()))
}

/// Map a document field name to its stored key
fn stored_key(field: &str) -> &str {
    if field == "id" { "_id" } else { field }
}

fn field_bson(value: &FieldValue) -> Bson {
    match value {
        FieldValue::String(s) => Bson::String(s.clone()),
        FieldValue::Integer(i) => Bson::Int64(*i),
        FieldValue::Float(f) => Bson::Double(*f),
        FieldValue::Boolean(b) => Bson::Boolean(*b),
        FieldValue::Uuid(id) => uuid_bson(id),
        FieldValue::DateTime(at) => date_bson(at),
        FieldValue::Null => Bson::Null,
    }
}

/// Translate a filter into a MongoDB query document
fn filter_to_document(filter: &Filter) -> Document {
    match filter {
        Filter::All => doc! {},
        Filter::And(inner) if inner.is_empty() => doc! {},
        Filter::Or(inner) if inner.is_empty() => doc! { "_id": { "$in": [] } },
        Filter::And(inner) => {
            let parts: Vec<Document> = inner.iter().map(filter_to_document).collect();
            doc! { "$and": parts }
        }
        Filter::Or(inner) => {
            let parts: Vec<Document> = inner.iter().map(filter_to_document).collect();
            doc! { "$or": parts }
        }
        Filter::Eq { field, value } => {
            let mut d = Document::new();
            match value {
                FieldValue::Null => d.insert(stored_key(field), doc! { "$in": [] }),
                other => d.insert(stored_key(field), field_bson(other)),
            };
            d
        }
        Filter::Contains { field, needle } => {
            let mut d = Document::new();
            d.insert(
                stored_key(field),
                doc! { "$regex": regex::escape(needle), "$options": "i" },
            );
            d
        }
        Filter::Between { field, start, end } => {
            let mut d = Document::new();
            d.insert(
                stored_key(field),
                doc! { "$gte": date_bson(start), "$lte": date_bson(end) },
            );
            d
        }
    }
}

fn sort_document(sort: &SortOrder) -> Document {
    let direction = match sort.direction {
        SortDirection::Asc => 1,
        SortDirection::Desc => -1,
    };
    let mut d = Document::new();
    d.insert(stored_key(&sort.field), direction);
    if sort.field != "id" {
        d.insert("_id", 1);
    }
    d
}

fn bson_f64(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Double(f)) => *f,
        Some(Bson::Int32(i)) => f64::from(*i),
        Some(Bson::Int64(i)) => *i as f64,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// MongoDataService<T>
// ---------------------------------------------------------------------------

/// Generic data storage service backed by MongoDB.
///
/// # Type bounds
///
/// `T` must implement:
/// - `Data` — document trait hierarchy (Entity + Data)
/// - `Serialize` — for serializing documents to BSON
/// - `DeserializeOwned` — for deserializing BSON to documents
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use tally::storage::MongoDataService;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let db = client.database("erp");
/// let service = MongoDataService::<Sale>::new(db);
/// let sale = service.create(sale).await?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoDataService<T> {
    database: Database,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> MongoDataService<T> {
    /// Create a new `MongoDataService` with the given database handle.
    pub fn new(database: Database) -> Self {
        Self {
            database,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl<T: Data + Serialize + DeserializeOwned> MongoDataService<T> {
    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(T::resource_name())
    }

    /// Convert a document into its stored form, with timestamps as BSON dates.
    fn entity_to_document(entity: &T) -> Result<Document> {
        let json = serde_json::to_value(entity)
            .map_err(|e| anyhow!("Failed to serialize entity: {}", e))?;
        let mut doc = json_to_document(json)?;

        let keys: Vec<String> = doc.keys().cloned().collect();
        for key in keys {
            if let Some(FieldValue::DateTime(at)) = entity.field_value(&key) {
                doc.insert(key, date_bson(&at));
            }
        }
        Ok(doc)
    }

    fn document_to_entity(doc: Document) -> Result<T> {
        let json = document_to_json(doc);
        serde_json::from_value(json).map_err(|e| {
            StorageError::DecodeError {
                resource: T::resource_name().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        let cursor = self
            .collection()
            .find(filter)
            .await
            .map_err(|e| driver_error(format!("Failed to query {}", T::resource_name()), e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| driver_error(format!("Failed to collect {}", T::resource_name()), e))?;

        docs.into_iter().map(Self::document_to_entity).collect()
    }
}

#[async_trait]
impl<T: Data + Serialize + DeserializeOwned> DataService<T> for MongoDataService<T> {
    async fn create(&self, entity: T) -> Result<T> {
        let doc = Self::entity_to_document(&entity)?;

        self.collection()
            .insert_one(doc)
            .await
            .map_err(|e| driver_error("Failed to create entity".to_string(), e))?;

        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let doc = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| driver_error("Failed to get entity".to_string(), e))?;

        doc.map(Self::document_to_entity).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Bson> = ids.iter().map(uuid_bson).collect();
        self.find_many(doc! { "_id": { "$in": ids } }).await
    }

    /// Replace an existing document.
    ///
    /// Returns `Err` if the document does not exist (no document matched).
    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        let doc = Self::entity_to_document(&entity)?;

        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(id) }, doc)
            .await
            .map_err(|e| driver_error("Failed to update entity".to_string(), e))?;

        if result.matched_count == 0 {
            return Err(anyhow!("Entity not found: {}", id));
        }

        Ok(entity)
    }

    /// Delete a document by UUID. Silently succeeds if it does not exist.
    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.collection()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| driver_error("Failed to delete entity".to_string(), e))?;

        Ok(())
    }

    async fn find_page(
        &self,
        filter: &Filter,
        sort: &SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let cursor = self
            .collection()
            .find(filter_to_document(filter))
            .sort(sort_document(sort))
            .skip(bson_skip(skip))
            .limit(limit)
            .await
            .map_err(|e| driver_error(format!("Failed to list {}", T::resource_name()), e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| driver_error(format!("Failed to collect {}", T::resource_name()), e))?;

        docs.into_iter().map(Self::document_to_entity).collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.collection()
            .count_documents(filter_to_document(filter))
            .await
            .map_err(|e| driver_error(format!("Failed to count {}", T::resource_name()), e))
    }

    async fn summarize(&self, filter: &Filter, sum_fields: &[String]) -> Result<Summary> {
        let mut group = doc! { "_id": Bson::Null, "count": { "$sum": 1 } };
        for (i, field) in sum_fields.iter().enumerate() {
            group.insert(format!("s{}", i), doc! { "$sum": format!("${}", field) });
        }
        let pipeline = vec![
            doc! { "$match": filter_to_document(filter) },
            doc! { "$group": group },
        ];

        let mut cursor = self
            .collection()
            .aggregate(pipeline)
            .await
            .map_err(|e| driver_error(format!("Failed to summarize {}", T::resource_name()), e))?;

        let mut summary = Summary::empty(sum_fields);
        if let Some(row) = cursor
            .try_next()
            .await
            .map_err(|e| {
                driver_error(format!("Failed to read summary for {}", T::resource_name()), e)
            })?
        {
            summary.count = bson_f64(row.get("count")) as u64;
            for (i, field) in sum_fields.iter().enumerate() {
                summary
                    .totals
                    .insert(field.clone(), bson_f64(row.get(format!("s{}", i))));
            }
        }
        Ok(summary)
    }
}
