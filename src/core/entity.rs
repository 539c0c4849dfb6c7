//! Entity traits defining the core abstraction for listable ERP documents

use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Base trait for all persisted documents.
///
/// Every document has:
/// - id: Unique, stable identifier
/// - created_at: Creation timestamp (the default sort key of list endpoints)
/// - updated_at: Last modification timestamp
/// - status: Current lifecycle status (e.g. "active", "pending", "completed")
pub trait Entity: Clone + Send + Sync + 'static {
    /// The plural resource name used in URLs and envelopes (e.g. "purchases")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g. "purchase")
    fn resource_name_singular() -> &'static str;

    /// Get the unique identifier for this document
    fn id(&self) -> Uuid;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;

    /// Get the document status
    fn status(&self) -> &str;

    /// Check if the document is active
    fn is_active(&self) -> bool {
        self.status() == "active"
    }
}

/// Trait for documents that can be listed, filtered and referenced.
pub trait Data: Entity {
    /// Human-readable title shown wherever another document references this one
    fn display_title(&self) -> String;

    /// Get the value of a specific field by name
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}
