//! # Tally
//!
//! A declarative list-query pipeline for the REST API of a small-business ERP.
//!
//! Every listable resource (sales, purchases, customers, products, ...) is
//! described by a [`ResourceDescriptor`](core::descriptor::ResourceDescriptor)
//! and served by the same generic pipeline:
//!
//! - **Role gate**: the caller's role is checked before any data access
//! - **Normalization**: raw query parameters become a canonical query with
//!   safe pagination defaults
//! - **Filter compilation**: free-text search, named filters, foreign keys,
//!   categorical values and date ranges combine into one storage filter
//! - **Fetch**: one page, the total count and an optional summary row
//! - **Shaping**: referenced ids gain a human-readable `<stem>_title` field
//! - **Envelope**: every response is `{ success, data | error }`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tally::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new(TallyConfig::default_config())
//!         .with_session_provider(HeaderSessionProvider)
//!         .register_resource::<Branch, _>(InMemoryDataService::new())
//!         .register_resource::<Purchase, _>(InMemoryDataService::new())
//!         .serve("127.0.0.1:3000")
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        auth::{HeaderSessionProvider, NoSessionProvider, Session, SessionProvider},
        descriptor::{ResourceDescriptor, SortDirection, SortOrder},
        entity::{Data, Entity},
        envelope::{Envelope, ListData},
        error::{TallyError, TallyResult},
        field::FieldValue,
        filter::Filter,
        pipeline::{ListEndpoint, ListPipeline, PipelineSettings},
        query::{ListParams, ListQuery, PageLimits},
        reference::{EntityFetcher, ReferenceDirectory},
        service::{DataService, Page},
        summary::Summary,
    };

    // === Macros ===
    pub use crate::impl_listable_entity;

    // === Documents ===
    pub use crate::entities::{
        Branch, Category, Customer, Expense, Product, Purchase, Sale, StaffUser, Supplier,
    };

    // === Storage ===
    pub use crate::storage::InMemoryDataService;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoDataService;

    // === Config ===
    pub use crate::config::TallyConfig;

    // === Server ===
    pub use crate::server::{ResourceRegistry, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;

    // === Axum ===
    pub use axum::{Router, routing::get};
}
