//! Core module containing the list pipeline and its building blocks

pub mod auth;
pub mod descriptor;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod field;
pub mod filter;
pub mod pipeline;
pub mod query;
pub mod reference;
pub mod service;
pub mod shaper;
pub mod summary;

pub use auth::{HeaderSessionProvider, NoSessionProvider, RoleGate, Session, SessionProvider};
pub use descriptor::{ResourceDescriptor, SortDirection, SortOrder};
pub use entity::{Data, Entity};
pub use envelope::{Envelope, ListData};
pub use error::{TallyError, TallyResult};
pub use field::FieldValue;
pub use filter::Filter;
pub use pipeline::{ListEndpoint, ListPipeline, PipelineSettings};
pub use query::{DateRange, ListParams, ListQuery, PageLimits};
pub use reference::{DataServiceFetcher, EntityFetcher, ReferenceDirectory};
pub use service::{DataService, Page};
pub use summary::Summary;
