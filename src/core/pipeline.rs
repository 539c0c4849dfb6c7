//! The list pipeline: authorize, normalize, compile, fetch, summarize, shape
//!
//! [`ListPipeline`] is generic over the document type and driven entirely by a
//! [`ResourceDescriptor`]; no resource has pipeline code of its own.
//! [`ListEndpoint`] erases the document type so the HTTP layer can hold one
//! pipeline per resource in a single registry.

use crate::core::auth::{RoleGate, Session};
use crate::core::descriptor::ResourceDescriptor;
use crate::core::entity::Data;
use crate::core::envelope::ListData;
use crate::core::error::{AuthorizationError, StorageError, TallyError, TallyResult, ValidationError};
use crate::core::field::FieldValue;
use crate::core::filter::{Filter, compile};
use crate::core::query::{ListParams, ListQuery, PageLimits};
use crate::core::reference::ReferenceDirectory;
use crate::core::service::{DataService, Page};
use crate::core::shaper::ResponseShaper;
use crate::core::summary::Summary;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Settings shared by every pipeline of a server
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub limits: PageLimits,

    /// Title shown when a referenced document cannot be resolved
    pub placeholder_title: String,

    /// Roles restricted to their own branch on branch-scoped resources
    pub branch_scoped_roles: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            limits: PageLimits::default(),
            placeholder_title: "N/A".to_string(),
            branch_scoped_roles: vec!["branch".to_string()],
        }
    }
}

/// Type-erased list endpoint for one resource
#[async_trait]
pub trait ListEndpoint: Send + Sync {
    fn descriptor(&self) -> &ResourceDescriptor;

    /// Run a list request and return the shaped payload
    async fn list(&self, session: Option<&Session>, params: &ListParams) -> TallyResult<ListData>;

    /// Load and shape a single document by its raw path id
    async fn get(&self, session: Option<&Session>, id: &str) -> TallyResult<Value>;
}

/// Generic list pipeline for documents of type `T`
pub struct ListPipeline<T: Data> {
    descriptor: Arc<ResourceDescriptor>,
    service: Arc<dyn DataService<T>>,
    references: Arc<ReferenceDirectory>,
    settings: Arc<PipelineSettings>,
}

impl<T: Data> Clone for ListPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            service: self.service.clone(),
            references: self.references.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<T: Data + Serialize> ListPipeline<T> {
    pub fn new(
        descriptor: Arc<ResourceDescriptor>,
        service: Arc<dyn DataService<T>>,
        references: Arc<ReferenceDirectory>,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            descriptor,
            service,
            references,
            settings,
        }
    }

    /// Role check. Runs before anything touches the store.
    pub fn authorize<'s>(&self, session: Option<&'s Session>) -> Result<&'s Session, AuthorizationError> {
        let Some(session) = session else {
            tracing::warn!(resource = %self.descriptor.plural, "anonymous list request denied");
            return Err(AuthorizationError::Unauthenticated);
        };
        if !RoleGate::allows(Some(session), &self.descriptor.roles) {
            tracing::warn!(
                resource = %self.descriptor.plural,
                role = session.role().unwrap_or("<none>"),
                user_id = %session.user_id,
                "list request denied"
            );
            return Err(AuthorizationError::Forbidden {
                resource: self.descriptor.plural.clone(),
            });
        }
        Ok(session)
    }

    /// The branch a session is pinned to on this resource, if any
    fn pinned_branch(&self, session: &Session) -> Result<Option<Uuid>, AuthorizationError> {
        if !self.descriptor.branch_scoped
            || self.descriptor.branch_key().is_none()
            || !session.has_role(&self.settings.branch_scoped_roles)
        {
            return Ok(None);
        }
        match session.branch_id {
            Some(branch) => Ok(Some(branch)),
            None => {
                tracing::warn!(
                    resource = %self.descriptor.plural,
                    user_id = %session.user_id,
                    "branch-scoped role without a branch"
                );
                Err(AuthorizationError::Forbidden {
                    resource: self.descriptor.plural.clone(),
                })
            }
        }
    }

    /// Compile the filter for a query, narrowed to the caller's branch when pinned
    pub fn filter_for(&self, query: &ListQuery, pinned_branch: Option<Uuid>) -> Filter {
        let filter = compile(query, &self.descriptor);
        match (pinned_branch, self.descriptor.branch_key()) {
            (Some(branch), Some(fk)) => Filter::all_of(vec![
                filter,
                Filter::Eq {
                    field: fk.field.clone(),
                    value: FieldValue::Uuid(branch),
                },
            ]),
            _ => filter,
        }
    }

    /// Fetch one page, the total count and, if enabled, the summary row.
    ///
    /// The three reads share one filter and run concurrently. Any failure
    /// fails the whole fetch; a partial page is never returned.
    pub async fn fetch(&self, query: &ListQuery, filter: &Filter) -> TallyResult<(Page<T>, Option<Summary>)> {
        let summary = async {
            if self.descriptor.summary {
                self.service
                    .summarize(filter, &self.descriptor.sum_fields)
                    .await
                    .map(Some)
            } else {
                Ok(None)
            }
        };

        let (items, total_count, summary) = futures::try_join!(
            self.service
                .find_page(filter, &self.descriptor.sort, query.skip(), query.page_size),
            self.service.count(filter),
            summary,
        )
        .map_err(StorageError::from)?;

        let page = Page {
            items,
            total_count,
            is_next: query.is_next(total_count),
        };
        Ok((page, summary))
    }

    pub async fn list(&self, session: Option<&Session>, params: &ListParams) -> TallyResult<ListData> {
        let session = self.authorize(session)?;
        let query = params.normalize(&self.descriptor, &self.settings.limits)?;
        let pinned = self.pinned_branch(session)?;
        let filter = self.filter_for(&query, pinned);

        tracing::debug!(
            resource = %self.descriptor.plural,
            page = query.page,
            page_size = query.page_size,
            filter = ?filter,
            "running list query"
        );

        let (page, summary) = self.fetch(&query, &filter).await?;

        let items = ResponseShaper::new(
            &self.descriptor,
            &self.references,
            &self.settings.placeholder_title,
        )
        .shape(&page.items)
        .await?;

        tracing::debug!(
            resource = %self.descriptor.plural,
            returned = items.len(),
            total_count = page.total_count,
            is_next = page.is_next,
            "list query complete"
        );

        Ok(ListData {
            plural: self.descriptor.plural.clone(),
            items,
            summary,
            is_next: page.is_next,
            total_count: page.total_count,
        })
    }

    pub async fn get(&self, session: Option<&Session>, id: &str) -> TallyResult<Value> {
        let session = self.authorize(session)?;
        let id = Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidId {
            value: id.to_string(),
        })?;
        let pinned = self.pinned_branch(session)?;

        let not_found = || TallyError::not_found(&self.descriptor.name, id);
        let doc = self
            .service
            .get(&id)
            .await
            .map_err(StorageError::from)?
            .ok_or_else(not_found)?;

        if let (Some(branch), Some(fk)) = (pinned, self.descriptor.branch_key())
            && doc.field_value(&fk.field).and_then(|v| v.as_uuid()) != Some(branch)
        {
            return Err(not_found());
        }

        let shaped = ResponseShaper::new(
            &self.descriptor,
            &self.references,
            &self.settings.placeholder_title,
        )
        .shape_one(&doc)
        .await?;
        Ok(shaped)
    }
}

#[async_trait]
impl<T: Data + Serialize> ListEndpoint for ListPipeline<T> {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    async fn list(&self, session: Option<&Session>, params: &ListParams) -> TallyResult<ListData> {
        ListPipeline::list(self, session, params).await
    }

    async fn get(&self, session: Option<&Session>, id: &str) -> TallyResult<Value> {
        ListPipeline::get(self, session, id).await
    }
}
