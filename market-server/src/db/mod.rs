//! Database Module
//!
//! Storage seams consumed by the visibility engine:
//! - [`Repository`]: generic CRUD over every resource type
//! - [`PermissionStore`]: grant lookup by role, resource and operation
//!
//! Two backends implement both: [`MemoryStore`] (in-process, records every
//! query) and [`SqliteStore`] (sqlx connection pool with embedded migrations).

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryStore, QueryKind, QueryLog};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use shared::models::{
    Entity, EntityId, Field, Operation, Patch, PermissionGrant, ResourceType, RoleId,
};
use thiserror::Error;

use crate::filter::Predicate;
use crate::utils::AppError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row not found".to_string()),
            other => RepoError::Database(other.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::not_found(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => {
                tracing::error!(error = %msg, "Storage query failed");
                AppError::database("Internal query failure")
            }
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: Field,
    pub descending: bool,
}

impl SortOrder {
    pub fn asc(field: Field) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: Field) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    /// Newest first where the resource is timestamped, id order otherwise
    pub fn default_for(resource: ResourceType) -> Self {
        if resource.has_field(Field::CreatedAt) {
            Self::desc(Field::CreatedAt)
        } else {
            Self::asc(Field::Id)
        }
    }

    /// Parse `price`, `-price` or `price_desc` style sort keys
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, descending) = if let Some(name) = raw.strip_prefix('-') {
            (name, true)
        } else if let Some(name) = raw.strip_suffix("_desc") {
            (name, true)
        } else if let Some(name) = raw.strip_suffix("_asc") {
            (name, false)
        } else {
            (raw, false)
        };
        name.parse::<Field>().ok().map(|field| Self { field, descending })
    }
}

/// Sorting and paging for [`Repository::find_many`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<SortOrder>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FindOptions {
    /// 1-based page
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            sort: None,
            limit: Some(page_size),
            offset: Some(page.saturating_sub(1).saturating_mul(page_size)),
        }
    }

    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_many(
        &self,
        resource: ResourceType,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RepoResult<Vec<Entity>>;

    /// Ids of every matching record
    async fn find_ids(&self, resource: ResourceType, filter: &Predicate) -> RepoResult<Vec<EntityId>> {
        let rows = self
            .find_many(resource, filter, &FindOptions::default())
            .await?;
        Ok(rows.iter().map(Entity::id).collect())
    }

    async fn find_one(&self, resource: ResourceType, id: EntityId) -> RepoResult<Option<Entity>>;

    async fn count(&self, resource: ResourceType, filter: &Predicate) -> RepoResult<u64>;

    /// Apply `patch` and return the updated record
    async fn update(&self, resource: ResourceType, id: EntityId, patch: &Patch) -> RepoResult<Entity>;

    /// Returns false when no record had that id
    async fn delete(&self, resource: ResourceType, id: EntityId) -> RepoResult<bool>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn find_grants(
        &self,
        role_ids: &[RoleId],
        resource: ResourceType,
        operation: Operation,
    ) -> RepoResult<Vec<PermissionGrant>>;
}

/// Reject predicates and sorts naming columns the resource does not store
pub fn check_fields(
    resource: ResourceType,
    filter: &Predicate,
    sort: Option<&SortOrder>,
) -> RepoResult<()> {
    let sort_field = sort.map(|s| s.field);
    for field in filter.fields().into_iter().chain(sort_field) {
        if !resource.has_field(field) {
            return Err(RepoError::Validation(format!(
                "{} has no column '{}'",
                resource.label(),
                field
            )));
        }
    }
    Ok(())
}
