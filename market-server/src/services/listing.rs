//! Scoped listing and export

use shared::PaginatedResponse;
use shared::models::{Entity, Operation, ResourceType};

use super::MarketplaceEngine;
use crate::db::{FindOptions, SortOrder};
use crate::filter::{FilterCompiler, Predicate, UserFilters};
use crate::scope::ScopeSession;
use crate::utils::validation::MAX_PAGE_SIZE;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    /// 1-based; 0 is treated as 1
    pub page: u32,
    /// Falls back to the configured default page size
    pub page_size: Option<u32>,
    pub sort: Option<SortOrder>,
    pub filters: UserFilters,
}

impl MarketplaceEngine {
    /// One page of the records `session` may see, filtered by `params`.
    ///
    /// A missing read grant or an empty scope yields an empty page without
    /// touching storage.
    pub async fn list_scoped(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        params: &ListParams,
    ) -> AppResult<PaginatedResponse<Entity>> {
        let page = params.page.max(1);
        let page_size = params
            .page_size
            .unwrap_or(self.limits.default_page_size)
            .clamp(1, MAX_PAGE_SIZE);

        let Some(filter) = self.scoped_filter(session, resource, params).await? else {
            return Ok(PaginatedResponse::empty(page, page_size));
        };

        let mut options = FindOptions::page(page, page_size);
        options.sort = params.sort;
        let (total, items) = tokio::try_join!(
            self.repo.count(resource, &filter),
            self.repo.find_many(resource, &filter, &options),
        )?;

        tracing::debug!(
            principal_id = session.principal().id,
            resource = %resource,
            filter = %filter,
            total,
            "Scoped list"
        );
        Ok(PaginatedResponse::new(items, total, page, page_size))
    }

    /// Every visible match up to the export limit
    pub async fn export_scoped(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        params: &ListParams,
    ) -> AppResult<Vec<Entity>> {
        let Some(filter) = self.scoped_filter(session, resource, params).await? else {
            return Ok(Vec::new());
        };

        let mut options = FindOptions::limit(self.limits.export_limit);
        options.sort = params.sort;
        let rows = self.repo.find_many(resource, &filter, &options).await?;
        if rows.len() as u32 >= self.limits.export_limit {
            tracing::warn!(
                resource = %resource,
                limit = self.limits.export_limit,
                "Export truncated at limit"
            );
        }
        Ok(rows)
    }

    /// Validated user filter combined with the session's scope; `None` when
    /// nothing can match
    async fn scoped_filter(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        params: &ListParams,
    ) -> AppResult<Option<Predicate>> {
        // 输入错误先于任何范围计算返回
        let user = FilterCompiler::translate(resource, &params.filters)?;
        if let Some(sort) = params.sort
            && !resource.has_field(sort.field)
        {
            return Err(AppError::validation(format!(
                "{} cannot be sorted by '{}'",
                resource.label(),
                sort.field
            )));
        }

        let decision = self
            .resolver
            .resolve(session.principal(), resource, Operation::Read)
            .await;
        if !decision.granted {
            return Ok(None);
        }

        let scope = session.scope_for(resource).await?;
        let filter = FilterCompiler::compile(&scope, user);
        if filter.is_unsatisfiable() {
            return Ok(None);
        }
        Ok(Some(filter))
    }
}
