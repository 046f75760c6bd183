//! Resource API Handlers

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::Deserialize;
use serde_json::Value;
use shared::PaginatedResponse;
use shared::models::Entity;
use validator::Validate;

use crate::api::{json_rejection, parse_entity_id, parse_resource, path_rejection, query_rejection};
use crate::auth::CurrentPrincipal;
use crate::core::ServerState;
use crate::db::SortOrder;
use crate::filter::UserFilters;
use crate::guard::BulkOutcome;
use crate::services::{BulkCommand, ListParams, MutationResult};
use crate::utils::time::{parse_lower_bound, parse_upper_bound};
use crate::utils::validation::validate_dto;
use crate::utils::{ApiResponse, AppError, AppResult};

/// Query params shared by list and export
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "pageSize must be between 1 and 100"))]
    pub page_size: Option<u32>,
    #[validate(length(max = 200, message = "search must be at most 200 characters"))]
    pub search: Option<String>,
    pub status: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub date_from: Option<String>,
    /// `YYYY-MM-DD` (whole day included) or RFC 3339 (exclusive)
    pub date_to: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// `price`, `-price`, `created_at_desc`
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn into_params(self) -> AppResult<ListParams> {
        validate_dto(&self)?;

        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                SortOrder::parse(raw)
                    .ok_or_else(|| AppError::validation(format!("Unknown sort key '{raw}'")))?,
            ),
        };

        let filters = UserFilters {
            search: self.search,
            status: self.status.filter(|s| !s.trim().is_empty()),
            date_from: self.date_from.as_deref().map(parse_lower_bound).transpose()?,
            date_to: self.date_to.as_deref().map(parse_upper_bound).transpose()?,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
        };

        Ok(ListParams {
            page: self.page.unwrap_or(1),
            page_size: self.page_size,
            sort,
            filters,
        })
    }
}

/// GET /api/resources/{resource} - 当前用户可见范围内的分页列表
pub async fn list(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(resource): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<ApiResponse<PaginatedResponse<Entity>>> {
    let resource = parse_resource(&resource)?;
    let Query(query) = query.map_err(query_rejection)?;
    let params = query.into_params()?;

    let session = state.engine.session(principal);
    let page = state.engine.list_scoped(&session, resource, &params).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/resources/{resource}/export - 导出全部可见记录 (JSON)
pub async fn export(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(resource): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<ApiResponse<Vec<Entity>>> {
    let resource = parse_resource(&resource)?;
    let Query(query) = query.map_err(query_rejection)?;
    let params = query.into_params()?;

    let session = state.engine.session(principal);
    let rows = state.engine.export_scoped(&session, resource, &params).await?;
    Ok(ApiResponse::success_with_message(
        format!("{} records exported", rows.len()),
        rows,
    ))
}

/// DELETE /api/resources/{resource}/{id}
pub async fn delete(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    path: Result<Path<(String, String)>, PathRejection>,
) -> AppResult<ApiResponse<MutationResult>> {
    let Path((resource, id)) = path.map_err(path_rejection)?;
    let resource = parse_resource(&resource)?;
    let id = parse_entity_id(&id)?;

    let session = state.engine.session(principal);
    let result = state.engine.delete_entity(&session, resource, id).await?;
    Ok(ApiResponse::success_with_message(
        format!("{} {id} deleted", resource.label()),
        result,
    ))
}

/// POST /api/resources/{resource}/bulk/{action}
///
/// Body: `{"ids": [5, 9, 7], "stock": 10, "status": "shipped"}`.
/// Per-id failures are reported in `data.failed`; the request itself only
/// fails on malformed input.
pub async fn bulk(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<ApiResponse<BulkOutcome>> {
    let Path((resource, action)) = path.map_err(path_rejection)?;
    let resource = parse_resource(&resource)?;
    let Json(body) = body.map_err(json_rejection)?;

    let ids = body
        .get("ids")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::validation("ids must be an array of ids"))?;
    let command = BulkCommand::parse(resource, &action, &body)?;

    let session = state.engine.session(principal);
    let outcome = state
        .engine
        .run_bulk(&session, resource, ids, command)
        .await?;
    Ok(ApiResponse::success_with_message(outcome.summary(), outcome))
}
