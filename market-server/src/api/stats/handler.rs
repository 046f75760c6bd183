//! Statistics API Handlers

use axum::extract::{Query, State, rejection::QueryRejection};
use serde::Deserialize;
use shared::models::ResourceType;

use crate::api::{parse_resource, query_rejection};
use crate::auth::CurrentPrincipal;
use crate::core::ServerState;
use crate::services::{MerchantStats, ScopedStats};
use crate::utils::{ApiResponse, AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Comma separated resource names
    pub resources: Option<String>,
}

fn parse_resource_list(raw: Option<&str>) -> AppResult<Vec<ResourceType>> {
    let resources = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_resource(s).map_err(|_| AppError::validation(format!("Unknown resource '{s}'"))))
        .collect::<AppResult<Vec<_>>>()?;
    if resources.is_empty() {
        return Err(AppError::validation("resources must name at least one resource"));
    }
    Ok(resources)
}

/// GET /api/stats?resources=products,orders
pub async fn scoped(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> AppResult<ApiResponse<ScopedStats>> {
    let Query(query) = query.map_err(query_rejection)?;
    let resources = parse_resource_list(query.resources.as_deref())?;

    let session = state.engine.session(principal);
    let stats = state.engine.get_scoped_stats(&session, &resources).await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/stats/dashboard - 全部资源的统计
pub async fn dashboard(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<ApiResponse<ScopedStats>> {
    let session = state.engine.session(principal);
    let stats = state
        .engine
        .get_scoped_stats(&session, &ResourceType::ALL)
        .await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/stats/merchants
pub async fn merchants(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<ApiResponse<Vec<MerchantStats>>> {
    let session = state.engine.session(principal);
    let stats = state.engine.merchant_statistics(&session).await?;
    Ok(ApiResponse::success(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_list() {
        assert_eq!(
            parse_resource_list(Some("products, orders,,")).unwrap(),
            vec![ResourceType::Product, ResourceType::Order]
        );
        assert!(parse_resource_list(None).is_err());
        assert!(parse_resource_list(Some("products,users")).is_err());
    }
}
