//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`resources`] - 通用资源列表、导出、删除、批量操作
//! - [`orders`] - 订单状态变更
//! - [`stats`] - 范围内统计

pub mod health;
pub mod orders;
pub mod resources;
pub mod stats;

use std::time::Duration;

use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use shared::models::{EntityId, ResourceType};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Health API - public route
        .merge(health::router())
        // Everything below resolves a principal first
        .merge(resources::router())
        .merge(orders::router())
        .merge(stats::router())
}

/// Build the fully configured application used by the server and by tests
pub fn create_router(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);
    build_router()
        .with_state(state)
        // ========== Tower HTTP Middleware ==========
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::x_request_id())
        // Request ID - Generate unique ID for each request
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

// ── Shared extract helpers ──────────────────────────────────────────

/// `products`, `order-items`, `order_item` ... → [`ResourceType`]
pub(crate) fn parse_resource(raw: &str) -> AppResult<ResourceType> {
    raw.parse::<ResourceType>().map_err(|e| {
        AppError::with_message(ErrorCode::NotFound, format!("Unknown resource '{raw}'"))
            .with_detail("reason", e.to_string())
    })
}

pub(crate) fn parse_entity_id(raw: &str) -> AppResult<EntityId> {
    raw.trim()
        .parse::<EntityId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation(format!("Invalid id '{raw}'")))
}

pub(crate) fn query_rejection(rejection: QueryRejection) -> AppError {
    AppError::validation("Invalid query parameters").with_detail("reason", rejection.body_text())
}

pub(crate) fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::invalid_request("Invalid JSON body").with_detail("reason", rejection.body_text())
}

pub(crate) fn path_rejection(rejection: PathRejection) -> AppError {
    AppError::invalid_request("Invalid path").with_detail("reason", rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_accepts_segments() {
        assert_eq!(parse_resource("order-items").unwrap(), ResourceType::OrderItem);
        assert_eq!(parse_resource("banners").unwrap(), ResourceType::Banner);
        assert_eq!(parse_resource("users").unwrap_err().code, ErrorCode::NotFound);
    }

    #[test]
    fn test_parse_entity_id() {
        assert_eq!(parse_entity_id("42").unwrap(), 42);
        assert!(parse_entity_id("0").is_err());
        assert!(parse_entity_id("abc").is_err());
    }
}
