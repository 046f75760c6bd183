//! Resource API 模块
//!
//! 所有资源共用一组路由，`{resource}` 取 URL 段名 (`products`, `order-items` ...)。

mod handler;

pub use handler::ListQuery;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/resources", resource_routes())
}

fn resource_routes() -> Router<ServerState> {
    Router::new()
        .route("/{resource}", get(handler::list))
        .route("/{resource}/export", get(handler::export))
        .route("/{resource}/{id}", delete(handler::delete))
        .route("/{resource}/bulk/{action}", post(handler::bulk))
}
