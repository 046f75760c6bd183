//! Order API Handlers

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use serde::Deserialize;
use shared::models::OrderStatus;

use crate::api::{json_rejection, parse_entity_id, path_rejection};
use crate::auth::CurrentPrincipal;
use crate::core::ServerState;
use crate::services::MutationResult;
use crate::utils::{ApiResponse, AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// PUT /api/orders/{id}/status - 单个订单状态变更
pub async fn update_status(
    State(state): State<ServerState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> AppResult<ApiResponse<MutationResult>> {
    let Path(id) = path.map_err(path_rejection)?;
    let id = parse_entity_id(&id)?;
    let Json(update) = body.map_err(json_rejection)?;
    let status = update
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let session = state.engine.session(principal);
    let result = state.engine.update_order_status(&session, id, status).await?;
    Ok(ApiResponse::success_with_message(
        format!("Order {id} is now {status}"),
        result,
    ))
}
