//! Statistics API 模块
//!
//! | 路径 | 说明 |
//! |------|------|
//! | /api/stats?resources=products,orders | 指定资源的范围内统计 |
//! | /api/stats/dashboard | 全部资源 |
//! | /api/stats/merchants | 按商户 (商品创建者) 汇总 |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/stats", get(handler::scoped))
        .route("/api/stats/dashboard", get(handler::dashboard))
        .route("/api/stats/merchants", get(handler::merchants))
}
