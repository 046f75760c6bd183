//! 订单状态流转表
//!
//! ```text
//! pending ──► paid ──► processing ──► shipped ──► delivered
//!    │         │  │         │                        │
//!    └─────────┴──┼─────────┴──► cancelled           └──► refunded
//!                 └────────────────────────────────────► refunded
//! ```
//! cancelled / refunded 为终态。

use shared::models::OrderStatus;

use crate::utils::{AppError, AppResult, ErrorCode};

pub fn allowed_transitions(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Paid, Cancelled],
        Paid => &[Processing, Cancelled, Refunded],
        Processing => &[Shipped, Cancelled],
        Shipped => &[Delivered],
        Delivered => &[Refunded],
        Cancelled | Refunded => &[],
    }
}

pub fn is_terminal(status: OrderStatus) -> bool {
    allowed_transitions(status).is_empty()
}

pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> AppResult<()> {
    if allowed_transitions(from).contains(&to) {
        return Ok(());
    }
    Err(AppError::with_message(
        ErrorCode::OrderStatusTransitionInvalid,
        format!("Cannot change order status from {from} to {to}"),
    )
    .with_detail("from", from.as_str())
    .with_detail("to", to.as_str()))
}
