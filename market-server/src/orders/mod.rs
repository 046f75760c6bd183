//! 订单
//!
//! - [`status`] - 状态流转表
//! - [`notify`] - 状态变更通知

pub mod notify;
pub mod status;

pub use notify::{LogNotifier, Notifier, StatusNotification};
pub use status::{allowed_transitions, is_terminal, validate_transition};
