//! 订单状态变更通知
//!
//! 通知在状态变更提交后发送，失败只产生警告。邮件渲染不在本服务内，
//! [`LogNotifier`] 只把通知写入日志。

use async_trait::async_trait;
use shared::models::{Order, OrderStatus};
use std::sync::Arc;

use crate::guard::{BoxError, SideEffect};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_status_changed(&self, order: &Order, previous: OrderStatus) -> Result<(), BoxError>;
}

/// Writes notifications to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_status_changed(&self, order: &Order, previous: OrderStatus) -> Result<(), BoxError> {
        tracing::info!(
            order_id = order.id,
            reference = %order.reference,
            customer_id = order.customer_id,
            from = %previous,
            to = %order.status,
            "Order status notification queued"
        );
        Ok(())
    }
}

/// Post-commit effect notifying the customer of a status change
pub struct StatusNotification {
    notifier: Arc<dyn Notifier>,
    order: Order,
    previous: OrderStatus,
}

impl StatusNotification {
    pub fn new(notifier: Arc<dyn Notifier>, order: Order, previous: OrderStatus) -> Self {
        Self {
            notifier,
            order,
            previous,
        }
    }
}

#[async_trait]
impl SideEffect for StatusNotification {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn run(&self) -> Result<(), BoxError> {
        self.notifier
            .order_status_changed(&self.order, self.previous)
            .await
    }
}
