//! 审计日志
//!
//! 每次成功的变更写一条 [`AuditRecord`]。写入作为提交后的副作用执行，
//! 失败只产生警告，不影响主操作结果。

use async_trait::async_trait;
use serde::Serialize;
use shared::models::{EntityId, PrincipalId, ResourceType};
use std::sync::Arc;

use crate::db::RepoResult;
use crate::guard::{BoxError, SideEffect};
use crate::utils::time::now_millis;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// UUID v4
    pub id: String,
    pub actor_id: PrincipalId,
    pub resource: ResourceType,
    pub entity_id: EntityId,
    /// e.g. `publish`, `delete`, `set_status`
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: i64,
}

impl AuditRecord {
    pub fn new(
        actor_id: PrincipalId,
        resource: ResourceType,
        entity_id: EntityId,
        action: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id,
            resource,
            entity_id,
            action: action.into(),
            details,
            created_at: now_millis(),
        }
    }
}

/// Append-only audit storage
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> RepoResult<()>;
}

/// Post-commit effect writing one audit record
pub struct AuditEffect {
    sink: Arc<dyn AuditSink>,
    record: AuditRecord,
}

impl AuditEffect {
    pub fn new(sink: Arc<dyn AuditSink>, record: AuditRecord) -> Self {
        Self { sink, record }
    }
}

#[async_trait]
impl SideEffect for AuditEffect {
    fn name(&self) -> &'static str {
        "audit"
    }

    async fn run(&self) -> Result<(), BoxError> {
        self.sink.record(&self.record).await?;
        tracing::debug!(
            actor_id = self.record.actor_id,
            resource = %self.record.resource,
            entity_id = self.record.entity_id,
            action = %self.record.action,
            "Audit record written"
        );
        Ok(())
    }
}
