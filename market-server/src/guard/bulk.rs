//! Bulk operation input and outcome

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use shared::models::{Entity, EntityId, Operation};
use std::collections::HashSet;

use super::effects::{EffectWarning, PostCommit};
use crate::scope::ScopeSession;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Validate raw bulk ids: non-empty, at most `max`, positive integers.
/// Duplicates are dropped, first occurrence wins.
pub fn validate_ids(raw: &[Value], max: usize) -> AppResult<Vec<EntityId>> {
    if raw.is_empty() {
        return Err(AppError::validation("ids must not be empty"));
    }
    if raw.len() > max {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("Too many ids: at most {max} per request"),
        )
        .with_detail("max", max as u64)
        .with_detail("received", raw.len() as u64));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut ids = Vec::with_capacity(raw.len());
    for (index, value) in raw.iter().enumerate() {
        let id = value.as_i64().filter(|id| *id > 0).ok_or_else(|| {
            AppError::validation("ids must be positive integers")
                .with_detail("index", index as u64)
                .with_detail("value", value.clone())
        })?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// One bulk command applied to each entity that passed the guard
#[async_trait]
pub trait BulkAction: Send + Sync {
    fn name(&self) -> &str;

    /// Operation checked by the guard before `apply`
    fn operation(&self) -> Operation;

    /// Perform the mutation; the returned effects run after it succeeded
    async fn apply(&self, session: &ScopeSession, entity: Entity) -> AppResult<PostCommit>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: EntityId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub success: Vec<EntityId>,
    pub failed: Vec<BulkFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EffectWarning>,
}

impl BulkOutcome {
    pub fn record_success(&mut self, id: EntityId, warnings: Vec<EffectWarning>) {
        self.success.push(id);
        self.warnings.extend(warnings);
    }

    pub fn record_failure(&mut self, id: EntityId, error: impl Into<String>) {
        self.failed.push(BulkFailure {
            id,
            error: error.into(),
        });
    }

    /// e.g. `3 processed: 2 succeeded, 1 failed`
    pub fn summary(&self) -> String {
        format!(
            "{} processed: {} succeeded, {} failed",
            self.success.len() + self.failed.len(),
            self.success.len(),
            self.failed.len()
        )
    }
}
