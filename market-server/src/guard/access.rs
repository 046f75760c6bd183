//! Per-entity mutation guard and bulk executor

use futures::StreamExt;
use shared::models::{Entity, EntityId, Operation, ResourceType};
use std::sync::Arc;

use super::bulk::{BulkAction, BulkOutcome};
use super::effects::EffectWarning;
use crate::auth::PermissionResolver;
use crate::db::Repository;
use crate::scope::{ConditionRegistry, ScopeSession};
use crate::security_log;
use crate::utils::AppResult;

pub const ENTITY_NOT_FOUND: &str = "Entity not found";
pub const PERMISSION_DENIED: &str = "Permission denied";

#[derive(Clone)]
pub struct EntityAccessGuard {
    resolver: PermissionResolver,
    conditions: ConditionRegistry,
    repo: Arc<dyn Repository>,
}

impl EntityAccessGuard {
    pub fn new(
        resolver: PermissionResolver,
        conditions: ConditionRegistry,
        repo: Arc<dyn Repository>,
    ) -> Self {
        Self {
            resolver,
            conditions,
            repo,
        }
    }

    /// Whether the session's principal may apply `operation` to `entity`.
    ///
    /// Conditions are checked against the loaded entity. Entities without an
    /// owner column fall back to membership in the chain the condition
    /// itself admits; the caller's read scope never widens it.
    pub async fn can_mutate(
        &self,
        session: &ScopeSession,
        entity: &Entity,
        operation: Operation,
    ) -> AppResult<bool> {
        let principal = session.principal();
        let resource = entity.resource_type();
        let decision = self.resolver.resolve(principal, resource, operation).await;
        if !decision.granted {
            return Ok(false);
        }

        for tag in &decision.conditions {
            let Some(evaluator) = self.conditions.get(*tag) else {
                tracing::warn!(condition = %tag, "No evaluator registered for condition, denying");
                return Ok(false);
            };
            let admitted = match evaluator.admits(principal, entity) {
                Some(admitted) => admitted,
                None => session
                    .condition_scope(*tag, resource)
                    .await?
                    .contains(entity.id()),
            };
            if !admitted {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Apply `action` to every id in order. One failing id never aborts the
    /// batch; its error is recorded and the fold moves on.
    pub async fn run_bulk(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        ids: &[EntityId],
        action: &dyn BulkAction,
    ) -> BulkOutcome {
        let outcome = futures::stream::iter(ids.iter().copied())
            .fold(BulkOutcome::default(), |mut outcome, id| async move {
                match self.process_one(session, resource, id, action).await {
                    Ok(warnings) => outcome.record_success(id, warnings),
                    Err(error) => outcome.record_failure(id, error),
                }
                outcome
            })
            .await;

        tracing::info!(
            principal_id = session.principal().id,
            resource = %resource,
            action = action.name(),
            succeeded = outcome.success.len(),
            failed = outcome.failed.len(),
            "Bulk operation finished"
        );
        outcome
    }

    async fn process_one(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        id: EntityId,
        action: &dyn BulkAction,
    ) -> Result<Vec<EffectWarning>, String> {
        let entity = match self.repo.find_one(resource, id).await {
            Ok(Some(entity)) => entity,
            Ok(None) => return Err(ENTITY_NOT_FOUND.to_string()),
            Err(e) => {
                tracing::error!(resource = %resource, id, error = %e, "Bulk fetch failed");
                return Err("Internal query failure".to_string());
            }
        };

        match self.can_mutate(session, &entity, action.operation()).await {
            Ok(true) => {}
            Ok(false) => {
                security_log!(
                    "WARN",
                    "mutation_denied",
                    principal_id = session.principal().id,
                    resource = resource.as_str(),
                    entity_id = id,
                    action = action.name().to_string()
                );
                return Err(PERMISSION_DENIED.to_string());
            }
            Err(e) => return Err(e.message),
        }

        let post_commit = action.apply(session, entity).await.map_err(|e| e.message)?;
        Ok(post_commit.run(id).await)
    }
}
