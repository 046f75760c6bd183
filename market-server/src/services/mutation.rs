//! 变更命令 (批量与单实体)
//!
//! 批量操作逐条经过 [`EntityAccessGuard`](crate::guard::EntityAccessGuard)；
//! 单实体操作在无权限或不存在时直接返回错误。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use shared::models::{Entity, EntityId, Field, Operation, OrderStatus, Patch, ResourceType};
use std::sync::Arc;

use super::MarketplaceEngine;
use crate::audit::{AuditEffect, AuditRecord, AuditSink};
use crate::db::Repository;
use crate::guard::{BulkAction, BulkOutcome, EffectWarning, PostCommit, validate_ids};
use crate::orders::{Notifier, StatusNotification, validate_transition};
use crate::scope::ScopeSession;
use crate::security_log;
use crate::utils::time::now_millis;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Commands accepted by `POST /api/resources/{resource}/bulk/{action}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkCommand {
    Publish,
    Unpublish,
    SetStock(i64),
    SetStatus(OrderStatus),
    Delete,
}

impl BulkCommand {
    /// Parse the action segment plus its body arguments (`stock`, `status`)
    pub fn parse(resource: ResourceType, action: &str, body: &Value) -> AppResult<Self> {
        let command = match action {
            "publish" => Self::Publish,
            "unpublish" => Self::Unpublish,
            "delete" => Self::Delete,
            "set-stock" | "set_stock" | "stock" => {
                let stock = body
                    .get("stock")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| AppError::validation("stock must be an integer"))?;
                if stock < 0 {
                    return Err(AppError::with_message(
                        ErrorCode::ProductInvalidStock,
                        "stock must not be negative",
                    )
                    .with_detail("stock", stock));
                }
                Self::SetStock(stock)
            }
            "set-status" | "set_status" | "status" => {
                let raw = body
                    .get("status")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AppError::validation("status is required"))?;
                let status = raw
                    .parse::<OrderStatus>()
                    .map_err(|e| AppError::validation(e.to_string()))?;
                Self::SetStatus(status)
            }
            other => {
                return Err(AppError::validation(format!("Unknown bulk action '{other}'")));
            }
        };

        if !command.supports(resource) {
            return Err(AppError::validation(format!(
                "{} does not support '{}'",
                resource.label(),
                command.name()
            )));
        }
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::SetStock(_) => "set_stock",
            Self::SetStatus(_) => "set_status",
            Self::Delete => "delete",
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Delete => Operation::Delete,
            _ => Operation::Update,
        }
    }

    pub fn supports(&self, resource: ResourceType) -> bool {
        use ResourceType::*;
        match self {
            Self::Publish | Self::Unpublish => matches!(resource, Product | Banner),
            Self::SetStock(_) => resource == Product,
            Self::SetStatus(_) => resource == Order,
            Self::Delete => matches!(resource, Product | Order | Category | Banner),
        }
    }
}

/// Result of a single-entity mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    /// Updated record; absent after a delete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EffectWarning>,
}

/// [`BulkCommand`] bound to the engine's storage, audit sink and notifier
struct CommandAction {
    command: BulkCommand,
    repo: Arc<dyn Repository>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
}

impl CommandAction {
    /// Perform the mutation; returns the updated entity (None after delete)
    /// and the effects to run once it is committed
    async fn execute(
        &self,
        session: &ScopeSession,
        entity: Entity,
    ) -> AppResult<(Option<Entity>, PostCommit)> {
        let resource = entity.resource_type();
        let id = entity.id();
        let actor = session.principal().id;

        let (updated, details, notification) = match self.command {
            BulkCommand::Delete => {
                if !self.repo.delete(resource, id).await? {
                    return Err(AppError::with_message(
                        resource.not_found_code(),
                        format!("{} not found", resource.label()),
                    ));
                }
                (None, json!({}), None)
            }
            BulkCommand::SetStatus(to) => {
                let Entity::Order(order) = &entity else {
                    return Err(AppError::validation("Only orders carry a status"));
                };
                let from = order.status;
                validate_transition(from, to)?;
                let updated = self
                    .repo
                    .update(resource, id, &Patch::new().set(Field::Status, to))
                    .await?;
                let notification = match &updated {
                    Entity::Order(order) => Some(StatusNotification::new(
                        self.notifier.clone(),
                        order.clone(),
                        from,
                    )),
                    _ => None,
                };
                let details = json!({"from": from.as_str(), "to": to.as_str()});
                (Some(updated), details, notification)
            }
            command => {
                let patch = match command {
                    BulkCommand::Publish => Patch::new().set(Field::PublishedAt, now_millis()),
                    BulkCommand::Unpublish => Patch::new().set(Field::PublishedAt, None::<i64>),
                    BulkCommand::SetStock(stock) => Patch::new().set(Field::Stock, stock),
                    _ => Patch::new(),
                };
                let updated = self.repo.update(resource, id, &patch).await?;
                (Some(updated), patch.to_json(), None)
            }
        };

        let record = AuditRecord::new(actor, resource, id, self.command.name(), details);
        let mut post_commit = PostCommit::new().with(AuditEffect::new(self.audit.clone(), record));
        if let Some(notification) = notification {
            post_commit = post_commit.with(notification);
        }
        Ok((updated, post_commit))
    }
}

#[async_trait]
impl BulkAction for CommandAction {
    fn name(&self) -> &str {
        self.command.name()
    }

    fn operation(&self) -> Operation {
        self.command.operation()
    }

    async fn apply(&self, session: &ScopeSession, entity: Entity) -> AppResult<PostCommit> {
        let (_, post_commit) = self.execute(session, entity).await?;
        Ok(post_commit)
    }
}

impl MarketplaceEngine {
    fn command_action(&self, command: BulkCommand) -> CommandAction {
        CommandAction {
            command,
            repo: self.repo.clone(),
            audit: self.audit.clone(),
            notifier: self.notifier.clone(),
        }
    }

    /// Same answer as the bulk guard gives for `entity`
    pub async fn check_mutate_access(
        &self,
        session: &ScopeSession,
        entity: &Entity,
        operation: Operation,
    ) -> AppResult<bool> {
        self.guard.can_mutate(session, entity, operation).await
    }

    /// Validate raw ids, then apply `command` to each one independently.
    /// Only structural input errors fail the whole request.
    pub async fn run_bulk(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        raw_ids: &[Value],
        command: BulkCommand,
    ) -> AppResult<BulkOutcome> {
        let ids = validate_ids(raw_ids, self.limits.max_bulk_ids)?;
        if !command.supports(resource) {
            return Err(AppError::validation(format!(
                "{} does not support '{}'",
                resource.label(),
                command.name()
            )));
        }

        let action = self.command_action(command);
        Ok(self.guard.run_bulk(session, resource, &ids, &action).await)
    }

    pub async fn update_order_status(
        &self,
        session: &ScopeSession,
        id: EntityId,
        status: OrderStatus,
    ) -> AppResult<MutationResult> {
        self.mutate_one(session, ResourceType::Order, id, BulkCommand::SetStatus(status))
            .await
    }

    pub async fn delete_entity(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        id: EntityId,
    ) -> AppResult<MutationResult> {
        if !BulkCommand::Delete.supports(resource) {
            return Err(AppError::validation(format!(
                "{} cannot be deleted",
                resource.label()
            )));
        }
        self.mutate_one(session, resource, id, BulkCommand::Delete).await
    }

    async fn mutate_one(
        &self,
        session: &ScopeSession,
        resource: ResourceType,
        id: EntityId,
        command: BulkCommand,
    ) -> AppResult<MutationResult> {
        let entity = self.repo.find_one(resource, id).await?.ok_or_else(|| {
            AppError::with_message(
                resource.not_found_code(),
                format!("{} not found", resource.label()),
            )
            .with_detail("id", id)
        })?;

        if !self.guard.can_mutate(session, &entity, command.operation()).await? {
            security_log!(
                "WARN",
                "mutation_denied",
                principal_id = session.principal().id,
                resource = resource.as_str(),
                entity_id = id,
                action = command.name()
            );
            return Err(AppError::permission_denied(format!(
                "Not allowed to {} this {}",
                command.name(),
                resource.label().to_lowercase()
            )));
        }

        let (updated, post_commit) = self.command_action(command).execute(session, entity).await?;
        let warnings = post_commit.run(id).await;
        Ok(MutationResult {
            entity: updated,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            BulkCommand::parse(ResourceType::Product, "publish", &json!({})).unwrap(),
            BulkCommand::Publish
        );
        assert_eq!(
            BulkCommand::parse(ResourceType::Product, "set-stock", &json!({"stock": 12})).unwrap(),
            BulkCommand::SetStock(12)
        );
        assert_eq!(
            BulkCommand::parse(ResourceType::Order, "set-status", &json!({"status": "shipped"}))
                .unwrap(),
            BulkCommand::SetStatus(OrderStatus::Shipped)
        );
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        let err = BulkCommand::parse(ResourceType::Product, "set-stock", &json!({"stock": -1}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductInvalidStock);

        let err = BulkCommand::parse(ResourceType::Product, "set-stock", &json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = BulkCommand::parse(ResourceType::Order, "set-status", &json!({"status": "lost"}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = BulkCommand::parse(ResourceType::Product, "explode", &json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_commands_are_resource_specific() {
        assert!(BulkCommand::parse(ResourceType::Order, "publish", &json!({})).is_err());
        assert!(BulkCommand::parse(ResourceType::Customer, "delete", &json!({})).is_err());
        assert!(BulkCommand::parse(ResourceType::Banner, "unpublish", &json!({})).is_ok());
        assert!(BulkCommand::parse(ResourceType::Category, "delete", &json!({})).is_ok());
        assert_eq!(BulkCommand::Delete.operation(), Operation::Delete);
        assert_eq!(BulkCommand::SetStock(1).operation(), Operation::Update);
    }
}
