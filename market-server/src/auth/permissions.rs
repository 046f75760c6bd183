//! Permission resolution
//!
//! Collapses every grant a principal's roles hold for (resource, operation)
//! into one [`Decision`].
//!
//! ## 规则
//! - 超级管理员：无条件授权，不查询授权存储
//! - 无角色：拒绝，不查询授权存储
//! - 多条授权：条件集合取并集 (合并永远不会放宽有条件的授权)
//! - 存储故障：不重试，记录日志后按拒绝处理 (fail closed)

use serde::Serialize;
use shared::models::{ConditionTag, Operation, Principal, ResourceType};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::db::PermissionStore;
use crate::security_log;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub granted: bool,
    pub conditions: BTreeSet<ConditionTag>,
}

impl Decision {
    pub fn deny() -> Self {
        Self {
            granted: false,
            conditions: BTreeSet::new(),
        }
    }

    pub fn unconditional() -> Self {
        Self {
            granted: true,
            conditions: BTreeSet::new(),
        }
    }

    /// Granted with no remaining restriction
    pub fn is_unconditional(&self) -> bool {
        self.granted && self.conditions.is_empty()
    }
}

#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(
        &self,
        principal: &Principal,
        resource: ResourceType,
        operation: Operation,
    ) -> Decision {
        if principal.is_super_admin() {
            return Decision::unconditional();
        }

        let role_ids = principal.role_ids();
        if role_ids.is_empty() {
            return Decision::deny();
        }

        let grants = match self.store.find_grants(&role_ids, resource, operation).await {
            Ok(grants) => grants,
            Err(e) => {
                tracing::error!(
                    principal_id = principal.id,
                    resource = %resource,
                    operation = %operation,
                    error = %e,
                    "Permission lookup failed, denying access"
                );
                security_log!(
                    "ERROR",
                    "permission_lookup_failed",
                    principal_id = principal.id,
                    resource = resource.as_str(),
                    operation = operation.as_str()
                );
                return Decision::deny();
            }
        };

        let matching = grants
            .into_iter()
            .filter(|g| g.resource == resource && g.operation == operation);

        let mut decision = Decision::deny();
        for grant in matching {
            decision.granted = true;
            decision.conditions.extend(grant.conditions);
        }

        tracing::debug!(
            principal_id = principal.id,
            resource = %resource,
            operation = %operation,
            granted = decision.granted,
            conditions = ?decision.conditions,
            "Permission resolved"
        );
        decision
    }
}
