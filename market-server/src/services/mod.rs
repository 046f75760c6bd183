//! 引擎门面
//!
//! [`MarketplaceEngine`] 把权限解析、范围推导、聚合、守卫、审计和通知
//! 组装在一起，供 HTTP 处理器调用。所有依赖通过构造函数注入。

pub mod listing;
pub mod mutation;
pub mod statistics;

pub use listing::ListParams;
pub use mutation::{BulkCommand, MutationResult};
pub use statistics::{MerchantStats, ScopedStats, default_spec};

use shared::models::Principal;
use std::sync::Arc;

use crate::audit::AuditSink;
use crate::auth::PermissionResolver;
use crate::db::{PermissionStore, Repository};
use crate::guard::EntityAccessGuard;
use crate::orders::Notifier;
use crate::scope::{ConditionRegistry, ScopeSession, VisibilityScopeBuilder};
use crate::stats::ScopedAggregator;
use crate::utils::validation::DEFAULT_MAX_BULK_IDS;

/// Request limits applied by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub max_bulk_ids: usize,
    pub default_page_size: u32,
    pub export_limit: u32,
    /// Products with stock at or below this count as low stock
    pub low_stock_threshold: i64,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_bulk_ids: DEFAULT_MAX_BULK_IDS,
            default_page_size: 20,
            export_limit: 5000,
            low_stock_threshold: 5,
        }
    }
}

#[derive(Clone)]
pub struct MarketplaceEngine {
    repo: Arc<dyn Repository>,
    resolver: PermissionResolver,
    scopes: VisibilityScopeBuilder,
    aggregator: ScopedAggregator,
    guard: EntityAccessGuard,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    limits: EngineLimits,
}

impl MarketplaceEngine {
    pub fn new(
        repo: Arc<dyn Repository>,
        grants: Arc<dyn PermissionStore>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        limits: EngineLimits,
    ) -> Self {
        Self::with_conditions(repo, grants, audit, notifier, limits, ConditionRegistry::default())
    }

    pub fn with_conditions(
        repo: Arc<dyn Repository>,
        grants: Arc<dyn PermissionStore>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        limits: EngineLimits,
        conditions: ConditionRegistry,
    ) -> Self {
        let resolver = PermissionResolver::new(grants);
        let scopes = VisibilityScopeBuilder::new(resolver.clone(), repo.clone(), conditions.clone());
        let aggregator = ScopedAggregator::new(repo.clone());
        let guard = EntityAccessGuard::new(resolver.clone(), conditions, repo.clone());
        Self {
            repo,
            resolver,
            scopes,
            aggregator,
            guard,
            audit,
            notifier,
            limits,
        }
    }

    /// Fresh per-request scope cache for `principal`
    pub fn session(&self, principal: Principal) -> ScopeSession {
        ScopeSession::new(principal, self.scopes.clone())
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn guard(&self) -> &EntityAccessGuard {
        &self.guard
    }
}
