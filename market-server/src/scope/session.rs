//! Request-scoped scope cache
//!
//! One [`ScopeSession`] lives for one request. The chain and each root scope
//! are derived at most once, however many consumers (list, stats, guard)
//! ask for them.

use shared::models::{ConditionTag, Principal, ResourceType};
use std::collections::BTreeMap;
use tokio::sync::{Mutex, OnceCell};

use super::builder::{ScopeChain, VisibilityScopeBuilder};
use super::visibility::VisibilityScope;
use crate::utils::AppResult;

pub struct ScopeSession {
    principal: Principal,
    builder: VisibilityScopeBuilder,
    chain: OnceCell<ScopeChain>,
    categories: OnceCell<VisibilityScope>,
    banners: OnceCell<VisibilityScope>,
    /// 按条件推导的链，只供变更守卫使用，与读权限无关
    condition_chains: Mutex<BTreeMap<ConditionTag, ScopeChain>>,
}

impl ScopeSession {
    pub fn new(principal: Principal, builder: VisibilityScopeBuilder) -> Self {
        Self {
            principal,
            builder,
            chain: OnceCell::new(),
            categories: OnceCell::new(),
            banners: OnceCell::new(),
            condition_chains: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn builder(&self) -> &VisibilityScopeBuilder {
        &self.builder
    }

    pub async fn chain(&self) -> AppResult<&ScopeChain> {
        self.chain
            .get_or_try_init(|| self.builder.scope_chain(&self.principal))
            .await
    }

    pub async fn scope_for(&self, resource: ResourceType) -> AppResult<VisibilityScope> {
        let cell = match resource {
            ResourceType::Category => &self.categories,
            ResourceType::Banner => &self.banners,
            chained => {
                let chain = self.chain().await?;
                return Ok(chain.get(chained).cloned().unwrap_or(VisibilityScope::Empty));
            }
        };
        let scope = cell
            .get_or_try_init(|| self.builder.root_scope(&self.principal, resource))
            .await?;
        Ok(scope.clone())
    }

    /// Scope of a chain member under `tag` alone
    pub async fn condition_scope(
        &self,
        tag: ConditionTag,
        resource: ResourceType,
    ) -> AppResult<VisibilityScope> {
        let mut chains = self.condition_chains.lock().await;
        if !chains.contains_key(&tag) {
            let chain = self.builder.condition_chain(&self.principal, tag).await?;
            chains.insert(tag, chain);
        }
        Ok(chains
            .get(&tag)
            .and_then(|chain| chain.get(resource))
            .cloned()
            .unwrap_or(VisibilityScope::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PermissionResolver;
    use crate::db::{MemoryStore, QueryKind};
    use crate::scope::ConditionRegistry;
    use shared::models::{ConditionTag, Entity, Operation, PermissionGrant, Product, Role};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_chain_is_derived_once_per_session() {
        let store = Arc::new(MemoryStore::new());
        store.add_grant(
            PermissionGrant::new(10, ResourceType::Product, Operation::Read)
                .with_condition(ConditionTag::IsCreator),
        );
        store.insert(Entity::Product(Product {
            id: 5,
            name: "Lamp".into(),
            created_by: 42,
            category_id: None,
            price: 10.0,
            stock: 1,
            published_at: None,
            created_at: 0,
        }));
        let builder = VisibilityScopeBuilder::new(
            PermissionResolver::new(store.clone()),
            store.clone(),
            ConditionRegistry::default(),
        );
        let session = ScopeSession::new(Principal::new(42, "m", vec![Role::new(10, "m")]), builder);

        let first = session.scope_for(ResourceType::Order).await.unwrap();
        let calls = store.query_log().len();
        let again = session.scope_for(ResourceType::Customer).await.unwrap();
        let product = session.scope_for(ResourceType::Product).await.unwrap();

        assert_eq!(first, VisibilityScope::Empty);
        assert_eq!(again, VisibilityScope::Empty);
        assert_eq!(product, VisibilityScope::restricted([5]));
        assert_eq!(store.query_log().len(), calls);
        assert_eq!(
            store
                .query_log()
                .iter()
                .filter(|q| q.kind == QueryKind::Grants)
                .count(),
            1
        );
    }
}
