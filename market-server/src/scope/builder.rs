//! Visibility scope derivation
//!
//! Root resources (Product, Category, Banner) are scoped from the caller's
//! read decision. Shared resources follow the fixed chain
//! Product → OrderItem → Order → Customer, one hop at a time.
//! `Empty` and `Unrestricted` propagate without touching storage.

use serde::Serialize;
use shared::models::{ConditionTag, Entity, EntityId, Field, Operation, Principal, ResourceType};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::conditions::ConditionRegistry;
use super::visibility::VisibilityScope;
use crate::auth::{Decision, PermissionResolver};
use crate::db::Repository;
use crate::filter::Predicate;
use crate::utils::AppResult;

/// Scopes of the whole chain, derived in one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeChain {
    pub product: VisibilityScope,
    pub order_item: VisibilityScope,
    pub order: VisibilityScope,
    pub customer: VisibilityScope,
}

impl ScopeChain {
    pub fn empty() -> Self {
        Self {
            product: VisibilityScope::Empty,
            order_item: VisibilityScope::Empty,
            order: VisibilityScope::Empty,
            customer: VisibilityScope::Empty,
        }
    }

    /// Scope of a chain member; `None` for resources outside the chain
    pub fn get(&self, resource: ResourceType) -> Option<&VisibilityScope> {
        match resource {
            ResourceType::Product => Some(&self.product),
            ResourceType::OrderItem => Some(&self.order_item),
            ResourceType::Order => Some(&self.order),
            ResourceType::Customer => Some(&self.customer),
            ResourceType::Category | ResourceType::Banner => None,
        }
    }
}

#[derive(Clone)]
pub struct VisibilityScopeBuilder {
    resolver: PermissionResolver,
    repo: Arc<dyn Repository>,
    conditions: ConditionRegistry,
}

impl VisibilityScopeBuilder {
    pub fn new(
        resolver: PermissionResolver,
        repo: Arc<dyn Repository>,
        conditions: ConditionRegistry,
    ) -> Self {
        Self {
            resolver,
            repo,
            conditions,
        }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Scope of any resource type
    pub async fn scope_for(
        &self,
        principal: &Principal,
        resource: ResourceType,
    ) -> AppResult<VisibilityScope> {
        if resource.is_creator_owned() {
            return self.root_scope(principal, resource).await;
        }
        let chain = self.scope_chain(principal).await?;
        Ok(chain.get(resource).cloned().unwrap_or(VisibilityScope::Empty))
    }

    /// Scope of a creator-owned root from the caller's read decision
    pub async fn root_scope(
        &self,
        principal: &Principal,
        resource: ResourceType,
    ) -> AppResult<VisibilityScope> {
        let decision = self
            .resolver
            .resolve(principal, resource, Operation::Read)
            .await;
        self.scope_from_decision(principal, resource, &decision).await
    }

    /// Apply a decision's conditions. Several tags intersect; a tag without a
    /// registered evaluator, or one that does not apply to `resource`, yields
    /// `Empty`.
    pub async fn scope_from_decision(
        &self,
        principal: &Principal,
        resource: ResourceType,
        decision: &Decision,
    ) -> AppResult<VisibilityScope> {
        if !decision.granted {
            return Ok(VisibilityScope::Empty);
        }
        if decision.conditions.is_empty() {
            return Ok(VisibilityScope::Unrestricted);
        }

        let mut scope = VisibilityScope::Unrestricted;
        for tag in &decision.conditions {
            let Some(evaluator) = self.conditions.get(*tag) else {
                tracing::warn!(
                    condition = %tag,
                    resource = %resource,
                    "No evaluator registered for condition, scope is empty"
                );
                return Ok(VisibilityScope::Empty);
            };
            let admitted = evaluator
                .admitted_ids(principal, resource, self.repo.as_ref())
                .await?;
            let Some(ids) = admitted else {
                tracing::warn!(
                    condition = %tag,
                    resource = %resource,
                    "Condition does not apply to resource, scope is empty"
                );
                return Ok(VisibilityScope::Empty);
            };
            scope = scope.intersect(&VisibilityScope::restricted(ids));
            if scope.is_empty() {
                break;
            }
        }
        Ok(scope)
    }

    pub async fn scope_chain(&self, principal: &Principal) -> AppResult<ScopeChain> {
        let product = self.root_scope(principal, ResourceType::Product).await?;
        let chain = self.chain_from_products(product).await?;
        tracing::debug!(
            principal_id = principal.id,
            product = %chain.product.describe(),
            order_item = %chain.order_item.describe(),
            order = %chain.order.describe(),
            customer = %chain.customer.describe(),
            "Scope chain derived"
        );
        Ok(chain)
    }

    /// Chain seeded by the products one condition admits, independent of the
    /// caller's read decision. Used to check a condition against shared
    /// entities, which carry no owner column of their own.
    pub async fn condition_chain(
        &self,
        principal: &Principal,
        tag: ConditionTag,
    ) -> AppResult<ScopeChain> {
        let Some(evaluator) = self.conditions.get(tag) else {
            return Ok(ScopeChain::empty());
        };
        let admitted = evaluator
            .admitted_ids(principal, ResourceType::Product, self.repo.as_ref())
            .await?;
        let product = match admitted {
            Some(ids) => VisibilityScope::restricted(ids),
            None => VisibilityScope::Empty,
        };
        self.chain_from_products(product).await
    }

    /// Derive the downstream scopes from a product scope
    pub async fn chain_from_products(&self, product: VisibilityScope) -> AppResult<ScopeChain> {
        let (order_item, order) = self.order_hop(&product).await?;
        let customer = self.customer_hop(&order).await?;
        Ok(ScopeChain {
            product,
            order_item,
            order,
            customer,
        })
    }

    /// Product → (OrderItem, Order). One OrderItem fetch yields both scopes.
    async fn order_hop(
        &self,
        product: &VisibilityScope,
    ) -> AppResult<(VisibilityScope, VisibilityScope)> {
        let ids = match product {
            VisibilityScope::Unrestricted => {
                return Ok((VisibilityScope::Unrestricted, VisibilityScope::Unrestricted));
            }
            VisibilityScope::Empty => return Ok((VisibilityScope::Empty, VisibilityScope::Empty)),
            VisibilityScope::Restricted(ids) => ids,
        };

        let items = self
            .fetch_linked(
                ResourceType::OrderItem,
                Predicate::in_ids(Field::ProductId, ids.iter().copied()),
            )
            .await?;
        let item_ids = items.iter().map(Entity::id);
        let order_ids = linked_ids(&items, Field::OrderId);
        Ok((
            VisibilityScope::restricted(item_ids),
            VisibilityScope::restricted(order_ids),
        ))
    }

    /// Order → Customer
    async fn customer_hop(&self, order: &VisibilityScope) -> AppResult<VisibilityScope> {
        let ids = match order {
            VisibilityScope::Unrestricted => return Ok(VisibilityScope::Unrestricted),
            VisibilityScope::Empty => return Ok(VisibilityScope::Empty),
            VisibilityScope::Restricted(ids) => ids,
        };

        let orders = self
            .fetch_linked(
                ResourceType::Order,
                Predicate::in_ids(Field::Id, ids.iter().copied()),
            )
            .await?;
        Ok(VisibilityScope::restricted(linked_ids(&orders, Field::CustomerId)))
    }

    async fn fetch_linked(&self, resource: ResourceType, filter: Predicate) -> AppResult<Vec<Entity>> {
        if filter.is_unsatisfiable() {
            return Ok(Vec::new());
        }
        let rows = self
            .repo
            .find_many(resource, &filter, &Default::default())
            .await?;
        Ok(rows)
    }
}

/// Distinct values of an id column
fn linked_ids(rows: &[Entity], field: Field) -> BTreeSet<EntityId> {
    rows.iter().filter_map(|row| row.field(field).as_i64()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use shared::models::{ConditionTag, OrderItem, PermissionGrant, Product, Role};
    use std::collections::BTreeSet;

    fn builder(store: Arc<MemoryStore>, conditions: ConditionRegistry) -> VisibilityScopeBuilder {
        VisibilityScopeBuilder::new(PermissionResolver::new(store.clone()), store, conditions)
    }

    fn product(id: EntityId, created_by: i64) -> Entity {
        Entity::Product(Product {
            id,
            name: format!("P{id}"),
            created_by,
            category_id: None,
            price: 1.0,
            stock: 1,
            published_at: None,
            created_at: 0,
        })
    }

    fn item(id: EntityId, order_id: EntityId, product_id: EntityId) -> Entity {
        Entity::OrderItem(OrderItem {
            id,
            order_id,
            product_id,
            quantity: 1,
            unit_price: 1.0,
        })
    }

    #[tokio::test]
    async fn test_unknown_evaluator_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.insert(product(5, 42));
        let builder = builder(store, ConditionRegistry::empty());
        let merchant = Principal::new(42, "m", vec![Role::new(10, "merchant")]);
        let decision = Decision {
            granted: true,
            conditions: BTreeSet::from([ConditionTag::IsCreator]),
        };

        let scope = builder
            .scope_from_decision(&merchant, ResourceType::Product, &decision)
            .await
            .unwrap();
        assert_eq!(scope, VisibilityScope::Empty);
    }

    #[tokio::test]
    async fn test_order_hop_also_yields_item_scope() {
        let store = Arc::new(MemoryStore::new());
        store.insert_all([item(1, 100, 5), item(2, 101, 9), item(3, 102, 7), item(4, 100, 9)]);
        let builder = builder(store, ConditionRegistry::default());

        let chain = builder
            .chain_from_products(VisibilityScope::restricted([5, 9]))
            .await
            .unwrap();
        assert_eq!(chain.order_item, VisibilityScope::restricted([1, 2, 4]));
        assert_eq!(chain.order, VisibilityScope::restricted([100, 101]));
        // no orders stored, so no customer ids
        assert_eq!(chain.customer, VisibilityScope::Empty);
    }

    #[tokio::test]
    async fn test_products_without_sales_give_empty_orders() {
        let store = Arc::new(MemoryStore::new());
        store.insert(item(1, 100, 7));
        let builder = builder(store.clone(), ConditionRegistry::default());

        let chain = builder
            .chain_from_products(VisibilityScope::restricted([5]))
            .await
            .unwrap();
        assert_eq!(chain.order, VisibilityScope::Empty);
        // Empty order scope must not reach the order table
        assert_eq!(store.queries_for(ResourceType::Order), 0);
    }

    #[tokio::test]
    async fn test_conditioned_grant_on_shared_resource_is_empty() {
        let store = Arc::new(MemoryStore::new());
        store.add_grant(
            PermissionGrant::new(10, ResourceType::Order, Operation::Read)
                .with_condition(ConditionTag::IsCreator),
        );
        let builder = builder(store.clone(), ConditionRegistry::default());
        let merchant = Principal::new(42, "m", vec![Role::new(10, "merchant")]);

        let decision = builder
            .resolver()
            .resolve(&merchant, ResourceType::Order, Operation::Read)
            .await;
        let scope = builder
            .scope_from_decision(&merchant, ResourceType::Order, &decision)
            .await
            .unwrap();
        assert_eq!(scope, VisibilityScope::Empty);
    }
}
