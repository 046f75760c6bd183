//! Visibility scope derivation through the engine

mod common;

use common::{Fixture, admin, analyst, merchant_a, newcomer, visitor};
use market_server::VisibilityScope;
use market_server::db::QueryKind;
use market_server::filter::UserFilters;
use market_server::services::ListParams;
use serde_json::json;
use shared::models::{Entity, ResourceType};

fn ids(items: &[Entity]) -> Vec<i64> {
    let mut ids: Vec<i64> = items.iter().map(Entity::id).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn super_admin_sees_everything_without_grant_lookups() {
    let fx = Fixture::new();
    let session = fx.engine.session(admin());

    for resource in ResourceType::ALL {
        let scope = session.scope_for(resource).await.unwrap();
        assert_eq!(scope, VisibilityScope::Unrestricted, "{resource}");
    }

    let log = fx.store.query_log();
    assert!(log.iter().all(|q| q.kind != QueryKind::Grants));
    // Unrestricted products need no join through order items
    assert_eq!(fx.store.queries_for(ResourceType::OrderItem), 0);
}

#[tokio::test]
async fn merchant_only_sees_own_products() {
    let fx = Fixture::new();
    let session = fx.engine.session(merchant_a());

    let scope = session.scope_for(ResourceType::Product).await.unwrap();
    assert_eq!(scope, VisibilityScope::restricted([5, 9]));

    let page = fx
        .engine
        .list_scoped(&session, ResourceType::Product, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(ids(&page.items), vec![5, 9]);

    let categories = fx
        .engine
        .list_scoped(&session, ResourceType::Category, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(ids(&categories.items), vec![20]);
}

#[tokio::test]
async fn chain_reaches_orders_and_customers_through_sold_products() {
    let fx = Fixture::new();
    let session = fx.engine.session(merchant_a());

    let chain = session.chain().await.unwrap();
    assert_eq!(chain.product, VisibilityScope::restricted([5, 9]));
    assert_eq!(chain.order_item, VisibilityScope::restricted([1, 2, 4]));
    assert_eq!(chain.order, VisibilityScope::restricted([100, 101]));
    assert_eq!(chain.customer, VisibilityScope::restricted([500, 501]));

    let orders = fx
        .engine
        .list_scoped(&session, ResourceType::Order, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(ids(&orders.items), vec![100, 101]);

    let customers = fx
        .engine
        .list_scoped(&session, ResourceType::Customer, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(ids(&customers.items), vec![500, 501]);
}

#[tokio::test]
async fn chain_is_derived_once_per_session() {
    let fx = Fixture::new();
    let session = fx.engine.session(merchant_a());

    session.scope_for(ResourceType::Order).await.unwrap();
    session.scope_for(ResourceType::Customer).await.unwrap();
    session.scope_for(ResourceType::OrderItem).await.unwrap();

    assert_eq!(fx.store.queries_for(ResourceType::OrderItem), 1);
    assert_eq!(fx.store.queries_for(ResourceType::Order), 1);
}

#[tokio::test]
async fn empty_product_scope_propagates_without_queries() {
    let fx = Fixture::new();
    let session = fx.engine.session(newcomer());

    let chain = session.chain().await.unwrap();
    assert_eq!(chain.product, VisibilityScope::Empty);
    assert_eq!(chain.order_item, VisibilityScope::Empty);
    assert_eq!(chain.order, VisibilityScope::Empty);
    assert_eq!(chain.customer, VisibilityScope::Empty);

    let page = fx
        .engine
        .list_scoped(&session, ResourceType::Order, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());

    for resource in [ResourceType::OrderItem, ResourceType::Order, ResourceType::Customer] {
        assert_eq!(fx.store.queries_for(resource), 0, "{resource}");
    }
}

#[tokio::test]
async fn unconditioned_grants_are_unrestricted() {
    let fx = Fixture::new();
    let session = fx.engine.session(analyst());

    let chain = session.chain().await.unwrap();
    assert!(chain.order.is_unrestricted());
    assert!(chain.customer.is_unrestricted());
    assert_eq!(fx.store.queries_for(ResourceType::OrderItem), 0);

    let orders = fx
        .engine
        .list_scoped(&session, ResourceType::Order, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(orders.total, 3);
}

#[tokio::test]
async fn principals_without_roles_get_empty_pages() {
    let fx = Fixture::new();
    let session = fx.engine.session(visitor());

    for resource in ResourceType::ALL {
        let page = fx
            .engine
            .list_scoped(&session, resource, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0, "{resource}");
    }
    assert!(fx.store.query_log().is_empty());
}

#[tokio::test]
async fn permission_store_failure_fails_closed() {
    let fx = Fixture::new();
    fx.store.fail_grant_lookups(true);
    let session = fx.engine.session(merchant_a());

    let page = fx
        .engine
        .list_scoped(&session, ResourceType::Product, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(fx.store.queries_for(ResourceType::Product), 0);
}

#[tokio::test]
async fn user_filters_compose_with_scope() {
    let fx = Fixture::new();
    let session = fx.engine.session(merchant_a());

    let params = ListParams {
        filters: UserFilters {
            status: Some("paid".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let page = fx
        .engine
        .list_scoped(&session, ResourceType::Order, &params)
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec![100]);

    // shipped order 102 exists but is outside the merchant's chain
    let params = ListParams {
        filters: UserFilters {
            status: Some("shipped".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let page = fx
        .engine
        .list_scoped(&session, ResourceType::Order, &params)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn compiled_filter_document() {
    use market_server::filter::{FilterCompiler, Predicate};
    use shared::models::Field;

    let scope = VisibilityScope::restricted([1, 2, 3]);
    let filter = FilterCompiler::compile(&scope, Predicate::eq(Field::Status, "shipped"));
    assert_eq!(
        filter.to_document(),
        json!({"status": "shipped", "id": {"$in": [1, 2, 3]}})
    );
}

#[tokio::test]
async fn invalid_filters_are_rejected_before_scope_work() {
    let fx = Fixture::new();
    let session = fx.engine.session(merchant_a());

    let params = ListParams {
        filters: UserFilters {
            status: Some("paid".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let err = fx
        .engine
        .list_scoped(&session, ResourceType::Customer, &params)
        .await
        .unwrap_err();
    assert_eq!(err.code, market_server::ErrorCode::ValidationFailed);
    assert!(fx.store.query_log().is_empty());
}
