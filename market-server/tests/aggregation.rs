//! Scoped statistics

mod common;

use common::{Fixture, admin, merchant_a, newcomer, visitor};
use market_server::VisibilityScope;
use market_server::services::{MerchantStats, default_spec};
use market_server::stats::{MetricValue, ScopedAggregator, Stats, TrendSummary};
use chrono::Utc;
use shared::models::ResourceType;
use std::collections::BTreeMap;

fn count(stats: &Stats, name: &str) -> u64 {
    stats.get(name).and_then(MetricValue::as_count).unwrap_or(u64::MAX)
}

fn trend(stats: &Stats, name: &str) -> TrendSummary {
    stats
        .get(name)
        .and_then(MetricValue::as_trend)
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn empty_scope_aggregates_to_zero_without_queries() {
    let fx = Fixture::new();
    let aggregator = ScopedAggregator::new(fx.store.clone());
    let spec = default_spec(ResourceType::Order, Utc::now(), 5);

    let stats = aggregator.aggregate(&VisibilityScope::Empty, &spec).await.unwrap();
    assert_eq!(stats, Stats::zeros(&spec));
    assert_eq!(count(&stats, "total"), 0);
    assert_eq!(stats.get("sales").and_then(MetricValue::as_sum), Some(0.0));
    assert_eq!(trend(&stats, "ordersTrend"), TrendSummary::default());
    assert!(fx.store.query_log().is_empty());
}

#[tokio::test]
async fn merchant_stats_follow_the_chain() {
    let fx = Fixture::new();
    let session = fx.engine.session(merchant_a());

    let stats = fx
        .engine
        .get_scoped_stats(
            &session,
            &[
                ResourceType::Product,
                ResourceType::Order,
                ResourceType::OrderItem,
                ResourceType::Customer,
            ],
        )
        .await
        .unwrap();

    let products = stats.get(ResourceType::Product).unwrap();
    assert_eq!(count(products, "total"), 2);
    assert_eq!(count(products, "published"), 1);
    assert_eq!(count(products, "lowStock"), 1);
    assert_eq!(
        trend(products, "newThisMonth"),
        TrendSummary {
            current: 2.0,
            previous: 0.0,
            change: 100.0
        }
    );

    let orders = stats.get(ResourceType::Order).unwrap();
    assert_eq!(count(orders, "total"), 2);
    assert_eq!(orders.get("sales").and_then(MetricValue::as_sum), Some(80.0));
    assert_eq!(count(orders, "buyers"), 2);
    let by_status = orders.get("byStatus").and_then(MetricValue::as_groups).unwrap();
    assert_eq!(
        by_status,
        &BTreeMap::from([("paid".to_string(), 1), ("pending".to_string(), 1)])
    );

    let items = stats.get(ResourceType::OrderItem).unwrap();
    assert_eq!(count(items, "total"), 3);
    assert_eq!(items.get("unitsSold").and_then(MetricValue::as_sum), Some(4.0));
    assert_eq!(count(items, "productsSold"), 2);

    let customers = stats.get(ResourceType::Customer).unwrap();
    assert_eq!(count(customers, "total"), 2);
    assert_eq!(trend(customers, "newThisMonth").change, 0.0);
}

#[tokio::test]
async fn admin_trends_compare_with_last_month() {
    let fx = Fixture::new();
    let session = fx.engine.session(admin());

    let stats = fx
        .engine
        .get_scoped_stats(&session, &[ResourceType::Order, ResourceType::Product])
        .await
        .unwrap();

    let orders = stats.get(ResourceType::Order).unwrap();
    assert_eq!(count(orders, "total"), 3);
    assert_eq!(trend(orders, "ordersTrend").change, 100.0);
    assert_eq!(
        trend(orders, "salesTrend"),
        TrendSummary {
            current: 80.0,
            previous: 50.0,
            change: 60.0
        }
    );

    let products = stats.get(ResourceType::Product).unwrap();
    assert_eq!(count(products, "lowStock"), 2);
    assert_eq!(trend(products, "newThisMonth").change, 0.0);
}

#[tokio::test]
async fn missing_read_grant_reports_zeros() {
    let fx = Fixture::new();
    let session = fx.engine.session(visitor());

    let stats = fx
        .engine
        .get_scoped_stats(&session, &ResourceType::ALL)
        .await
        .unwrap();

    assert_eq!(stats.0.len(), ResourceType::ALL.len());
    for (resource, values) in &stats.0 {
        assert_eq!(count(values, "total"), 0, "{resource}");
    }
    assert!(fx.store.query_log().is_empty());
}

#[tokio::test]
async fn merchant_breakdown_is_scoped() {
    let fx = Fixture::new();

    let session = fx.engine.session(admin());
    let all = fx.engine.merchant_statistics(&session).await.unwrap();
    assert_eq!(
        all,
        vec![
            MerchantStats {
                merchant_id: 8,
                product_count: 2,
                published_count: 1,
                order_count: 1,
                units_sold: 1,
                revenue: 50.0,
            },
            MerchantStats {
                merchant_id: 42,
                product_count: 2,
                published_count: 1,
                order_count: 2,
                units_sold: 4,
                revenue: 80.0,
            },
        ]
    );

    let session = fx.engine.session(merchant_a());
    let own = fx.engine.merchant_statistics(&session).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].merchant_id, 42);

    let session = fx.engine.session(newcomer());
    assert!(fx.engine.merchant_statistics(&session).await.unwrap().is_empty());
}
