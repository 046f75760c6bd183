//! Scoped dashboard statistics

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Entity, EntityId, Field, Operation, PrincipalId, ResourceType};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::MarketplaceEngine;
use crate::db::FindOptions;
use crate::filter::{Bound, FilterCompiler, Predicate};
use crate::scope::{ScopeSession, VisibilityScope};
use crate::stats::{Metric, Stats, StatsSpec, TrendMeasure};
use crate::utils::AppResult;
use crate::utils::money::{to_decimal, to_f64};
use crate::utils::time::TimeWindow;

/// Resource → its KPIs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScopedStats(pub BTreeMap<ResourceType, Stats>);

impl ScopedStats {
    pub fn get(&self, resource: ResourceType) -> Option<&Stats> {
        self.0.get(&resource)
    }
}

/// Per-merchant breakdown over the caller's visible chain
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantStats {
    pub merchant_id: PrincipalId,
    pub product_count: u64,
    pub published_count: u64,
    pub order_count: u64,
    pub units_sold: i64,
    pub revenue: f64,
}

/// Default KPI set per resource
pub fn default_spec(resource: ResourceType, now: DateTime<Utc>, low_stock_threshold: i64) -> StatsSpec {
    let this_month = TimeWindow::month_of(now);
    let last_month = TimeWindow::previous_month_of(now);
    let new_this_month = |name: &str| {
        Metric::trend(name, Field::CreatedAt, TrendMeasure::Count, this_month, last_month)
    };

    let spec = StatsSpec::new(resource).metric(Metric::count("total"));
    match resource {
        ResourceType::Product => spec
            .metric(Metric::count("published").with_filter(Predicate::NotNull(Field::PublishedAt)))
            .metric(Metric::count("lowStock").with_filter(Predicate::range(
                Field::Stock,
                None,
                Some(Bound::inclusive(low_stock_threshold)),
            )))
            .metric(new_this_month("newThisMonth")),
        ResourceType::Order => spec
            .metric(Metric::sum("sales", Field::TotalAmount))
            .metric(Metric::grouped("byStatus", Field::Status))
            .metric(Metric::distinct("buyers", Field::CustomerId))
            .metric(new_this_month("ordersTrend"))
            .metric(Metric::trend(
                "salesTrend",
                Field::CreatedAt,
                TrendMeasure::Sum(Field::TotalAmount),
                this_month,
                last_month,
            )),
        ResourceType::OrderItem => spec
            .metric(Metric::sum("unitsSold", Field::Quantity))
            .metric(Metric::distinct("productsSold", Field::ProductId)),
        ResourceType::Customer => spec.metric(new_this_month("newThisMonth")),
        ResourceType::Banner => spec
            .metric(Metric::count("published").with_filter(Predicate::NotNull(Field::PublishedAt))),
        ResourceType::Category => spec,
    }
}

impl MarketplaceEngine {
    /// KPIs for each resource; resources without a read grant report zeros
    pub async fn get_scoped_stats(
        &self,
        session: &ScopeSession,
        resources: &[ResourceType],
    ) -> AppResult<ScopedStats> {
        let now = Utc::now();
        let unique: BTreeSet<ResourceType> = resources.iter().copied().collect();
        let results = try_join_all(unique.into_iter().map(|resource| async move {
            let spec = default_spec(resource, now, self.limits.low_stock_threshold);
            let decision = self
                .resolver
                .resolve(session.principal(), resource, Operation::Read)
                .await;
            let stats = if decision.granted {
                let scope = session.scope_for(resource).await?;
                self.aggregator.aggregate(&scope, &spec).await?
            } else {
                Stats::zeros(&spec)
            };
            Ok::<_, crate::utils::AppError>((resource, stats))
        }))
        .await?;

        Ok(ScopedStats(results.into_iter().collect()))
    }

    /// Products, orders, units and revenue grouped by product creator
    pub async fn merchant_statistics(&self, session: &ScopeSession) -> AppResult<Vec<MerchantStats>> {
        let decision = self
            .resolver
            .resolve(session.principal(), ResourceType::Product, Operation::Read)
            .await;
        if !decision.granted {
            return Ok(Vec::new());
        }

        let chain = session.chain().await?;
        let product_filter = FilterCompiler::compile(&chain.product, Predicate::True);
        if product_filter.is_unsatisfiable() {
            return Ok(Vec::new());
        }
        let products = self
            .repo
            .find_many(ResourceType::Product, &product_filter, &FindOptions::default())
            .await?;

        let item_filter = match &chain.product {
            VisibilityScope::Unrestricted => Predicate::True,
            _ => Predicate::in_ids(Field::ProductId, products.iter().map(Entity::id)),
        };
        let items = if item_filter.is_unsatisfiable() {
            Vec::new()
        } else {
            self.repo
                .find_many(ResourceType::OrderItem, &item_filter, &FindOptions::default())
                .await?
        };

        Ok(merchant_breakdown(&products, &items))
    }
}

#[derive(Default)]
struct MerchantAccumulator {
    products: u64,
    published: u64,
    orders: BTreeSet<EntityId>,
    units: i64,
    revenue: Decimal,
}

fn merchant_breakdown(products: &[Entity], items: &[Entity]) -> Vec<MerchantStats> {
    let mut owners: HashMap<EntityId, PrincipalId> = HashMap::new();
    let mut merchants: BTreeMap<PrincipalId, MerchantAccumulator> = BTreeMap::new();

    for product in products {
        let Some(owner) = product.created_by() else {
            continue;
        };
        owners.insert(product.id(), owner);
        let acc = merchants.entry(owner).or_default();
        acc.products += 1;
        if !product.field(Field::PublishedAt).is_null() {
            acc.published += 1;
        }
    }

    for item in items {
        let Some(owner) = item
            .field(Field::ProductId)
            .as_i64()
            .and_then(|product_id| owners.get(&product_id))
        else {
            continue;
        };
        let acc = merchants.entry(*owner).or_default();
        if let Some(order_id) = item.field(Field::OrderId).as_i64() {
            acc.orders.insert(order_id);
        }
        let quantity = item.field(Field::Quantity).as_i64().unwrap_or(0);
        let unit_price = item.field(Field::UnitPrice).as_f64().unwrap_or(0.0);
        acc.units += quantity;
        acc.revenue += to_decimal(unit_price) * Decimal::from(quantity);
    }

    merchants
        .into_iter()
        .map(|(merchant_id, acc)| MerchantStats {
            merchant_id,
            product_count: acc.products,
            published_count: acc.published,
            order_count: acc.orders.len() as u64,
            units_sold: acc.units,
            revenue: to_f64(acc.revenue),
        })
        .collect()
}
