//! Scope-aware aggregation
//!
//! Every metric of a [`StatsSpec`] is evaluated against the same scope
//! snapshot. Metrics run concurrently; an `Empty` scope answers with zero
//! values and never reaches storage.

use futures::future::try_join_all;
use serde::Serialize;
use shared::models::{Entity, Field, ResourceType};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::trend::calculate_trend;
use crate::db::{FindOptions, Repository};
use crate::filter::{Bound, FilterCompiler, Predicate};
use crate::scope::VisibilityScope;
use crate::utils::AppResult;
use crate::utils::money;
use crate::utils::time::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMeasure {
    Count,
    Sum(Field),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKind {
    Count,
    Sum(Field),
    DistinctCount(Field),
    GroupedCount(Field),
    /// `measure` over `time_field` in the current window vs the previous one
    Trend {
        time_field: Field,
        measure: TrendMeasure,
        current: TimeWindow,
        previous: TimeWindow,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub kind: MetricKind,
    /// Extra filter, combined with the scope
    pub filter: Predicate,
}

impl Metric {
    fn new(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
            filter: Predicate::True,
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Count)
    }

    pub fn sum(name: impl Into<String>, field: Field) -> Self {
        Self::new(name, MetricKind::Sum(field))
    }

    pub fn distinct(name: impl Into<String>, field: Field) -> Self {
        Self::new(name, MetricKind::DistinctCount(field))
    }

    pub fn grouped(name: impl Into<String>, field: Field) -> Self {
        Self::new(name, MetricKind::GroupedCount(field))
    }

    pub fn trend(
        name: impl Into<String>,
        time_field: Field,
        measure: TrendMeasure,
        current: TimeWindow,
        previous: TimeWindow,
    ) -> Self {
        Self::new(
            name,
            MetricKind::Trend {
                time_field,
                measure,
                current,
                previous,
            },
        )
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    fn zero(&self) -> MetricValue {
        match self.kind {
            MetricKind::Count | MetricKind::DistinctCount(_) => MetricValue::Count(0),
            MetricKind::Sum(_) => MetricValue::Sum(0.0),
            MetricKind::GroupedCount(_) => MetricValue::Groups(BTreeMap::new()),
            MetricKind::Trend { .. } => MetricValue::Trend(TrendSummary::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSpec {
    pub resource: ResourceType,
    pub metrics: Vec<Metric>,
}

impl StatsSpec {
    pub fn new(resource: ResourceType) -> Self {
        Self {
            resource,
            metrics: Vec::new(),
        }
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSummary {
    pub current: f64,
    pub previous: f64,
    /// Percentage change, 2 decimals
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Sum(f64),
    Groups(BTreeMap<String, u64>),
    Trend(TrendSummary),
}

impl MetricValue {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_sum(&self) -> Option<f64> {
        match self {
            Self::Sum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_groups(&self) -> Option<&BTreeMap<String, u64>> {
        match self {
            Self::Groups(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_trend(&self) -> Option<&TrendSummary> {
        match self {
            Self::Trend(t) => Some(t),
            _ => None,
        }
    }
}

/// Metric name → value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Stats(pub BTreeMap<String, MetricValue>);

impl Stats {
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.0.get(name)
    }

    /// Zero value for every metric of `spec`
    pub fn zeros(spec: &StatsSpec) -> Self {
        Self(
            spec.metrics
                .iter()
                .map(|m| (m.name.clone(), m.zero()))
                .collect(),
        )
    }
}

#[derive(Clone)]
pub struct ScopedAggregator {
    repo: Arc<dyn Repository>,
}

impl ScopedAggregator {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn aggregate(&self, scope: &VisibilityScope, spec: &StatsSpec) -> AppResult<Stats> {
        if scope.is_empty() {
            return Ok(Stats::zeros(spec));
        }

        let values = try_join_all(
            spec.metrics
                .iter()
                .map(|metric| self.evaluate(scope, spec.resource, metric)),
        )
        .await?;

        Ok(Stats(
            spec.metrics
                .iter()
                .map(|m| m.name.clone())
                .zip(values)
                .collect(),
        ))
    }

    async fn evaluate(
        &self,
        scope: &VisibilityScope,
        resource: ResourceType,
        metric: &Metric,
    ) -> AppResult<MetricValue> {
        let filter = FilterCompiler::compile(scope, metric.filter.clone());
        if filter.is_unsatisfiable() {
            return Ok(metric.zero());
        }

        let value = match metric.kind {
            MetricKind::Count => MetricValue::Count(self.repo.count(resource, &filter).await?),
            MetricKind::Sum(field) => {
                MetricValue::Sum(self.sum(resource, &filter, field).await?)
            }
            MetricKind::DistinctCount(field) => {
                let rows = self.rows(resource, &filter).await?;
                let distinct: BTreeSet<String> = rows
                    .iter()
                    .map(|row| row.field(field))
                    .filter(|v| !v.is_null())
                    .map(|v| v.group_key())
                    .collect();
                MetricValue::Count(distinct.len() as u64)
            }
            MetricKind::GroupedCount(field) => {
                let rows = self.rows(resource, &filter).await?;
                let mut groups = BTreeMap::new();
                for row in &rows {
                    *groups.entry(row.field(field).group_key()).or_insert(0u64) += 1;
                }
                MetricValue::Groups(groups)
            }
            MetricKind::Trend {
                time_field,
                measure,
                current,
                previous,
            } => {
                let (current, previous) = tokio::try_join!(
                    self.measure(resource, &filter, time_field, measure, current),
                    self.measure(resource, &filter, time_field, measure, previous),
                )?;
                MetricValue::Trend(TrendSummary {
                    current,
                    previous,
                    change: calculate_trend(current, previous),
                })
            }
        };
        Ok(value)
    }

    async fn measure(
        &self,
        resource: ResourceType,
        filter: &Predicate,
        time_field: Field,
        measure: TrendMeasure,
        window: TimeWindow,
    ) -> AppResult<f64> {
        let windowed = filter.clone().and(Predicate::range(
            time_field,
            Some(Bound::inclusive(window.start)),
            Some(Bound::exclusive(window.end)),
        ));
        match measure {
            TrendMeasure::Count => Ok(self.repo.count(resource, &windowed).await? as f64),
            TrendMeasure::Sum(field) => self.sum(resource, &windowed, field).await,
        }
    }

    async fn sum(&self, resource: ResourceType, filter: &Predicate, field: Field) -> AppResult<f64> {
        let rows = self.rows(resource, filter).await?;
        Ok(money::sum(rows.iter().filter_map(|row| row.field(field).as_f64())))
    }

    async fn rows(&self, resource: ResourceType, filter: &Predicate) -> AppResult<Vec<Entity>> {
        Ok(self
            .repo
            .find_many(resource, filter, &FindOptions::default())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use shared::models::{Order, OrderStatus};

    fn order(id: i64, customer_id: i64, status: OrderStatus, total: f64, created_at: i64) -> Entity {
        Entity::Order(Order {
            id,
            reference: format!("ORD-{id}"),
            customer_id,
            status,
            total_amount: total,
            created_at,
        })
    }

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_all([
            order(100, 1, OrderStatus::Paid, 10.10, 1_500),
            order(101, 1, OrderStatus::Shipped, 20.20, 2_500),
            order(102, 2, OrderStatus::Paid, 30.30, 2_600),
            order(103, 3, OrderStatus::Cancelled, 99.0, 2_700),
        ]);
        store
    }

    fn spec() -> StatsSpec {
        StatsSpec::new(ResourceType::Order)
            .metric(Metric::count("total"))
            .metric(Metric::sum("sales", Field::TotalAmount))
            .metric(Metric::distinct("buyers", Field::CustomerId))
            .metric(Metric::grouped("byStatus", Field::Status))
            .metric(Metric::trend(
                "ordersTrend",
                Field::CreatedAt,
                TrendMeasure::Count,
                TimeWindow::new(2_000, 3_000),
                TimeWindow::new(1_000, 2_000),
            ))
    }

    #[tokio::test]
    async fn test_empty_scope_returns_zeros_without_queries() {
        let store = store();
        let aggregator = ScopedAggregator::new(store.clone());
        let stats = aggregator
            .aggregate(&VisibilityScope::Empty, &spec())
            .await
            .unwrap();

        assert_eq!(stats.get("total"), Some(&MetricValue::Count(0)));
        assert_eq!(stats.get("sales"), Some(&MetricValue::Sum(0.0)));
        assert_eq!(stats.get("buyers"), Some(&MetricValue::Count(0)));
        assert_eq!(stats.get("byStatus"), Some(&MetricValue::Groups(BTreeMap::new())));
        assert_eq!(
            stats.get("ordersTrend"),
            Some(&MetricValue::Trend(TrendSummary::default()))
        );
        assert!(store.query_log().is_empty());
    }

    #[tokio::test]
    async fn test_restricted_scope_limits_every_metric() {
        let aggregator = ScopedAggregator::new(store());
        let stats = aggregator
            .aggregate(&VisibilityScope::restricted([100, 101, 102]), &spec())
            .await
            .unwrap();

        assert_eq!(stats.get("total").and_then(MetricValue::as_count), Some(3));
        assert_eq!(stats.get("sales").and_then(MetricValue::as_sum), Some(60.6));
        assert_eq!(stats.get("buyers").and_then(MetricValue::as_count), Some(2));

        let groups = stats.get("byStatus").and_then(MetricValue::as_groups).unwrap();
        assert_eq!(groups.get("paid"), Some(&2));
        assert_eq!(groups.get("shipped"), Some(&1));
        // only statuses present in the scoped data
        assert!(!groups.contains_key("cancelled"));

        let trend = stats.get("ordersTrend").and_then(MetricValue::as_trend).unwrap();
        assert_eq!(trend.current, 2.0);
        assert_eq!(trend.previous, 1.0);
        assert_eq!(trend.change, 100.0);
    }

    #[tokio::test]
    async fn test_metric_filter_is_combined_with_scope() {
        let aggregator = ScopedAggregator::new(store());
        let spec = StatsSpec::new(ResourceType::Order).metric(
            Metric::count("paid").with_filter(Predicate::eq(Field::Status, OrderStatus::Paid)),
        );

        let all = aggregator
            .aggregate(&VisibilityScope::Unrestricted, &spec)
            .await
            .unwrap();
        assert_eq!(all.get("paid").and_then(MetricValue::as_count), Some(2));

        let scoped = aggregator
            .aggregate(&VisibilityScope::restricted([101, 102]), &spec)
            .await
            .unwrap();
        assert_eq!(scoped.get("paid").and_then(MetricValue::as_count), Some(1));
    }

    #[test]
    fn test_stats_serialize_flat() {
        let mut values = BTreeMap::new();
        values.insert("total".to_string(), MetricValue::Count(3));
        values.insert("sales".to_string(), MetricValue::Sum(60.6));
        let json = serde_json::to_value(Stats(values)).unwrap();
        assert_eq!(json, serde_json::json!({"total": 3, "sales": 60.6}));
    }
}
