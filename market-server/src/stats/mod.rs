//! 范围内聚合
//!
//! [`ScopedAggregator`] 在一个可见范围快照上并发计算一组指标。

pub mod aggregator;
pub mod trend;

pub use aggregator::{
    Metric, MetricKind, MetricValue, ScopedAggregator, Stats, StatsSpec, TrendMeasure,
    TrendSummary,
};
pub use trend::calculate_trend;
