//! Tool-call token measurement and baseline/optimized comparison.

mod collector;
mod report;

pub use collector::{MetricEvent, MetricsCollector};
pub use report::{ComparisonReport, ScenarioComparison};
