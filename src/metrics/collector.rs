//! Append-only stream of tool-invocation measurements.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::config::MemoryPaths;
use crate::error::Result;
use crate::store::{self, VersionedRecord, default_schema_version};

use super::report::ComparisonReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEvent {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub scenario: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub baseline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MetricEvent {
    pub fn new(
        tool: impl Into<String>,
        scenario: impl Into<String>,
        tokens_in: u64,
        tokens_out: u64,
        baseline: bool,
    ) -> Self {
        Self {
            schema_version: default_schema_version(),
            timestamp: Utc::now(),
            tool: tool.into(),
            scenario: scenario.into(),
            tokens_in,
            tokens_out,
            baseline,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens_in + self.tokens_out
    }
}

impl VersionedRecord for MetricEvent {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

pub struct MetricsCollector {
    path: PathBuf,
}

impl MetricsCollector {
    pub fn new(paths: &MemoryPaths) -> Self {
        Self {
            path: paths.metrics_file(),
        }
    }

    pub async fn record(&self, event: &MetricEvent) -> Result<()> {
        store::append_jsonl(&self.path, event).await?;
        debug!(
            tool = %event.tool,
            scenario = %event.scenario,
            tokens = event.total_tokens(),
            baseline = event.baseline,
            "Recorded metric"
        );
        Ok(())
    }

    pub async fn load(&self) -> Result<Vec<MetricEvent>> {
        store::read_jsonl(&self.path).await
    }

    /// Aggregate all recorded events. Read-only: repeated calls over the
    /// same data produce identical reports.
    pub async fn report(&self) -> Result<ComparisonReport> {
        let events = self.load().await?;
        Ok(ComparisonReport::from_events(&events))
    }

    /// Reset the store to empty.
    pub async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
            debug!("Cleared metrics");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn collector_in(dir: &TempDir) -> MetricsCollector {
        MetricsCollector::new(&MemoryPaths::new(dir.path()))
    }

    #[tokio::test]
    async fn test_record_and_load() {
        let dir = TempDir::new().unwrap();
        let collector = collector_in(&dir);

        collector
            .record(&MetricEvent::new("Glob", "file-discovery", 50, 100, false))
            .await
            .unwrap();
        collector
            .record(
                &MetricEvent::new("Bash", "file-discovery", 100, 700, true)
                    .with_notes("find over the whole tree"),
            )
            .await
            .unwrap();

        let events = collector.load().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].total_tokens(), 150);
        assert_eq!(events[1].notes.as_deref(), Some("find over the whole tree"));
    }

    #[tokio::test]
    async fn test_report_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let collector = collector_in(&dir);

        collector
            .record(&MetricEvent::new("Grep", "content-search", 100, 200, true))
            .await
            .unwrap();
        collector
            .record(&MetricEvent::new("Grep", "content-search", 40, 60, false))
            .await
            .unwrap();

        let first = collector.report().await.unwrap();
        let second = collector.report().await.unwrap();
        assert_eq!(first.render(0.4), second.render(0.4));
        assert_eq!(first.baseline_total_tokens, second.baseline_total_tokens);
    }

    #[tokio::test]
    async fn test_clear_then_report_is_all_zero() {
        let dir = TempDir::new().unwrap();
        let collector = collector_in(&dir);

        collector
            .record(&MetricEvent::new("Read", "multi-file-read", 200, 500, true))
            .await
            .unwrap();
        collector.clear().await.unwrap();

        let report = collector.report().await.unwrap();
        assert!(report.scenarios.is_empty());
        assert_eq!(report.baseline_total_tokens, 0);
        assert_eq!(report.optimized_total_tokens, 0);
        assert_eq!(report.total_reduction(), 0.0);
    }

    #[tokio::test]
    async fn test_clear_missing_store_is_ok() {
        let dir = TempDir::new().unwrap();
        collector_in(&dir).clear().await.unwrap();
    }
}
