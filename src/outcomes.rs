//! Append-only log of session outcomes, split by kind.
//!
//! Records are never mutated after the append. No retention policy is
//! applied; readers take a bounded recent window instead.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MemoryPaths;
use crate::error::Result;
use crate::store::{self, VersionedRecord, default_schema_version};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Failure,
}

impl OutcomeKind {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    pub task: String,
    pub outcome: OutcomeKind,
    /// Pattern that worked, or the mistake made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Consequence or fix, recorded for failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    pub project: String,
    pub tokens: u64,
}

impl OutcomeRecord {
    pub fn new(
        outcome: OutcomeKind,
        task: impl Into<String>,
        project: impl Into<String>,
        tokens: u64,
    ) -> Self {
        Self {
            schema_version: default_schema_version(),
            timestamp: Utc::now(),
            task: task.into(),
            outcome,
            pattern: None,
            fix: None,
            project: project.into(),
            tokens,
        }
    }

    pub fn success(task: impl Into<String>, project: impl Into<String>, tokens: u64) -> Self {
        Self::new(OutcomeKind::Success, task, project, tokens)
    }

    pub fn failure(task: impl Into<String>, project: impl Into<String>, tokens: u64) -> Self {
        Self::new(OutcomeKind::Failure, task, project, tokens)
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    /// One-line rendering used by retrieval summaries.
    pub fn one_line(&self) -> String {
        let text = self.pattern.as_deref().unwrap_or(&self.task);
        let text: String = text.chars().take(50).collect();
        format!("[{}] {}", self.timestamp.format("%Y-%m-%d"), text)
    }
}

impl VersionedRecord for OutcomeRecord {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

pub struct OutcomeLog {
    successes_path: PathBuf,
    failures_path: PathBuf,
}

impl OutcomeLog {
    pub fn new(paths: &MemoryPaths) -> Self {
        Self {
            successes_path: paths.successes_file(),
            failures_path: paths.failures_file(),
        }
    }

    pub async fn append_success(&self, record: &OutcomeRecord) -> Result<()> {
        store::append_jsonl(&self.successes_path, record).await?;
        debug!(task = %record.task, "Appended success outcome");
        Ok(())
    }

    pub async fn append_failure(&self, record: &OutcomeRecord) -> Result<()> {
        store::append_jsonl(&self.failures_path, record).await?;
        debug!(task = %record.task, "Appended failure outcome");
        Ok(())
    }

    /// Route by the record's own kind.
    pub async fn append(&self, record: &OutcomeRecord) -> Result<()> {
        match record.outcome {
            OutcomeKind::Success => self.append_success(record).await,
            OutcomeKind::Failure => self.append_failure(record).await,
        }
    }

    /// Last `n` failures in original append order. Fewer than `n` records
    /// returns all of them.
    pub async fn recent_failures(&self, n: usize) -> Result<Vec<OutcomeRecord>> {
        Self::recent(&self.failures_path, n).await
    }

    pub async fn recent_successes(&self, n: usize) -> Result<Vec<OutcomeRecord>> {
        Self::recent(&self.successes_path, n).await
    }

    async fn recent(path: &std::path::Path, n: usize) -> Result<Vec<OutcomeRecord>> {
        let mut records: Vec<OutcomeRecord> = store::read_jsonl(path).await?;
        let skip = records.len().saturating_sub(n);
        Ok(records.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir) -> OutcomeLog {
        OutcomeLog::new(&MemoryPaths::new(dir.path()))
    }

    #[tokio::test]
    async fn test_recent_failures_with_fewer_entries() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append_failure(&OutcomeRecord::failure("broke the build", "/p", 100))
            .await
            .unwrap();

        let recent = log.recent_failures(3).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].task, "broke the build");
    }

    #[tokio::test]
    async fn test_recent_preserves_original_order() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        for i in 0..5 {
            log.append_failure(&OutcomeRecord::failure(format!("task {}", i), "/p", 10))
                .await
                .unwrap();
        }

        let recent = log.recent_failures(3).await.unwrap();
        let tasks: Vec<_> = recent.iter().map(|r| r.task.as_str()).collect();
        assert_eq!(tasks, vec!["task 2", "task 3", "task 4"]);
    }

    #[tokio::test]
    async fn test_successes_and_failures_are_separate() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(&OutcomeRecord::success("won", "/p", 10))
            .await
            .unwrap();
        log.append(&OutcomeRecord::failure("lost", "/p", 10))
            .await
            .unwrap();

        assert_eq!(log.recent_successes(10).await.unwrap().len(), 1);
        assert_eq!(log.recent_failures(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        assert!(log.recent_failures(3).await.unwrap().is_empty());
    }

    #[test]
    fn test_one_line_prefers_pattern_and_truncates() {
        let record = OutcomeRecord::failure("x".repeat(100), "/p", 0)
            .with_pattern("forgot to run the formatter before committing changes again");
        let line = record.one_line();
        assert!(line.contains("forgot to run the formatter"));
        // date prefix + truncated text
        assert!(line.len() <= 12 + 50 + 1);
    }
}
