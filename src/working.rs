//! Ephemeral per-session scratch state.
//!
//! A single buffer per process tree: `initialize` overwrites whatever was
//! there before, and nothing is carried into a session record unless a
//! collaborator harvests a snapshot before the buffer is cleared.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::MemoryPaths;
use crate::error::Result;
use crate::store::{self, SCHEMA_VERSION, default_schema_version};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: DateTime<Utc>,
    pub decision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingBuffer {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub project_path: String,
    #[serde(default)]
    pub current_task: String,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub decisions_made: Vec<Decision>,
    #[serde(default)]
    pub accumulated_tokens: u64,
}

impl WorkingBuffer {
    pub fn new(project_path: &Path) -> Self {
        Self {
            schema_version: default_schema_version(),
            session_id: "current".to_string(),
            started_at: Utc::now(),
            project_path: project_path.display().to_string(),
            current_task: String::new(),
            tools_used: Vec::new(),
            files_modified: Vec::new(),
            decisions_made: Vec::new(),
            accumulated_tokens: 0,
        }
    }
}

pub struct BufferStore {
    path: PathBuf,
}

impl BufferStore {
    pub fn new(paths: &MemoryPaths) -> Self {
        Self {
            path: paths.buffer_file(),
        }
    }

    /// Start a fresh buffer, discarding any prior content.
    pub async fn initialize(&self, project_path: &Path) -> Result<WorkingBuffer> {
        let buffer = WorkingBuffer::new(project_path);
        self.save(&buffer).await?;
        debug!(project = %buffer.project_path, "Initialized working buffer");
        Ok(buffer)
    }

    /// Read-only copy for a caller that wants to persist it into a session
    /// record before the buffer is discarded. None when no buffer exists.
    pub async fn snapshot(&self) -> Result<Option<WorkingBuffer>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        match serde_json::from_str::<WorkingBuffer>(&content) {
            Ok(buffer) if buffer.schema_version == SCHEMA_VERSION => Ok(Some(buffer)),
            Ok(buffer) => {
                warn!(
                    version = buffer.schema_version,
                    "Working buffer has unsupported schema version, discarding"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Malformed working buffer, discarding");
                Ok(None)
            }
        }
    }

    pub async fn set_task(&self, task: impl Into<String>) -> Result<WorkingBuffer> {
        self.update(|buffer| buffer.current_task = task.into()).await
    }

    pub async fn record_tool(&self, name: impl Into<String>) -> Result<WorkingBuffer> {
        let name = name.into();
        self.update(|buffer| {
            if !buffer.tools_used.contains(&name) {
                buffer.tools_used.push(name);
            }
        })
        .await
    }

    pub async fn record_file(&self, path: impl Into<String>) -> Result<WorkingBuffer> {
        let path = path.into();
        self.update(|buffer| {
            if !buffer.files_modified.contains(&path) {
                buffer.files_modified.push(path);
            }
        })
        .await
    }

    pub async fn record_decision(&self, text: impl Into<String>) -> Result<WorkingBuffer> {
        let decision = Decision {
            timestamp: Utc::now(),
            decision: text.into(),
        };
        self.update(|buffer| buffer.decisions_made.push(decision)).await
    }

    pub async fn add_tokens(&self, count: u64) -> Result<WorkingBuffer> {
        self.update(|buffer| buffer.accumulated_tokens += count).await
    }

    /// Destroy the buffer at session end.
    pub async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
            debug!("Cleared working buffer");
        }
        Ok(())
    }

    async fn update(&self, apply: impl FnOnce(&mut WorkingBuffer)) -> Result<WorkingBuffer> {
        let mut buffer = match self.snapshot().await? {
            Some(buffer) => buffer,
            // Updates before an explicit initialize start from the cwd.
            None => WorkingBuffer::new(&std::env::current_dir()?),
        };
        apply(&mut buffer);
        self.save(&buffer).await?;
        Ok(buffer)
    }

    async fn save(&self, buffer: &WorkingBuffer) -> Result<()> {
        let content = serde_json::to_string_pretty(buffer)?;
        store::write_atomic(&self.path, &content).await
    }
}
