use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{RecallError, Result};

/// Filesystem layout of the per-user memory root.
///
/// ```text
/// <root>/
/// ├── bootstrap.md                  (fixed session-start document)
/// ├── config.toml
/// ├── episodic/
/// │   ├── sessions/<id>.json
/// │   └── outcomes/{successes,failures}.jsonl
/// ├── procedural/skills.jsonl
/// ├── semantic/user-profile.json
/// ├── working/context-buffer.json
/// └── metrics/tool-metrics.jsonl
/// ```
#[derive(Debug, Clone)]
pub struct MemoryPaths {
    pub root: PathBuf,
}

impl MemoryPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the memory root from an explicit override, falling back to
    /// `~/.claude/memory`.
    pub fn resolve(root: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = root {
            return Ok(Self::new(root));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| RecallError::Config("could not determine home directory".into()))?;
        Ok(Self::new(home.join(".claude").join("memory")))
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("episodic").join("sessions")
    }

    pub fn outcomes_dir(&self) -> PathBuf {
        self.root.join("episodic").join("outcomes")
    }

    pub fn successes_file(&self) -> PathBuf {
        self.outcomes_dir().join("successes.jsonl")
    }

    pub fn failures_file(&self) -> PathBuf {
        self.outcomes_dir().join("failures.jsonl")
    }

    pub fn skills_file(&self) -> PathBuf {
        self.root.join("procedural").join("skills.jsonl")
    }

    pub fn profile_file(&self) -> PathBuf {
        self.root.join("semantic").join("user-profile.json")
    }

    pub fn buffer_file(&self) -> PathBuf {
        self.root.join("working").join("context-buffer.json")
    }

    pub fn metrics_file(&self) -> PathBuf {
        self.root.join("metrics").join("tool-metrics.jsonl")
    }

    pub fn bootstrap_file(&self) -> PathBuf {
        self.root.join("bootstrap.md")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in self.store_dirs() {
            fs::create_dir_all(&dir).await?;
        }
        self.recover_interrupted_writes().await;
        Ok(())
    }

    fn store_dirs(&self) -> [PathBuf; 6] {
        [
            self.sessions_dir(),
            self.outcomes_dir(),
            self.root.join("procedural"),
            self.root.join("semantic"),
            self.root.join("working"),
            self.root.join("metrics"),
        ]
    }

    /// Remove temp files left behind by a write interrupted before its
    /// rename landed.
    async fn recover_interrupted_writes(&self) {
        for dir in self.store_dirs() {
            let Ok(mut entries) = fs::read_dir(&dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    debug!(path = %path.display(), "Removing interrupted write");
                    let _ = fs::remove_file(&path).await;
                }
            }
        }
    }
}

/// Tunables for retrieval and reporting, loaded from `<root>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Global token-equivalent budget for the budgeted retrieval sections.
    /// The bootstrap document is excluded from this cap.
    pub context_budget: usize,
    /// Window of recent failures surfaced at session start.
    pub recent_failures: usize,
    /// Window of recent successes surfaced at session start.
    pub recent_successes: usize,
    /// Improvement target the metrics report is judged against.
    pub improvement_target: f64,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            context_budget: 1_300,
            recent_failures: 3,
            recent_successes: 3,
            improvement_target: 0.40,
        }
    }
}

impl RecallConfig {
    /// Load configuration, treating a missing file as defaults.
    pub async fn load(paths: &MemoryPaths) -> Result<Self> {
        let file = paths.config_file();
        if !file.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&file).await?;
        Ok(toml::from_str(&content)?)
    }

    pub async fn save(&self, paths: &MemoryPaths) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RecallError::Config(format!("TOML serialize failed: {}", e)))?;
        fs::create_dir_all(&paths.root).await?;
        fs::write(paths.config_file(), content).await?;
        Ok(())
    }
}
