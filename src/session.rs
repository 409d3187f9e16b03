//! Immutable session records and the session-end capture flow.
//!
//! Capture harvests the working buffer into a `SessionRecord`, appends an
//! outcome to the episodic log, extracts or updates a skill on success,
//! and finally clears the buffer. It is designed to never block the host
//! runtime: callers should treat failures as warnings.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::MemoryPaths;
use crate::error::{RecallError, Result};
use crate::outcomes::{OutcomeKind, OutcomeLog, OutcomeRecord};
use crate::skills::{SkillLibrary, SkillRecord};
use crate::store::{self, SCHEMA_VERSION, default_schema_version};
use crate::working::BufferStore;

/// Keywords promoted to skill triggers when present in a task description.
const TRIGGER_KEYWORDS: &[&str] = &[
    "auth", "test", "api", "database", "fix", "add", "create", "implement",
    "refactor", "update", "delete", "remove", "component", "hook",
    "middleware", "config", "deploy",
];

static WORD_PATTERN: OnceLock<Regex> = OnceLock::new();

fn word_pattern() -> &'static Regex {
    WORD_PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").unwrap())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub project_path: String,
    pub initial_task: String,
    pub outcome: OutcomeKind,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_decisions: Vec<String>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub lessons: Vec<String>,
}

pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    pub fn new(paths: &MemoryPaths) -> Self {
        Self {
            sessions_dir: paths.sessions_dir(),
        }
    }

    /// Next session id for today: `YYYY-MM-DD_NNN`, strictly increasing
    /// per day, derived from the highest existing sequence.
    pub async fn next_id(&self) -> Result<String> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let prefix = format!("{}_", today);

        let mut max_seq = 0u32;
        if self.sessions_dir.exists() {
            let mut entries = fs::read_dir(&self.sessions_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(rest) = name.strip_prefix(&prefix)
                    && let Some(seq) = rest.strip_suffix(".json")
                    && let Ok(seq) = seq.parse::<u32>()
                {
                    max_seq = max_seq.max(seq);
                }
            }
        }

        Ok(format!("{}_{:03}", today, max_seq + 1))
    }

    /// Persist a session record. Records are created once and never
    /// mutated afterwards.
    pub async fn save(&self, record: &SessionRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.sessions_dir).await?;
        let path = self.sessions_dir.join(format!("{}.json", record.session_id));
        let content = serde_json::to_string_pretty(record)?;
        store::write_atomic(&path, &content).await?;
        debug!(session_id = %record.session_id, "Saved session record");
        Ok(path)
    }

    pub async fn load(&self, session_id: &str) -> Result<SessionRecord> {
        let path = self.sessions_dir.join(format!("{}.json", session_id));
        let content = fs::read_to_string(&path).await?;
        let record: SessionRecord = serde_json::from_str(&content)?;
        if record.schema_version != SCHEMA_VERSION {
            return Err(RecallError::Store(format!(
                "session {} has unsupported schema version {}",
                session_id, record.schema_version
            )));
        }
        Ok(record)
    }
}

/// Outcome of a capture run, for display.
#[derive(Debug)]
pub struct CaptureSummary {
    pub session_id: String,
    pub outcome: OutcomeKind,
    pub extracted_skill: Option<String>,
}

pub struct SessionCapture {
    buffer: BufferStore,
    sessions: SessionStore,
    outcomes: OutcomeLog,
    skills: SkillLibrary,
}

impl SessionCapture {
    pub fn new(paths: &MemoryPaths) -> Self {
        Self {
            buffer: BufferStore::new(paths),
            sessions: SessionStore::new(paths),
            outcomes: OutcomeLog::new(paths),
            skills: SkillLibrary::new(paths),
        }
    }

    pub async fn capture(
        &self,
        outcome: OutcomeKind,
        summary: Option<String>,
    ) -> Result<CaptureSummary> {
        let buffer = self.buffer.snapshot().await?;
        let now = Utc::now();

        let (started_at, project_path, task, tools, files, decisions, tokens) = match buffer {
            Some(b) => (
                b.started_at.min(now),
                b.project_path,
                if b.current_task.is_empty() {
                    "Unknown task".to_string()
                } else {
                    b.current_task
                },
                b.tools_used,
                b.files_modified,
                b.decisions_made.into_iter().map(|d| d.decision).collect(),
                b.accumulated_tokens,
            ),
            None => {
                warn!("No working buffer to harvest, capturing minimal session");
                let cwd = std::env::current_dir()?.display().to_string();
                (now, cwd, "Unknown task".to_string(), Vec::new(), Vec::new(), Vec::new(), 0)
            }
        };

        let session_id = self.sessions.next_id().await?;
        let record = SessionRecord {
            schema_version: default_schema_version(),
            session_id: session_id.clone(),
            started_at,
            ended_at: now,
            project_path: project_path.clone(),
            initial_task: task.clone(),
            outcome,
            summary: summary.unwrap_or_default(),
            key_decisions: decisions,
            tools_used: tools,
            files_modified: files,
            tokens_used: tokens,
            turn_count: 0,
            errors: Vec::new(),
            lessons: Vec::new(),
        };
        self.sessions.save(&record).await?;

        let outcome_record = OutcomeRecord::new(outcome, &task, &project_path, tokens);
        self.outcomes.append(&outcome_record).await?;

        let extracted_skill = if outcome.is_success() {
            self.extract_and_store_skill(&record).await?
        } else {
            None
        };

        self.buffer.clear().await?;

        info!(session_id = %session_id, outcome = %outcome, "Captured session");
        Ok(CaptureSummary {
            session_id,
            outcome,
            extracted_skill,
        })
    }

    /// Voyager-style extraction: a successful session with a clear task
    /// becomes a skill, or reinforces the one it previously produced.
    async fn extract_and_store_skill(&self, record: &SessionRecord) -> Result<Option<String>> {
        let Some(skill) = extract_skill(record) else {
            return Ok(None);
        };

        let name = skill.name.clone();
        if self.skills.contains(&skill.id).await? {
            self.skills
                .record_usage(&skill.id, OutcomeKind::Success)
                .await?;
        } else {
            self.skills.append(skill).await?;
        }

        Ok(Some(name))
    }
}

/// Build a candidate skill from a successful session, or None when the
/// task is too thin to generalize.
pub fn extract_skill(record: &SessionRecord) -> Option<SkillRecord> {
    if !record.outcome.is_success() || record.initial_task.chars().count() < 10 {
        return None;
    }

    let task_lower = record.initial_task.to_lowercase();

    let mut triggers: Vec<String> = TRIGGER_KEYWORDS
        .iter()
        .filter(|kw| task_lower.contains(**kw))
        .map(|kw| kw.to_string())
        .collect();

    if triggers.is_empty() {
        triggers = word_pattern()
            .find_iter(&task_lower)
            .take(3)
            .map(|m| m.as_str().to_string())
            .collect();
    }
    if triggers.is_empty() {
        return None;
    }

    let name: String = task_lower
        .chars()
        .take(50)
        .map(|c| if c == ' ' { '-' } else { c })
        .collect();

    let mut skill = SkillRecord::new(
        stable_skill_id(&record.initial_task),
        name,
        &record.initial_task,
        triggers,
        &record.session_id,
    )
    .with_steps(record.key_decisions.clone())
    .with_estimated_tokens(record.tokens_used);

    // A freshly extracted skill carries its originating outcome.
    skill.apply_usage(OutcomeKind::Success);
    Some(skill)
}

/// Deterministic id for a task so repeat sessions reinforce the same
/// skill instead of duplicating it. FNV-1a over the raw task text.
pub fn stable_skill_id(task: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in task.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("skill_{:08x}", (hash >> 32) as u32 ^ hash as u32)
}
