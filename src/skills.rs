//! Catalog of reusable solution patterns with usage statistics.
//!
//! The catalog is small enough to hold in memory; every mutation rewrites
//! the full record set through a temp file and atomic rename. Concurrent
//! writers are last-writer-wins.

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MemoryPaths;
use crate::error::{RecallError, Result};
use crate::outcomes::OutcomeKind;
use crate::store::{self, VersionedRecord, default_schema_version};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub id: String,
    pub name: String,
    pub description: String,
    /// Keywords whose presence in a task description nominates this skill.
    pub triggers: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    pub estimated_tokens: u64,
    /// Cumulative mean of recorded outcomes, in [0, 1].
    pub success_rate: f64,
    pub times_used: u64,
    pub last_used: DateTime<Utc>,
    pub source_session: String,
}

impl SkillRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        triggers: Vec<String>,
        source_session: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: default_schema_version(),
            id: id.into(),
            name: name.into(),
            description: description.into(),
            triggers,
            prerequisites: Vec::new(),
            steps: Vec::new(),
            estimated_tokens: 0,
            success_rate: 0.0,
            times_used: 0,
            last_used: Utc::now(),
            source_session: source_session.into(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_estimated_tokens(mut self, tokens: u64) -> Self {
        self.estimated_tokens = tokens;
        self
    }

    /// Count of trigger keywords appearing as case-insensitive substrings
    /// of the task description.
    pub fn trigger_matches(&self, task: &str) -> usize {
        let task_lower = task.to_lowercase();
        self.triggers
            .iter()
            .filter(|t| !t.is_empty() && task_lower.contains(&t.to_lowercase()))
            .count()
    }

    /// Fold one usage outcome into the running statistics.
    ///
    /// `success_rate` stays the exact cumulative mean of all recorded
    /// outcomes; older and newer evidence weigh equally.
    pub fn apply_usage(&mut self, outcome: OutcomeKind) {
        let value = if outcome.is_success() { 1.0 } else { 0.0 };
        let n = self.times_used as f64;
        self.success_rate = (self.success_rate * n + value) / (n + 1.0);
        self.times_used += 1;
        self.last_used = Utc::now();
    }
}

impl VersionedRecord for SkillRecord {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

pub struct SkillLibrary {
    path: PathBuf,
}

impl SkillLibrary {
    pub fn new(paths: &MemoryPaths) -> Self {
        Self {
            path: paths.skills_file(),
        }
    }

    pub async fn load(&self) -> Result<Vec<SkillRecord>> {
        store::read_jsonl(&self.path).await
    }

    /// Insert a new skill. Rejects an already-present id without touching
    /// the existing record.
    pub async fn append(&self, skill: SkillRecord) -> Result<String> {
        let mut skills = self.load().await?;

        if skills.iter().any(|s| s.id == skill.id) {
            return Err(RecallError::DuplicateSkill(skill.id));
        }

        let id = skill.id.clone();
        skills.push(skill);
        self.save_all(&skills).await?;

        debug!(id = %id, "Appended skill");
        Ok(id)
    }

    /// Record one usage outcome for a skill, returning the updated record.
    pub async fn record_usage(&self, id: &str, outcome: OutcomeKind) -> Result<SkillRecord> {
        let mut skills = self.load().await?;

        let skill = skills
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RecallError::SkillNotFound(id.to_string()))?;

        skill.apply_usage(outcome);
        let updated = skill.clone();

        self.save_all(&skills).await?;

        debug!(
            id = %updated.id,
            times_used = updated.times_used,
            success_rate = updated.success_rate,
            "Recorded skill usage"
        );
        Ok(updated)
    }

    /// Check whether a skill id is already catalogued.
    pub async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.load().await?.iter().any(|s| s.id == id))
    }

    /// Rank skills against a task description.
    ///
    /// Order: trigger match count desc, success rate desc, last used desc,
    /// then id asc as the deterministic tie-break. Skills with no trigger
    /// match are excluded.
    pub async fn lookup(&self, task: &str) -> Result<Vec<SkillRecord>> {
        let skills = self.load().await?;
        Ok(rank(skills, task))
    }

    async fn save_all(&self, skills: &[SkillRecord]) -> Result<()> {
        let mut content = String::new();
        for skill in skills {
            content.push_str(&serde_json::to_string(skill)?);
            content.push('\n');
        }
        store::write_atomic(&self.path, &content).await
    }
}

fn rank(skills: Vec<SkillRecord>, task: &str) -> Vec<SkillRecord> {
    let mut scored: Vec<(usize, SkillRecord)> = skills
        .into_iter()
        .filter_map(|s| {
            let matches = s.trigger_matches(task);
            (matches > 0).then_some((matches, s))
        })
        .collect();

    scored.sort_by(|(am, a), (bm, b)| {
        bm.cmp(am)
            .then_with(|| {
                b.success_rate
                    .partial_cmp(&a.success_rate)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.last_used.cmp(&a.last_used))
            .then_with(|| a.id.cmp(&b.id))
    });

    scored.into_iter().map(|(_, s)| s).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn library_in(dir: &TempDir) -> SkillLibrary {
        SkillLibrary::new(&MemoryPaths::new(dir.path()))
    }

    fn skill(id: &str, triggers: &[&str]) -> SkillRecord {
        SkillRecord::new(
            id,
            format!("{}-name", id),
            "a reusable pattern",
            triggers.iter().map(|t| t.to_string()).collect(),
            "2026-01-01_001",
        )
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);

        library.append(skill("skill_a", &["auth"])).await.unwrap();
        let skills = library.load().await.unwrap();

        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].id, "skill_a");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected_and_original_untouched() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);

        let mut original = skill("skill_a", &["auth"]);
        original.description = "the original".into();
        library.append(original).await.unwrap();

        let mut imposter = skill("skill_a", &["deploy"]);
        imposter.description = "the imposter".into();
        let err = library.append(imposter).await.unwrap_err();

        assert!(matches!(err, RecallError::DuplicateSkill(id) if id == "skill_a"));

        let skills = library.load().await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].description, "the original");
    }

    #[tokio::test]
    async fn test_cumulative_mean_identity() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        library.append(skill("skill_a", &["auth"])).await.unwrap();

        let outcomes = [
            OutcomeKind::Success,
            OutcomeKind::Failure,
            OutcomeKind::Success,
            OutcomeKind::Success,
            OutcomeKind::Failure,
        ];
        let mut updated = None;
        for outcome in outcomes {
            updated = Some(library.record_usage("skill_a", outcome).await.unwrap());
        }

        let updated = updated.unwrap();
        let successes = outcomes.iter().filter(|o| o.is_success()).count() as f64;
        assert_eq!(updated.times_used, outcomes.len() as u64);
        assert!((updated.success_rate - successes / outcomes.len() as f64).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_record_usage_unknown_skill() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);

        let err = library
            .record_usage("missing", OutcomeKind::Success)
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::SkillNotFound(_)));
    }

    #[tokio::test]
    async fn test_lookup_ranks_by_match_count_then_success_rate() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);

        let mut one_match = skill("skill_one", &["auth"]);
        one_match.success_rate = 1.0;
        let mut two_matches = skill("skill_two", &["auth", "jwt"]);
        two_matches.success_rate = 0.5;
        library.append(one_match).await.unwrap();
        library.append(two_matches).await.unwrap();

        let ranked = library.lookup("add jwt auth to the api").await.unwrap();
        assert_eq!(ranked[0].id, "skill_two");
        assert_eq!(ranked[1].id, "skill_one");
    }

    #[tokio::test]
    async fn test_lookup_tie_breaks_on_recency_then_id() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);

        let now = Utc::now();
        let mut older = skill("skill_a", &["auth"]);
        older.last_used = now - Duration::days(2);
        let mut newer = skill("skill_b", &["auth"]);
        newer.last_used = now;
        library.append(older).await.unwrap();
        library.append(newer).await.unwrap();

        let ranked = library.lookup("fix auth").await.unwrap();
        assert_eq!(ranked[0].id, "skill_b");

        // Same recency falls back to ascending id.
        let mut twin_a = skill("skill_c", &["deploy"]);
        twin_a.last_used = now;
        let mut twin_b = skill("skill_d", &["deploy"]);
        twin_b.last_used = now;
        library.append(twin_b).await.unwrap();
        library.append(twin_a).await.unwrap();

        let ranked = library.lookup("deploy the service").await.unwrap();
        assert_eq!(ranked[0].id, "skill_c");
    }

    #[tokio::test]
    async fn test_lookup_excludes_non_matching() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        library.append(skill("skill_a", &["database"])).await.unwrap();

        let ranked = library.lookup("write documentation").await.unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_trigger_match_is_case_insensitive_substring() {
        let s = skill("skill_a", &["Auth", "API"]);
        assert_eq!(s.trigger_matches("fix the authentication api"), 2);
        assert_eq!(s.trigger_matches("unrelated"), 0);
    }
}
