//! Slowly-changing user preference store.
//!
//! Preferences are an opaque nested map the core never interprets beyond
//! lookup of a few well-known keys for the condensed retrieval summary.
//! Learned notes are appended over time, never removed.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::warn;

use crate::config::MemoryPaths;
use crate::error::Result;
use crate::store::{self, SCHEMA_VERSION, default_schema_version};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedNote {
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Opaque preference map: communication style, code style, testing
    /// policy, and whatever else the user's tooling writes here.
    #[serde(default)]
    pub preferences: serde_json::Map<String, Value>,
    #[serde(default)]
    pub learned: Vec<LearnedNote>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            preferences: serde_json::Map::new(),
            learned: Vec::new(),
        }
    }
}

impl UserProfile {
    fn pref(&self, section: &str, key: &str) -> Option<&Value> {
        self.preferences.get(section)?.get(key)
    }

    /// Condensed summary for context injection: a fixed small subset of
    /// fields, never the full preference map. Returns None when nothing
    /// summarizable is set.
    pub fn summary(&self) -> Option<String> {
        let mut lines = Vec::new();

        if let Some(verbosity) = self.pref("communication", "verbosity").and_then(Value::as_str) {
            lines.push(format!("- Verbosity: {}", verbosity));
        }
        if self
            .pref("communication", "ask_before_major_changes")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            lines.push("- Ask before major changes: yes".to_string());
        }
        if let Some(indent) = self.pref("code_style", "indent_size").and_then(Value::as_u64) {
            lines.push(format!("- Indent size: {}", indent));
        }

        if lines.is_empty() {
            return None;
        }
        Some(format!("### User Preferences\n{}", lines.join("\n")))
    }
}

pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(paths: &MemoryPaths) -> Self {
        Self {
            path: paths.profile_file(),
        }
    }

    /// Load the profile. Missing or unreadable files degrade to defaults.
    pub async fn load(&self) -> Result<UserProfile> {
        if !self.path.exists() {
            return Ok(UserProfile::default());
        }

        let content = fs::read_to_string(&self.path).await?;
        match serde_json::from_str::<UserProfile>(&content) {
            Ok(profile) if profile.schema_version == SCHEMA_VERSION => Ok(profile),
            Ok(profile) => {
                warn!(
                    version = profile.schema_version,
                    "Profile has unsupported schema version, using defaults"
                );
                Ok(UserProfile::default())
            }
            Err(e) => {
                warn!(error = %e, "Malformed profile, using defaults");
                Ok(UserProfile::default())
            }
        }
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        let content = serde_json::to_string_pretty(profile)?;
        store::write_atomic(&self.path, &content).await
    }

    /// Append a timestamped learned-preference note.
    pub async fn add_learned_note(&self, note: impl Into<String>) -> Result<()> {
        let mut profile = self.load().await?;
        profile.learned.push(LearnedNote {
            timestamp: Utc::now(),
            note: note.into(),
        });
        self.save(&profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProfileStore {
        ProfileStore::new(&MemoryPaths::new(dir.path()))
    }

    fn sample_profile() -> UserProfile {
        let mut profile = UserProfile::default();
        profile.preferences.insert(
            "communication".into(),
            json!({ "verbosity": "concise", "ask_before_major_changes": true }),
        );
        profile.preferences.insert(
            "code_style".into(),
            json!({ "indent_size": 4, "indent": "spaces" }),
        );
        profile
    }

    #[tokio::test]
    async fn test_missing_profile_is_default() {
        let dir = TempDir::new().unwrap();
        let profile = store_in(&dir).load().await.unwrap();
        assert!(profile.preferences.is_empty());
        assert!(profile.summary().is_none());
    }

    #[tokio::test]
    async fn test_roundtrip_and_summary_subset() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&sample_profile()).await.unwrap();
        let loaded = store.load().await.unwrap();
        let summary = loaded.summary().unwrap();

        assert!(summary.contains("Verbosity: concise"));
        assert!(summary.contains("Ask before major changes: yes"));
        assert!(summary.contains("Indent size: 4"));
        // Never the full map
        assert!(!summary.contains("spaces"));
    }

    #[tokio::test]
    async fn test_malformed_profile_degrades_to_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        fs::create_dir_all(dir.path().join("semantic")).await.unwrap();
        fs::write(dir.path().join("semantic/user-profile.json"), "{broken")
            .await
            .unwrap();

        let profile = store.load().await.unwrap();
        assert!(profile.preferences.is_empty());
    }

    #[tokio::test]
    async fn test_learned_notes_accumulate() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.add_learned_note("prefers rebase over merge").await.unwrap();
        store.add_learned_note("runs tests before committing").await.unwrap();

        let profile = store.load().await.unwrap();
        assert_eq!(profile.learned.len(), 2);
        assert_eq!(profile.learned[0].note, "prefers rebase over merge");
    }
}
