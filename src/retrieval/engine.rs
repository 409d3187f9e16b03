//! Token-budgeted context bundle assembly.
//!
//! The bootstrap document is always included verbatim and excluded from
//! the cap. The remaining sections compete for a global budget in priority
//! order (matched skill, recent failures, recent successes, profile
//! summary); a section that does not fit is dropped whole, so lower
//! priority sections disappear first as the budget shrinks.
//!
//! Assembly never fails: unreadable or empty stores shrink the bundle.

use tracing::{debug, warn};

use crate::config::{MemoryPaths, RecallConfig};
use crate::outcomes::{OutcomeLog, OutcomeRecord};
use crate::profile::ProfileStore;
use crate::skills::{SkillLibrary, SkillRecord};
use crate::tokens::estimate_tokens;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Bootstrap,
    Skill,
    Failures,
    Successes,
    Profile,
}

impl SectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Skill => "skill",
            Self::Failures => "failures",
            Self::Successes => "successes",
            Self::Profile => "profile",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone)]
pub struct ContextSection {
    pub kind: SectionKind,
    pub text: String,
    pub tokens: usize,
}

/// Assembled bundle plus metadata for observability.
#[derive(Debug)]
pub struct BoundedContext {
    pub sections: Vec<ContextSection>,
    pub dropped: Vec<SectionKind>,
    pub budget: usize,
    /// Token-equivalents consumed by the budgeted sections; the bootstrap
    /// section is not counted here.
    pub estimated_tokens: usize,
}

impl BoundedContext {
    pub fn includes(&self, kind: SectionKind) -> bool {
        self.sections.iter().any(|s| s.kind == kind)
    }

    /// Ordered text of all included sections.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub struct RetrievalEngine {
    skills: SkillLibrary,
    outcomes: OutcomeLog,
    profile: ProfileStore,
    config: RecallConfig,
}

impl RetrievalEngine {
    pub fn new(paths: &MemoryPaths, config: RecallConfig) -> Self {
        Self {
            skills: SkillLibrary::new(paths),
            outcomes: OutcomeLog::new(paths),
            profile: ProfileStore::new(paths),
            config,
        }
    }

    /// Assemble the session-start bundle. Deterministic for identical
    /// store contents and inputs, and infallible by design.
    pub async fn assemble_context(&self, bootstrap: &str, task: Option<&str>) -> BoundedContext {
        let budget = self.config.context_budget;
        let mut sections = Vec::new();
        let mut dropped = Vec::new();
        let mut used = 0usize;

        if !bootstrap.is_empty() {
            sections.push(ContextSection {
                kind: SectionKind::Bootstrap,
                text: bootstrap.to_string(),
                tokens: estimate_tokens(bootstrap),
            });
        }

        let candidates = [
            (SectionKind::Skill, self.skill_section(task).await),
            (SectionKind::Failures, self.failures_section().await),
            (SectionKind::Successes, self.successes_section().await),
            (SectionKind::Profile, self.profile_section().await),
        ];

        for (kind, text) in candidates {
            let Some(text) = text else { continue };
            let tokens = estimate_tokens(&text);

            if used + tokens <= budget {
                used += tokens;
                sections.push(ContextSection { kind, text, tokens });
            } else {
                debug!(section = %kind, tokens, remaining = budget - used, "Dropped section over budget");
                dropped.push(kind);
            }
        }

        BoundedContext {
            sections,
            dropped,
            budget,
            estimated_tokens: used,
        }
    }

    /// Top-ranked skill for the task; at most one skill per retrieval.
    async fn skill_section(&self, task: Option<&str>) -> Option<String> {
        let task = task?;
        let ranked = self.skills.lookup(task).await.unwrap_or_else(|e| {
            warn!(error = %e, "Skill lookup failed, omitting section");
            Vec::new()
        });
        ranked.first().map(render_skill)
    }

    async fn failures_section(&self) -> Option<String> {
        let failures = self
            .outcomes
            .recent_failures(self.config.recent_failures)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failure log unreadable, omitting section");
                Vec::new()
            });
        render_outcomes("Recent Failures", &failures)
    }

    async fn successes_section(&self) -> Option<String> {
        let successes = self
            .outcomes
            .recent_successes(self.config.recent_successes)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Success log unreadable, omitting section");
                Vec::new()
            });
        render_outcomes("Recent Successes", &successes)
    }

    async fn profile_section(&self) -> Option<String> {
        match self.profile.load().await {
            Ok(profile) => profile.summary(),
            Err(e) => {
                warn!(error = %e, "Profile unreadable, omitting section");
                None
            }
        }
    }
}

fn render_skill(skill: &SkillRecord) -> String {
    let mut lines = vec![
        format!("### Skill: {}", skill.name),
        format!("**Description**: {}", skill.description),
        format!(
            "**Success Rate**: {:.0}% ({} uses)",
            skill.success_rate * 100.0,
            skill.times_used
        ),
    ];

    if !skill.steps.is_empty() {
        lines.push("**Steps**:".to_string());
        for step in skill.steps.iter().take(5) {
            lines.push(format!("- {}", step));
        }
    }

    lines.join("\n")
}

fn render_outcomes(title: &str, records: &[OutcomeRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let mut lines = vec![format!("### {}", title)];
    for record in records {
        lines.push(format!("- {}", record.one_line()));
    }
    Some(lines.join("\n"))
}
