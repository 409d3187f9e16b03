//! Cross-session memory for Claude Code.
//!
//! Persists what each coding session learned (outcomes, skills, user
//! preferences) under a per-user memory root and assembles a bounded
//! context bundle at the start of the next session. A small metrics
//! collector measures the token cost of tool calls so the optimized
//! workflow can be compared against a baseline.

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod outcomes;
pub mod profile;
pub mod retrieval;
pub mod session;
pub mod skills;
pub mod store;
pub mod tokens;
pub mod working;

pub use config::{MemoryPaths, RecallConfig};
pub use error::{RecallError, Result};
pub use metrics::{ComparisonReport, MetricEvent, MetricsCollector};
pub use outcomes::{OutcomeKind, OutcomeLog, OutcomeRecord};
pub use profile::{ProfileStore, UserProfile};
pub use retrieval::{BoundedContext, RetrievalEngine, SectionKind};
pub use session::{SessionCapture, SessionRecord, SessionStore};
pub use skills::{SkillLibrary, SkillRecord};
pub use working::{BufferStore, WorkingBuffer};
