use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::outcomes::OutcomeKind;

#[derive(Parser)]
#[command(name = "claude-recall")]
#[command(author, version, about = "Cross-session memory for Claude Code", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Memory root directory (default: ~/.claude/memory)
    #[arg(long, global = true, env = "CLAUDE_RECALL_ROOT")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the memory directory layout
    Init,

    /// Assemble the session-start context bundle (never fails the session)
    Retrieve {
        /// Task description used for skill matching
        #[arg(short, long)]
        task: Option<String>,

        /// Number of recent successes to surface
        #[arg(short, long)]
        recent: Option<usize>,

        /// Override the bootstrap document path
        #[arg(long)]
        bootstrap: Option<PathBuf>,
    },

    /// Harvest the working buffer into a session record at session end
    Capture {
        /// Session outcome
        #[arg(long, value_enum, default_value = "success")]
        outcome: OutcomeArg,

        /// Free-text session summary
        #[arg(long)]
        summary: Option<String>,
    },

    /// Track per-session scratch state
    Buffer {
        #[command(subcommand)]
        action: BufferAction,
    },

    /// Record and compare tool-call token measurements
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },
}

#[derive(Subcommand)]
pub enum BufferAction {
    /// Start a fresh buffer, discarding any prior one
    Init {
        /// Project path (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Set the current task description
    Task { text: String },
    /// Record a tool use
    Tool { name: String },
    /// Record a file modification
    File { path: String },
    /// Record a decision made
    Decision { text: String },
    /// Add to the accumulated token count
    Tokens { count: u64 },
    /// Show the current buffer
    Show,
}

#[derive(Subcommand)]
pub enum MetricsAction {
    /// Record one tool-call measurement
    Record {
        /// Tool name
        #[arg(long)]
        tool: String,

        /// Test scenario label
        #[arg(long)]
        scenario: String,

        /// Input tokens
        #[arg(long = "tokens-in")]
        tokens_in: u64,

        /// Output tokens
        #[arg(long = "tokens-out")]
        tokens_out: u64,

        /// Mark as a baseline measurement
        #[arg(long)]
        baseline: bool,

        /// Additional notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Generate the baseline/optimized comparison report
    Report,
    /// Clear all recorded metrics
    Clear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutcomeArg {
    Success,
    Failure,
}

impl From<OutcomeArg> for OutcomeKind {
    fn from(arg: OutcomeArg) -> Self {
        match arg {
            OutcomeArg::Success => Self::Success,
            OutcomeArg::Failure => Self::Failure,
        }
    }
}
