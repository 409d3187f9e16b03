use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::fs;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use claude_recall::cli::{BufferAction, Cli, Commands, Display, MetricsAction};
use claude_recall::config::{MemoryPaths, RecallConfig};
use claude_recall::error::Result;
use claude_recall::metrics::{MetricEvent, MetricsCollector};
use claude_recall::outcomes::OutcomeKind;
use claude_recall::retrieval::RetrievalEngine;
use claude_recall::session::SessionCapture;
use claude_recall::working::BufferStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Session hooks must never block a session: a broken memory store
    // degrades to a warning instead of a failing exit code.
    let never_block = matches!(
        cli.command,
        Commands::Retrieve { .. } | Commands::Capture { .. }
    );

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if never_block => {
            Display::new().print_warning(&format!("memory unavailable: {}", e));
            ExitCode::SUCCESS
        }
        Err(e) => {
            Display::new().print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("claude_recall=debug")
    } else {
        EnvFilter::new("claude_recall=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let display = Display::new();
    let paths = MemoryPaths::resolve(cli.root)?;

    match cli.command {
        Commands::Init => cmd_init(&display, &paths).await,
        Commands::Retrieve {
            task,
            recent,
            bootstrap,
        } => cmd_retrieve(&display, &paths, task, recent, bootstrap).await,
        Commands::Capture { outcome, summary } => {
            cmd_capture(&display, &paths, outcome.into(), summary).await
        }
        Commands::Buffer { action } => cmd_buffer(&display, &paths, action).await,
        Commands::Metrics { action } => cmd_metrics(&display, &paths, action).await,
    }
}

async fn cmd_init(display: &Display, paths: &MemoryPaths) -> Result<()> {
    paths.ensure_dirs().await?;

    let config_file = paths.config_file();
    if !config_file.exists() {
        RecallConfig::default().save(paths).await?;
    }

    display.print_success(&format!("Memory initialized at {}", paths.root.display()));
    Ok(())
}

async fn cmd_retrieve(
    display: &Display,
    paths: &MemoryPaths,
    task: Option<String>,
    recent: Option<usize>,
    bootstrap_override: Option<PathBuf>,
) -> Result<()> {
    let mut config = RecallConfig::load(paths).await?;
    if let Some(n) = recent {
        config.recent_successes = n;
    }

    let bootstrap_path = bootstrap_override.unwrap_or_else(|| paths.bootstrap_file());
    let bootstrap = match fs::read_to_string(&bootstrap_path).await {
        Ok(content) => content,
        Err(_) => {
            display.print_warning(&format!(
                "bootstrap document missing: {}",
                bootstrap_path.display()
            ));
            String::new()
        }
    };

    let engine = RetrievalEngine::new(paths, config);
    let context = engine.assemble_context(&bootstrap, task.as_deref()).await;
    display.print_context(&context);
    Ok(())
}

async fn cmd_capture(
    display: &Display,
    paths: &MemoryPaths,
    outcome: OutcomeKind,
    summary: Option<String>,
) -> Result<()> {
    paths.ensure_dirs().await?;
    let capture = SessionCapture::new(paths);
    let result = capture.capture(outcome, summary).await?;
    display.print_capture(&result);
    Ok(())
}

async fn cmd_buffer(display: &Display, paths: &MemoryPaths, action: BufferAction) -> Result<()> {
    paths.ensure_dirs().await?;
    let store = BufferStore::new(paths);

    match action {
        BufferAction::Init { project } => {
            let project = match project {
                Some(p) => p,
                None => std::env::current_dir()?,
            };
            let buffer = store.initialize(&project).await?;
            display.print_success(&format!("Buffer started for {}", buffer.project_path));
        }
        BufferAction::Task { text } => {
            store.set_task(text).await?;
            display.print_success("Task recorded");
        }
        BufferAction::Tool { name } => {
            store.record_tool(name).await?;
        }
        BufferAction::File { path } => {
            store.record_file(path).await?;
        }
        BufferAction::Decision { text } => {
            store.record_decision(text).await?;
            display.print_success("Decision recorded");
        }
        BufferAction::Tokens { count } => {
            store.add_tokens(count).await?;
        }
        BufferAction::Show => match store.snapshot().await? {
            Some(buffer) => display.print_buffer(&buffer),
            None => display.print_info("No active buffer"),
        },
    }
    Ok(())
}

async fn cmd_metrics(display: &Display, paths: &MemoryPaths, action: MetricsAction) -> Result<()> {
    paths.ensure_dirs().await?;
    let collector = MetricsCollector::new(paths);

    match action {
        MetricsAction::Record {
            tool,
            scenario,
            tokens_in,
            tokens_out,
            baseline,
            notes,
        } => {
            let mut event = MetricEvent::new(tool, scenario, tokens_in, tokens_out, baseline);
            if let Some(notes) = notes {
                event = event.with_notes(notes);
            }
            collector.record(&event).await?;
            display.print_success(&format!("Recorded {} tokens", event.total_tokens()));
        }
        MetricsAction::Report => {
            let config = RecallConfig::load(paths).await?;
            let report = collector.report().await?;
            println!("{}", report.render(config.improvement_target));
        }
        MetricsAction::Clear => {
            collector.clear().await?;
            display.print_success("Metrics cleared");
        }
    }
    Ok(())
}
