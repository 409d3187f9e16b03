use console::style;

use crate::retrieval::BoundedContext;
use crate::session::CaptureSummary;
use crate::working::WorkingBuffer;

pub struct Display;

impl Display {
    pub fn new() -> Self {
        Self
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", style("✓").green().bold(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    pub fn print_warning(&self, message: &str) {
        println!("{} {}", style("!").yellow().bold(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{} {}", style("→").cyan(), message);
    }

    pub fn print_context(&self, context: &BoundedContext) {
        println!("{}", context.render());

        let included: Vec<_> = context.sections.iter().map(|s| s.kind.name()).collect();
        let dropped: Vec<_> = context.dropped.iter().map(|k| k.name()).collect();
        eprintln!(
            "{}",
            style(format!(
                "sections: [{}]  dropped: [{}]  estimated: {}/{} tokens",
                included.join(", "),
                dropped.join(", "),
                context.estimated_tokens,
                context.budget
            ))
            .dim()
        );
    }

    pub fn print_capture(&self, summary: &CaptureSummary) {
        self.print_success(&format!(
            "Captured session {} ({})",
            summary.session_id, summary.outcome
        ));
        if let Some(skill) = &summary.extracted_skill {
            self.print_info(&format!("Skill extracted: {}", skill));
        }
    }

    pub fn print_buffer(&self, buffer: &WorkingBuffer) {
        println!("{}", style("Working Buffer").bold());
        println!("  Project:   {}", buffer.project_path);
        println!("  Started:   {}", buffer.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if !buffer.current_task.is_empty() {
            println!("  Task:      {}", buffer.current_task);
        }
        println!("  Tools:     {}", list_or_dash(&buffer.tools_used));
        println!("  Files:     {}", list_or_dash(&buffer.files_modified));
        println!("  Decisions: {}", buffer.decisions_made.len());
        println!("  Tokens:    {}", buffer.accumulated_tokens);
    }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
