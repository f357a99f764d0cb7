//! Human and machine readable rendering of comparisons and deploy events.

use std::fmt::Write as _;

use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::diff::ComparisonSummary;
use crate::events::{DeployEvent, ItemStatus};
use crate::executor::DeployReport;
use crate::utils::Result;

fn section(out: &mut String, title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for line in lines {
        let _ = writeln!(out, "  {line}");
    }
}

fn mark(out: &mut Vec<String>, sign: char, names: &[String], suffix: &str) {
    out.extend(names.iter().map(|name| format!("{sign} {name}{suffix}")));
}

/// Render the change list as indented text. Empty summaries render a
/// single "no changes" line.
pub fn render_summary(summary: &ComparisonSummary) -> String {
    if summary.entity_count() == 0 {
        return "No changes detected.\n".to_string();
    }

    let mut out = String::new();

    let dependencies: Vec<String> = summary
        .dependencies
        .iter()
        .map(|(name, c)| {
            let label = if c.new {
                "new"
            } else if c.edited {
                "edited"
            } else if c.forced {
                "forced"
            } else {
                "deleted remotely, kept"
            };
            format!("{name} ({label})")
        })
        .collect();
    section(&mut out, "Dependencies", &dependencies);

    let entry = |created: bool, edited: bool, deleted: bool| {
        if created {
            '+'
        } else if edited {
            '~'
        } else if deleted {
            '-'
        } else {
            '!'
        }
    };
    let models: Vec<String> = summary
        .models
        .iter()
        .map(|(name, c)| format!("{} {name}", entry(c.created, c.edited, c.deleted)))
        .collect();
    section(&mut out, "Models", &models);

    let files: Vec<String> = summary
        .files
        .iter()
        .map(|(name, c)| format!("{} {name}", entry(c.created, c.edited, c.deleted)))
        .collect();
    section(&mut out, "Project files", &files);

    for (name, c) in &summary.classes {
        let title = if c.new_class {
            format!("Class {name} (new)")
        } else if c.deleted_class {
            format!("Class {name} (remote only, kept)")
        } else {
            format!("Class {name}")
        };
        let mut lines = Vec::new();
        mark(&mut lines, '+', &c.created_files, "");
        mark(&mut lines, '~', &c.edited_files, "");
        mark(&mut lines, '-', &c.deleted_files, "");
        mark(&mut lines, '!', &c.forced_files, "");
        mark(&mut lines, '+', &c.created_models, " (model)");
        mark(&mut lines, '~', &c.edited_models, " (model)");
        mark(&mut lines, '-', &c.deleted_models, " (model)");
        mark(&mut lines, '!', &c.forced_models, " (model)");
        if lines.is_empty() {
            let _ = writeln!(out, "{title}");
        } else {
            section(&mut out, &title, &lines);
        }
    }

    out
}

pub fn render_summary_json(summary: &ComparisonSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

pub fn render_report_json(summary: &ComparisonSummary, report: &DeployReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json!({
        "summary": summary,
        "report": report,
    }))?)
}

pub fn render_event(event: &DeployEvent) -> String {
    let time = event.timestamp.format("%H:%M:%S");
    match &event.status {
        ItemStatus::Pending => format!("[{time}] PENDING {:?} {}", event.kind, event.name),
        ItemStatus::Done => format!("[{time}] DONE    {:?} {}", event.kind, event.name),
        ItemStatus::Failed(message) => {
            format!("[{time}] FAILED  {:?} {}: {message}", event.kind, event.name)
        }
    }
}

/// Print events to stdout until the bus closes.
pub fn spawn_printer(mut rx: broadcast::Receiver<DeployEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => println!("{}", render_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Status printer lagged, {} event(s) dropped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
