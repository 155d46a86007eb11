use std::fmt::Write;

use time::Date;

use crate::core::db::{AuditEntry, LookupEntry};
use crate::core::timeline::ProjectTimeline;

const BAR_WIDTH: usize = 20;

fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Summary card shown on the dashboard listing.
pub fn render_card(timeline: &ProjectTimeline, today: Date) -> String {
    let project = &timeline.project;
    let mut out = String::new();
    let _ = writeln!(out, "{}  ({})", project.title, project.id);
    let progress = timeline.progress();
    let _ = writeln!(out, "  {} {}%", progress_bar(progress), progress);

    match timeline.current_step() {
        Some(step) => {
            let _ = write!(out, "  now: {} [{}]", step.title, step.status);
            if let Some(agency) = &step.responsible_agency {
                let _ = write!(out, " - {}", agency);
            }
            out.push('\n');
        }
        None => out.push_str("  now: -\n"),
    }
    if let Some(details) = &project.current_step_details {
        let _ = writeln!(out, "  with: {}  due: {}", details.responsible, details.deadline);
    }
    let overdue = timeline.overdue_steps(today).count();
    if overdue > 0 {
        let _ = writeln!(out, "  overdue steps: {}", overdue);
    }
    out
}

pub fn render_dashboard(timelines: &[ProjectTimeline], today: Date) -> String {
    if timelines.is_empty() {
        return "No projects.\n".to_string();
    }
    timelines
        .iter()
        .map(|timeline| render_card(timeline, today))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_lookups(entries: &[LookupEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{}  {}", entry.id, entry.name);
    }
    out
}

pub fn render_audit(entries: &[AuditEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = write!(
            out,
            "{}  {:<8} {:<8} {}",
            entry.created_at.date(),
            entry.action.as_str(),
            entry.entity.as_str(),
            entry.entity_id
        );
        if let Some(details) = &entry.details {
            let _ = write!(out, "  {}", details);
        }
        out.push('\n');
    }
    out
}
