use std::fmt::Write;

use time::Date;

use crate::core::db::format_date;
use crate::core::timeline::{ProjectTimeline, StepTier, StepView};

pub fn tier_marker(tier: StepTier) -> &'static str {
    match tier {
        StepTier::CompletedEarly => "[x]",
        StepTier::CompletedLate => "[X]",
        StepTier::Current => "[>]",
        StepTier::Pending => "[ ]",
    }
}

fn render_step(out: &mut String, view: &StepView<'_>) {
    let step = view.step;
    let _ = write!(
        out,
        "{:>3}. {} {}",
        view.index + 1,
        tier_marker(view.tier),
        step.title
    );
    if step.is_current {
        out.push_str(" (current)");
    }
    if view.overdue {
        out.push_str(" OVERDUE");
    }
    let _ = writeln!(out, "  [{}]  {}", step.status, step.id);

    if let Some(label) = view.top_label {
        let _ = writeln!(out, "       ^ {}", label);
    }
    if let Some(sector) = &step.responsible_sector {
        let _ = writeln!(out, "       sector: {}", sector);
    }
    match (step.start_date, step.completion_forecast) {
        (None, None) => {}
        (start, forecast) => {
            let show = |d: Option<Date>| d.map(format_date).unwrap_or_else(|| "?".to_string());
            let _ = writeln!(out, "       {} -> {}", show(start), show(forecast));
        }
    }
    if let Some(label) = view.bottom_label {
        let _ = writeln!(out, "       v {}", label);
    }
}

/// One line per step, in order, with its labels underneath.
pub fn render_timeline(timeline: &ProjectTimeline, today: Date) -> String {
    let mut out = String::new();
    if timeline.steps.is_empty() {
        out.push_str("  (no steps)\n");
        return out;
    }
    for view in timeline.views(today) {
        render_step(&mut out, &view);
    }
    out
}

/// Project header followed by its timeline.
pub fn render_project(timeline: &ProjectTimeline, today: Date) -> String {
    let project = &timeline.project;
    let mut out = String::new();
    let _ = writeln!(out, "{}  [{}]", project.title, project.status);
    let _ = writeln!(out, "id: {}", project.id);
    if !project.description.is_empty() {
        let _ = writeln!(out, "{}", project.description);
    }
    let _ = writeln!(out, "progress: {}%", project.progress);
    if let Some(url) = &project.image_url {
        let _ = writeln!(out, "image: {}", url);
    }
    if let Some(details) = &project.current_step_details {
        let _ = writeln!(
            out,
            "responsible: {}  deadline: {}  notes: {}",
            details.responsible, details.deadline, details.notes
        );
    }
    out.push('\n');
    out.push_str(&render_timeline(timeline, today));
    out
}
