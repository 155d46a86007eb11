use time::{Date, OffsetDateTime};

use crate::core::db::{StepStatus, TimelineStep};

/// Completed steps before this index use the early-stage tier.
pub const EARLY_STAGE_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepTier {
    CompletedEarly,
    CompletedLate,
    Current,
    Pending,
}

impl StepTier {
    pub fn of(step: &TimelineStep, index: usize) -> Self {
        match step.status {
            StepStatus::Completed if index < EARLY_STAGE_LIMIT => StepTier::CompletedEarly,
            StepStatus::Completed => StepTier::CompletedLate,
            StepStatus::InProgress if step.is_current => StepTier::Current,
            _ => StepTier::Pending,
        }
    }

    pub fn is_emphasized(&self) -> bool {
        !matches!(self, StepTier::Pending)
    }
}

pub fn is_overdue(step: &TimelineStep, today: Date) -> bool {
    step.status != StepStatus::Completed
        && step.completion_forecast.is_some_and(|forecast| forecast < today)
}

/// The local calendar date, or the UTC one when the local offset is unknown.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// First flagged step in display order.
pub fn current_step(steps: &[TimelineStep]) -> Option<(usize, &TimelineStep)> {
    steps.iter().enumerate().find(|(_, step)| step.is_current)
}

/// Everything a renderer needs to draw one step.
#[derive(Debug, Clone)]
pub struct StepView<'a> {
    pub step: &'a TimelineStep,
    pub index: usize,
    pub tier: StepTier,
    pub overdue: bool,
    pub top_label: Option<&'a str>,
    pub bottom_label: Option<&'a str>,
}

impl<'a> StepView<'a> {
    pub fn new(step: &'a TimelineStep, index: usize, today: Date) -> Self {
        Self {
            step,
            index,
            tier: StepTier::of(step, index),
            overdue: is_overdue(step, today),
            top_label: step
                .responsible_agency
                .as_deref()
                .or(step.top_annotation.as_deref()),
            bottom_label: step.bottom_annotation.as_deref(),
        }
    }
}

pub fn step_views(steps: &[TimelineStep], today: Date) -> Vec<StepView<'_>> {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| StepView::new(step, index, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use uuid::Uuid;

    fn step(status: StepStatus, is_current: bool) -> TimelineStep {
        TimelineStep {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            title: "Step".to_string(),
            status,
            order_index: 1,
            is_current,
            top_annotation: None,
            bottom_annotation: None,
            responsible_agency: None,
            responsible_sector: None,
            start_date: None,
            completion_forecast: None,
            _guard: (),
        }
    }

    #[test]
    fn completed_tier_depends_on_position() {
        let done = step(StepStatus::Completed, false);
        assert_eq!(StepTier::of(&done, 0), StepTier::CompletedEarly);
        assert_eq!(StepTier::of(&done, 5), StepTier::CompletedEarly);
        assert_eq!(StepTier::of(&done, 6), StepTier::CompletedLate);
    }

    #[test]
    fn only_in_progress_current_step_is_highlighted() {
        assert_eq!(StepTier::of(&step(StepStatus::InProgress, true), 2), StepTier::Current);
        assert_eq!(StepTier::of(&step(StepStatus::InProgress, false), 2), StepTier::Pending);
        assert_eq!(StepTier::of(&step(StepStatus::Pending, true), 2), StepTier::Pending);
        assert_eq!(StepTier::of(&step(StepStatus::Completed, true), 2), StepTier::CompletedEarly);
    }

    #[test]
    fn overdue_requires_past_forecast_and_open_status() {
        let today = date!(2024 - 06 - 15);
        let mut late = step(StepStatus::InProgress, true);
        late.completion_forecast = Some(date!(2024 - 06 - 14));
        assert!(is_overdue(&late, today));

        late.status = StepStatus::Completed;
        assert!(!is_overdue(&late, today));

        let mut due_today = step(StepStatus::Pending, false);
        due_today.completion_forecast = Some(today);
        assert!(!is_overdue(&due_today, today));

        assert!(!is_overdue(&step(StepStatus::Pending, false), today));
    }

    #[test]
    fn current_step_is_first_flagged() {
        let steps = vec![
            step(StepStatus::Completed, false),
            step(StepStatus::InProgress, true),
            step(StepStatus::InProgress, true),
        ];
        let (index, current) = current_step(&steps).expect("a flagged step");
        assert_eq!(index, 1);
        assert_eq!(current.id, steps[1].id);
        assert!(current_step(&steps[..1]).is_none());
    }

    #[test]
    fn agency_takes_precedence_over_top_annotation() {
        let mut s = step(StepStatus::Pending, false);
        s.top_annotation = Some("Issued by planning".to_string());
        let view = StepView::new(&s, 0, date!(2024 - 01 - 01));
        assert_eq!(view.top_label, Some("Issued by planning"));

        s.responsible_agency = Some("City Hall".to_string());
        let view = StepView::new(&s, 0, date!(2024 - 01 - 01));
        assert_eq!(view.top_label, Some("City Hall"));
    }
}
