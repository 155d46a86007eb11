//! Ordered step timeline of a project and the state derived from it.

pub mod reorder;
mod status;

use time::Date;

use crate::core::db::{Project, TimelineStep};

pub use status::{EARLY_STAGE_LIMIT, StepTier, StepView, current_step, is_overdue, step_views, today};

/// A project together with its steps in display order.
#[derive(Debug, Clone)]
pub struct ProjectTimeline {
    pub project: Project,
    pub steps: Vec<TimelineStep>,
}

impl ProjectTimeline {
    /// Sorts `steps` by order position; equal positions keep their given order.
    pub fn new(project: Project, mut steps: Vec<TimelineStep>) -> Self {
        steps.sort_by_key(|step| step.order_index);
        Self { project, steps }
    }

    pub fn current_step(&self) -> Option<&TimelineStep> {
        current_step(&self.steps).map(|(_, step)| step)
    }

    pub fn current_index(&self) -> Option<usize> {
        current_step(&self.steps).map(|(index, _)| index)
    }

    /// Stored percentage, entered by hand rather than derived from the steps.
    pub fn progress(&self) -> u8 {
        self.project.progress.min(100)
    }

    pub fn step_ids(&self) -> Vec<uuid::Uuid> {
        self.steps.iter().map(|step| step.id).collect()
    }

    pub fn views(&self, today: Date) -> Vec<StepView<'_>> {
        step_views(&self.steps, today)
    }

    pub fn overdue_steps(&self, today: Date) -> impl Iterator<Item = &TimelineStep> {
        self.steps.iter().filter(move |step| is_overdue(step, today))
    }
}
