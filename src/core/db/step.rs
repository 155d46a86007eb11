use std::future::Future;

use time::Date;
use uuid::Uuid;

use crate::core::db::model::StepStatus;
use crate::error::{Result, ValidationError};

#[derive(Debug, Clone)]
pub struct TimelineStep {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: StepStatus,
    pub order_index: i64,
    pub is_current: bool,
    pub top_annotation: Option<String>,
    pub bottom_annotation: Option<String>,
    pub responsible_agency: Option<String>,
    pub responsible_sector: Option<String>,
    pub start_date: Option<Date>,
    pub completion_forecast: Option<Date>,
    pub(crate) _guard: (),
}

#[derive(Debug, Clone, Default)]
pub struct NewStep {
    pub title: String,
    pub status: StepStatus,
    pub is_current: bool,
    pub top_annotation: Option<String>,
    pub bottom_annotation: Option<String>,
    pub responsible_agency: Option<String>,
    pub responsible_sector: Option<String>,
    pub start_date: Option<Date>,
    pub completion_forecast: Option<Date>,
}

/// Partial edit. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct StepUpdate {
    pub title: Option<String>,
    pub status: Option<StepStatus>,
    pub is_current: Option<bool>,
    pub top_annotation: Option<Option<String>>,
    pub bottom_annotation: Option<Option<String>>,
    pub responsible_agency: Option<Option<String>>,
    pub responsible_sector: Option<Option<String>>,
    pub start_date: Option<Option<Date>>,
    pub completion_forecast: Option<Option<Date>>,
}

/// A forecast may not precede the start date when both are known.
pub fn check_dates(
    start_date: Option<Date>,
    completion_forecast: Option<Date>,
) -> std::result::Result<(), ValidationError> {
    match (start_date, completion_forecast) {
        (Some(start), Some(forecast)) if forecast < start => {
            Err(ValidationError::ForecastBeforeStart { start, forecast })
        }
        _ => Ok(()),
    }
}

impl NewStep {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        check_dates(self.start_date, self.completion_forecast)
    }
}

impl StepUpdate {
    /// Checks only what the update carries on its own.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ValidationError::EmptyTitle);
        }
        match (self.start_date, self.completion_forecast) {
            (Some(start), Some(forecast)) => check_dates(start, forecast),
            _ => Ok(()),
        }
    }

    /// Checks the dates that would be stored once the update is applied to `step`.
    pub fn validate_against(&self, step: &TimelineStep) -> std::result::Result<(), ValidationError> {
        self.validate()?;
        let start = self.start_date.unwrap_or(step.start_date);
        let forecast = self.completion_forecast.unwrap_or(step.completion_forecast);
        check_dates(start, forecast)
    }

    /// True when date validation needs the stored step to decide.
    pub fn needs_stored_dates(&self) -> bool {
        self.start_date.is_some() != self.completion_forecast.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.is_current.is_none()
            && self.top_annotation.is_none()
            && self.bottom_annotation.is_none()
            && self.responsible_agency.is_none()
            && self.responsible_sector.is_none()
            && self.start_date.is_none()
            && self.completion_forecast.is_none()
    }
}

pub trait StepRepository {
    /// Sorted by order position ascending.
    fn get_steps(&self) -> impl Future<Output = Result<Vec<TimelineStep>>>;
    fn get_step_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<TimelineStep>>>;
    /// Appends after the current highest order position.
    fn add_step(&self, step: &NewStep) -> impl Future<Output = Result<TimelineStep>>;
    fn update_step(&self, step: &TimelineStep, update: &StepUpdate) -> impl Future<Output = Result<TimelineStep>>;
    fn delete_step(&self, step: TimelineStep) -> impl Future<Output = Result<()>>;
    /// Flags `step` as current and clears the flag on every other step of the project.
    fn set_current_step(&self, step: &TimelineStep) -> impl Future<Output = Result<()>>;
    /// One independent update. Fails with `NotFound` when the id is not a step of this project.
    fn set_step_order(&self, id: Uuid, order_index: i64) -> impl Future<Output = Result<()>>;
    /// All positions in a single transaction.
    fn set_step_orders(&self, positions: &[(Uuid, i64)]) -> impl Future<Output = Result<()>>;
}
