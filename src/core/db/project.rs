use std::{collections::HashMap, future::Future};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::db::{model::ProjectStatus, step::{NewStep, StepRepository, TimelineStep}};
use crate::error::{Result, ValidationError};

/// Free-text snapshot of whatever the active step is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurrentStepDetails {
    pub responsible: String,
    pub deadline: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub progress: u8,
    pub image_url: Option<String>,
    pub status: ProjectStatus,
    pub current_step_details: Option<CurrentStepDetails>,
    pub created_at: OffsetDateTime,
    pub(crate) _guard: (),
}

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub current_step_details: Option<CurrentStepDetails>,
    /// Inserted with the project, in this order.
    pub steps: Vec<NewStep>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub progress: Option<i64>,
    pub image_url: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub current_step_details: Option<Option<CurrentStepDetails>>,
}

impl NewProject {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        self.steps.iter().try_for_each(NewStep::validate)
    }
}

impl ProjectUpdate {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ValidationError::EmptyTitle);
        }
        if let Some(progress) = self.progress {
            if !(0..=100).contains(&progress) {
                return Err(ValidationError::ProgressOutOfRange(progress));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.progress.is_none()
            && self.image_url.is_none()
            && self.status.is_none()
            && self.current_step_details.is_none()
    }
}

/// Operations on one project that has been resolved by id.
pub trait BoundProjectRepository: StepRepository {
    fn project_id(&self) -> Uuid;
    fn get_project(&self) -> impl Future<Output = Result<Project>>;
    fn update_project(&self, update: &ProjectUpdate) -> impl Future<Output = Result<Project>>;
    fn delete(self) -> impl Future<Output = Result<()>>;
}

pub trait ProjectRepository: 'static {
    type Repository: BoundProjectRepository;
    /// Resolves `id`, failing with `NotFound` when no such project exists.
    fn get_project_repo(&self, id: Uuid) -> impl Future<Output = Result<Self::Repository>> + 'static;
    fn add_project(&self, project: NewProject) -> impl Future<Output = Result<Self::Repository>> + 'static;
    /// Newest first. `search` matches the title case-insensitively.
    fn get_projects(
        &self,
        status: Option<ProjectStatus>,
        search: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Project>>>;
    /// Steps of every listed project, each list sorted by order position.
    fn get_steps_for_projects(
        &self,
        project_ids: &[Uuid],
    ) -> impl Future<Output = Result<HashMap<Uuid, Vec<TimelineStep>>>>;
}
