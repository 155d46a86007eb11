//! The operations a user performs on the board.
//!
//! Every mutation validates its input before touching the store and, once it
//! has succeeded, appends an entry to the audit log.

use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::core::db::{
    AuditAction, AuditEntity, AuditEntry, AuditRepository, BoundProjectRepository, LookupEntry,
    LookupKind, LookupRepository, NewAuditEntry, NewProject, NewStep, Project, ProjectRepository,
    ProjectStatus, ProjectUpdate, StepRepository, StepUpdate, TimelineStep,
};
use crate::core::timeline::{ProjectTimeline, reorder};
use crate::error::{Error, Result, ValidationError};

pub struct Board<R> {
    repo: R,
    config: Config,
}

impl<R> Board<R>
where
    R: ProjectRepository + LookupRepository + AuditRepository,
{
    pub fn new(repo: R, config: Config) -> Self {
        Self { repo, config }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Projects with `status`, newest first, each with its timeline.
    pub async fn list_projects(
        &self,
        status: ProjectStatus,
        search: Option<&str>,
    ) -> Result<Vec<ProjectTimeline>> {
        let projects = self.repo.get_projects(Some(status), search).await?;
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let mut steps = self.repo.get_steps_for_projects(&ids).await?;
        tracing::debug!(count = projects.len(), status = %status, "projects listed");
        Ok(projects
            .into_iter()
            .map(|project| {
                let project_steps = steps.remove(&project.id).unwrap_or_default();
                ProjectTimeline::new(project, project_steps)
            })
            .collect())
    }

    pub async fn load(&self, project_id: Uuid) -> Result<ProjectTimeline> {
        let repo = self.repo.get_project_repo(project_id).await?;
        let project = repo.get_project().await?;
        let steps = repo.get_steps().await?;
        Ok(ProjectTimeline::new(project, steps))
    }

    /// Creates a project. Without explicit steps the configured defaults are seeded.
    pub async fn create_project(&self, mut project: NewProject) -> Result<ProjectTimeline> {
        let defaults = &self.config.defaults;
        if project.steps.is_empty() {
            project.steps = defaults
                .steps
                .iter()
                .map(|step| NewStep {
                    title: step.title.clone(),
                    status: step.status,
                    is_current: step.current,
                    ..Default::default()
                })
                .collect();
        }
        if project.image_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            project.image_url = Some(defaults.image_url.clone()).filter(|url| !url.is_empty());
        }
        project.validate()?;

        let title = project.title.trim().to_string();
        let repo = self.repo.add_project(project).await?;
        let project_id = repo.project_id();
        tracing::info!(%project_id, title = %title, "project created");
        self.audit(
            AuditAction::Create,
            AuditEntity::Project,
            project_id,
            Some(json!({ "title": title })),
        )
        .await;

        let project = repo.get_project().await?;
        let steps = repo.get_steps().await?;
        Ok(ProjectTimeline::new(project, steps))
    }

    pub async fn update_project(&self, project_id: Uuid, update: &ProjectUpdate) -> Result<Project> {
        update.validate()?;
        let repo = self.repo.get_project_repo(project_id).await?;
        if update.is_empty() {
            return repo.get_project().await;
        }
        let project = repo.update_project(update).await?;
        tracing::info!(%project_id, "project updated");
        self.audit(
            AuditAction::Update,
            AuditEntity::Project,
            project_id,
            Some(json!({
                "title": update.title,
                "progress": update.progress,
                "status": update.status.map(|s| s.as_str()),
            })),
        )
        .await;
        Ok(project)
    }

    /// Moves the project to the archived listing. Its steps are untouched.
    pub async fn archive(&self, project_id: Uuid) -> Result<Project> {
        self.set_status(project_id, ProjectStatus::Archived, AuditAction::Archive)
            .await
    }

    pub async fn restore(&self, project_id: Uuid) -> Result<Project> {
        self.set_status(project_id, ProjectStatus::Active, AuditAction::Restore)
            .await
    }

    async fn set_status(
        &self,
        project_id: Uuid,
        status: ProjectStatus,
        action: AuditAction,
    ) -> Result<Project> {
        let repo = self.repo.get_project_repo(project_id).await?;
        let update = ProjectUpdate {
            status: Some(status),
            ..Default::default()
        };
        let project = repo.update_project(&update).await?;
        tracing::info!(%project_id, status = %status, "project status changed");
        self.audit(action, AuditEntity::Project, project_id, None).await;
        Ok(project)
    }

    /// Removes the project and all of its steps.
    pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
        let repo = self.repo.get_project_repo(project_id).await?;
        repo.delete().await?;
        tracing::info!(%project_id, "project deleted");
        self.audit(AuditAction::Delete, AuditEntity::Project, project_id, None)
            .await;
        Ok(())
    }

    /// Appends a step at the end of the timeline.
    pub async fn add_step(&self, project_id: Uuid, step: &NewStep) -> Result<TimelineStep> {
        step.validate()?;
        let repo = self.repo.get_project_repo(project_id).await?;
        let step = repo.add_step(step).await?;
        tracing::info!(%project_id, step_id = %step.id, order_index = step.order_index, "step added");
        self.audit(
            AuditAction::Create,
            AuditEntity::Step,
            step.id,
            Some(json!({ "project_id": project_id, "title": step.title })),
        )
        .await;
        Ok(step)
    }

    /// Applies a partial edit. The merged dates are checked before anything is written.
    pub async fn edit_step(
        &self,
        project_id: Uuid,
        step_id: Uuid,
        update: &StepUpdate,
    ) -> Result<TimelineStep> {
        update.validate()?;
        let repo = self.repo.get_project_repo(project_id).await?;
        let stored = find_step(&repo, step_id).await?;
        update.validate_against(&stored)?;
        if update.is_empty() {
            return Ok(stored);
        }
        let step = repo.update_step(&stored, update).await?;
        tracing::info!(%project_id, %step_id, "step updated");
        self.audit(
            AuditAction::Update,
            AuditEntity::Step,
            step_id,
            Some(json!({ "project_id": project_id, "status": step.status.as_str() })),
        )
        .await;
        Ok(step)
    }

    /// Removes a step. The other steps keep their positions.
    pub async fn delete_step(&self, project_id: Uuid, step_id: Uuid) -> Result<()> {
        let repo = self.repo.get_project_repo(project_id).await?;
        let step = find_step(&repo, step_id).await?;
        repo.delete_step(step).await?;
        tracing::info!(%project_id, %step_id, "step deleted");
        self.audit(
            AuditAction::Delete,
            AuditEntity::Step,
            step_id,
            Some(json!({ "project_id": project_id })),
        )
        .await;
        Ok(())
    }

    pub async fn set_current_step(&self, project_id: Uuid, step_id: Uuid) -> Result<()> {
        let repo = self.repo.get_project_repo(project_id).await?;
        let step = find_step(&repo, step_id).await?;
        repo.set_current_step(&step).await?;
        tracing::info!(%project_id, %step_id, "current step changed");
        self.audit(
            AuditAction::Update,
            AuditEntity::Step,
            step_id,
            Some(json!({ "project_id": project_id, "is_current": true })),
        )
        .await;
        Ok(())
    }

    /// Gives each listed step the position of its index, starting at 1.
    ///
    /// Steps left out of `ordered_ids` keep whatever position they had.
    pub async fn reorder_steps(&self, project_id: Uuid, ordered_ids: &[Uuid]) -> Result<ProjectTimeline> {
        let positions = reorder::plan(ordered_ids)?;
        let repo = self.repo.get_project_repo(project_id).await?;
        let stored = repo.get_steps().await?;
        let omitted = reorder::omitted(&stored, ordered_ids);
        if !omitted.is_empty() {
            tracing::warn!(%project_id, ?omitted, "reorder leaves steps at their previous positions");
        }

        let mode = self.config.reorder.mode;
        let outcome = reorder::apply(&repo, &positions, mode).await;
        if let Err(Error::ReorderFailed { failed }) = &outcome {
            tracing::warn!(%project_id, ?mode, ?failed, "reorder did not complete");
        }
        outcome?;

        tracing::info!(%project_id, steps = positions.len(), ?mode, "steps reordered");
        self.audit(
            AuditAction::Reorder,
            AuditEntity::Project,
            project_id,
            Some(json!({ "order": ordered_ids })),
        )
        .await;

        let project = repo.get_project().await?;
        let steps = repo.get_steps().await?;
        Ok(ProjectTimeline::new(project, steps))
    }

    /// Drag and drop: moves the step at display index `from` to index `to`.
    pub async fn move_step(&self, project_id: Uuid, from: usize, to: usize) -> Result<ProjectTimeline> {
        let timeline = self.load(project_id).await?;
        let ids = reorder::move_id(&timeline.step_ids(), from, to);
        self.reorder_steps(project_id, &ids).await
    }

    pub async fn lookups(&self, kind: LookupKind) -> Result<Vec<LookupEntry>> {
        self.repo.get_entries(kind).await
    }

    /// Names offered when assigning a step: the stored entries, or the
    /// configured vocabulary while the table is still empty.
    pub async fn lookup_choices(&self, kind: LookupKind) -> Result<Vec<String>> {
        let stored = self.repo.get_entries(kind).await?;
        if !stored.is_empty() {
            return Ok(stored.into_iter().map(|entry| entry.name).collect());
        }
        let vocabulary = &self.config.vocabulary;
        Ok(match kind {
            LookupKind::Agency => vocabulary.agencies.clone(),
            LookupKind::Sector => vocabulary.sectors.clone(),
        })
    }

    pub async fn add_lookup(&self, kind: LookupKind, name: &str) -> Result<LookupEntry> {
        let name = lookup_name(name)?;
        let entry = self.repo.add_entry(kind, name).await?;
        tracing::info!(kind = %kind, id = %entry.id, name = %entry.name, "lookup entry added");
        self.audit(
            AuditAction::Create,
            lookup_entity(kind),
            entry.id,
            Some(json!({ "name": entry.name })),
        )
        .await;
        Ok(entry)
    }

    pub async fn rename_lookup(&self, kind: LookupKind, id: Uuid, name: &str) -> Result<LookupEntry> {
        let name = lookup_name(name)?;
        let entry = self.find_lookup(kind, id).await?;
        let renamed = self.repo.rename_entry(&entry, name).await?;
        tracing::info!(kind = %kind, %id, from = %entry.name, to = %renamed.name, "lookup entry renamed");
        self.audit(
            AuditAction::Update,
            lookup_entity(kind),
            id,
            Some(json!({ "from": entry.name, "to": renamed.name })),
        )
        .await;
        Ok(renamed)
    }

    pub async fn delete_lookup(&self, kind: LookupKind, id: Uuid) -> Result<()> {
        let entry = self.find_lookup(kind, id).await?;
        let name = entry.name.clone();
        self.repo.delete_entry(entry).await?;
        tracing::info!(kind = %kind, %id, "lookup entry deleted");
        self.audit(
            AuditAction::Delete,
            lookup_entity(kind),
            id,
            Some(json!({ "name": name })),
        )
        .await;
        Ok(())
    }

    async fn find_lookup(&self, kind: LookupKind, id: Uuid) -> Result<LookupEntry> {
        self.repo
            .get_entry_by_id(kind, id)
            .await?
            .ok_or_else(|| Error::not_found(kind.label(), id))
    }

    /// Most recent entries first.
    pub async fn audit_log(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        self.repo.get_audit_entries(limit).await
    }

    async fn audit(
        &self,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: impl ToString,
        details: Option<serde_json::Value>,
    ) {
        let entry = NewAuditEntry {
            action,
            entity,
            entity_id: entity_id.to_string(),
            details,
        };
        if let Err(e) = self.repo.record(&entry).await {
            tracing::warn!(
                action = entry.action.as_str(),
                entity = entry.entity.as_str(),
                entity_id = %entry.entity_id,
                error = %e,
                "failed to write audit entry"
            );
        }
    }
}

async fn find_step<S: StepRepository>(repo: &S, step_id: Uuid) -> Result<TimelineStep> {
    repo.get_step_by_id(step_id)
        .await?
        .ok_or_else(|| Error::not_found("Step", step_id))
}

fn lookup_name(name: &str) -> std::result::Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(name)
}

fn lookup_entity(kind: LookupKind) -> AuditEntity {
    match kind {
        LookupKind::Agency => AuditEntity::Agency,
        LookupKind::Sector => AuditEntity::Sector,
    }
}
