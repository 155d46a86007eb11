mod audit;
mod lookup;
mod model;
mod project;
mod state;
mod step;

use std::{collections::HashMap, path::Path, sync::Arc};

use sqlx::{QueryBuilder, Sqlite};
use state::BoardState;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

pub use audit::{AuditAction, AuditEntity, AuditEntry, AuditRepository, NewAuditEntry};
pub use lookup::{LookupEntry, LookupKind, LookupRepository};
pub use model::{ProjectStatus, StepStatus, format_date, parse_date};
pub use project::{
    BoundProjectRepository, CurrentStepDetails, NewProject, Project, ProjectRepository,
    ProjectUpdate,
};
pub use step::{NewStep, StepRepository, StepUpdate, TimelineStep, check_dates};

const PROJECT_COLUMNS: &str = "id, title, description, progress, image_url, status, \
    current_responsible, current_deadline, current_notes, created_at";

const STEP_COLUMNS: &str = "id, project_id, title, status, is_current, top_annotation, \
    bottom_annotation, responsible_agency, responsible_sector, start_date, \
    completion_forecast, order_index";

/// Handle on the whole board: project listing, lookups and the audit log.
#[derive(Debug, Clone)]
pub struct BoardDb {
    state: Arc<BoardState>,
}

impl BoardDb {
    pub async fn new<P: AsRef<Path>>(db_file: P) -> Result<Self> {
        Self::open(db_file, DatabaseConfig::default().max_connections).await
    }

    pub async fn with_config(config: &DatabaseConfig) -> Result<Self> {
        Self::open(&config.path, config.max_connections).await
    }

    async fn open<P: AsRef<Path>>(db_file: P, max_connections: u32) -> Result<Self> {
        Ok(Self {
            state: Arc::new(BoardState::new(db_file, max_connections).await?),
        })
    }

    /// Checkpoint and close the pool. Further calls on this handle fail.
    pub async fn close(&self) -> Result<()> {
        self.state.close().await
    }
}

/// Handle on one project and its timeline steps.
#[derive(Debug, Clone)]
pub struct ProjectDb {
    state: Arc<BoardState>,
    project_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    title: String,
    description: String,
    progress: i64,
    image_url: Option<String>,
    status: String,
    current_responsible: Option<String>,
    current_deadline: Option<String>,
    current_notes: Option<String>,
    created_at: i64,
}

impl TryFrom<ProjectRow> for Project {
    type Error = Error;

    fn try_from(row: ProjectRow) -> Result<Self> {
        let current_step_details = row
            .current_responsible
            .filter(|r| !r.is_empty())
            .map(|responsible| CurrentStepDetails {
                responsible,
                deadline: row.current_deadline.unwrap_or_default(),
                notes: row.current_notes.unwrap_or_default(),
            });
        Ok(Project {
            id: model::decode_uuid(&row.id)?,
            title: row.title,
            description: row.description,
            progress: u8::try_from(row.progress)
                .map_err(|_| Error::Corrupt(format!("Invalid progress: {}", row.progress)))?,
            image_url: row.image_url.filter(|u| !u.is_empty()),
            status: ProjectStatus::try_from(row.status.as_str())?,
            current_step_details,
            created_at: model::decode_timestamp(row.created_at)?,
            _guard: (),
        })
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: String,
    project_id: String,
    title: String,
    status: String,
    is_current: bool,
    top_annotation: Option<String>,
    bottom_annotation: Option<String>,
    responsible_agency: Option<String>,
    responsible_sector: Option<String>,
    start_date: Option<String>,
    completion_forecast: Option<String>,
    order_index: i64,
}

impl TryFrom<StepRow> for TimelineStep {
    type Error = Error;

    fn try_from(row: StepRow) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Ok(TimelineStep {
            id: model::decode_uuid(&row.id)?,
            project_id: model::decode_uuid(&row.project_id)?,
            title: row.title,
            status: StepStatus::try_from(row.status.as_str())
                .map_err(|e| Error::Corrupt(e.to_string()))?,
            order_index: row.order_index,
            is_current: row.is_current,
            top_annotation: non_empty(row.top_annotation),
            bottom_annotation: non_empty(row.bottom_annotation),
            responsible_agency: non_empty(row.responsible_agency),
            responsible_sector: non_empty(row.responsible_sector),
            start_date: model::decode_date(row.start_date)?,
            completion_forecast: model::decode_date(row.completion_forecast)?,
            _guard: (),
        })
    }
}

#[derive(sqlx::FromRow)]
struct LookupRow {
    id: String,
    name: String,
}

impl LookupRow {
    fn into_entry(self, kind: LookupKind) -> Result<LookupEntry> {
        Ok(LookupEntry {
            id: model::decode_uuid(&self.id)?,
            kind,
            name: self.name,
            _guard: (),
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    action: String,
    entity: String,
    entity_id: String,
    details: Option<String>,
    created_at: i64,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = Error;

    fn try_from(row: AuditRow) -> Result<Self> {
        let details = row
            .details
            .map(|d| {
                serde_json::from_str(&d)
                    .map_err(|e| Error::Corrupt(format!("Invalid audit details: {}", e)))
            })
            .transpose()?;
        Ok(AuditEntry {
            id: row.id,
            action: AuditAction::try_from(row.action.as_str())?,
            entity: AuditEntity::try_from(row.entity.as_str())?,
            entity_id: row.entity_id,
            details,
            created_at: model::decode_timestamp(row.created_at)?,
            _guard: (),
        })
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ProjectRepository for BoardDb {
    type Repository = ProjectDb;

    fn get_project_repo(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Self::Repository>> + 'static {
        let state = self.state.clone();
        async move {
            let mut conn = state.conn().await?;
            let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE id = $1")
                .bind(id.to_string())
                .fetch_one(&mut **conn)
                .await?;
            if found == 0 {
                return Err(Error::not_found("Project", id));
            }
            Ok(ProjectDb {
                state: state.clone(),
                project_id: id,
            })
        }
    }

    fn add_project(
        &self,
        project: NewProject,
    ) -> impl std::future::Future<Output = Result<Self::Repository>> + 'static {
        let state = self.state.clone();
        async move {
            let mut conn = state.conn().await?;
            let mut tx = conn.begin_transaction().await?;
            let project_id = Uuid::new_v4();
            let details = project.current_step_details.as_ref();
            sqlx::query(
                r#"INSERT INTO projects (
                    id, title, description, progress, image_url, status,
                    current_responsible, current_deadline, current_notes, created_at
                ) VALUES ($1, $2, $3, 0, $4, $5, $6, $7, $8, $9)"#,
            )
            .bind(project_id.to_string())
            .bind(project.title.trim())
            .bind(&project.description)
            .bind(trimmed(&project.image_url))
            .bind(ProjectStatus::Active.as_str())
            .bind(details.map(|d| d.responsible.as_str()))
            .bind(details.map(|d| d.deadline.as_str()))
            .bind(details.map(|d| d.notes.as_str()))
            .bind(model::encode_timestamp(OffsetDateTime::now_utc()))
            .execute(&mut *tx)
            .await?;

            let mut seen_current = false;
            for (position, step) in project.steps.iter().enumerate() {
                let is_current = step.is_current && !seen_current;
                seen_current |= is_current;
                insert_step(&mut tx, project_id, step, is_current, position as i64 + 1).await?;
            }
            tx.commit().await?;
            tracing::debug!(%project_id, steps = project.steps.len(), "project inserted");

            Ok(ProjectDb {
                state: state.clone(),
                project_id,
            })
        }
    }

    async fn get_projects(
        &self,
        status: Option<ProjectStatus>,
        search: Option<&str>,
    ) -> Result<Vec<Project>> {
        let mut conn = self.state.conn().await?;
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE 1 = 1"));
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query
                .push(" AND instr(lower(title), lower(")
                .push_bind(search.to_string())
                .push(")) > 0");
        }
        query.push(" ORDER BY created_at DESC, rowid DESC");
        query
            .build_query_as::<ProjectRow>()
            .fetch_all(&mut **conn)
            .await?
            .into_iter()
            .map(Project::try_from)
            .collect()
    }

    async fn get_steps_for_projects(
        &self,
        project_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<TimelineStep>>> {
        let mut map: HashMap<Uuid, Vec<TimelineStep>> =
            project_ids.iter().map(|id| (*id, Vec::new())).collect();
        if project_ids.is_empty() {
            return Ok(map);
        }
        let mut conn = self.state.conn().await?;
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {STEP_COLUMNS} FROM project_steps WHERE project_id IN ("
        ));
        let mut ids = query.separated(", ");
        for id in project_ids {
            ids.push_bind(id.to_string());
        }
        query.push(") ORDER BY order_index ASC, rowid ASC");
        let rows = query.build_query_as::<StepRow>().fetch_all(&mut **conn).await?;
        for row in rows {
            let step = TimelineStep::try_from(row)?;
            map.entry(step.project_id).or_default().push(step);
        }
        Ok(map)
    }
}

async fn insert_step(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    project_id: Uuid,
    step: &NewStep,
    is_current: bool,
    order_index: i64,
) -> Result<StepRow> {
    Ok(sqlx::query_as::<_, StepRow>(&format!(
        r#"INSERT INTO project_steps (
            id, project_id, title, status, is_current, top_annotation, bottom_annotation,
            responsible_agency, responsible_sector, start_date, completion_forecast, order_index
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {STEP_COLUMNS}"#
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(project_id.to_string())
    .bind(step.title.trim())
    .bind(step.status.as_str())
    .bind(is_current)
    .bind(trimmed(&step.top_annotation))
    .bind(trimmed(&step.bottom_annotation))
    .bind(trimmed(&step.responsible_agency))
    .bind(trimmed(&step.responsible_sector))
    .bind(step.start_date.map(format_date))
    .bind(step.completion_forecast.map(format_date))
    .bind(order_index)
    .fetch_one(&mut **tx)
    .await?)
}

async fn clear_current(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    project_id: Uuid,
) -> Result<()> {
    sqlx::query("UPDATE project_steps SET is_current = 0 WHERE project_id = $1 AND is_current <> 0")
        .bind(project_id.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

impl BoundProjectRepository for ProjectDb {
    fn project_id(&self) -> Uuid {
        self.project_id
    }

    async fn get_project(&self) -> Result<Project> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(self.project_id.to_string())
        .fetch_optional(&mut **conn)
        .await?
        .ok_or_else(|| Error::not_found("Project", self.project_id))
        .and_then(Project::try_from)
    }

    async fn update_project(&self, update: &ProjectUpdate) -> Result<Project> {
        let current = self.get_project().await?;
        let mut conn = self.state.conn().await?;
        let title = update
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.title);
        let description = update.description.as_ref().unwrap_or(&current.description);
        let progress = update.progress.unwrap_or(i64::from(current.progress));
        let image_url = match &update.image_url {
            Some(url) => trimmed(url),
            None => current.image_url.clone(),
        };
        let status = update.status.unwrap_or(current.status);
        let details = match &update.current_step_details {
            Some(details) => details.clone(),
            None => current.current_step_details.clone(),
        };
        let details = details.as_ref();
        let record = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"UPDATE projects SET
                title = $1,
                description = $2,
                progress = $3,
                image_url = $4,
                status = $5,
                current_responsible = $6,
                current_deadline = $7,
                current_notes = $8
            WHERE id = $9
            RETURNING {PROJECT_COLUMNS}"#
        ))
        .bind(title)
        .bind(description)
        .bind(progress)
        .bind(image_url)
        .bind(status.as_str())
        .bind(details.map(|d| d.responsible.as_str()))
        .bind(details.map(|d| d.deadline.as_str()))
        .bind(details.map(|d| d.notes.as_str()))
        .bind(self.project_id.to_string())
        .fetch_optional(&mut **conn)
        .await?
        .ok_or_else(|| Error::not_found("Project", self.project_id))?;
        Project::try_from(record)
    }

    async fn delete(self) -> Result<()> {
        let mut conn = self.state.conn().await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(self.project_id.to_string())
            .execute(&mut **conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Project", self.project_id));
        }
        Ok(())
    }
}

impl StepRepository for ProjectDb {
    async fn get_steps(&self) -> Result<Vec<TimelineStep>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM project_steps
            WHERE project_id = $1
            ORDER BY order_index ASC, rowid ASC"
        ))
        .bind(self.project_id.to_string())
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(TimelineStep::try_from)
        .collect()
    }

    async fn get_step_by_id(&self, id: Uuid) -> Result<Option<TimelineStep>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM project_steps WHERE project_id = $1 AND id = $2"
        ))
        .bind(self.project_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&mut **conn)
        .await?
        .map(TimelineStep::try_from)
        .transpose()
    }

    async fn add_step(&self, step: &NewStep) -> Result<TimelineStep> {
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin_transaction().await?;
        let next_order = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(order_index), 0) + 1 FROM project_steps WHERE project_id = $1",
        )
        .bind(self.project_id.to_string())
        .fetch_one(&mut *tx)
        .await?;
        if step.is_current {
            clear_current(&mut tx, self.project_id).await?;
        }
        let record = insert_step(&mut tx, self.project_id, step, step.is_current, next_order).await?;
        tx.commit().await?;
        TimelineStep::try_from(record)
    }

    async fn update_step(&self, step: &TimelineStep, update: &StepUpdate) -> Result<TimelineStep> {
        let merge = |field: &Option<Option<String>>, stored: &Option<String>| match field {
            Some(value) => trimmed(value),
            None => stored.clone(),
        };
        let title = update
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(&step.title);
        let status = update.status.unwrap_or(step.status);
        let is_current = update.is_current.unwrap_or(step.is_current);
        let start_date = update.start_date.unwrap_or(step.start_date);
        let completion_forecast = update.completion_forecast.unwrap_or(step.completion_forecast);

        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin_transaction().await?;
        if update.is_current == Some(true) {
            clear_current(&mut tx, self.project_id).await?;
        }
        let record = sqlx::query_as::<_, StepRow>(&format!(
            r#"UPDATE project_steps SET
                title = $1,
                status = $2,
                is_current = $3,
                top_annotation = $4,
                bottom_annotation = $5,
                responsible_agency = $6,
                responsible_sector = $7,
                start_date = $8,
                completion_forecast = $9
            WHERE id = $10 AND project_id = $11
            RETURNING {STEP_COLUMNS}"#
        ))
        .bind(title)
        .bind(status.as_str())
        .bind(is_current)
        .bind(merge(&update.top_annotation, &step.top_annotation))
        .bind(merge(&update.bottom_annotation, &step.bottom_annotation))
        .bind(merge(&update.responsible_agency, &step.responsible_agency))
        .bind(merge(&update.responsible_sector, &step.responsible_sector))
        .bind(start_date.map(format_date))
        .bind(completion_forecast.map(format_date))
        .bind(step.id.to_string())
        .bind(self.project_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::not_found("Step", step.id))?;
        tx.commit().await?;
        TimelineStep::try_from(record)
    }

    async fn delete_step(&self, step: TimelineStep) -> Result<()> {
        let mut conn = self.state.conn().await?;
        let result = sqlx::query("DELETE FROM project_steps WHERE id = $1 AND project_id = $2")
            .bind(step.id.to_string())
            .bind(self.project_id.to_string())
            .execute(&mut **conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Step", step.id));
        }
        Ok(())
    }

    async fn set_current_step(&self, step: &TimelineStep) -> Result<()> {
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin_transaction().await?;
        clear_current(&mut tx, self.project_id).await?;
        let result =
            sqlx::query("UPDATE project_steps SET is_current = 1 WHERE id = $1 AND project_id = $2")
                .bind(step.id.to_string())
                .bind(self.project_id.to_string())
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls the cleared flags back.
            return Err(Error::not_found("Step", step.id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_step_order(&self, id: Uuid, order_index: i64) -> Result<()> {
        let mut conn = self.state.conn().await?;
        let result =
            sqlx::query("UPDATE project_steps SET order_index = $1 WHERE id = $2 AND project_id = $3")
                .bind(order_index)
                .bind(id.to_string())
                .bind(self.project_id.to_string())
                .execute(&mut **conn)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Step", id));
        }
        Ok(())
    }

    async fn set_step_orders(&self, positions: &[(Uuid, i64)]) -> Result<()> {
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin_transaction().await?;
        let mut missing = Vec::new();
        for (id, order_index) in positions {
            let result = sqlx::query(
                "UPDATE project_steps SET order_index = $1 WHERE id = $2 AND project_id = $3",
            )
            .bind(*order_index)
            .bind(id.to_string())
            .bind(self.project_id.to_string())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                missing.push(*id);
            }
        }
        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(Error::ReorderFailed { failed: missing });
        }
        tx.commit().await?;
        Ok(())
    }
}

impl LookupRepository for BoardDb {
    async fn get_entries(&self, kind: LookupKind) -> Result<Vec<LookupEntry>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, LookupRow>(&format!(
            "SELECT id, name FROM {} ORDER BY name ASC",
            kind.table()
        ))
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(|row| row.into_entry(kind))
        .collect()
    }

    async fn get_entry_by_id(&self, kind: LookupKind, id: Uuid) -> Result<Option<LookupEntry>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, LookupRow>(&format!(
            "SELECT id, name FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id.to_string())
        .fetch_optional(&mut **conn)
        .await?
        .map(|row| row.into_entry(kind))
        .transpose()
    }

    async fn add_entry(&self, kind: LookupKind, name: &str) -> Result<LookupEntry> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, LookupRow>(&format!(
            "INSERT INTO {} (id, name) VALUES ($1, $2) RETURNING id, name",
            kind.table()
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(name.trim())
        .fetch_one(&mut **conn)
        .await?
        .into_entry(kind)
    }

    async fn rename_entry(&self, entry: &LookupEntry, name: &str) -> Result<LookupEntry> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, LookupRow>(&format!(
            "UPDATE {} SET name = $1 WHERE id = $2 RETURNING id, name",
            entry.kind.table()
        ))
        .bind(name.trim())
        .bind(entry.id.to_string())
        .fetch_optional(&mut **conn)
        .await?
        .ok_or_else(|| Error::not_found(entry.kind.label(), entry.id))?
        .into_entry(entry.kind)
    }

    async fn delete_entry(&self, entry: LookupEntry) -> Result<()> {
        let mut conn = self.state.conn().await?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", entry.kind.table()))
            .bind(entry.id.to_string())
            .execute(&mut **conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(entry.kind.label(), entry.id));
        }
        Ok(())
    }
}

impl AuditRepository for BoardDb {
    async fn record(&self, entry: &NewAuditEntry) -> Result<()> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Corrupt(format!("Unserializable audit details: {}", e)))?;
        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO audit_logs (action, entity, entity_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(&entry.entity_id)
        .bind(details)
        .bind(model::encode_timestamp(OffsetDateTime::now_utc()))
        .execute(&mut **conn)
        .await?;
        Ok(())
    }

    async fn get_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, AuditRow>(
            r#"SELECT id, action, entity, entity_id, details, created_at
            FROM audit_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(AuditEntry::try_from)
        .collect()
    }
}
