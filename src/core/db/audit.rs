use std::future::Future;

use time::OffsetDateTime;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Archive,
    Restore,
    Reorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEntity {
    Project,
    Step,
    Agency,
    Sector,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Archive => "ARCHIVE",
            AuditAction::Restore => "RESTORE",
            AuditAction::Reorder => "REORDER",
        }
    }
}

impl TryFrom<&str> for AuditAction {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "CREATE" => Ok(AuditAction::Create),
            "UPDATE" => Ok(AuditAction::Update),
            "DELETE" => Ok(AuditAction::Delete),
            "ARCHIVE" => Ok(AuditAction::Archive),
            "RESTORE" => Ok(AuditAction::Restore),
            "REORDER" => Ok(AuditAction::Reorder),
            _ => Err(Error::Corrupt(format!("Invalid audit action: {}", value))),
        }
    }
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Project => "PROJECT",
            AuditEntity::Step => "STEP",
            AuditEntity::Agency => "AGENCY",
            AuditEntity::Sector => "SECTOR",
        }
    }
}

impl TryFrom<&str> for AuditEntity {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "PROJECT" => Ok(AuditEntity::Project),
            "STEP" => Ok(AuditEntity::Step),
            "AGENCY" => Ok(AuditEntity::Agency),
            "SECTOR" => Ok(AuditEntity::Sector),
            _ => Err(Error::Corrupt(format!("Invalid audit entity: {}", value))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub details: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
    pub(crate) _guard: (),
}

/// Append-only log of user actions.
pub trait AuditRepository {
    fn record(&self, entry: &NewAuditEntry) -> impl Future<Output = Result<()>>;
    /// Newest first.
    fn get_audit_entries(&self, limit: u32) -> impl Future<Output = Result<Vec<AuditEntry>>>;
}
