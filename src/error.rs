//! Error types for worksboard

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using worksboard's Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Fetch(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Reorder failed for {} step(s): {}", .failed.len(), join_ids(.failed))]
    ReorderFailed { failed: Vec<Uuid> },

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Field checks performed before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Completion forecast ({forecast}) cannot be earlier than the start date ({start})")]
    ForecastBeforeStart { start: time::Date, forecast: time::Date },

    #[error("Progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),

    #[error("Step '{0}' appears more than once in the requested order")]
    DuplicateStep(Uuid),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unknown step status '{0}'")]
    UnknownStatus(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
