mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from worksboard for tests
pub use worksboard::core::db::{
    AuditAction, AuditEntity, AuditRepository, BoardDb, BoundProjectRepository, LookupKind,
    LookupRepository, NewProject, NewStep, ProjectRepository, ProjectStatus, ProjectUpdate,
    StepRepository, StepStatus, StepUpdate, TimelineStep,
};
pub use worksboard::{Board, Config, Error, ReorderMode, ValidationError};
