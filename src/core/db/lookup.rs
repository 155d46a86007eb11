use std::{fmt, future::Future};

use uuid::Uuid;

use crate::error::Result;

/// The two classification tables offered when assigning a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Agency,
    Sector,
}

impl LookupKind {
    pub(super) fn table(&self) -> &'static str {
        match self {
            LookupKind::Agency => "agencies",
            LookupKind::Sector => "sectors",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LookupKind::Agency => "Agency",
            LookupKind::Sector => "Sector",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct LookupEntry {
    pub id: Uuid,
    pub kind: LookupKind,
    pub name: String,
    pub(crate) _guard: (),
}

pub trait LookupRepository {
    /// Ordered by name.
    fn get_entries(&self, kind: LookupKind) -> impl Future<Output = Result<Vec<LookupEntry>>>;
    fn get_entry_by_id(&self, kind: LookupKind, id: Uuid) -> impl Future<Output = Result<Option<LookupEntry>>>;
    fn add_entry(&self, kind: LookupKind, name: &str) -> impl Future<Output = Result<LookupEntry>>;
    fn rename_entry(&self, entry: &LookupEntry, name: &str) -> impl Future<Output = Result<LookupEntry>>;
    fn delete_entry(&self, entry: LookupEntry) -> impl Future<Output = Result<()>>;
}
