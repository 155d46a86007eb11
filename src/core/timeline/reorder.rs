use std::collections::HashSet;

use futures_util::future::join_all;
use uuid::Uuid;

use crate::config::ReorderMode;
use crate::core::db::{StepRepository, TimelineStep};
use crate::error::{Error, Result, ValidationError};

/// Positions for an ordered id list: the first id gets 1, the next 2 and so on.
pub fn plan(ids: &[Uuid]) -> std::result::Result<Vec<(Uuid, i64)>, ValidationError> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            if !seen.insert(*id) {
                return Err(ValidationError::DuplicateStep(*id));
            }
            Ok((*id, index as i64 + 1))
        })
        .collect()
}

/// Stored steps the requested order leaves out. They keep their old positions.
pub fn omitted(stored: &[TimelineStep], requested: &[Uuid]) -> Vec<Uuid> {
    let requested: HashSet<&Uuid> = requested.iter().collect();
    stored
        .iter()
        .map(|step| step.id)
        .filter(|id| !requested.contains(id))
        .collect()
}

/// Moves the id at `from` to `to`, shifting the ids in between.
/// Indices past the end are clamped to the last slot.
pub fn move_id(ids: &[Uuid], from: usize, to: usize) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    if ids.is_empty() || from >= ids.len() {
        return ids;
    }
    let to = to.min(ids.len() - 1);
    let id = ids.remove(from);
    ids.insert(to, id);
    ids
}

/// Write the planned positions.
///
/// `Atomic` applies everything in one transaction. `BestEffort` issues every
/// update concurrently and keeps the ones that succeed; the error then names
/// exactly the ids whose update failed.
pub async fn apply<R: StepRepository>(
    repo: &R,
    positions: &[(Uuid, i64)],
    mode: ReorderMode,
) -> Result<()> {
    match mode {
        ReorderMode::Atomic => repo.set_step_orders(positions).await,
        ReorderMode::BestEffort => {
            let results = join_all(positions.iter().map(|(id, order_index)| async move {
                (*id, repo.set_step_order(*id, *order_index).await)
            }))
            .await;

            let failed: Vec<Uuid> = results
                .into_iter()
                .filter_map(|(id, result)| {
                    result
                        .inspect_err(|e| tracing::warn!(step_id = %id, error = %e, "step order update failed"))
                        .err()
                        .map(|_| id)
                })
                .collect();

            if failed.is_empty() {
                Ok(())
            } else {
                Err(Error::ReorderFailed { failed })
            }
        }
    }
}
