//! Two-phase mutations: call the store, then touch local state only if
//! the call succeeded.
//!
//! The coordinator is a trait so the create policy can be swapped without
//! touching the board. [`OptimisticCoordinator`] appends the draft exactly
//! as submitted; [`ReconcilingCoordinator`] adopts the id the store
//! echoes back. The other operations share the provided implementations.

use async_trait::async_trait;
use docket_shared::TaskPatch;
use tracing::{debug, info, instrument};

use crate::error::MutationError;
use crate::remote::TaskRemote;
use crate::state::BoardState;
use crate::task::{TaskId, TaskRecord, TaskStatus};

/// The store id behind `id`, or a missing-identity error. Runs before
/// any remote call.
fn store_id<'a>(id: Option<&'a TaskId>, op: &'static str) -> Result<&'a str, MutationError> {
    id.and_then(TaskId::as_store)
        .ok_or(MutationError::MissingIdentity { op })
}

#[async_trait]
pub trait MutationCoordinator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends the draft to the store and appends it to the canonical
    /// collection on success.
    async fn create(
        &self,
        remote: &dyn TaskRemote,
        state: &mut BoardState,
        draft: TaskRecord,
    ) -> Result<(), MutationError>;

    /// Full edit: the draft replaces the record carrying the same id.
    async fn update(
        &self,
        remote: &dyn TaskRemote,
        state: &mut BoardState,
        draft: TaskRecord,
    ) -> Result<(), MutationError> {
        let id = store_id(draft.id.as_ref(), "update")?;
        remote
            .update(id, &TaskPatch::full(draft.to_create()))
            .await?;

        let id = id.to_string();
        let replaced = state.replace(draft);
        debug!(coordinator = self.name(), id = %id, replaced, "task updated");
        Ok(())
    }

    /// Sets the status and closes the row's status dropdown.
    async fn set_status(
        &self,
        remote: &dyn TaskRemote,
        state: &mut BoardState,
        id: Option<&TaskId>,
        status: TaskStatus,
    ) -> Result<(), MutationError> {
        let store = store_id(id, "change status")?;
        remote.update(store, &TaskPatch::status(status.label())).await?;

        if let Some(id) = id {
            state.patch(id, |task| {
                task.status = status;
                task.status_dropdown_open = false;
            });
        }
        debug!(coordinator = self.name(), id = store, status = status.label(), "status changed");
        Ok(())
    }

    async fn save_notes(
        &self,
        remote: &dyn TaskRemote,
        state: &mut BoardState,
        id: Option<&TaskId>,
        notes: String,
    ) -> Result<(), MutationError> {
        let store = store_id(id, "save notes")?;
        remote.update(store, &TaskPatch::notes(notes.clone())).await?;

        if let Some(id) = id {
            state.patch(id, |task| task.notes = notes);
        }
        debug!(coordinator = self.name(), id = store, "notes saved");
        Ok(())
    }

    /// Removes the record from both collections. Unknown ids are a local
    /// no-op once the store has accepted the call.
    async fn delete(
        &self,
        remote: &dyn TaskRemote,
        state: &mut BoardState,
        id: Option<&TaskId>,
    ) -> Result<(), MutationError> {
        let store = store_id(id, "delete")?;
        remote.delete(store).await?;

        let removed = id.is_some_and(|id| state.remove(id));
        info!(coordinator = self.name(), id = store, removed, "task deleted");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OptimisticCoordinator;

#[async_trait]
impl MutationCoordinator for OptimisticCoordinator {
    fn name(&self) -> &'static str {
        "optimistic"
    }

    #[instrument(skip_all, fields(coordinator = "optimistic"))]
    async fn create(
        &self,
        remote: &dyn TaskRemote,
        state: &mut BoardState,
        draft: TaskRecord,
    ) -> Result<(), MutationError> {
        remote.create(&draft).await?;
        state.append(draft);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilingCoordinator;

#[async_trait]
impl MutationCoordinator for ReconcilingCoordinator {
    fn name(&self) -> &'static str {
        "reconciling"
    }

    #[instrument(skip_all, fields(coordinator = "reconciling"))]
    async fn create(
        &self,
        remote: &dyn TaskRemote,
        state: &mut BoardState,
        mut draft: TaskRecord,
    ) -> Result<(), MutationError> {
        let echo = remote.create(&draft).await?;

        match echo.and_then(|task| task.id).filter(|id| !id.is_local()) {
            Some(id) => {
                debug!(id = %id, "adopting store-assigned id");
                draft.id = Some(id);
            }
            None => debug!("store echo carried no id; keeping draft as submitted"),
        }
        state.append(draft);
        Ok(())
    }
}

/// Picks a coordinator by its configured name.
pub fn coordinator_named(name: &str) -> Option<Box<dyn MutationCoordinator>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "optimistic" => Some(Box::new(OptimisticCoordinator)),
        "reconciling" => Some(Box::new(ReconcilingCoordinator)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_id_rejects_absent_and_local_ids() {
        assert!(matches!(
            store_id(None, "delete"),
            Err(MutationError::MissingIdentity { op: "delete" })
        ));
        let local = TaskId::new_local();
        assert!(store_id(Some(&local), "delete").is_err());
        let stored = TaskId::store("7");
        assert_eq!(store_id(Some(&stored), "delete").ok(), Some("7"));
    }

    #[test]
    fn coordinators_resolve_by_name() {
        assert_eq!(
            coordinator_named("Reconciling").map(|c| c.name()),
            Some("reconciling")
        );
        assert_eq!(
            coordinator_named("optimistic").map(|c| c.name()),
            Some("optimistic")
        );
        assert!(coordinator_named("eager").is_none());
    }
}
