//! The board: owns the task state, both form sessions, the remote store
//! and the mutation coordinator, and turns user actions into calls on
//! them.
//!
//! Every mutating operation takes `&mut self` and awaits its remote call
//! inside, so mutations never interleave. Failures are logged, kept in
//! [`TaskBoard::last_error`] and returned; none of them leave the board
//! unusable.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::error::MutationError;
use crate::filter::{KindFlag, TaskSelector};
use crate::mutation::{MutationCoordinator, ReconcilingCoordinator};
use crate::remote::TaskRemote;
use crate::session::{EditSession, ModalMode, NotesSession};
use crate::state::BoardState;
use crate::task::{TaskId, TaskRecord, TaskStatus};
use crate::toggle::DropdownKind;

/// How a row action names its target: by task id, or by position in the
/// current view. Positions reach rows that have no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRef {
    Id(TaskId),
    Position(usize),
}

impl From<TaskId> for RowRef {
    fn from(id: TaskId) -> Self {
        Self::Id(id)
    }
}

impl From<&TaskId> for RowRef {
    fn from(id: &TaskId) -> Self {
        Self::Id(id.clone())
    }
}

impl From<usize> for RowRef {
    fn from(row: usize) -> Self {
        Self::Position(row)
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Position(row) => write!(f, "#{}", row + 1),
        }
    }
}

pub struct TaskBoard {
    remote: Arc<dyn TaskRemote>,
    coordinator: Box<dyn MutationCoordinator>,
    state: BoardState,
    session: EditSession,
    notes: NotesSession,
    filter_menu_open: bool,
    last_error: Option<String>,
}

impl fmt::Debug for TaskBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBoard")
            .field("coordinator", &self.coordinator.name())
            .field("state", &self.state)
            .field("session", &self.session)
            .field("notes", &self.notes)
            .field("filter_menu_open", &self.filter_menu_open)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl TaskBoard {
    pub fn new(remote: Arc<dyn TaskRemote>, coordinator: Box<dyn MutationCoordinator>) -> Self {
        Self {
            remote,
            coordinator,
            state: BoardState::new(),
            session: EditSession::new(),
            notes: NotesSession::new(),
            filter_menu_open: false,
            last_error: None,
        }
    }

    /// Board with the id-adopting coordinator.
    pub fn with_remote(remote: Arc<dyn TaskRemote>) -> Self {
        Self::new(remote, Box::new(ReconcilingCoordinator))
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// The rows to render.
    pub fn view(&self) -> &[TaskRecord] {
        self.state.filtered()
    }

    pub fn canonical(&self) -> &[TaskRecord] {
        self.state.canonical()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    pub fn notes_session(&self) -> &NotesSession {
        &self.notes
    }

    pub fn notes_session_mut(&mut self) -> &mut NotesSession {
        &mut self.notes
    }

    pub fn coordinator_name(&self) -> &'static str {
        self.coordinator.name()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn filter_menu_open(&self) -> bool {
        self.filter_menu_open
    }

    fn report(&mut self, op: &'static str, err: MutationError) -> MutationError {
        if err.is_remote() {
            error!(op, error = %err, "remote call failed; local state unchanged");
        } else {
            warn!(op, error = %err, "operation rejected");
        }
        self.last_error = Some(err.to_string());
        err
    }

    fn settle(&mut self, op: &'static str, result: Result<(), MutationError>) -> Result<(), MutationError> {
        match result {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => Err(self.report(op, err)),
        }
    }

    fn row_index(&self, row: &RowRef) -> Result<usize, MutationError> {
        match row {
            RowRef::Position(pos) => {
                if *pos < self.view().len() {
                    Ok(*pos)
                } else {
                    Err(MutationError::NoSuchRow { row: pos + 1 })
                }
            }
            RowRef::Id(id) => self
                .state
                .position_in_view(id)
                .ok_or_else(|| MutationError::NotFound { id: id.clone() }),
        }
    }

    fn row_record(&self, row: &RowRef) -> Result<&TaskRecord, MutationError> {
        let idx = self.row_index(row)?;
        Ok(&self.view()[idx])
    }

    /// Identity a remote row action should target. An id is used as given,
    /// even when the view does not hold it; a position yields that row's id.
    fn row_identity(&self, row: &RowRef) -> Result<Option<TaskId>, MutationError> {
        match row {
            RowRef::Id(id) => Ok(Some(id.clone())),
            RowRef::Position(_) => Ok(self.row_record(row)?.id.clone()),
        }
    }

    /// Replaces the canonical collection with the store's contents. On
    /// failure the current collection stays.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<usize, MutationError> {
        match self.remote.fetch_all().await {
            Ok(tasks) => {
                let count = tasks.len();
                self.state.replace_all(tasks);
                self.last_error = None;
                info!(count, "loaded tasks");
                Ok(count)
            }
            Err(err) => Err(self.report("load", err.into())),
        }
    }

    pub fn query(&self) -> &str {
        self.state.query()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.state.set_query(query);
    }

    pub fn selector(&self) -> TaskSelector {
        self.state.selector()
    }

    pub fn set_selector(&mut self, selector: TaskSelector) {
        self.state.set_selector(selector);
    }

    /// Flips one checkbox of the task-type filter.
    pub fn toggle_kind(&mut self, flag: KindFlag) {
        let mut selector = self.state.selector();
        selector.toggle(flag);
        self.state.set_selector(selector);
    }

    pub fn select_kind(&mut self, flag: KindFlag) {
        let mut selector = self.state.selector();
        selector.select(flag);
        self.state.set_selector(selector);
    }

    pub fn toggle_filter_menu(&mut self) -> bool {
        self.filter_menu_open = !self.filter_menu_open;
        self.filter_menu_open
    }

    /// Returns the row's new open state. An id outside the view is a no-op
    /// and reads as closed.
    pub fn toggle_dropdown(
        &mut self,
        kind: DropdownKind,
        row: impl Into<RowRef>,
    ) -> Result<bool, MutationError> {
        let row = row.into();
        if let RowRef::Id(id) = &row
            && self.state.position_in_view(id).is_none()
        {
            debug!(id = %id, ?kind, "dropdown target not in view");
            return Ok(false);
        }
        let idx = self.row_index(&row).map_err(|err| self.report("toggle dropdown", err))?;
        self.state
            .toggle_dropdown(kind, idx)
            .ok_or(MutationError::NoSuchRow { row: idx + 1 })
    }

    pub fn close_menus(&mut self, kind: DropdownKind) {
        self.state.close_dropdowns(kind);
    }

    /// Local copy under a fresh local id, added to the view only. The
    /// store is not called; the copy disappears on the next re-derivation.
    pub fn duplicate(&mut self, row: impl Into<RowRef>) -> Result<TaskId, MutationError> {
        let row = row.into();
        let idx = self.row_index(&row).map_err(|err| self.report("duplicate", err))?;
        let id = self
            .state
            .duplicate_row(idx)
            .ok_or(MutationError::NoSuchRow { row: idx + 1 })?;
        info!(source = %row, id = %id, "duplicated task locally");
        Ok(id)
    }

    pub fn open_for_create(&mut self) {
        self.session.open_for_create();
    }

    pub fn open_for_edit(&mut self, row: impl Into<RowRef>) -> Result<(), MutationError> {
        let row = row.into();
        let task = self
            .row_record(&row)
            .cloned()
            .map_err(|err| self.report("edit", err))?;
        self.session.open_for_edit(&task);
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.session.cancel();
    }

    /// Routes the draft to create or update. The form closes on success
    /// and stays open with the error otherwise.
    #[instrument(skip(self), fields(coordinator = self.coordinator.name()))]
    pub async fn submit(&mut self) -> Result<(), MutationError> {
        let (mode, draft) = match self.session.begin_submit() {
            Ok(begun) => begun,
            Err(err) => return Err(self.report("submit", err)),
        };

        let result = match mode {
            ModalMode::Create => {
                self.coordinator
                    .create(self.remote.as_ref(), &mut self.state, draft)
                    .await
            }
            ModalMode::Edit => {
                self.coordinator
                    .update(self.remote.as_ref(), &mut self.state, draft)
                    .await
            }
        };

        self.session.finish_submit(result.as_ref().err());
        self.settle("submit", result)
    }

    pub fn open_notes(&mut self, row: impl Into<RowRef>) -> Result<(), MutationError> {
        let row = row.into();
        let task = self
            .row_record(&row)
            .cloned()
            .map_err(|err| self.report("open notes", err))?;
        self.notes.open_for(&task);
        Ok(())
    }

    pub fn close_notes(&mut self) {
        self.notes.close();
    }

    #[instrument(skip(self))]
    pub async fn save_notes(&mut self) -> Result<(), MutationError> {
        let (target, notes) = match self.notes.begin_save() {
            Ok(begun) => begun,
            Err(err) => return Err(self.report("save notes", err)),
        };

        let result = self
            .coordinator
            .save_notes(self.remote.as_ref(), &mut self.state, target.as_ref(), notes)
            .await;

        self.notes.finish_save(result.as_ref().err());
        self.settle("save notes", result)
    }

    /// Sets an explicit status, as picked from the status dropdown.
    #[instrument(skip_all, fields(status = status.label(), row = tracing::field::Empty))]
    pub async fn set_status(
        &mut self,
        row: impl Into<RowRef>,
        status: TaskStatus,
    ) -> Result<(), MutationError> {
        let row = row.into();
        tracing::Span::current().record("row", tracing::field::display(&row));
        let id = match self.row_identity(&row) {
            Ok(id) => id,
            Err(err) => return Err(self.report("change status", err)),
        };

        let result = self
            .coordinator
            .set_status(self.remote.as_ref(), &mut self.state, id.as_ref(), status)
            .await;
        self.settle("change status", result)
    }

    /// Flips Open and Closed based on the row's current status.
    pub async fn toggle_status(&mut self, row: impl Into<RowRef>) -> Result<(), MutationError> {
        let row = row.into();
        let current = match self.current_status(&row) {
            Ok(status) => status,
            Err(err) => return Err(self.report("toggle status", err)),
        };
        self.set_status(row, current.toggled()).await
    }

    fn current_status(&self, row: &RowRef) -> Result<TaskStatus, MutationError> {
        match row {
            RowRef::Id(id) => self
                .state
                .position_in_view(id)
                .map(|idx| self.view()[idx].status)
                .or_else(|| self.state.find(id).map(|task| task.status))
                .ok_or_else(|| MutationError::NotFound { id: id.clone() }),
            RowRef::Position(_) => Ok(self.row_record(row)?.status),
        }
    }

    #[instrument(skip_all, fields(row = tracing::field::Empty))]
    pub async fn delete(&mut self, row: impl Into<RowRef>) -> Result<(), MutationError> {
        let row = row.into();
        tracing::Span::current().record("row", tracing::field::display(&row));
        let id = match self.row_identity(&row) {
            Ok(id) => id,
            Err(err) => return Err(self.report("delete", err)),
        };

        let result = self
            .coordinator
            .delete(self.remote.as_ref(), &mut self.state, id.as_ref())
            .await;
        self.settle("delete", result)
    }
}
