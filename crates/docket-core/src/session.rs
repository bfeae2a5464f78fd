use tracing::debug;

use crate::error::{FieldError, MutationError};
use crate::task::{TaskField, TaskId, TaskRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    Open(ModalMode),
}

/// Backing state of the add/edit form. The draft is always an owned copy;
/// nothing in the canonical collection changes until a submit succeeds.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: ModalState,
    draft: TaskRecord,
    error: Option<String>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ModalState::Open(_))
    }

    pub fn mode(&self) -> Option<ModalMode> {
        match self.state {
            ModalState::Open(mode) => Some(mode),
            ModalState::Closed => None,
        }
    }

    pub fn draft(&self) -> &TaskRecord {
        &self.draft
    }

    /// Message from the last failed submit, shown while the form stays open.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn open_for_create(&mut self) {
        self.draft = TaskRecord::default();
        self.error = None;
        self.state = ModalState::Open(ModalMode::Create);
        debug!("create form opened");
    }

    pub fn open_for_edit(&mut self, task: &TaskRecord) {
        self.draft = task.clone();
        self.draft.close_dropdowns();
        self.error = None;
        self.state = ModalState::Open(ModalMode::Edit);
        debug!(id = ?task.id, "edit form opened");
    }

    pub fn set_field(&mut self, field: TaskField, value: &str) -> Result<(), FieldError> {
        self.draft.set_field(field, value)
    }

    /// Hands out the draft for submission. The form stays open until
    /// [`EditSession::finish_submit`] reports the outcome.
    pub fn begin_submit(&self) -> Result<(ModalMode, TaskRecord), MutationError> {
        match self.state {
            ModalState::Open(mode) => Ok((mode, self.draft.clone())),
            ModalState::Closed => Err(MutationError::SessionClosed { op: "submit" }),
        }
    }

    /// Closes on success. On failure the form stays open with the draft
    /// intact and the error attached.
    pub fn finish_submit(&mut self, failure: Option<&MutationError>) {
        match failure {
            None => self.close(),
            Some(err) => self.error = Some(err.to_string()),
        }
    }

    pub fn cancel(&mut self) {
        debug!(was_open = self.is_open(), "form cancelled");
        self.close();
    }

    fn close(&mut self) {
        self.state = ModalState::Closed;
        self.draft = TaskRecord::default();
        self.error = None;
    }
}

/// Backing state of the notes modal. Holds the target's id and a copy of
/// its notes; only the notes field is editable here.
#[derive(Debug, Clone, Default)]
pub struct NotesSession {
    open: bool,
    target: Option<TaskId>,
    notes: String,
    error: Option<String>,
}

impl NotesSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn target(&self) -> Option<&TaskId> {
        self.target.as_ref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn open_for(&mut self, task: &TaskRecord) {
        self.open = true;
        self.target = task.id.clone();
        self.notes = task.notes.clone();
        self.error = None;
        debug!(id = ?task.id, "notes form opened");
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn begin_save(&self) -> Result<(Option<TaskId>, String), MutationError> {
        if !self.open {
            return Err(MutationError::SessionClosed { op: "save notes" });
        }
        Ok((self.target.clone(), self.notes.clone()))
    }

    pub fn finish_save(&mut self, failure: Option<&MutationError>) {
        match failure {
            None => self.close(),
            Some(err) => self.error = Some(err.to_string()),
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.target = None;
        self.notes.clear();
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskKind, TaskStatus};

    fn stored(id: &str) -> TaskRecord {
        TaskRecord {
            id: Some(TaskId::store(id)),
            entity: "Acme".to_string(),
            task: TaskKind::Meeting,
            status: TaskStatus::Closed,
            ..TaskRecord::default()
        }
    }

    #[test]
    fn create_starts_from_empty_defaults() {
        let mut session = EditSession::new();
        session.open_for_edit(&stored("1"));
        session.open_for_create();
        assert_eq!(session.mode(), Some(ModalMode::Create));
        assert_eq!(session.draft(), &TaskRecord::default());
    }

    #[test]
    fn edit_draft_is_a_copy() {
        let original = stored("1");
        let mut session = EditSession::new();
        session.open_for_edit(&original);
        session.set_field(TaskField::Entity, "Globex").expect("entity");
        assert_eq!(original.entity, "Acme");
        assert_eq!(session.draft().entity, "Globex");
        assert_eq!(session.draft().id, original.id);
    }

    #[test]
    fn submit_requires_an_open_form() {
        let session = EditSession::new();
        assert!(matches!(
            session.begin_submit(),
            Err(MutationError::SessionClosed { .. })
        ));
    }

    #[test]
    fn failed_submit_keeps_form_open_with_error() {
        let mut session = EditSession::new();
        session.open_for_edit(&stored("1"));
        session.set_field(TaskField::Notes, "draft text").expect("notes");

        let err = MutationError::MissingIdentity { op: "update" };
        session.finish_submit(Some(&err));
        assert!(session.is_open());
        assert_eq!(session.draft().notes, "draft text");
        assert!(session.error().is_some_and(|e| e.contains("no store-assigned id")));

        session.finish_submit(None);
        assert_eq!(session.state(), ModalState::Closed);
        assert!(session.error().is_none());
    }

    #[test]
    fn cancel_discards_draft() {
        let mut session = EditSession::new();
        session.open_for_create();
        session.set_field(TaskField::Person, "Dana").expect("person");
        session.cancel();
        assert!(!session.is_open());
        assert_eq!(session.draft(), &TaskRecord::default());
    }

    #[test]
    fn notes_session_round_trip() {
        let mut notes = NotesSession::new();
        assert!(notes.begin_save().is_err());

        notes.open_for(&stored("4"));
        notes.set_notes("call back friday");
        let (target, text) = notes.begin_save().expect("open");
        assert_eq!(target, Some(TaskId::store("4")));
        assert_eq!(text, "call back friday");

        notes.finish_save(None);
        assert!(!notes.is_open());
        assert!(notes.target().is_none());
    }
}
