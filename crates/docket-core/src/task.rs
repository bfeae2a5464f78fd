use std::fmt;
use std::str::FromStr;

use docket_shared::{TaskCreate, TaskWire};
use tracing::debug;
use uuid::Uuid;

use crate::error::FieldError;

const LOCAL_ID_PREFIX: &str = "local-";

/// Identity of a task. Store ids come from the remote store; local ids are
/// minted for duplicates that were never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskId {
    Store(String),
    Local(Uuid),
}

impl TaskId {
    pub fn store(id: impl Into<String>) -> Self {
        Self::Store(id.into())
    }

    pub fn new_local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    /// Maps the display form back to an id. `local-<uuid>` is a local id,
    /// anything else non-blank is a store id.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(rest) = text.strip_prefix(LOCAL_ID_PREFIX)
            && let Ok(uuid) = Uuid::parse_str(rest)
        {
            return Some(Self::Local(uuid));
        }
        Some(Self::Store(text.to_string()))
    }

    pub fn as_store(&self) -> Option<&str> {
        match self {
            Self::Store(id) => Some(id),
            Self::Local(_) => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(id) => f.write_str(id),
            Self::Local(uuid) => write!(f, "{LOCAL_ID_PREFIX}{uuid}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Call,
    Meeting,
    VideoCall,
    Other(String),
}

impl Default for TaskKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl TaskKind {
    pub fn parse(text: &str) -> Self {
        let key: String = text
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "call" => Self::Call,
            "meeting" => Self::Meeting,
            "videocall" => Self::VideoCall,
            _ => Self::Other(text.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Call => "Call",
            Self::Meeting => "Meeting",
            Self::VideoCall => "Video Call",
            Self::Other(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Open,
    Closed,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }

    /// Lenient decoding for store payloads: anything unrecognized is Open.
    fn from_wire(text: &str) -> Self {
        text.parse().unwrap_or_else(|_| {
            debug!(status = %text, "unrecognized status from store, treating as Open");
            Self::Open
        })
    }
}

impl FromStr for TaskStatus {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(FieldError::InvalidStatus(s.to_string())),
        }
    }
}

/// The persisted fields of a task, addressable by name from forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Date,
    Time,
    Entity,
    Task,
    Person,
    Notes,
    Status,
}

impl FromStr for TaskField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "entity" => Ok(Self::Entity),
            "task" => Ok(Self::Task),
            "person" => Ok(Self::Person),
            "notes" => Ok(Self::Notes),
            "status" => Ok(Self::Status),
            _ => Err(FieldError::UnknownField(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskRecord {
    pub id: Option<TaskId>,
    pub date: String,
    pub time: String,
    pub entity: String,
    pub task: TaskKind,
    pub person: String,
    pub notes: String,
    pub status: TaskStatus,

    // UI-only; there is no wire type carrying these.
    pub status_dropdown_open: bool,
    pub action_dropdown_open: bool,
}

impl TaskRecord {
    pub fn from_wire(wire: TaskWire) -> Self {
        Self {
            id: wire.identity().map(TaskId::store),
            task: TaskKind::parse(&wire.task),
            status: TaskStatus::from_wire(&wire.status),
            date: wire.date,
            time: wire.time,
            entity: wire.entity,
            person: wire.person,
            notes: wire.notes,
            status_dropdown_open: false,
            action_dropdown_open: false,
        }
    }

    pub fn to_create(&self) -> TaskCreate {
        TaskCreate {
            date: self.date.clone(),
            time: self.time.clone(),
            entity: self.entity.clone(),
            task: self.task.label().to_string(),
            person: self.person.clone(),
            notes: self.notes.clone(),
            status: self.status.label().to_string(),
        }
    }

    /// Wire form including the store id, if any. Local ids never leave
    /// the process.
    pub fn to_wire(&self) -> TaskWire {
        let create = self.to_create();
        TaskWire {
            store_id: self
                .id
                .as_ref()
                .and_then(TaskId::as_store)
                .map(str::to_string),
            id: None,
            date: create.date,
            time: create.time,
            entity: create.entity,
            task: create.task,
            person: create.person,
            notes: create.notes,
            status: create.status,
        }
    }

    pub fn has_id(&self, id: &TaskId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// Equality over persisted fields, ignoring identity and UI flags.
    pub fn same_content(&self, other: &TaskRecord) -> bool {
        self.to_create() == other.to_create()
    }

    /// Searchable text, in display form.
    pub fn text_fields(&self) -> [&str; 7] {
        [
            self.date.as_str(),
            self.time.as_str(),
            self.entity.as_str(),
            self.task.label(),
            self.person.as_str(),
            self.notes.as_str(),
            self.status.label(),
        ]
    }

    pub fn set_field(&mut self, field: TaskField, value: &str) -> Result<(), FieldError> {
        match field {
            TaskField::Date => self.date = value.to_string(),
            TaskField::Time => self.time = value.to_string(),
            TaskField::Entity => self.entity = value.to_string(),
            TaskField::Task => self.task = TaskKind::parse(value),
            TaskField::Person => self.person = value.to_string(),
            TaskField::Notes => self.notes = value.to_string(),
            TaskField::Status => self.status = value.parse()?,
        }
        Ok(())
    }

    /// Copy under a fresh local id, with every dropdown closed.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Some(TaskId::new_local()),
            status_dropdown_open: false,
            action_dropdown_open: false,
            ..self.clone()
        }
    }

    pub fn close_dropdowns(&mut self) {
        self.status_dropdown_open = false;
        self.action_dropdown_open = false;
    }
}
