use std::collections::HashSet;

use async_trait::async_trait;
use docket_shared::{TaskCreate, TaskPatch, TaskWire};
use parking_lot::Mutex;
use tracing::debug;

use super::TaskRemote;
use crate::error::RemoteError;
use crate::task::TaskRecord;

const MEMORY_URL: &str = "memory://products";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    FetchAll,
    Create,
    Update,
    Delete,
}

/// One call as the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    FetchAll,
    Create(TaskCreate),
    Update { id: String, patch: TaskPatch },
    Delete { id: String },
}

impl RemoteCall {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::FetchAll => CallKind::FetchAll,
            Self::Create(_) => CallKind::Create,
            Self::Update { .. } => CallKind::Update,
            Self::Delete { .. } => CallKind::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<TaskWire>,
    next_id: u64,
    calls: Vec<RemoteCall>,
    failing: HashSet<CallKind>,
    echo: bool,
}

impl Inner {
    fn mint_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }

    fn check(&self, kind: CallKind, method: &'static str) -> Result<(), RemoteError> {
        if self.failing.contains(&kind) {
            debug!(?kind, "memory remote failing call on request");
            return Err(RemoteError::Status {
                method,
                url: MEMORY_URL.to_string(),
                status: 503,
            });
        }
        Ok(())
    }
}

/// In-process task store. Assigns `mem-N` ids, echoes created records,
/// and can be told to fail any kind of call. Every call is recorded,
/// including failed ones.
#[derive(Debug)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                echo: true,
                ..Inner::default()
            }),
        }
    }

    /// Seeds the store. Records without a store id get one.
    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        let remote = Self::new();
        {
            let mut inner = remote.inner.lock();
            for record in records {
                let mut wire = record.to_wire();
                if wire.identity().is_none() {
                    wire.store_id = Some(inner.mint_id());
                }
                inner.records.push(wire);
            }
        }
        remote
    }

    /// Creates succeed but return no decodable echo.
    pub fn without_echo(self) -> Self {
        self.inner.lock().echo = false;
        self
    }

    pub fn fail(&self, kind: CallKind) {
        self.inner.lock().failing.insert(kind);
    }

    pub fn recover(&self, kind: CallKind) {
        self.inner.lock().failing.remove(&kind);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }

    pub fn count_of(&self, kind: CallKind) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| call.kind() == kind)
            .count()
    }

    /// What the store currently holds.
    pub fn stored(&self) -> Vec<TaskRecord> {
        self.inner
            .lock()
            .records
            .iter()
            .cloned()
            .map(TaskRecord::from_wire)
            .collect()
    }
}

#[async_trait]
impl TaskRemote for MemoryRemote {
    async fn fetch_all(&self) -> Result<Vec<TaskRecord>, RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::FetchAll);
        inner.check(CallKind::FetchAll, "GET")?;
        Ok(inner
            .records
            .iter()
            .cloned()
            .map(TaskRecord::from_wire)
            .collect())
    }

    async fn create(&self, task: &TaskRecord) -> Result<Option<TaskRecord>, RemoteError> {
        let body = task.to_create();
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Create(body.clone()));
        inner.check(CallKind::Create, "POST")?;

        let id = inner.mint_id();
        let wire = TaskWire {
            store_id: Some(id),
            id: None,
            date: body.date,
            time: body.time,
            entity: body.entity,
            task: body.task,
            person: body.person,
            notes: body.notes,
            status: body.status,
        };
        inner.records.push(wire.clone());
        Ok(inner.echo.then(|| TaskRecord::from_wire(wire)))
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Update {
            id: id.to_string(),
            patch: patch.clone(),
        });
        inner.check(CallKind::Update, "PUT")?;
        if let Some(wire) = inner.records.iter_mut().find(|w| w.identity() == Some(id)) {
            patch.apply_to(wire);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Delete { id: id.to_string() });
        inner.check(CallKind::Delete, "DELETE")?;
        inner.records.retain(|w| w.identity() != Some(id));
        Ok(())
    }
}
