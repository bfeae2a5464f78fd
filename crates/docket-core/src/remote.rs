//! The remote task store, seen as four calls.
//!
//! [`HttpRemote`] talks to the REST resource; [`MemoryRemote`] keeps the
//! records in process and records every call, for tests.
//! Both speak [`TaskRecord`]; wire shapes stay inside the implementations.

mod http;
mod memory;

use async_trait::async_trait;
use docket_shared::TaskPatch;

pub use http::HttpRemote;
pub use memory::{CallKind, MemoryRemote, RemoteCall};

use crate::error::RemoteError;
use crate::task::TaskRecord;

#[async_trait]
pub trait TaskRemote: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<TaskRecord>, RemoteError>;

    /// Returns the store's echo of the created record when it could be
    /// decoded. A missing echo is not a failure.
    async fn create(&self, task: &TaskRecord) -> Result<Option<TaskRecord>, RemoteError>;

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<(), RemoteError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}
