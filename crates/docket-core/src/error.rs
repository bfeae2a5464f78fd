use thiserror::Error;

use crate::task::TaskId;

/// Failure of a call to the remote task
/// store. Always terminal for that call.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("{method} {url} failed: {source}")]
  Transport {
    method: &'static str,
    url:    String,
    #[source]
    source: reqwest::Error
  },

  #[error("{method} {url} returned HTTP {status}")]
  Status {
    method: &'static str,
    url:    String,
    status: u16
  },

  #[error("could not decode response from {url}: {detail}")]
  Decode {
    url:    String,
    detail: String
  },

  #[error("invalid remote URL {url}")]
  InvalidUrl { url: String }
}

/// Failure of a board operation. The
/// canonical collection is unchanged
/// whenever one of these is returned.
#[derive(Debug, Error)]
pub enum MutationError {
  #[error("cannot {op}: task has no store-assigned id")]
  MissingIdentity { op: &'static str },

  #[error("no task {id} in the current view")]
  NotFound { id: TaskId },

  #[error("no row {row} in the current view")]
  NoSuchRow { row: usize },

  #[error("cannot {op}: the form is not open")]
  SessionClosed { op: &'static str },

  #[error(transparent)]
  Remote(#[from] RemoteError)
}

impl MutationError {
  pub fn is_remote(&self) -> bool {
    matches!(self, Self::Remote(_))
  }
}

/// Rejected user input for a task field
/// or a filter flag.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
  #[error("unknown field '{0}' (expected date, time, entity, task, person, notes or status)")]
  UnknownField(String),

  #[error("invalid status '{0}' (expected Open or Closed)")]
  InvalidStatus(String),

  #[error("unknown task filter '{0}' (expected all, call, meeting or video-call)")]
  UnknownKindFlag(String)
}
