use std::str::FromStr;

use tracing::trace;

use crate::error::FieldError;
use crate::task::{
  TaskKind,
  TaskRecord
};

/// One checkbox of the task-type
/// filter menu.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum KindFlag {
  All,
  Call,
  Meeting,
  VideoCall
}

impl FromStr for KindFlag {
  type Err = FieldError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let key: String = s
      .chars()
      .filter(|c| {
        !matches!(c, ' ' | '-' | '_')
      })
      .flat_map(char::to_lowercase)
      .collect();
    match key.as_str() {
      | "all" => Ok(Self::All),
      | "call" => Ok(Self::Call),
      | "meeting" => Ok(Self::Meeting),
      | "videocall" => {
        Ok(Self::VideoCall)
      }
      | _ => Err(
        FieldError::UnknownKindFlag(
          s.to_string()
        )
      )
    }
  }
}

/// Task-type selector. "All" is
/// exclusive with the specific kinds
/// when set through [`select`] or
/// [`toggle`]; raw [`set`] can produce
/// any combination and matching stays
/// well defined for all of them.
///
/// [`select`]: TaskSelector::select
/// [`toggle`]: TaskSelector::toggle
/// [`set`]: TaskSelector::set
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct TaskSelector {
  pub all:        bool,
  pub call:       bool,
  pub meeting:    bool,
  pub video_call: bool
}

impl Default for TaskSelector {
  fn default() -> Self {
    Self::all()
  }
}

impl TaskSelector {
  pub fn all() -> Self {
    Self {
      all:        true,
      call:       false,
      meeting:    false,
      video_call: false
    }
  }

  pub fn none() -> Self {
    Self {
      all:        false,
      call:       false,
      meeting:    false,
      video_call: false
    }
  }

  pub fn only(flag: KindFlag) -> Self {
    let mut selector = Self::none();
    selector.select(flag);
    selector
  }

  pub fn is_set(
    &self,
    flag: KindFlag
  ) -> bool {
    match flag {
      | KindFlag::All => self.all,
      | KindFlag::Call => self.call,
      | KindFlag::Meeting => self.meeting,
      | KindFlag::VideoCall => {
        self.video_call
      }
    }
  }

  pub fn set(
    &mut self,
    flag: KindFlag,
    value: bool
  ) {
    match flag {
      | KindFlag::All => self.all = value,
      | KindFlag::Call => {
        self.call = value
      }
      | KindFlag::Meeting => {
        self.meeting = value
      }
      | KindFlag::VideoCall => {
        self.video_call = value
      }
    }
  }

  /// Checks a box. Checking "All"
  /// clears the specific kinds; checking
  /// a specific kind clears "All".
  pub fn select(
    &mut self,
    flag: KindFlag
  ) {
    if flag == KindFlag::All {
      *self = Self::all();
      return;
    }
    self.all = false;
    self.set(flag, true);
  }

  /// Flips a box. Unchecking leaves the
  /// others alone, so unchecking the
  /// last one yields the empty selector.
  pub fn toggle(
    &mut self,
    flag: KindFlag
  ) {
    if self.is_set(flag) {
      self.set(flag, false);
    } else {
      self.select(flag);
    }
  }

  pub fn matches(
    &self,
    kind: &TaskKind
  ) -> bool {
    if self.all {
      return true;
    }
    match kind {
      | TaskKind::Call => self.call,
      | TaskKind::Meeting => self.meeting,
      | TaskKind::VideoCall => {
        self.video_call
      }
      | TaskKind::Other(_) => false
    }
  }
}

/// Case-insensitive substring match
/// over every text field. `needle` must
/// already be lowercased.
fn matches_query(
  task: &TaskRecord,
  needle: &str
) -> bool {
  if needle.is_empty() {
    return true;
  }
  task.text_fields().iter().any(|field| {
    field.to_lowercase().contains(needle)
  })
}

/// Derives the filtered view. Pure and
/// order-preserving.
pub fn filter(
  tasks: &[TaskRecord],
  query: &str,
  selector: &TaskSelector
) -> Vec<TaskRecord> {
  let needle = query.to_lowercase();

  let out: Vec<TaskRecord> = tasks
    .iter()
    .filter(|task| {
      selector.matches(&task.task)
        && matches_query(task, &needle)
    })
    .cloned()
    .collect();

  trace!(
    total = tasks.len(),
    kept = out.len(),
    query,
    ?selector,
    "filtered tasks"
  );
  out
}
