use tracing::debug;

use crate::task::TaskRecord;

/// The two per-row dropdowns. Each is
/// its own at-most-one-open space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownKind {
    Status,
    Action,
}

impl DropdownKind {
    pub fn is_open(self, task: &TaskRecord) -> bool {
        match self {
            Self::Status => task.status_dropdown_open,
            Self::Action => task.action_dropdown_open,
        }
    }

    fn flag_mut(self, task: &mut TaskRecord) -> &mut bool {
        match self {
            Self::Status => &mut task.status_dropdown_open,
            Self::Action => &mut task.action_dropdown_open,
        }
    }
}

/// Flips `kind` on the row at `row` and closes it on every other row.
/// Returns the row's new state, or `None` when the row does not exist.
pub fn toggle_at(view: &mut [TaskRecord], kind: DropdownKind, row: usize) -> Option<bool> {
    let open = !kind.is_open(view.get(row)?);
    for (idx, task) in view.iter_mut().enumerate() {
        *kind.flag_mut(task) = idx == row && open;
    }
    debug!(?kind, row, open, "toggled dropdown");
    Some(open)
}

pub fn close_all(tasks: &mut [TaskRecord], kind: DropdownKind) {
    for task in tasks {
        *kind.flag_mut(task) = false;
    }
}

/// The row currently holding `kind` open, if any.
pub fn open_row(view: &[TaskRecord], kind: DropdownKind) -> Option<usize> {
    view.iter().position(|task| kind.is_open(task))
}

/// Copies the open state of `kind` from the view onto the canonical
/// collection so a later re-derivation shows the same row open. Rows
/// without an id cannot be matched and end up closed.
pub fn mirror(view: &[TaskRecord], canonical: &mut [TaskRecord], kind: DropdownKind) {
    let open_id = view
        .iter()
        .find(|task| kind.is_open(task))
        .and_then(|task| task.id.as_ref());
    for task in canonical {
        *kind.flag_mut(task) = open_id.is_some_and(|id| task.has_id(id));
    }
}
