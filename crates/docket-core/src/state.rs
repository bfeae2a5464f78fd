use tracing::{debug, trace};

use crate::filter::{TaskSelector, filter};
use crate::task::{TaskId, TaskRecord};
use crate::toggle::{self, DropdownKind};

/// The canonical collection plus the view derived from it. Every
/// canonical mutation goes through a method here and ends with
/// [`BoardState::refresh`], except removal, which edits both sides in
/// place so local-only rows survive a delete.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    canonical: Vec<TaskRecord>,
    filtered: Vec<TaskRecord>,
    query: String,
    selector: TaskSelector,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonical(&self) -> &[TaskRecord] {
        &self.canonical
    }

    pub fn filtered(&self) -> &[TaskRecord] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selector(&self) -> TaskSelector {
        self.selector
    }

    pub fn find(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.canonical.iter().find(|task| task.has_id(id))
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.refresh();
    }

    pub fn set_selector(&mut self, selector: TaskSelector) {
        self.selector = selector;
        self.refresh();
    }

    /// Re-runs the filter over the canonical collection into a new view.
    pub fn refresh(&mut self) {
        self.filtered = filter(&self.canonical, &self.query, &self.selector);
        trace!(
            canonical = self.canonical.len(),
            filtered = self.filtered.len(),
            "view re-derived"
        );
    }

    /// Full replace after a fetch. Open dropdowns do not carry over.
    pub fn replace_all(&mut self, mut tasks: Vec<TaskRecord>) {
        for task in &mut tasks {
            task.close_dropdowns();
        }
        debug!(count = tasks.len(), "replaced canonical collection");
        self.canonical = tasks;
        self.refresh();
    }

    pub fn append(&mut self, task: TaskRecord) {
        self.canonical.push(task);
        self.refresh();
    }

    /// Swaps the record with the same id for `task`. Returns false, and
    /// leaves the collection alone, when no record matches.
    pub fn replace(&mut self, task: TaskRecord) -> bool {
        let Some(id) = task.id.clone() else {
            return false;
        };
        let Some(slot) = self.canonical.iter_mut().find(|t| t.has_id(&id)) else {
            return false;
        };
        *slot = task;
        self.refresh();
        true
    }

    pub fn patch<F>(&mut self, id: &TaskId, apply: F) -> bool
    where
        F: FnOnce(&mut TaskRecord),
    {
        let Some(task) = self.canonical.iter_mut().find(|t| t.has_id(id)) else {
            return false;
        };
        apply(task);
        self.refresh();
        true
    }

    /// Drops the record from both collections. Returns whether the
    /// canonical collection held it.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let before = self.canonical.len();
        self.canonical.retain(|task| !task.has_id(id));
        self.filtered.retain(|task| !task.has_id(id));
        before != self.canonical.len()
    }

    /// Appends a copy of the view row under a fresh local id. Only the
    /// view changes.
    pub fn duplicate_row(&mut self, row: usize) -> Option<TaskId> {
        let copy = self.filtered.get(row)?.duplicate();
        let id = copy.id.clone();
        self.filtered.push(copy);
        id
    }

    pub fn toggle_dropdown(&mut self, kind: DropdownKind, row: usize) -> Option<bool> {
        let open = toggle::toggle_at(&mut self.filtered, kind, row)?;
        toggle::mirror(&self.filtered, &mut self.canonical, kind);
        Some(open)
    }

    pub fn close_dropdowns(&mut self, kind: DropdownKind) {
        toggle::close_all(&mut self.filtered, kind);
        toggle::close_all(&mut self.canonical, kind);
    }

    pub fn position_in_view(&self, id: &TaskId) -> Option<usize> {
        self.filtered.iter().position(|task| task.has_id(id))
    }
}
