//! Immutable board snapshot published to the UI.

use crate::model::task::{Memo, Task, TaskId, Todo};
use crate::week::{WeekOutOfRange, WeekTaskMap, WeekWindow};
use chrono::NaiveDate;
use serde::Serialize;

/// Open/closed state of a modal surface carrying an opaque tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "tag", rename_all = "snake_case")]
pub enum ModalState<T> {
    Closed,
    Opened(T),
}

impl<T> ModalState<T> {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Opened(_))
    }

    pub fn tag(&self) -> Option<&T> {
        match self {
            Self::Opened(tag) => Some(tag),
            Self::Closed => None,
        }
    }
}

impl<T> Default for ModalState<T> {
    fn default() -> Self {
        Self::Closed
    }
}

/// Which input sheet is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "sheet", rename_all = "snake_case")]
pub enum SheetTag {
    NewTodo { date: NaiveDate },
    NewMemo { date: NaiveDate },
    EditTodo { todo: Todo },
    EditMemo { memo: Memo },
}

/// Which confirmation dialog is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogTag {
    MoveIncompleteTodos,
}

/// Everything the UI needs to render the week board.
///
/// # Invariants
/// - `current_week.contains(selected_date)` after every transition.
/// - `week_tasks`, when present, may still belong to the previous week
///   until the new subscription emits; see [`BoardState::week_is_current`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardState {
    /// Clock date captured when the board was created.
    pub today: NaiveDate,
    pub selected_date: NaiveDate,
    pub current_week: WeekWindow,
    pub week_tasks: Option<WeekTaskMap>,
    pub is_loading: bool,
    pub is_fab_expanded: bool,
    pub sheet: ModalState<SheetTag>,
    pub dialog: ModalState<DialogTag>,
    /// Set when the week query failed. The failed query is dropped, and it
    /// is only replaced when the selection moves to a different week, so the
    /// UI has to navigate away (and back) to retry the load.
    pub load_error: Option<String>,
}

impl BoardState {
    /// Fails when `today` has no complete week in the calendar range.
    pub fn new(today: NaiveDate) -> Result<Self, WeekOutOfRange> {
        Ok(Self {
            today,
            selected_date: today,
            current_week: WeekWindow::try_containing(today)?,
            week_tasks: None,
            is_loading: false,
            is_fab_expanded: false,
            sheet: ModalState::Closed,
            dialog: ModalState::Closed,
            load_error: None,
        })
    }

    pub fn current_week_monday(&self) -> NaiveDate {
        self.current_week.monday
    }

    /// Whether the loaded buckets belong to `current_week`.
    pub fn week_is_current(&self) -> bool {
        self.week_tasks
            .as_ref()
            .is_some_and(|map| map.window() == self.current_week)
    }

    /// Tasks of the selected day, newest first. Empty while the week loads.
    pub fn selected_tasks(&self) -> &[Task] {
        match &self.week_tasks {
            Some(map) if map.window() == self.current_week => map.tasks_on(self.selected_date),
            _ => &[],
        }
    }

    pub fn show_loading_indicator(&self) -> bool {
        self.is_loading || (!self.week_is_current() && self.selected_tasks().is_empty())
    }

    pub fn find_todo(&self, id: TaskId) -> Option<&Todo> {
        self.find_task(id).and_then(Task::as_todo)
    }

    pub fn find_memo(&self, id: TaskId) -> Option<&Memo> {
        self.find_task(id).and_then(Task::as_memo)
    }

    fn find_task(&self, id: TaskId) -> Option<&Task> {
        self.week_tasks.as_ref().and_then(|map| map.find(id))
    }

    /// Moves the selection. Returns the new window when the week changed.
    ///
    /// The state is left untouched when `date` has no complete week.
    pub(crate) fn select_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<WeekWindow>, WeekOutOfRange> {
        if self.current_week.contains(date) {
            self.selected_date = date;
            return Ok(None);
        }
        let window = WeekWindow::try_containing(date)?;
        self.selected_date = date;
        self.current_week = window;
        Ok(Some(window))
    }

    /// Installs freshly emitted buckets. Stale windows are ignored.
    pub(crate) fn apply_week(&mut self, map: WeekTaskMap) -> bool {
        if map.window() != self.current_week {
            return false;
        }
        self.week_tasks = Some(map);
        self.load_error = None;
        true
    }
}
