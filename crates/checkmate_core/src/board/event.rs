//! Board intents, one-shot notifications and reducer effects.

use super::state::SheetTag;
use crate::model::task::{Task, TaskId, Todo};
use crate::week::WeekWindow;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Closed set of user intents accepted by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    ChangeSelectedDate(NaiveDate),
    JumpToToday,
    /// Same weekday, one week earlier.
    PreviousWeek,
    /// Same weekday, one week later.
    NextWeek,
    ToggleTodo(TaskId),
    DeleteTask(TaskId),
    /// `date: None` saves on the selected date.
    SaveNewTodo {
        title: String,
        date: Option<NaiveDate>,
    },
    SaveNewMemo {
        title: String,
        content: String,
        date: Option<NaiveDate>,
    },
    UpdateTodoTitle {
        id: TaskId,
        title: String,
    },
    UpdateMemo {
        id: TaskId,
        title: String,
        content: String,
    },
    RequestMoveIncompleteTodos,
    ConfirmMoveIncompleteTodos,
    ExpandFab,
    CollapseFab,
    OpenSheet(SheetTag),
    CloseSheet,
    CloseDialog,
}

/// One-shot message for the UI (snackbar/toast). Never replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    TitleRequired,
    TaskDeleted,
    TodosMoved { count: usize },
    SaveFailed,
    ToggleFailed,
    DeleteFailed,
    UpdateFailed,
    MoveFailed { moved: usize, failed: usize },
    LoadFailed,
}

impl Notification {
    pub fn message(&self) -> &'static str {
        match self {
            Self::TitleRequired => "Please enter a title.",
            Self::TaskDeleted => "Item deleted.",
            Self::TodosMoved { .. } => "Moved unfinished todos to today.",
            Self::SaveFailed => "Could not save.",
            Self::ToggleFailed => "Could not update the todo.",
            Self::DeleteFailed => "Could not delete.",
            Self::UpdateFailed => "Could not save changes.",
            Self::MoveFailed { .. } => "Could not move todos.",
            Self::LoadFailed => "Could not load tasks.",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            Self::TaskDeleted | Self::TodosMoved { .. }
        )
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// The single I/O step a transition asks the controller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Replace the week subscription.
    Subscribe(WeekWindow),
    Notify(Notification),
    Toggle(TaskId),
    Delete(TaskId),
    /// Persist a new task (id is the unsaved sentinel).
    Create(Task),
    /// Full replace of an existing task.
    Update(Task),
    /// Re-date each todo to `to`, one update per todo.
    Move { todos: Vec<Todo>, to: NaiveDate },
}
