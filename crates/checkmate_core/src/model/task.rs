//! Task domain model.
//!
//! # Responsibility
//! - Define the two dated record kinds (todo, memo) and their union `Task`.
//! - Provide validation used by every repository write path.
//! - Convert calendar dates to and from the persisted epoch-day form.
//!
//! # Invariants
//! - `id == NEW_TASK_ID` means "not yet persisted"; the store assigns ids.
//! - Ids come from one shared sequence, so they are unique across both kinds.
//! - A persisted task always has a non-blank title.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Numeric task identifier shared by todos and memos.
pub type TaskId = i64;

/// Sentinel id for a task that has not been stored yet.
pub const NEW_TASK_ID: TaskId = 0;

const EPOCH_DAY_ZERO_FROM_CE: i64 = 719_163;

/// Discriminant for the two task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Todo,
    Memo,
}

/// A dated task with a completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TaskId,
    pub title: String,
    pub date: NaiveDate,
    pub is_completed: bool,
}

impl Todo {
    /// Creates an unsaved, incomplete todo.
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: NEW_TASK_ID,
            title: title.into(),
            date,
            is_completed: false,
        }
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_title(&self.title)
    }
}

/// A dated free-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub id: TaskId,
    pub title: String,
    /// May be empty.
    pub content: String,
    pub date: NaiveDate,
}

impl Memo {
    /// Creates an unsaved memo.
    pub fn new(title: impl Into<String>, content: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: NEW_TASK_ID,
            title: title.into(),
            content: content.into(),
            date,
        }
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_title(&self.title)
    }
}

/// Union of the two task kinds, as shown in day lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    Todo(Todo),
    Memo(Memo),
}

impl Task {
    pub fn id(&self) -> TaskId {
        match self {
            Self::Todo(todo) => todo.id,
            Self::Memo(memo) => memo.id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Todo(todo) => todo.date,
            Self::Memo(memo) => memo.date,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Todo(todo) => todo.title.as_str(),
            Self::Memo(memo) => memo.title.as_str(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Todo(_) => TaskKind::Todo,
            Self::Memo(_) => TaskKind::Memo,
        }
    }

    /// Returns the todo payload when this task is a todo.
    pub fn as_todo(&self) -> Option<&Todo> {
        match self {
            Self::Todo(todo) => Some(todo),
            Self::Memo(_) => None,
        }
    }

    pub fn as_memo(&self) -> Option<&Memo> {
        match self {
            Self::Todo(_) => None,
            Self::Memo(memo) => Some(memo),
        }
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        match self {
            Self::Todo(todo) => todo.validate(),
            Self::Memo(memo) => memo.validate(),
        }
    }
}

impl From<Todo> for Task {
    fn from(value: Todo) -> Self {
        Self::Todo(value)
    }
}

impl From<Memo> for Task {
    fn from(value: Memo) -> Self {
        Self::Memo(value)
    }
}

/// Sorts tasks in display order: highest (most recent) id first.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| right.id().cmp(&left.id()));
}

/// Validation errors for task write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    BlankTitle,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task title must not be blank"),
        }
    }
}

impl Error for TaskValidationError {}

/// Whether `title` is empty once surrounding whitespace is trimmed.
pub fn is_blank_title(title: &str) -> bool {
    title.trim().is_empty()
}

fn validate_title(title: &str) -> Result<(), TaskValidationError> {
    if is_blank_title(title) {
        return Err(TaskValidationError::BlankTitle);
    }
    Ok(())
}

/// Converts a date to days since 1970-01-01 (the persisted column form).
pub fn to_epoch_day(date: NaiveDate) -> i64 {
    i64::from(chrono::Datelike::num_days_from_ce(&date)) - EPOCH_DAY_ZERO_FROM_CE
}

/// Inverse of [`to_epoch_day`]. Returns `None` when out of chrono's range.
pub fn from_epoch_day(epoch_day: i64) -> Option<NaiveDate> {
    let days_from_ce = i32::try_from(epoch_day + EPOCH_DAY_ZERO_FROM_CE).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days_from_ce)
}
