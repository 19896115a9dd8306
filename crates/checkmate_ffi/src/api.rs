//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose todo/memo use-cases to Dart via FRB as sync calls.
//! - Convert every core error into a response envelope message.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Dates cross the boundary as ISO `YYYY-MM-DD` strings.
//! - Live queries stay in core; FFI calls return one-shot snapshots.

use checkmate_core::db::open_db;
use checkmate_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Memo, RepoError, SqliteTaskRepository, Task, TaskId, TaskRepository, Todo, WeekOutOfRange,
    WeekTaskMap, WeekWindow,
};
use chrono::NaiveDate;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_FILE_NAME: &str = "checkmate.sqlite3";
const DB_PATH_ENV: &str = "CHECKMATE_DB_PATH";
const DATE_FORMAT: &str = "%Y-%m-%d";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling logs.
/// - Idempotent for the same `level + log_dir`; other combinations fail.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One todo or memo as seen by Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: i64,
    /// `todo` or `memo`.
    pub kind: String,
    pub title: String,
    /// Memo body; `None` for todos.
    pub content: Option<String>,
    /// ISO date.
    pub date: String,
    /// Completion flag; `None` for memos.
    pub is_completed: Option<bool>,
}

/// Tasks of one day, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTasks {
    pub date: String,
    pub items: Vec<TaskItem>,
}

/// Seven Monday-first day buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekTasksResponse {
    pub ok: bool,
    /// Monday of the week, empty on failure.
    pub monday: String,
    pub days: Vec<DayTasks>,
    pub message: String,
}

/// Flat task list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasksResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Generic mutation envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the created task, when the call creates one.
    pub task_id: Option<i64>,
    /// Number of rows moved by `move_incomplete_todos`.
    pub affected: u32,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            task_id: None,
            affected: 0,
            message: message.into(),
        }
    }

    fn created(message: impl Into<String>, task_id: TaskId) -> Self {
        Self {
            task_id: Some(task_id),
            affected: 1,
            ..Self::success(message)
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task_id: None,
            affected: 0,
            message: message.into(),
        }
    }
}

/// Returns the Monday-anchored week containing `date`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Always seven `days` on success.
#[flutter_rust_bridge::frb(sync)]
pub fn week_tasks(date: String) -> WeekTasksResponse {
    let result = parse_date(&date).and_then(|anchor| {
        let window = WeekWindow::try_containing(anchor)?;
        with_repo(|repo| repo.list_tasks_in_range(window.monday, window.sunday))
            .map(|tasks| WeekTaskMap::bucket(window, tasks))
    });

    match result {
        Ok(map) => WeekTasksResponse {
            ok: true,
            monday: format_date(map.window().monday),
            days: map
                .iter()
                .map(|(day, tasks)| DayTasks {
                    date: format_date(day),
                    items: tasks.iter().map(to_task_item).collect(),
                })
                .collect(),
            message: String::new(),
        },
        Err(err) => WeekTasksResponse {
            ok: false,
            monday: String::new(),
            days: Vec::new(),
            message: format!("week_tasks failed: {err}"),
        },
    }
}

/// Returns tasks dated exactly `date`, newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_for_date(date: String) -> TasksResponse {
    let result = parse_date(&date)
        .and_then(|day| with_repo(|repo| repo.list_tasks_in_range(day, day)));
    match result {
        Ok(tasks) => TasksResponse {
            ok: true,
            items: tasks.iter().map(to_task_item).collect(),
            message: String::new(),
        },
        Err(err) => TasksResponse {
            ok: false,
            items: Vec::new(),
            message: format!("tasks_for_date failed: {err}"),
        },
    }
}

/// Creates an incomplete todo on `date`.
#[flutter_rust_bridge::frb(sync)]
pub fn add_todo(title: String, date: String) -> ActionResponse {
    let result = parse_date(&date).and_then(|day| {
        let todo = Todo::new(title.trim(), day);
        with_repo(|repo| repo.insert_todo(&todo))
    });
    match result {
        Ok(id) => ActionResponse::created("Todo created.", id),
        Err(err) => ActionResponse::failure(format!("add_todo failed: {err}")),
    }
}

/// Creates a memo on `date`.
#[flutter_rust_bridge::frb(sync)]
pub fn add_memo(title: String, content: String, date: String) -> ActionResponse {
    let result = parse_date(&date).and_then(|day| {
        let memo = Memo::new(title.trim(), content, day);
        with_repo(|repo| repo.insert_memo(&memo))
    });
    match result {
        Ok(id) => ActionResponse::created("Memo created.", id),
        Err(err) => ActionResponse::failure(format!("add_memo failed: {err}")),
    }
}

/// Flips a todo's completion. Unknown ids succeed without effect.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_todo(id: i64) -> ActionResponse {
    match with_repo(|repo| repo.toggle_todo(id)) {
        Ok(true) => ActionResponse::success("Todo updated."),
        Ok(false) => ActionResponse::success("Nothing to update."),
        Err(err) => ActionResponse::failure(format!("toggle_todo failed: {err}")),
    }
}

/// Full replace of a todo.
#[flutter_rust_bridge::frb(sync)]
pub fn update_todo(id: i64, title: String, date: String, is_completed: bool) -> ActionResponse {
    let result = parse_date(&date).and_then(|day| {
        let todo = Todo {
            id,
            title: title.trim().to_string(),
            date: day,
            is_completed,
        };
        with_repo(|repo| repo.update_todo(&todo))
    });
    match result {
        Ok(()) => ActionResponse::success("Todo updated."),
        Err(err) => ActionResponse::failure(format!("update_todo failed: {err}")),
    }
}

/// Full replace of a memo.
#[flutter_rust_bridge::frb(sync)]
pub fn update_memo(id: i64, title: String, content: String, date: String) -> ActionResponse {
    let result = parse_date(&date).and_then(|day| {
        let memo = Memo {
            id,
            title: title.trim().to_string(),
            content,
            date: day,
        };
        with_repo(|repo| repo.update_memo(&memo))
    });
    match result {
        Ok(()) => ActionResponse::success("Memo updated."),
        Err(err) => ActionResponse::failure(format!("update_memo failed: {err}")),
    }
}

/// Deletes the todo or memo with `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_task(id: i64) -> ActionResponse {
    match with_repo(|repo| repo.delete_task(id)) {
        Ok(removed) => ActionResponse {
            affected: u32::try_from(removed).unwrap_or(u32::MAX),
            ..ActionResponse::success("Item deleted.")
        },
        Err(err) => ActionResponse::failure(format!("delete_task failed: {err}")),
    }
}

/// Re-dates every incomplete todo of `from` to `to`.
///
/// # FFI contract
/// - Each todo is updated independently; on failure `affected` reports how
///   many were already moved.
#[flutter_rust_bridge::frb(sync)]
pub fn move_incomplete_todos(from: String, to: String) -> ActionResponse {
    let dates = parse_date(&from).and_then(|from| Ok((from, parse_date(&to)?)));
    let (from, to) = match dates {
        Ok(dates) => dates,
        Err(err) => return ActionResponse::failure(format!("move_incomplete_todos failed: {err}")),
    };

    let outcome = with_repo(|repo| {
        let pending: Vec<Todo> = repo
            .list_todos_in_range(from, from)?
            .into_iter()
            .filter(|todo| !todo.is_completed)
            .collect();
        let mut moved = 0u32;
        for todo in pending {
            if let Err(err) = repo.update_todo(&Todo { date: to, ..todo }) {
                return Ok(Err((moved, err)));
            }
            moved += 1;
        }
        Ok(Ok(moved))
    });

    match outcome {
        Ok(Ok(moved)) => {
            info!("event=ffi_move module=ffi status=ok moved={moved}");
            ActionResponse {
                affected: moved,
                ..ActionResponse::success(format!("Moved {moved} todo(s)."))
            }
        }
        Ok(Err((moved, err))) => {
            warn!("event=ffi_move module=ffi status=error moved={moved}");
            ActionResponse {
                affected: moved,
                ..ActionResponse::failure(format!("move_incomplete_todos failed: {err}"))
            }
        }
        Err(err) => ActionResponse::failure(format!("move_incomplete_todos failed: {err}")),
    }
}

#[derive(Debug)]
enum CallError {
    InvalidDate(String),
    OutOfRange(WeekOutOfRange),
    Repo(RepoError),
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(raw) => write!(f, "invalid date `{raw}`; expected YYYY-MM-DD"),
            Self::OutOfRange(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl From<WeekOutOfRange> for CallError {
    fn from(value: WeekOutOfRange) -> Self {
        Self::OutOfRange(value)
    }
}

impl From<RepoError> for CallError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, CallError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| CallError::InvalidDate(raw.to_string()))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_repo<T>(
    f: impl FnOnce(&SqliteTaskRepository<'_>) -> Result<T, RepoError>,
) -> Result<T, CallError> {
    let conn = open_db(resolve_db_path()).map_err(RepoError::from)?;
    let repo = SqliteTaskRepository::new(&conn);
    Ok(f(&repo)?)
}

fn to_task_item(task: &Task) -> TaskItem {
    match task {
        Task::Todo(todo) => TaskItem {
            id: todo.id,
            kind: "todo".to_string(),
            title: todo.title.clone(),
            content: None,
            date: format_date(todo.date),
            is_completed: Some(todo.is_completed),
        },
        Task::Memo(memo) => TaskItem {
            id: memo.id,
            kind: "memo".to_string(),
            title: memo.title.clone(),
            content: Some(memo.content.clone()),
            date: format_date(memo.date),
            is_completed: None,
        },
    }
}
