//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and date-range reads over the `todos` and `memos` tables.
//! - Allocate ids from the shared `task_ids` sequence.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Range reads are inclusive on both ends and ordered by `id DESC`.

use crate::db::DbError;
use crate::model::task::{
    from_epoch_day, sort_newest_first, to_epoch_day, Memo, Task, TaskId, TaskValidationError,
    Todo,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TODO_SELECT_SQL: &str = "SELECT id, title, date, is_completed FROM todos";
const MEMO_SELECT_SQL: &str = "SELECT id, title, content, date FROM memos";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for todo/memo persistence.
pub trait TaskRepository {
    /// Stores a new todo and returns its assigned id. The input id is ignored.
    fn insert_todo(&self, todo: &Todo) -> RepoResult<TaskId>;
    /// Stores a new memo and returns its assigned id. The input id is ignored.
    fn insert_memo(&self, memo: &Memo) -> RepoResult<TaskId>;
    /// Replaces every field of the todo row with `todo.id`.
    fn update_todo(&self, todo: &Todo) -> RepoResult<()>;
    /// Replaces every field of the memo row with `memo.id`.
    fn update_memo(&self, memo: &Memo) -> RepoResult<()>;
    /// Flips `is_completed`. Missing ids are a no-op; returns whether a row changed.
    fn toggle_todo(&self, id: TaskId) -> RepoResult<bool>;
    /// Deletes the row with this id from whichever table holds it.
    /// Returns the number of rows removed (0 or 1).
    fn delete_task(&self, id: TaskId) -> RepoResult<usize>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_todos_in_range(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<Todo>>;
    fn list_memos_in_range(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<Memo>>;

    /// Both kinds in `[start, end]`, merged and ordered newest first.
    fn list_tasks_in_range(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<Task>> {
        Ok(merge_tasks(
            self.list_todos_in_range(start, end)?,
            self.list_memos_in_range(start, end)?,
        ))
    }
}

/// Merges both kinds into one list ordered by descending id.
pub fn merge_tasks(todos: Vec<Todo>, memos: Vec<Memo>) -> Vec<Task> {
    let mut tasks: Vec<Task> = todos
        .into_iter()
        .map(Task::Todo)
        .chain(memos.into_iter().map(Task::Memo))
        .collect();
    sort_newest_first(&mut tasks);
    tasks
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn next_task_id(&self) -> RepoResult<TaskId> {
        self.conn.execute("INSERT INTO task_ids DEFAULT VALUES;", [])?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_todo(&self, todo: &Todo) -> RepoResult<TaskId> {
        todo.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let id = self.next_task_id()?;
        tx.execute(
            "INSERT INTO todos (id, title, date, is_completed) VALUES (?1, ?2, ?3, ?4);",
            params![
                id,
                todo.title.as_str(),
                to_epoch_day(todo.date),
                bool_to_int(todo.is_completed),
            ],
        )?;
        tx.commit()?;

        Ok(id)
    }

    fn insert_memo(&self, memo: &Memo) -> RepoResult<TaskId> {
        memo.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let id = self.next_task_id()?;
        tx.execute(
            "INSERT INTO memos (id, title, content, date) VALUES (?1, ?2, ?3, ?4);",
            params![
                id,
                memo.title.as_str(),
                memo.content.as_str(),
                to_epoch_day(memo.date),
            ],
        )?;
        tx.commit()?;

        Ok(id)
    }

    fn update_todo(&self, todo: &Todo) -> RepoResult<()> {
        todo.validate()?;

        let changed = self.conn.execute(
            "UPDATE todos
             SET
                title = ?1,
                date = ?2,
                is_completed = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4;",
            params![
                todo.title.as_str(),
                to_epoch_day(todo.date),
                bool_to_int(todo.is_completed),
                todo.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(todo.id));
        }
        Ok(())
    }

    fn update_memo(&self, memo: &Memo) -> RepoResult<()> {
        memo.validate()?;

        let changed = self.conn.execute(
            "UPDATE memos
             SET
                title = ?1,
                content = ?2,
                date = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4;",
            params![
                memo.title.as_str(),
                memo.content.as_str(),
                to_epoch_day(memo.date),
                memo.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(memo.id));
        }
        Ok(())
    }

    fn toggle_todo(&self, id: TaskId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET
                is_completed = 1 - is_completed,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;
        Ok(changed > 0)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM todos WHERE id = ?1;", [id])?
            + tx.execute("DELETE FROM memos WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(removed)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let todo = self
            .conn
            .query_row(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"), [id], |row| {
                Ok(parse_todo_row(row))
            })
            .optional()?
            .transpose()?;
        if let Some(todo) = todo {
            return Ok(Some(Task::Todo(todo)));
        }

        let memo = self
            .conn
            .query_row(&format!("{MEMO_SELECT_SQL} WHERE id = ?1;"), [id], |row| {
                Ok(parse_memo_row(row))
            })
            .optional()?
            .transpose()?;
        Ok(memo.map(Task::Memo))
    }

    fn list_todos_in_range(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<Todo>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{TODO_SELECT_SQL} WHERE date BETWEEN ?1 AND ?2 ORDER BY id DESC;"
        ))?;
        let mut rows = stmt.query(params![to_epoch_day(start), to_epoch_day(end)])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn list_memos_in_range(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<Memo>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{MEMO_SELECT_SQL} WHERE date BETWEEN ?1 AND ?2 ORDER BY id DESC;"
        ))?;
        let mut rows = stmt.query(params![to_epoch_day(start), to_epoch_day(end)])?;
        let mut memos = Vec::new();
        while let Some(row) = rows.next()? {
            memos.push(parse_memo_row(row)?);
        }
        Ok(memos)
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id: TaskId = row.get("id")?;
    let is_completed = match row.get::<_, i64>("is_completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_completed value `{other}` in todos.is_completed (id={id})"
            )));
        }
    };

    Ok(Todo {
        id,
        title: row.get("title")?,
        date: parse_date(row, "todos", id)?,
        is_completed,
    })
}

fn parse_memo_row(row: &Row<'_>) -> RepoResult<Memo> {
    let id: TaskId = row.get("id")?;
    Ok(Memo {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        date: parse_date(row, "memos", id)?,
    })
}

fn parse_date(row: &Row<'_>, table: &str, id: TaskId) -> RepoResult<NaiveDate> {
    let epoch_day: i64 = row.get("date")?;
    from_epoch_day(epoch_day).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid epoch day `{epoch_day}` in {table}.date (id={id})"
        ))
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
