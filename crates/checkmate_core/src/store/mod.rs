//! Async task store facade with live queries.
//!
//! # Responsibility
//! - Own the single SQLite connection on a dedicated worker thread.
//! - Expose async mutations and reactive date / date-range queries.
//! - Notify live queries after every committed mutation.
//!
//! # Invariants
//! - Commands run on the worker strictly in submission order, so a query
//!   issued after a mutation returns always observes that mutation.
//! - Each table has its own revision counter; a mutation bumps the counter
//!   of every table it touched, only after it committed.
//! - Nothing is retried; failures surface to the caller as `StoreError`.

mod query;

pub use query::TaskQuery;

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::task::{Memo, TaskId, Todo};
use crate::repo::task_repo::{RepoError, SqliteTaskRepository, TaskRepository};
use chrono::NaiveDate;
use log::{debug, error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::{oneshot, watch};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store mutation or query.
#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// The worker thread is gone (store shut down or crashed).
    Closed,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Closed => write!(f, "task store is closed"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Closed => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tables {
    Todos,
    Memos,
    Both,
}

/// Per-table revision counters, bumped on the worker after each commit.
struct Revisions {
    todos: watch::Sender<u64>,
    memos: watch::Sender<u64>,
}

impl Revisions {
    fn bump(&self, tables: Tables) {
        if matches!(tables, Tables::Todos | Tables::Both) {
            self.todos.send_modify(|revision| *revision += 1);
        }
        if matches!(tables, Tables::Memos | Tables::Both) {
            self.memos.send_modify(|revision| *revision += 1);
        }
    }
}

struct StoreInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    revisions: Arc<Revisions>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if self.sender.send(DbCommand::Shutdown).is_err() {
                debug!("event=store_close module=store status=ok detail=worker_already_gone");
            }
            if handle.join().is_err() {
                error!("event=store_close module=store status=error error_code=worker_panicked");
            }
        }
    }
}

/// Shared handle to the task database. Cheap to clone.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

impl TaskStore {
    /// Opens (creating and migrating if needed) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path)?;
        Self::from_connection(conn)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Self::from_connection(conn)
    }

    /// Moves a migrated connection onto the worker thread.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();

        let worker = thread::Builder::new()
            .name("checkmate-db".into())
            .spawn(move || {
                let mut conn = conn;
                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }
                info!("event=store_close module=store status=ok");
            })
            .map_err(|err| {
                error!("event=store_open module=store status=error error_code=worker_spawn_failed error={err}");
                StoreError::Closed
            })?;

        let revisions = Arc::new(Revisions {
            todos: watch::channel(0u64).0,
            memos: watch::channel(0u64).0,
        });
        info!("event=store_open module=store status=ok");

        Ok(Self {
            inner: Arc::new(StoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
                revisions,
            }),
        })
    }

    /// Runs `task` on the worker connection and awaits its result.
    ///
    /// Dropping the returned future discards the result; the command itself
    /// still runs to completion on the worker.
    pub async fn execute<F, T>(&self, task: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                debug!("event=store_reply module=store status=discarded reason=caller_dropped");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|_| StoreError::Closed)?;

        reply_rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Stores a new todo and returns its id.
    pub async fn add_todo(&self, todo: Todo) -> StoreResult<TaskId> {
        let id = self
            .mutate(move |repo| Ok((repo.insert_todo(&todo)?, Some(Tables::Todos))))
            .await
            .inspect_err(|err| log_mutation_error("add_todo", err))?;
        debug!("event=task_add module=store status=ok kind=todo id={id}");
        Ok(id)
    }

    /// Stores a new memo and returns its id.
    pub async fn add_memo(&self, memo: Memo) -> StoreResult<TaskId> {
        let id = self
            .mutate(move |repo| Ok((repo.insert_memo(&memo)?, Some(Tables::Memos))))
            .await
            .inspect_err(|err| log_mutation_error("add_memo", err))?;
        debug!("event=task_add module=store status=ok kind=memo id={id}");
        Ok(id)
    }

    /// Flips completion of a todo. Unknown ids are a no-op.
    pub async fn toggle_todo(&self, id: TaskId) -> StoreResult<()> {
        self.mutate(move |repo| {
            let changed = repo.toggle_todo(id)?;
            Ok(((), changed.then_some(Tables::Todos)))
        })
        .await
        .inspect_err(|err| log_mutation_error("toggle_todo", err))
    }

    /// Full replace of the todo row with `todo.id` (last write wins).
    pub async fn update_todo(&self, todo: Todo) -> StoreResult<()> {
        self.mutate(move |repo| Ok((repo.update_todo(&todo)?, Some(Tables::Todos))))
            .await
            .inspect_err(|err| log_mutation_error("update_todo", err))
    }

    /// Full replace of the memo row with `memo.id` (last write wins).
    pub async fn update_memo(&self, memo: Memo) -> StoreResult<()> {
        self.mutate(move |repo| Ok((repo.update_memo(&memo)?, Some(Tables::Memos))))
            .await
            .inspect_err(|err| log_mutation_error("update_memo", err))
    }

    /// Deletes the task with this id, whichever kind it is.
    pub async fn delete_task(&self, id: TaskId) -> StoreResult<()> {
        let removed = self
            .mutate(move |repo| {
                let removed = repo.delete_task(id)?;
                Ok((removed, (removed > 0).then_some(Tables::Both)))
            })
            .await
            .inspect_err(|err| log_mutation_error("delete_task", err))?;
        debug!("event=task_delete module=store status=ok id={id} removed={removed}");
        Ok(())
    }

    /// Live list of tasks dated exactly `date`.
    pub fn tasks_for_date(&self, date: NaiveDate) -> TaskQuery {
        self.tasks_for_date_range(date, date)
    }

    /// Live list of tasks dated within `[start, end]`.
    ///
    /// `start > end` yields empty snapshots.
    pub fn tasks_for_date_range(&self, start: NaiveDate, end: NaiveDate) -> TaskQuery {
        TaskQuery::new(self.clone(), start, end)
    }

    /// Runs a repository call on the worker. When it succeeds and reports
    /// touched tables, their revisions are bumped before the reply is sent,
    /// so a caller dropping the future cannot leave live queries stale.
    async fn mutate<F, T>(&self, task: F) -> StoreResult<T>
    where
        F: FnOnce(&SqliteTaskRepository<'_>) -> Result<(T, Option<Tables>), RepoError>
            + Send
            + 'static,
        T: Send + 'static,
    {
        let revisions = Arc::clone(&self.inner.revisions);
        self.execute(move |conn| {
            let repo = SqliteTaskRepository::new(conn);
            let (value, touched) = task(&repo)?;
            if let Some(tables) = touched {
                revisions.bump(tables);
            }
            Ok(value)
        })
        .await
    }

    fn subscribe_revisions(&self) -> (watch::Receiver<u64>, watch::Receiver<u64>) {
        (
            self.inner.revisions.todos.subscribe(),
            self.inner.revisions.memos.subscribe(),
        )
    }
}

fn log_mutation_error(operation: &str, err: &StoreError) {
    error!("event=task_mutation module=store status=error op={operation} error={err}");
}
