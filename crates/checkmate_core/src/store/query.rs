//! Live date-range query over both task tables.
//!
//! A `TaskQuery` combines the latest todo rows with the latest memo rows:
//! whenever either table's revision moves, only that table is re-read, then
//! the merged list is re-sorted and emitted.

use super::{StoreResult, TaskStore};
use crate::model::task::{Memo, Task, Todo};
use crate::repo::task_repo::{merge_tasks, RepoError, SqliteTaskRepository, TaskRepository};
use chrono::NaiveDate;
use futures::Stream;
use log::{debug, error};
use tokio::sync::watch;

/// Per-table cache of the last rows read and the revision they reflect.
struct Source<T> {
    revisions: watch::Receiver<u64>,
    seen: Option<u64>,
    rows: Vec<T>,
}

impl<T> Source<T> {
    fn new(revisions: watch::Receiver<u64>) -> Self {
        Self {
            revisions,
            seen: None,
            rows: Vec::new(),
        }
    }

    /// Revision to read at, when this source is stale.
    fn stale_revision(&self) -> Option<u64> {
        let current = *self.revisions.borrow();
        (self.seen != Some(current)).then_some(current)
    }
}

/// Live, continuously updating list of tasks in a date range.
///
/// `next()` yields the current snapshot first, then one snapshot per
/// observable change. A storage fault is yielded once as `Err` and ends the
/// query. `next()` is cancel-safe: dropping it mid-read loses no update.
pub struct TaskQuery {
    store: TaskStore,
    start: NaiveDate,
    end: NaiveDate,
    todos: Source<Todo>,
    memos: Source<Memo>,
    last: Option<Vec<Task>>,
    finished: bool,
}

impl TaskQuery {
    pub(super) fn new(store: TaskStore, start: NaiveDate, end: NaiveDate) -> Self {
        let (todo_revisions, memo_revisions) = store.subscribe_revisions();
        Self {
            store,
            start,
            end,
            todos: Source::new(todo_revisions),
            memos: Source::new(memo_revisions),
            last: None,
            finished: false,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Waits for the next distinct snapshot.
    ///
    /// Returns `None` once the query has ended.
    pub async fn next(&mut self) -> Option<StoreResult<Vec<Task>>> {
        loop {
            if self.finished {
                return None;
            }

            if let Err(err) = self.refresh().await {
                error!(
                    "event=task_query module=store status=error start={} end={} error={}",
                    self.start, self.end, err
                );
                self.finished = true;
                return Some(Err(err));
            }

            let merged = merge_tasks(self.todos.rows.clone(), self.memos.rows.clone());
            if self.last.as_ref() != Some(&merged) {
                debug!(
                    "event=task_query module=store status=ok start={} end={} count={}",
                    self.start,
                    self.end,
                    merged.len()
                );
                self.last = Some(merged.clone());
                return Some(Ok(merged));
            }

            if !self.wait_for_change().await {
                self.finished = true;
            }
        }
    }

    /// Adapts this query into a `futures::Stream`.
    pub fn into_stream(self) -> impl Stream<Item = StoreResult<Vec<Task>>> + Send {
        futures::stream::unfold(self, |mut query| async move {
            query.next().await.map(|item| (item, query))
        })
    }

    /// Re-reads every table whose revision moved since it was last read.
    async fn refresh(&mut self) -> StoreResult<()> {
        let (start, end) = (self.start, self.end);

        if let Some(revision) = self.todos.stale_revision() {
            let rows = self
                .read(move |repo| repo.list_todos_in_range(start, end))
                .await?;
            self.todos.rows = rows;
            self.todos.seen = Some(revision);
        }

        if let Some(revision) = self.memos.stale_revision() {
            let rows = self
                .read(move |repo| repo.list_memos_in_range(start, end))
                .await?;
            self.memos.rows = rows;
            self.memos.seen = Some(revision);
        }

        Ok(())
    }

    async fn read<F, T>(&self, task: F) -> StoreResult<T>
    where
        F: FnOnce(&SqliteTaskRepository<'_>) -> Result<T, RepoError> + Send + 'static,
        T: Send + 'static,
    {
        self.store
            .mutate(move |repo| Ok((task(repo)?, None)))
            .await
    }

    /// Resolves when either table changes; `false` when the store is gone.
    async fn wait_for_change(&mut self) -> bool {
        let outcome = tokio::select! {
            changed = self.todos.revisions.changed() => changed,
            changed = self.memos.revisions.changed() => changed,
        };
        if outcome.is_err() {
            debug!("event=task_query module=store status=ok detail=store_closed");
            return false;
        }
        true
    }
}

impl std::fmt::Debug for TaskQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQuery")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("finished", &self.finished)
            .finish()
    }
}

