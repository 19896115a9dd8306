//! Week aggregation use-case.
//!
//! # Responsibility
//! - Turn "the date the user is looking at" into live seven-day buckets.
//!
//! # Invariants
//! - Every emitted map covers the Monday..Sunday window of the anchor.
//! - Store failures propagate unchanged; there is no local recovery.

use crate::store::{StoreResult, TaskQuery, TaskStore};
use crate::week::{WeekOutOfRange, WeekTaskMap, WeekWindow};
use chrono::NaiveDate;
use futures::Stream;

/// Live per-day task buckets for one week.
#[derive(Debug)]
pub struct WeekTaskQuery {
    window: WeekWindow,
    range: TaskQuery,
}

impl WeekTaskQuery {
    pub fn window(&self) -> WeekWindow {
        self.window
    }

    /// Waits for the next bucketed snapshot; `None` once the source ended.
    pub async fn next(&mut self) -> Option<StoreResult<WeekTaskMap>> {
        let window = self.window;
        self.range
            .next()
            .await
            .map(|result| result.map(|tasks| WeekTaskMap::bucket(window, tasks)))
    }

    pub fn into_stream(self) -> impl Stream<Item = StoreResult<WeekTaskMap>> + Send {
        futures::stream::unfold(self, |mut query| async move {
            query.next().await.map(|item| (item, query))
        })
    }
}

/// Subscribes to the week containing `anchor`.
///
/// # Errors
/// [`WeekOutOfRange`] when the anchor's week runs past the calendar range;
/// no query is started in that case.
pub fn week_tasks(
    store: &TaskStore,
    anchor: NaiveDate,
) -> Result<WeekTaskQuery, WeekOutOfRange> {
    Ok(subscribe_window(store, WeekWindow::try_containing(anchor)?))
}

/// Subscribes to an already computed window.
pub fn subscribe_window(store: &TaskStore, window: WeekWindow) -> WeekTaskQuery {
    WeekTaskQuery {
        window,
        range: store.tasks_for_date_range(window.monday, window.sunday),
    }
}
