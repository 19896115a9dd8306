//! Monday-anchored week windows and per-day task buckets.
//!
//! # Invariants
//! - `WeekWindow::monday` is always a Monday and `sunday == monday + 6`.
//! - A `WeekTaskMap` has exactly seven entries, one per day of its window,
//!   each ordered by descending task id.

use crate::model::task::{sort_newest_first, Task, TaskId};
use chrono::{Datelike, Days, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DAYS_PER_WEEK: u64 = 7;

/// Inclusive Monday..Sunday span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekWindow {
    pub monday: NaiveDate,
    pub sunday: NaiveDate,
}

/// The requested week does not fit in the supported calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekOutOfRange(pub NaiveDate);

impl Display for WeekOutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "no complete week around {} in the supported date range", self.0)
    }
}

impl Error for WeekOutOfRange {}

impl WeekWindow {
    /// Rewinds `anchor` to its Monday (itself when already Monday).
    ///
    /// Fails for anchors whose Monday or Sunday lies outside the calendar
    /// range `NaiveDate` can represent.
    pub fn try_containing(anchor: NaiveDate) -> Result<Self, WeekOutOfRange> {
        let back = Days::new(u64::from(anchor.weekday().num_days_from_monday()));
        let monday = anchor
            .checked_sub_days(back)
            .ok_or(WeekOutOfRange(anchor))?;
        let sunday = monday
            .checked_add_days(Days::new(DAYS_PER_WEEK - 1))
            .ok_or(WeekOutOfRange(anchor))?;
        Ok(Self { monday, sunday })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.monday <= date && date <= self.sunday
    }

    /// Monday through Sunday, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let monday = self.monday;
        (0..DAYS_PER_WEEK).filter_map(move |offset| monday.checked_add_days(Days::new(offset)))
    }

    pub fn previous(&self) -> Result<Self, WeekOutOfRange> {
        let day_before = self
            .monday
            .pred_opt()
            .ok_or(WeekOutOfRange(self.monday))?;
        Self::try_containing(day_before)
    }

    pub fn next(&self) -> Result<Self, WeekOutOfRange> {
        let day_after = self
            .sunday
            .succ_opt()
            .ok_or(WeekOutOfRange(self.sunday))?;
        Self::try_containing(day_after)
    }
}

/// Seven per-day task lists for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekTaskMap {
    window: WeekWindow,
    days: BTreeMap<NaiveDate, Vec<Task>>,
}

impl WeekTaskMap {
    /// A map with every day present and empty.
    pub fn empty(window: WeekWindow) -> Self {
        Self {
            window,
            days: window.days().map(|day| (day, Vec::new())).collect(),
        }
    }

    /// Distributes `tasks` into their day buckets.
    ///
    /// Tasks dated outside the window are dropped; the range query should
    /// never return any, so seeing one means the store is inconsistent.
    pub fn bucket(window: WeekWindow, tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut map = Self::empty(window);
        let mut dropped = 0usize;
        for task in tasks {
            match map.days.get_mut(&task.date()) {
                Some(bucket) => bucket.push(task),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                "event=week_bucket module=week status=degraded monday={} dropped={}",
                window.monday, dropped
            );
        }
        for bucket in map.days.values_mut() {
            sort_newest_first(bucket);
        }
        map
    }

    pub fn window(&self) -> WeekWindow {
        self.window
    }

    /// Tasks for `date`; empty when the date lies outside this week.
    pub fn tasks_on(&self, date: NaiveDate) -> &[Task] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(date, tasks)` pairs, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[Task])> {
        self.days.iter().map(|(day, tasks)| (*day, tasks.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Finds a task anywhere in the week.
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.days.values().flatten().find(|task| task.id() == id)
    }
}
