//! Core domain logic for CheckMate.
//! This crate is the single source of truth for todo/memo invariants.

pub mod board;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod week;

pub use board::{BoardClosed, BoardController, BoardEvent, BoardHandle, BoardState, Notification};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{Memo, Task, TaskId, TaskKind, TaskValidationError, Todo, NEW_TASK_ID};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use service::week_service::{week_tasks, WeekTaskQuery};
pub use store::{StoreError, StoreResult, TaskQuery, TaskStore};
pub use week::{WeekOutOfRange, WeekTaskMap, WeekWindow};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
