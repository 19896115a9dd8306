//! Domain model for dated todos and memos.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep persistence encoding (epoch days) next to the types it encodes.
//!
//! # Invariants
//! - Every persisted task is identified by a `TaskId` unique across kinds.
//! - Deletion is a hard delete; there are no tombstones.

pub mod task;
