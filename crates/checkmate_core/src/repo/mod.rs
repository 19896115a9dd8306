//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define synchronous data access contracts over one SQLite connection.
//! - Isolate SQL details from the async store and the board controller.
//!
//! # Invariants
//! - Repository writes enforce `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod task_repo;
