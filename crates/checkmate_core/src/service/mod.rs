//! Core use-case services.
//!
//! # Responsibility
//! - Compose store queries into use-case level results.
//! - Keep the board controller and FFI decoupled from query plumbing.

pub mod week_service;
