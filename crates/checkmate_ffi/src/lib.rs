//! Flutter bridge entry points for CheckMate core.

pub mod api;
