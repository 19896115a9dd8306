//! Week board navigation state.
//!
//! # Responsibility
//! - Hold the selected date, the Monday-anchored week and its buckets.
//! - Turn UI intents into store mutations and one-shot notifications.
//!
//! # Invariants
//! - Transitions are computed by [`reducer::reduce`] without I/O.
//! - A single [`controller::BoardController`] task owns each board state.

pub mod controller;
pub mod event;
pub mod reducer;
pub mod state;

pub use controller::{BoardClosed, BoardController, BoardHandle};
pub use event::{BoardEvent, Effect, Notification};
pub use reducer::reduce;
pub use state::{BoardState, DialogTag, ModalState, SheetTag};
