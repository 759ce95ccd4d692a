//! Wire formats shared with the data store.
//!
//! The Action Log row format lives here; planet and player rows use the
//! serde derives on the board types directly.

pub mod action;

pub use action::{ActionLogEntry, LoggedAction, NewAction};
