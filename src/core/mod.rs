//! Core types - pure abstractions shared across the codebase.

mod seq;
mod state;

pub use seq::Seq;
pub use state::{is_shutdown, register_session, setup_shutdown_handler};
