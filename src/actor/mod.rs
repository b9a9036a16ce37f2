//! Actor system for live preview.
//!
//! Message-passing concurrency between the session and the compiler:
//!
//! ```text
//! EditSession --Schedule--> RequestCoordinator --compile--> CompilerClient
//!      ^                      (debounce, seq)                    |
//!      +------- apply_result (latest seq only) <-----------------+
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types sent to the coordinator
//! - `coordinator` - Debouncing and stale-result suppression

pub mod coordinator;
pub mod messages;

