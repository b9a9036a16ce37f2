//! Actor message definitions.
//!
//! ```text
//! CoordinatorHandle --Schedule/Shutdown--> RequestCoordinator
//! ```

use tokio::sync::oneshot;

/// Messages to the request coordinator.
#[derive(Debug)]
pub enum CoordinatorMsg {
    /// New source text; (re)arms the debounce timer
    Schedule(String),
    /// Stop the timer, dispose the compiler and drain in-flight work.
    /// The sender is signalled once the coordinator has finished.
    Shutdown(oneshot::Sender<()>),
}
