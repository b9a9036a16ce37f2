//! Process-wide shutdown state.
//!
//! Two phases:
//! - Before `register_session()`: Ctrl+C exits immediately, nothing to tear down
//! - After `register_session()`: Ctrl+C notifies the running session, which
//!   disposes its compiler client and returns from `watch`

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{Receiver, Sender, bounded};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the live session
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        match SHUTDOWN_TX.get() {
            Some(tx) => {
                crate::log!("watch"; "shutting down...");
                let _ = tx.try_send(());
            }
            // No session yet (config loading, one-shot compile)
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register a live session for graceful shutdown.
///
/// Returns the receiver that fires once Ctrl+C is pressed, or `None` if a
/// session was already registered in this process.
pub fn register_session() -> Option<Receiver<()>> {
    let (tx, rx) = bounded(1);
    SHUTDOWN_TX.set(tx).ok().map(|()| rx)
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_shutdown_by_default() {
        assert!(!is_shutdown());
    }
}
