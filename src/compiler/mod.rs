//! Compilation: results, engines and the session's compiler client.
//!
//! # Module Structure
//!
//! - `result` - `CompileResult` / `Diagnostic` as seen by the session
//! - `engine` - the external compiler behind a capability trait
//! - `client` - worker threads, request routing, lifecycle

pub mod client;
pub mod engine;
mod result;

#[cfg(test)]
pub mod testing;

use std::future::Future;

pub use client::{ClientError, CompilerClient};
pub use result::{CompileResult, Diagnostic, FailureKind};

/// What the coordinator needs from a compiler: one async compile per call,
/// overlapping calls allowed, plus lifecycle hooks.
///
/// [`CompilerClient`] is the production implementation; swapping engines
/// (process vs in-process) happens below this trait.
pub trait Compile: Clone + Send + Sync + 'static {
    /// Compile exactly `source`. Each call resolves independently.
    fn compile(&self, source: String)
    -> impl Future<Output = Result<CompileResult, ClientError>> + Send;

    /// Bring the engine back after a transport failure.
    fn restart(&self);

    /// Release resources; outstanding calls resolve to `Disposed`.
    fn dispose(&self);
}
