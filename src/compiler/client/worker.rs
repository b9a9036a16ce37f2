//! Engine worker threads.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam::channel::Receiver;

use super::{ClientError, RequestId, Routes};
use crate::compiler::CompileResult;
use crate::compiler::engine::{EngineFactory, TransportError};

pub(super) struct Job {
    pub(super) id: RequestId,
    pub(super) source: String,
}

/// One worker's claim on the client's live count.
///
/// Released exactly once: by the thread when it exits, or earlier by the
/// client when the caller of the job it is stuck on gives up.
pub(super) struct WorkerSlot {
    retired: AtomicBool,
}

impl WorkerSlot {
    fn new() -> Self {
        Self {
            retired: AtomicBool::new(false),
        }
    }

    /// Stop counting this worker as live. True only for the first call.
    pub(super) fn retire(&self, routes: &Routes) -> bool {
        if self.retired.swap(true, Ordering::SeqCst) {
            return false;
        }
        routes.live.fetch_sub(1, Ordering::SeqCst);
        true
    }

    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }
}

/// How a worker loop ended.
enum Exit {
    /// Queue closed (client disposed)
    Closed,
    /// Replaced while compiling an abandoned request
    Retired,
    /// Engine failed to start, or died while compiling `job`
    Failed {
        reason: String,
        job: Option<RequestId>,
    },
}

/// Spawn one worker thread. Counts as live from this call on.
pub(super) fn spawn_worker(
    generation: u64,
    index: usize,
    factory: Arc<dyn EngineFactory>,
    jobs: Receiver<Job>,
    routes: Arc<Routes>,
) -> io::Result<()> {
    routes.live.fetch_add(1, Ordering::SeqCst);
    let slot = Arc::new(WorkerSlot::new());

    let thread_routes = Arc::clone(&routes);
    let thread_slot = Arc::clone(&slot);
    let spawned = std::thread::Builder::new()
        .name(format!("compile-{generation}.{index}"))
        .spawn(move || {
            let exit = run(factory.as_ref(), &jobs, &thread_routes, &thread_slot);
            let released = thread_slot.retire(&thread_routes);
            let remaining = thread_routes.live();

            match exit {
                Exit::Closed => {}
                Exit::Retired => {
                    crate::debug!("compile"; "{} worker retired", factory.name());
                }
                Exit::Failed { reason, job } => {
                    crate::log!("compile"; "{} worker stopped: {}", factory.name(), reason);
                    // Nobody left to take queued jobs; fail them so callers retry
                    if released && remaining == 0 {
                        drain(&jobs, &thread_routes, &reason);
                    }
                    // Answer last: the caller may restart as soon as it hears back
                    if let Some(id) = job {
                        thread_routes.resolve(id, Err(ClientError::Transport(reason)));
                    }
                }
            }
        });

    spawned.map(|_| ()).inspect_err(|_| {
        slot.retire(&routes);
    })
}

fn run(
    factory: &dyn EngineFactory,
    jobs: &Receiver<Job>,
    routes: &Routes,
    slot: &Arc<WorkerSlot>,
) -> Exit {
    let start = Instant::now();
    let mut engine = match factory.start() {
        Ok(engine) => engine,
        Err(e) => {
            return Exit::Failed {
                reason: describe(e),
                job: None,
            };
        }
    };
    crate::debug!("compile"; "{} ready in {:?}", factory.name(), start.elapsed());

    while let Ok(job) = jobs.recv() {
        // Disposed, or the caller stopped waiting while the job was queued
        if routes.is_disposed() || !routes.begin(job.id, slot) {
            continue;
        }

        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| engine.compile(&job.source)));
        routes.finish(job.id);
        crate::debug!("compile"; "request {} took {:?}", job.id, start.elapsed());

        let reason = match outcome {
            Ok(Ok(reply)) => {
                routes.resolve(job.id, Ok(CompileResult::from_reply(reply)));
                if slot.is_retired() {
                    return Exit::Retired;
                }
                continue;
            }
            Ok(Err(e)) => describe(e),
            Err(panic) => describe(TransportError::Panicked(panic_message(panic.as_ref()))),
        };
        return Exit::Failed {
            reason,
            job: Some(job.id),
        };
    }
    Exit::Closed
}

fn drain(jobs: &Receiver<Job>, routes: &Routes, reason: &str) {
    let mut failed = 0;
    while let Ok(job) = jobs.try_recv() {
        routes.resolve(job.id, Err(ClientError::Transport(reason.to_string())));
        failed += 1;
    }
    if failed > 0 {
        crate::debug!("compile"; "failed {} queued request(s)", failed);
    }
}

/// Error with its source chain, e.g. "failed to start `sass`: No such file".
fn describe(error: TransportError) -> String {
    format!("{:#}", anyhow::Error::new(error))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}
