//! Compiler client - the session's handle on the compiler engine.
//!
//! Engines run on dedicated worker threads. Every `compile` call gets a
//! request id; workers echo the id back and the reply is routed to the
//! caller's oneshot channel. Calls may overlap freely:
//!
//! ```text
//! compile() --Job{id}--> [crossbeam queue] --> worker 0 (engine)
//!     ^                                    \-> worker 1 (engine)
//!     |                                             |
//!     +------- oneshot <-- Routes[id] <-------------+
//! ```
//!
//! Jobs submitted while engines are still starting wait in the queue and are
//! flushed once a worker is ready. Dispose rejects everything outstanding
//! with [`ClientError::Disposed`].
//!
//! Dropping a `compile` future before its reply arrives (a caller-side
//! timeout) cancels the request. A worker still busy with it is retired and
//! a replacement spawned, so one runaway compile never blocks the queue.

mod worker;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::oneshot;

use super::engine::EngineFactory;
use super::{Compile, CompileResult};
use worker::{Job, WorkerSlot, spawn_worker};

pub type RequestId = u64;

type Reply = Result<CompileResult, ClientError>;

/// Why a compile produced no [`CompileResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("compiler client disposed")]
    Disposed,

    #[error("compiler transport failed: {0}")]
    Transport(String),
}

/// Session-owned compiler client. Cheap to clone; clones share workers.
#[derive(Clone)]
pub struct CompilerClient {
    inner: Arc<Inner>,
}

struct Inner {
    factory: Arc<dyn EngineFactory>,
    workers: usize,
    /// `None` once disposed
    jobs_tx: Mutex<Option<Sender<Job>>>,
    jobs_rx: Receiver<Job>,
    routes: Arc<Routes>,
    generation: AtomicU64,
}

/// Request routing shared between the client and its workers.
pub(super) struct Routes {
    pending: Mutex<FxHashMap<RequestId, oneshot::Sender<Reply>>>,
    /// Worker currently compiling each request
    running: Mutex<FxHashMap<RequestId, Arc<WorkerSlot>>>,
    next_id: AtomicU64,
    disposed: AtomicBool,
    live: AtomicUsize,
}

impl Routes {
    fn new() -> Self {
        Self {
            pending: Mutex::new(FxHashMap::default()),
            running: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
            disposed: AtomicBool::new(false),
            live: AtomicUsize::new(0),
        }
    }

    fn register(&self) -> Result<(RequestId, oneshot::Receiver<Reply>), ClientError> {
        let mut pending = self.pending.lock();
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        pending.insert(id, tx);
        Ok((id, rx))
    }

    /// Deliver the reply for `id`. Returns false if nobody is waiting anymore.
    pub(super) fn resolve(&self, id: RequestId, reply: Reply) -> bool {
        let Some(tx) = self.pending.lock().remove(&id) else {
            return false;
        };
        tx.send(reply).is_ok()
    }

    /// Mark `id` as picked up by `slot`. False if nobody waits for it anymore.
    fn begin(&self, id: RequestId, slot: &Arc<WorkerSlot>) -> bool {
        let pending = self.pending.lock();
        if !pending.contains_key(&id) {
            return false;
        }
        self.running.lock().insert(id, Arc::clone(slot));
        true
    }

    fn finish(&self, id: RequestId) {
        self.running.lock().remove(&id);
    }

    /// Forget an unanswered request. Returns the worker stuck on it, if any.
    fn cancel(&self, id: RequestId) -> Option<Arc<WorkerSlot>> {
        let mut pending = self.pending.lock();
        pending.remove(&id)?;
        self.running.lock().remove(&id)
    }

    fn reject_all(&self, error: &ClientError) -> usize {
        let drained: Vec<_> = {
            let mut pending = self.pending.lock();
            pending.drain().collect()
        };
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(error.clone()));
        }
        count
    }

    fn dispose(&self) -> bool {
        let _pending = self.pending.lock();
        !self.disposed.swap(true, Ordering::SeqCst)
    }

    pub(super) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(super) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }
}

impl CompilerClient {
    /// Start `workers` engine threads. Returns immediately; engines start in
    /// the background and queued jobs wait for them.
    pub fn new(factory: Arc<dyn EngineFactory>, workers: usize) -> Self {
        let (jobs_tx, jobs_rx) = unbounded();
        let client = Self {
            inner: Arc::new(Inner {
                factory,
                workers: workers.max(1),
                jobs_tx: Mutex::new(Some(jobs_tx)),
                jobs_rx,
                routes: Arc::new(Routes::new()),
                generation: AtomicU64::new(0),
            }),
        };
        client.inner.spawn_missing();
        client
    }

    /// Queue a compile and return the channel its reply arrives on.
    pub fn submit(&self, source: String) -> Result<oneshot::Receiver<Reply>, ClientError> {
        self.enqueue(source).map(|(_, rx)| rx)
    }

    fn enqueue(&self, source: String) -> Result<(RequestId, oneshot::Receiver<Reply>), ClientError> {
        let routes = &self.inner.routes;
        let (id, rx) = routes.register()?;

        let sent = match self.inner.jobs_tx.lock().as_ref() {
            Some(tx) => tx.send(Job { id, source }).is_ok(),
            None => false,
        };
        if !sent {
            routes.resolve(id, Err(ClientError::Disposed));
            return Ok((id, rx));
        }

        // Every worker died (startup failure, crash): bring a generation back
        if routes.live() == 0 {
            self.inner.spawn_missing();
        }
        Ok((id, rx))
    }

    /// Compile `source`, waiting for the worker's reply.
    ///
    /// Dropping the future early cancels the request.
    pub async fn compile(&self, source: String) -> Reply {
        let (id, rx) = self.enqueue(source)?;
        let mut guard = CancelOnDrop {
            inner: Arc::clone(&self.inner),
            id,
            answered: false,
        };
        let reply = rx.await.unwrap_or(Err(ClientError::Disposed));
        guard.answered = true;
        reply
    }

    /// Replace dead workers after a transport failure.
    pub fn restart(&self) {
        let spawned = self.inner.spawn_missing();
        if spawned > 0 {
            crate::log!("compile"; "restarted {} {} worker(s)", spawned, self.inner.factory.name());
        }
    }

    /// Release workers and reject every outstanding request. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[cfg(test)]
    pub fn is_disposed(&self) -> bool {
        self.inner.routes.is_disposed()
    }

    /// Requests submitted but not yet answered.
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.inner.routes.in_flight()
    }
}

impl Inner {
    fn spawn_missing(&self) -> usize {
        // Holding the sender lock serializes concurrent restarts
        let jobs_tx = self.jobs_tx.lock();
        if jobs_tx.is_none() {
            return 0;
        }

        let missing = self.workers.saturating_sub(self.routes.live());
        if missing == 0 {
            return 0;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut spawned = 0;
        for index in 0..missing {
            let result = spawn_worker(
                generation,
                index,
                Arc::clone(&self.factory),
                self.jobs_rx.clone(),
                Arc::clone(&self.routes),
            );
            match result {
                Ok(()) => spawned += 1,
                Err(e) => crate::log!("compile"; "failed to spawn worker: {}", e),
            }
        }
        spawned
    }

    /// Stop waiting for `id`; retire and replace a worker stuck on it.
    fn cancel(&self, id: RequestId) {
        let Some(slot) = self.routes.cancel(id) else {
            return;
        };
        if slot.retire(&self.routes) {
            crate::log!(
                "compile";
                "request {} abandoned, replacing its {} worker", id, self.factory.name()
            );
            self.spawn_missing();
        }
    }

    fn dispose(&self) {
        if !self.routes.dispose() {
            return;
        }
        // Dropping the sender lets idle workers see a closed queue and exit
        self.jobs_tx.lock().take();
        let rejected = self.routes.reject_all(&ClientError::Disposed);
        crate::debug!("compile"; "client disposed, {} request(s) rejected", rejected);
    }
}

/// Cancels its request unless the reply was received.
struct CancelOnDrop {
    inner: Arc<Inner>,
    id: RequestId,
    answered: bool,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.answered {
            self.inner.cancel(self.id);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Compile for CompilerClient {
    fn compile(&self, source: String) -> impl Future<Output = Reply> + Send {
        let client = self.clone();
        async move { CompilerClient::compile(&client, source).await }
    }

    fn restart(&self) {
        CompilerClient::restart(self);
    }

    fn dispose(&self) {
        CompilerClient::dispose(self);
    }
}
