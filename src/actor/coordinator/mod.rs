//! Request Coordinator - debounced, stale-safe compile scheduling
//!
//! Turns a stream of edits into compile requests:
//! - edits inside the quiet period collapse into one trailing request
//! - every request gets a fresh [`Seq`]; only the completion of the latest
//!   issued seq reaches the [`ResultSink`]
//!
//! ```text
//!          schedule             timer fires             latest seq done
//! Idle ──────────────> Pending ─────────────> Issued(n) ───────────────> Idle
//!                         ^                       │
//!                         └────── schedule ───────┘  (n stays in flight)
//! ```

mod debouncer;
mod sequence;


use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use super::messages::CoordinatorMsg;
use crate::compiler::{ClientError, Compile, CompileResult, Diagnostic};
use crate::core::Seq;
use debouncer::Debouncer;
use sequence::SequenceTracker;

/// How long shutdown waits for in-flight compiles to settle.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

type Completion = (Seq, Result<CompileResult, ClientError>);

/// Receives results the coordinator decided to apply.
pub trait ResultSink: Send + Sync + 'static {
    fn apply_result(&self, seq: Seq, result: CompileResult);
}

/// Coordinator state as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing pending, latest request settled
    #[default]
    Idle,
    /// Edit received, waiting for the quiet period to pass
    Pending,
    /// Latest request in flight
    Issued(Seq),
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    /// Quiet period after the last edit before a compile is issued
    pub debounce: Duration,
    /// Per-compile limit; `None` waits forever
    pub timeout: Option<Duration>,
}

/// Sending half of the coordinator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<CoordinatorMsg>,
    phase: watch::Receiver<Phase>,
}

impl CoordinatorHandle {
    /// Hand new source text to the coordinator. Never blocks.
    pub fn schedule(&self, source: String) {
        if self.tx.send(CoordinatorMsg::Schedule(source)).is_err() {
            crate::debug!("watch"; "coordinator stopped, edit not scheduled");
        }
    }

    /// Stop the coordinator and wait until in-flight work is drained.
    /// Calling it again after the coordinator stopped returns immediately.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(CoordinatorMsg::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }
}

/// Spawn a coordinator task driving `compiler` and feeding `sink`.
pub fn spawn<C: Compile>(
    compiler: C,
    sink: Arc<dyn ResultSink>,
    settings: CoordinatorSettings,
) -> (CoordinatorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (phase_tx, phase_rx) = watch::channel(Phase::Idle);

    let coordinator = RequestCoordinator {
        rx,
        compiler,
        sink,
        timeout: settings.timeout,
        debouncer: Debouncer::new(settings.debounce),
        sequence: SequenceTracker::default(),
        in_flight: JoinSet::new(),
        phase_tx,
    };
    let task = tokio::spawn(coordinator.run());

    let handle = CoordinatorHandle {
        tx,
        phase: phase_rx,
    };
    (handle, task)
}

pub struct RequestCoordinator<C: Compile> {
    rx: mpsc::UnboundedReceiver<CoordinatorMsg>,
    compiler: C,
    sink: Arc<dyn ResultSink>,
    timeout: Option<Duration>,
    debouncer: Debouncer,
    sequence: SequenceTracker,
    in_flight: JoinSet<Completion>,
    phase_tx: watch::Sender<Phase>,
}

impl<C: Compile> RequestCoordinator<C> {
    /// Main event loop: edits, completions and the debounce timer.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                msg = self.rx.recv() => match msg {
                    Some(CoordinatorMsg::Schedule(source)) => self.on_schedule(source),
                    Some(CoordinatorMsg::Shutdown(done)) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        self.shutdown().await;
                        return;
                    }
                },

                Some(joined) = self.in_flight.join_next() => self.on_joined(joined),

                _ = tokio::time::sleep(self.debouncer.sleep_duration()), if self.debouncer.is_pending() => {
                    self.flush();
                }
            }
            self.publish_phase();
        }
    }

    fn on_schedule(&mut self, source: String) {
        crate::debug!("watch"; "edit received ({} bytes)", source.len());
        self.debouncer.push(source);
    }

    /// Issue one request with the latest source if the quiet period passed.
    fn flush(&mut self) {
        let Some(source) = self.debouncer.take_if_ready() else {
            return;
        };

        let seq = self.sequence.issue();
        crate::debug!("compile"; "issue request {}", seq);

        let compiler = self.compiler.clone();
        let limit = self.timeout;
        self.in_flight.spawn(async move {
            let compile = compiler.compile(source);
            let reply = match limit {
                Some(limit) => tokio::time::timeout(limit, compile)
                    .await
                    .unwrap_or_else(|_| Ok(CompileResult::failure(Diagnostic::timeout(limit)))),
                None => compile.await,
            };
            (seq, reply)
        });
    }

    fn on_joined(&mut self, joined: Result<Completion, JoinError>) {
        match joined {
            Ok((seq, reply)) => self.on_completion(seq, reply),
            Err(e) if e.is_panic() => crate::log!("compile"; "compile task panicked: {}", e),
            Err(_) => {}
        }
    }

    fn on_completion(&mut self, seq: Seq, reply: Result<CompileResult, ClientError>) {
        let result = match reply {
            Ok(result) => result,
            Err(ClientError::Disposed) => {
                self.sequence.abandon(seq);
                crate::debug!("compile"; "request {} rejected, client disposed", seq);
                return;
            }
            Err(ClientError::Transport(reason)) => {
                crate::log!("compile"; "request {} lost: {}", seq, reason);
                self.compiler.restart();
                CompileResult::failure(Diagnostic::transport(reason))
            }
        };

        if !self.sequence.settle(seq) {
            crate::debug!("compile"; "dropped stale result {}", seq);
            return;
        }
        self.sink.apply_result(seq, result);
    }

    /// Stop the timer, dispose the compiler and discard in-flight results.
    async fn shutdown(&mut self) {
        self.debouncer.clear();
        self.compiler.dispose();

        let outstanding = self.in_flight.len();
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while let Some(joined) = self.in_flight.join_next().await {
                if let Ok((seq, _)) = joined {
                    crate::debug!("compile"; "discarded request {} on shutdown", seq);
                }
            }
        })
        .await;

        if drained.is_err() {
            crate::debug!("compile"; "aborting {} undrained request(s)", self.in_flight.len());
            self.in_flight.abort_all();
        }
        crate::debug!("compile"; "coordinator stopped ({} request(s) outstanding)", outstanding);
        self.phase_tx.send_replace(Phase::Idle);
    }

    fn publish_phase(&self) {
        let phase = if self.debouncer.is_pending() {
            Phase::Pending
        } else if let Some(seq) = self.sequence.awaiting() {
            Phase::Issued(seq)
        } else {
            Phase::Idle
        };
        self.phase_tx.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
    }
}
