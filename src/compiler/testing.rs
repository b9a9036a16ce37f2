//! Test doubles: a scripted [`Compile`] implementation for the coordinator
//! and session, and a scripted engine for the real client.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::sleep;

use super::engine::{Engine, EngineFactory, EngineReply, TransportError};
use super::{ClientError, Compile, CompileResult, Diagnostic};

/// How long a scripted engine blocks on `hang`.
const ENGINE_HANG: Duration = Duration::from_secs(3);

/// Blocking engine for worker threads, driven by the source text:
/// - `sleep:<ms>:<text>` replies `<text>` after `<ms>`
/// - `fail:<text>` replies status 1 with `<text>`
/// - `hang` blocks far longer than any test waits
/// - `crash` reports a transport error
/// - `panic` panics
/// - anything else is echoed back
pub struct ScriptEngine;

impl Engine for ScriptEngine {
    fn compile(&mut self, source: &str) -> Result<EngineReply, TransportError> {
        if let Some(rest) = source.strip_prefix("sleep:") {
            let (ms, text) = rest.split_once(':').unwrap();
            std::thread::sleep(Duration::from_millis(ms.parse().unwrap()));
            return Ok(EngineReply::new(0, text));
        }
        if let Some(text) = source.strip_prefix("fail:") {
            return Ok(EngineReply::new(1, text));
        }
        match source {
            "hang" => {
                std::thread::sleep(ENGINE_HANG);
                Ok(EngineReply::new(0, "late"))
            }
            "crash" => Err(TransportError::Killed("script".into())),
            "panic" => panic!("script engine exploded"),
            _ => Ok(EngineReply::new(0, source)),
        }
    }
}

#[derive(Default)]
pub struct ScriptFactory {
    pub startup: Duration,
    pub fail_start: bool,
    pub starts: AtomicUsize,
}

impl EngineFactory for ScriptFactory {
    fn name(&self) -> &str {
        "script"
    }

    fn start(&self) -> Result<Box<dyn Engine>, TransportError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.startup);
        if self.fail_start {
            return Err(TransportError::Startup("runtime missing".into()));
        }
        Ok(Box::new(ScriptEngine))
    }
}

/// Scripted compiler driven by the source text:
/// - `sleep:<ms>:<text>` succeeds with `<text>` after `<ms>`
/// - `fail:<text>` fails with a compile diagnostic
/// - `transport:<text>` fails the transport
/// - `hang` never answers (until disposed)
/// - anything else succeeds immediately with the source as output
#[derive(Clone)]
pub struct ScriptedCompiler {
    state: Arc<Script>,
}

struct Script {
    calls: Mutex<Vec<String>>,
    restarts: AtomicUsize,
    disposed_replies: AtomicUsize,
    disposed: watch::Sender<bool>,
}

impl Default for ScriptedCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Script {
                calls: Mutex::new(Vec::new()),
                restarts: AtomicUsize::new(0),
                disposed_replies: AtomicUsize::new(0),
                disposed: watch::channel(false).0,
            }),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().clone()
    }

    pub fn restarts(&self) -> usize {
        self.state.restarts.load(Ordering::SeqCst)
    }

    pub fn disposed_replies(&self) -> usize {
        self.state.disposed_replies.load(Ordering::SeqCst)
    }
}

async fn run_script(source: &str) -> Result<CompileResult, ClientError> {
    if let Some(rest) = source.strip_prefix("sleep:") {
        let (ms, text) = rest.split_once(':').unwrap();
        sleep(Duration::from_millis(ms.parse().unwrap())).await;
        return Ok(CompileResult::success(text));
    }
    if let Some(message) = source.strip_prefix("fail:") {
        return Ok(CompileResult::failure(Diagnostic::compile(65, message)));
    }
    if let Some(reason) = source.strip_prefix("transport:") {
        return Err(ClientError::Transport(reason.to_string()));
    }
    if source == "hang" {
        std::future::pending::<()>().await;
    }
    Ok(CompileResult::success(source))
}

impl Compile for ScriptedCompiler {
    fn compile(&self, source: String) -> impl Future<Output = Result<CompileResult, ClientError>> + Send {
        self.state.calls.lock().push(source.clone());
        let state = Arc::clone(&self.state);
        let mut disposed = state.disposed.subscribe();
        async move {
            let already = *disposed.borrow();
            if already {
                return Err(ClientError::Disposed);
            }
            let disposed = async {
                let _ = disposed.wait_for(|d| *d).await;
            };
            tokio::select! {
                reply = run_script(&source) => reply,
                () = disposed => {
                    state.disposed_replies.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::Disposed)
                }
            }
        }
    }

    fn restart(&self) {
        self.state.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&self) {
        self.state.disposed.send_replace(true);
    }
}
