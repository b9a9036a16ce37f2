use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::{ClientError, CompilerClient};
use crate::compiler::engine::{CssFactory, OutputStyle};
use crate::compiler::testing::ScriptFactory;
use crate::compiler::{CompileResult, FailureKind};

const WAIT: Duration = Duration::from_secs(5);

fn client(factory: ScriptFactory, workers: usize) -> (CompilerClient, Arc<ScriptFactory>) {
    let factory = Arc::new(factory);
    let client = CompilerClient::new(factory.clone(), workers);
    (client, factory)
}

async fn compile(client: &CompilerClient, source: &str) -> Result<CompileResult, ClientError> {
    tokio::time::timeout(WAIT, client.compile(source.to_string()))
        .await
        .expect("compile did not resolve")
}

#[tokio::test]
async fn test_compile_echo() {
    let (client, _) = client(ScriptFactory::default(), 1);
    let result = compile(&client, "h2 { color: red; }").await;
    assert_eq!(result, Ok(CompileResult::success("h2 { color: red; }")));
    assert_eq!(client.in_flight(), 0);
}

#[tokio::test]
async fn test_failure_status_is_diagnostic() {
    let (client, _) = client(ScriptFactory::default(), 1);
    let result = compile(&client, "fail:unexpected token").await.unwrap();
    let diagnostic = result.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::Compile);
    assert_eq!(diagnostic.message, "unexpected token");
}

#[tokio::test]
async fn test_same_source_same_output() {
    let (client, _) = client(ScriptFactory::default(), 1);
    let first = compile(&client, "a { b: c }").await;
    let second = compile(&client, "a { b: c }").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_overlapping_calls_resolve_independently() {
    let (client, _) = client(ScriptFactory::default(), 2);

    let mut slow = client.submit("sleep:600:slow".into()).unwrap();
    let fast = client.submit("fast".into()).unwrap();

    let fast = tokio::time::timeout(WAIT, fast).await.unwrap().unwrap();
    assert_eq!(fast, Ok(CompileResult::success("fast")));
    assert!(slow.try_recv().is_err(), "slow request finished first");

    let slow = tokio::time::timeout(WAIT, slow).await.unwrap().unwrap();
    assert_eq!(slow, Ok(CompileResult::success("slow")));
}

#[tokio::test]
async fn test_requests_queue_until_engine_ready() {
    let factory = ScriptFactory {
        startup: Duration::from_millis(150),
        ..Default::default()
    };
    let (client, factory) = client(factory, 1);

    let first = client.submit("one".into()).unwrap();
    let second = client.submit("two".into()).unwrap();
    assert_eq!(client.in_flight(), 2);

    let first = tokio::time::timeout(WAIT, first).await.unwrap().unwrap();
    let second = tokio::time::timeout(WAIT, second).await.unwrap().unwrap();
    assert_eq!(first, Ok(CompileResult::success("one")));
    assert_eq!(second, Ok(CompileResult::success("two")));
    assert_eq!(factory.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dispose_rejects_outstanding() {
    let (client, _) = client(ScriptFactory::default(), 1);

    let running = client.submit("sleep:300:late".into()).unwrap();
    let queued = client.submit("queued".into()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.dispose();
    client.dispose();

    let running = tokio::time::timeout(WAIT, running).await.unwrap().unwrap();
    let queued = tokio::time::timeout(WAIT, queued).await.unwrap().unwrap();
    assert_eq!(running, Err(ClientError::Disposed));
    assert_eq!(queued, Err(ClientError::Disposed));

    assert!(client.is_disposed());
    assert_eq!(compile(&client, "after").await, Err(ClientError::Disposed));
}

#[tokio::test]
async fn test_crash_then_self_heal() {
    let (client, factory) = client(ScriptFactory::default(), 1);

    let crashed = compile(&client, "crash").await;
    assert!(matches!(crashed, Err(ClientError::Transport(_))));

    client.restart();
    let healed = compile(&client, "ok").await;
    assert_eq!(healed, Ok(CompileResult::success("ok")));
    assert_eq!(factory.starts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dead_workers_respawn_on_submit() {
    let (client, _) = client(ScriptFactory::default(), 1);
    assert!(matches!(compile(&client, "panic").await, Err(ClientError::Transport(_))));

    // No explicit restart: submit notices nobody is listening
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(compile(&client, "ok").await, Ok(CompileResult::success("ok")));
}

#[tokio::test]
async fn test_startup_failure_fails_queued() {
    let factory = ScriptFactory {
        startup: Duration::from_millis(50),
        fail_start: true,
        ..Default::default()
    };
    let (client, _) = client(factory, 1);

    let result = compile(&client, "a{}").await;
    let Err(ClientError::Transport(reason)) = result else {
        panic!("expected transport failure, got {result:?}");
    };
    assert!(reason.contains("runtime missing"));
}

#[tokio::test]
async fn test_in_process_css_engine() {
    let client = CompilerClient::new(Arc::new(CssFactory::new(OutputStyle::Compressed)), 1);
    let result = compile(&client, "h2 {\n  color: red;\n}\n").await.unwrap();
    let output = result.output().unwrap();
    assert!(output.starts_with("h2{"));
}

#[tokio::test]
async fn test_abandoned_request_frees_its_worker() {
    let (client, factory) = client(ScriptFactory::default(), 1);

    let hung = tokio::time::timeout(Duration::from_millis(200), client.compile("hang".into())).await;
    assert!(hung.is_err());
    assert_eq!(client.in_flight(), 0);

    // Served by a replacement worker long before the hung one returns
    let next = tokio::time::timeout(Duration::from_secs(1), client.compile("a{}".into()))
        .await
        .expect("queue still blocked by the hung compile");
    assert_eq!(next, Ok(CompileResult::success("a{}")));
    assert_eq!(client.in_flight(), 0);
    assert_eq!(factory.starts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_abandoned_queued_request_is_skipped() {
    let (client, factory) = client(ScriptFactory::default(), 1);

    let running = client.submit("sleep:300:first".into()).unwrap();
    let abandoned = tokio::time::timeout(Duration::from_millis(50), client.compile("second".into())).await;
    assert!(abandoned.is_err());

    let running = tokio::time::timeout(WAIT, running).await.unwrap().unwrap();
    assert_eq!(running, Ok(CompileResult::success("first")));
    assert_eq!(compile(&client, "third").await, Ok(CompileResult::success("third")));

    // The queued request never reached the engine, so its worker was kept
    assert_eq!(factory.starts.load(Ordering::SeqCst), 1);
    assert_eq!(client.in_flight(), 0);
}
