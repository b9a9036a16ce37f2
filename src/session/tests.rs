use std::time::Duration;

use tokio::time::sleep;

use super::*;
use crate::compiler::FailureKind;
use crate::compiler::testing::ScriptedCompiler;

const SEED: &str = "h2 { color: red; }";

fn settings() -> SessionSettings {
    SessionSettings {
        seed: SEED.into(),
        seed_output: SEED.into(),
        compile_seed: false,
        coordinator: CoordinatorSettings {
            debounce: Duration::from_millis(200),
            timeout: None,
        },
        editor: EditorSectionConfig::default(),
    }
}

fn start() -> (ScriptedCompiler, EditSession<ScriptedCompiler>) {
    let compiler = ScriptedCompiler::new();
    let session = EditSession::start(compiler.clone(), settings());
    (compiler, session)
}

async fn wait(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_seed_displayed_before_any_edit() {
    let (compiler, session) = start();
    wait(500).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.source, SEED);
    assert_eq!(snapshot.output, SEED);
    assert_eq!(snapshot.applied, None);
    assert_eq!(session.diagnostic(), None);
    assert!(compiler.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_edit_is_echoed_immediately() {
    let (_compiler, session) = start();
    let rx = session.subscribe();

    session.on_edit("a{}".into());

    assert_eq!(session.source(), "a{}");
    assert_eq!(session.output(), SEED);
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow().source, "a{}");
}

#[tokio::test(start_paused = true)]
async fn test_success_updates_output() {
    let (compiler, session) = start();
    let mut rx = session.subscribe();

    session.on_edit("a".into());
    wait(10).await;
    session.on_edit("a{".into());
    wait(10).await;
    session.on_edit("a{}".into());
    wait(500).await;

    assert_eq!(compiler.calls(), vec!["a{}".to_string()]);
    assert_eq!(session.output(), "a{}");

    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.applied, Some(Seq::FIRST));
    assert_eq!(snapshot.output, "a{}");
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_previous_output() {
    let (_compiler, session) = start();

    for source in ["a{}", "b{}", "c{}", "d{}"] {
        session.on_edit(source.into());
        wait(300).await;
    }
    assert_eq!(session.snapshot().applied, Some(Seq::new(4)));

    session.on_edit("fail:unexpected token".into());
    wait(300).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.applied, Some(Seq::new(5)));
    assert_eq!(snapshot.output, "d{}");
    assert_eq!(snapshot.source, "fail:unexpected token");

    let diagnostic = session.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::Compile);
    assert_eq!(diagnostic.message, "unexpected token");
    assert_eq!(snapshot.diagnostic, Some(diagnostic));

    // Next success clears the diagnostic
    session.on_edit("e{}".into());
    wait(300).await;
    assert_eq!(session.output(), "e{}");
    assert_eq!(session.diagnostic(), None);
}

#[tokio::test(start_paused = true)]
async fn test_older_result_never_overwrites_newer() {
    let (_compiler, session) = start();

    let sink = &session.shared;
    sink.apply_result(Seq::new(3), CompileResult::success("three"));
    sink.apply_result(Seq::new(2), CompileResult::success("two"));
    sink.apply_result(Seq::new(3), CompileResult::success("three again"));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.output, "three");
    assert_eq!(snapshot.applied, Some(Seq::new(3)));
}

#[tokio::test(start_paused = true)]
async fn test_compile_seed_at_start() {
    let compiler = ScriptedCompiler::new();
    let settings = settings().with_document("p{}".into());
    let session = EditSession::start(compiler.clone(), settings);
    wait(300).await;

    assert_eq!(compiler.calls(), vec!["p{}".to_string()]);
    assert_eq!(session.output(), "p{}");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_with_compile_in_flight() {
    let (compiler, session) = start();

    for source in ["a{}", "b{}", "c{}", "d{}", "e{}", "f{}"] {
        session.on_edit(source.into());
        wait(300).await;
    }
    session.on_edit("hang".into());
    wait(300).await;
    assert_eq!(session.phase(), Phase::Issued(Seq::new(7)));

    session.shutdown().await;

    assert_eq!(compiler.disposed_replies(), 1);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.applied, Some(Seq::new(6)));
    assert_eq!(snapshot.output, "f{}");

    // Edits after shutdown still echo but never compile
    session.on_edit("g{}".into());
    wait(300).await;
    assert_eq!(session.source(), "g{}");
    assert_eq!(session.output(), "f{}");
    assert_eq!(compiler.calls().len(), 7);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_editor_config_follows_source() {
    let (_compiler, session) = start();
    session.on_edit("a{}".into());

    let config = session.editor_config();
    assert_eq!(config.value, "a{}");
    assert_eq!(config.mode, "text/x-scss");
    assert_eq!(config.theme, "monokai");
    assert!(!config.options.line_numbers);
}
