use std::sync::Arc;

use runpad_core::{
    CompletionEffect, EditorAdapter, LanguageCatalog, LanguageProfile, RunStatus, Session,
    StaleRunPolicy, SwitchOutcome, TerminalView, TextBuffer, Workbench,
};
use runpad_runexec::{RunRequest, ScriptedClient, ScriptedReply};
use tokio::runtime::Handle;

fn workbench(client: Arc<ScriptedClient>) -> Workbench<TextBuffer> {
    Workbench::new(
        Session::new(LanguageCatalog::builtin()),
        TextBuffer::default(),
        client,
        Handle::current(),
    )
}

async fn wait_for_submissions(client: &ScriptedClient, count: usize) {
    while client.submission_count() < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn python_print_scenario() {
    let client = Arc::new(ScriptedClient::with_replies([ScriptedReply::output("1\n")]));
    let mut bench = workbench(Arc::clone(&client));
    assert_eq!(bench.editor().value(), bench.session().source());

    bench.editor_mut().edit("print(1)");
    assert!(bench.run());
    assert!(bench.session().is_pending());

    let completion = bench.wait_for_completion().await.expect("completion");
    assert_eq!(
        completion.effect,
        CompletionEffect::Applied(RunStatus::Succeeded("1\n".into()))
    );
    assert_eq!(bench.session().status(), &RunStatus::Succeeded("1\n".into()));
    assert_eq!(bench.session().transcript(), "1\n");
    assert_eq!(client.submitted(), vec![RunRequest::new("print(1)", "python")]);
}

#[tokio::test]
async fn double_click_sends_one_request() {
    let client = Arc::new(ScriptedClient::with_replies([ScriptedReply::output("ok")]).gated());
    let mut bench = workbench(Arc::clone(&client));

    assert!(bench.run());
    assert!(!bench.run());
    assert_eq!(bench.outstanding(), 1);

    wait_for_submissions(&client, 1).await;
    tokio::task::yield_now().await;
    assert_eq!(client.submission_count(), 1);

    client.release(1);
    let applied = bench.settle().await;
    assert_eq!(applied.len(), 1);
    assert_eq!(client.submission_count(), 1);
    assert_eq!(bench.session().transcript(), "ok");
}

#[tokio::test]
async fn clear_before_resolution_still_shows_result() {
    let client = Arc::new(ScriptedClient::with_replies([ScriptedReply::output("result")]).gated());
    let mut bench = workbench(Arc::clone(&client));

    bench.run();
    bench.clear_output();
    assert_eq!(bench.session().transcript(), "");
    assert!(bench.session().is_pending());

    client.release(1);
    bench.wait_for_completion().await.expect("completion");
    assert_eq!(bench.session().transcript(), "result");
}

#[tokio::test]
async fn network_failure_marks_session_unreachable() {
    let client = Arc::new(ScriptedClient::with_replies([ScriptedReply::Unreachable]));
    let mut bench = workbench(Arc::clone(&client));

    bench.run();
    bench.wait_for_completion().await.expect("completion");
    assert_eq!(bench.session().status(), &RunStatus::Unreachable);
    let transcript = bench.session().transcript();
    assert!(transcript.contains("unreachable"));
    assert!(transcript.contains(&bench.session().active_language().display_label));
    assert!(bench.session().status().is_terminal());

    client.push_reply(ScriptedReply::output("back online"));
    assert!(bench.run(), "unreachable run must allow a fresh run");
    bench.settle().await;
    assert_eq!(bench.session().transcript(), "back online");
    assert_eq!(client.submission_count(), 2);
}

#[tokio::test]
async fn execution_error_is_prefixed() {
    let client = Arc::new(ScriptedClient::with_replies([ScriptedReply::error(
        "ReferenceError: x is not defined",
    )]));
    let mut bench = workbench(Arc::clone(&client));
    bench.select_language("JS", true).unwrap();

    bench.run();
    bench.settle().await;
    assert_eq!(
        bench.session().status(),
        &RunStatus::Failed("ReferenceError: x is not defined".into())
    );
    assert_eq!(
        bench.session().transcript(),
        "Error:\nReferenceError: x is not defined"
    );
    assert_eq!(client.submitted()[0].language, "javascript");
}

#[tokio::test]
async fn edits_during_pending_run_do_not_change_payload() {
    let client = Arc::new(ScriptedClient::new().gated());
    let mut bench = workbench(Arc::clone(&client));

    bench.editor_mut().edit("print('first')");
    bench.run();
    bench.editor_mut().edit("print('second')");
    assert_eq!(bench.session().source(), "print('second')");

    client.release(1);
    bench.settle().await;
    assert_eq!(client.submitted()[0].code, "print('first')");
}

#[tokio::test]
async fn declined_switch_keeps_editor_contents() {
    let client = Arc::new(ScriptedClient::new());
    let mut bench = workbench(client);
    bench.editor_mut().edit("print('edited')");

    let outcome = bench
        .select_language("JS", |_: &LanguageProfile, _: &LanguageProfile| false)
        .unwrap();
    assert_eq!(outcome, SwitchOutcome::Declined);
    assert_eq!(bench.session().active_language().id, "Python");
    assert_eq!(bench.session().source(), "print('edited')");
    assert_eq!(bench.editor().value(), "print('edited')");
}

#[tokio::test]
async fn accepted_switch_loads_template_into_editor() {
    let client = Arc::new(ScriptedClient::new());
    let mut bench = workbench(client);
    bench.editor_mut().edit("print('edited')");

    let outcome = bench.select_language("JS", true).unwrap();
    assert_eq!(outcome, SwitchOutcome::Switched);
    let js = LanguageCatalog::builtin().resolve("JS").unwrap().clone();
    assert_eq!(bench.session().active_language().id, "JS");
    assert_eq!(bench.session().source(), js.default_source);
    assert_eq!(bench.editor().value(), js.default_source);
    assert_eq!(bench.session().transcript(), "");
}

#[tokio::test]
async fn late_response_after_switch_is_discarded_by_default() {
    let client =
        Arc::new(ScriptedClient::with_replies([ScriptedReply::output("python says hi")]).gated());
    let mut bench = workbench(Arc::clone(&client));

    bench.run();
    bench.select_language("JS", true).unwrap();
    assert_eq!(bench.session().status(), &RunStatus::Idle);

    client.release(1);
    let completion = bench.wait_for_completion().await.expect("completion");
    assert_eq!(completion.effect, CompletionEffect::Discarded);
    assert_eq!(bench.session().transcript(), "");
    assert_eq!(bench.session().status(), &RunStatus::Idle);
}

#[tokio::test]
async fn late_response_overwrites_when_last_write_wins() {
    let client =
        Arc::new(ScriptedClient::with_replies([ScriptedReply::output("python says hi")]).gated());
    let mut bench = Workbench::new(
        Session::default().with_stale_policy(StaleRunPolicy::Apply),
        TextBuffer::default(),
        Arc::clone(&client) as Arc<dyn runpad_runexec::ExecutionClient>,
        Handle::current(),
    );

    bench.run();
    bench.select_language("JS", true).unwrap();
    client.release(1);
    bench.settle().await;

    assert_eq!(bench.session().active_language().id, "JS");
    assert_eq!(bench.session().transcript(), "python says hi");
}

#[tokio::test]
async fn terminal_follows_transcript_changes() {
    let output: String = (0..50).map(|n| format!("{n}\n")).collect();
    let client = Arc::new(ScriptedClient::with_replies([ScriptedReply::output(output)]));
    let mut bench = workbench(client);
    let mut view = TerminalView::new(10);

    bench.run();
    assert!(view.sync(bench.session()));
    bench.settle().await;
    assert!(view.sync(bench.session()));
    assert_eq!(view.visible_lines(bench.session()).last(), Some(&"49"));
}

#[tokio::test]
async fn poll_without_completions_is_empty() {
    let client = Arc::new(ScriptedClient::new());
    let mut bench = workbench(client);
    assert!(bench.poll().is_empty());
    assert!(bench.wait_for_completion().await.is_none());
}

#[tokio::test]
async fn editor_edits_reach_session_immediately() {
    let mut bench = workbench(Arc::new(ScriptedClient::new()));

    bench.editor_mut().edit("print('edited')");
    assert_eq!(bench.session().source(), bench.editor().value());
    assert!(bench.session().has_unsaved_edits());

    bench.editor_mut().push_line("print('more')");
    assert_eq!(bench.session().source(), "print('edited')\nprint('more')");
    assert!(!bench.editor().has_pending_change());
}

#[tokio::test]
async fn edit_source_updates_editor_and_session_together() {
    let mut bench = workbench(Arc::new(ScriptedClient::new()));

    bench.edit_source("console.log(1)");
    assert_eq!(bench.editor().value(), "console.log(1)");
    assert_eq!(bench.session().source(), "console.log(1)");
    assert!(!bench.editor().has_pending_change());
    assert!(bench.needs_confirmation("JS").unwrap());
}
