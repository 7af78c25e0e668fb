//! # Remote Dispatcher Tests
//!
//! Lock and message ordering, debug-mode error propagation, polling and
//! overlapping state reloads.

#![allow(clippy::panic)]

mod common;

use bindery_core::{
    Application, BinderyError, DebugConfig, ReloadOutcome, RemoteOptions, RemoteOutcome,
    Settings, StateMap, TransportError, Value,
};
use common::{Harness, RecordingNotifier, Reply, run_local, settle};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn with_methods(methods: Value) -> Harness {
    let harness = Harness::new();
    harness.app.state().set_state("methods", methods, None);
    harness
}

async fn call(app: &Application, method: &str, options: &RemoteOptions) -> Result<RemoteOutcome, BinderyError> {
    app.remote_call(method, &json!({}), options).await
}

// =============================================================================
// FAILURE HANDLING
// =============================================================================

#[test]
fn unknown_method_fails_quietly_outside_debug() {
    run_local(async {
        let harness = with_methods(json!({}));

        let outcome = call(&harness.app, "ghost.save", &RemoteOptions::default())
            .await
            .expect("outcome");

        assert!(matches!(
            outcome,
            RemoteOutcome::Failure(BinderyError::UnknownRemoteMethod(name)) if name == "ghost.save"
        ));
        assert_eq!(
            harness.events(),
            vec!["lock:show", "lock:hide", "error:We couldn't save your changes."]
        );
    });
}

#[test]
fn unknown_method_raises_in_debug() {
    run_local(async {
        let harness = with_methods(json!({}));
        harness.app.enable_debug(DebugConfig::default());
        assert!(harness.app.is_debug());
        assert!(!harness.app.is_offline());

        let result = call(&harness.app, "ghost.save", &RemoteOptions::default()).await;

        assert!(matches!(result, Err(BinderyError::UnknownRemoteMethod(_))));
        // the user is still told before the error propagates
        assert_eq!(
            harness.events().last().map(String::as_str),
            Some("error:We couldn't save your changes.")
        );
    });
}

#[test]
fn transport_errors_never_raise() {
    run_local(async {
        let harness = with_methods(json!({"friend.save": ["post", "/save"]}));
        harness.app.enable_debug(DebugConfig::default());
        harness.transport.reply(
            "/save",
            Reply::err(TransportError::ConnectionFailed("/save".into())),
        );

        let outcome = call(&harness.app, "friend.save", &RemoteOptions::default())
            .await
            .expect("outcome");

        assert!(matches!(
            outcome,
            RemoteOutcome::Failure(BinderyError::Transport(TransportError::ConnectionFailed(_)))
        ));
    });
}

#[test]
fn malformed_entries_and_verbs_are_rejected() {
    run_local(async {
        let harness = with_methods(json!({
            "bad.shape": "/nowhere",
            "bad.verb": ["put", "/x"]
        }));

        let shape = call(&harness.app, "bad.shape", &RemoteOptions::silent())
            .await
            .expect("outcome");
        let verb = call(&harness.app, "bad.verb", &RemoteOptions::silent())
            .await
            .expect("outcome");

        assert!(matches!(shape, RemoteOutcome::Failure(BinderyError::MalformedMethodTable(_))));
        assert!(matches!(verb, RemoteOutcome::Failure(BinderyError::UnknownTransportVerb(v)) if v == "put"));
        assert!(harness.transport.requests.borrow().is_empty());
    });
}

#[test]
fn missing_transport_is_a_requirement_error() {
    run_local(async {
        let journal = Rc::default();
        let app = Application::new(Settings::default());
        app.install_notifier(Rc::new(RecordingNotifier(Rc::clone(&journal))));
        app.state()
            .set_state("methods", json!({"a.b": ["get", "/a"]}), None);

        let outcome = call(&app, "a.b", &RemoteOptions::default()).await.expect("outcome");

        assert!(matches!(
            outcome,
            RemoteOutcome::Failure(BinderyError::RequirementMissing("transport"))
        ));
    });
}

// =============================================================================
// OPTIONS
// =============================================================================

#[test]
fn background_calls_skip_the_lock() {
    run_local(async {
        let harness = with_methods(json!({"feed.get": ["get", "/feed"]}));

        let outcome = call(&harness.app, "feed.get", &RemoteOptions::default().background())
            .await
            .expect("outcome");

        assert!(outcome.is_success());
        assert_eq!(
            harness.events(),
            vec!["send:GET /feed", "message:Your changes have been saved."]
        );
    });
}

#[test]
fn silent_calls_show_no_message() {
    run_local(async {
        let harness = with_methods(json!({"feed.get": ["get", "/feed"]}));
        harness.transport.reply("/feed", Reply::ok(json!([1, 2])));

        let outcome = call(&harness.app, "feed.get", &RemoteOptions::silent())
            .await
            .expect("outcome");

        match outcome {
            RemoteOutcome::Success(value) => assert_eq!(value, json!([1, 2])),
            RemoteOutcome::Failure(e) => panic!("unexpected failure: {e}"),
        }
        assert_eq!(harness.events(), vec!["lock:show", "send:GET /feed", "lock:hide"]);
    });
}

#[test]
fn custom_messages_replace_network_defaults() {
    run_local(async {
        let harness = with_methods(json!({"feed.get": ["get", "/feed"]}));
        let options = RemoteOptions {
            success: Some("Feed refreshed.".into()),
            ..RemoteOptions::default()
        };

        call(&harness.app, "feed.get", &options).await.expect("outcome");

        assert_eq!(
            harness.events().last().map(String::as_str),
            Some("message:Feed refreshed.")
        );
    });
}

#[test]
fn lock_stays_up_until_the_response_arrives() {
    run_local(async {
        let harness = with_methods(json!({"slow.get": ["get", "/slow"]}));
        harness
            .transport
            .reply("/slow", Reply::ok(json!("done")).after(Duration::from_millis(500)));

        let pending = tokio::task::spawn_local({
            let app = harness.app.clone();
            async move { call(&app, "slow.get", &RemoteOptions::silent()).await }
        });
        settle(250).await;
        assert_eq!(harness.events(), vec!["lock:show", "send:GET /slow"]);

        settle(300).await;
        assert!(pending.await.expect("join").expect("outcome").is_success());
        assert_eq!(harness.events().last().map(String::as_str), Some("lock:hide"));
    });
}

// =============================================================================
// POLLING AND RELOADS
// =============================================================================

fn fast_polling() -> Harness {
    let mut settings = Settings::default();
    settings.network.poll_ms = 1000;
    Harness::with_settings(settings)
}

#[test]
fn poll_delivers_every_response_in_order() {
    run_local(async {
        let harness = fast_polling();
        harness
            .app
            .state()
            .set_state("methods", json!({"feed.get": ["get", "/feed"]}), None);
        for n in 1..=3 {
            harness.transport.reply("/feed", Reply::ok(json!(n)));
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let handle = harness
            .app
            .remote_poll("feed.get", &json!({}), move |value| sink.borrow_mut().push(value))
            .expect("poll");

        settle(10).await;
        assert_eq!(*seen.borrow(), vec![json!(1)]);
        settle(2000).await;
        assert_eq!(*seen.borrow(), vec![json!(1), json!(2), json!(3)]);

        handle.abort();
        settle(5000).await;
        assert_eq!(seen.borrow().len(), 3);
    });
}

#[test]
fn poll_of_unknown_method_fails_up_front() {
    let harness = with_methods(json!({}));
    let result = harness.app.remote_poll("ghost.get", &json!({}), |_| {});
    assert!(matches!(result, Err(BinderyError::UnknownRemoteMethod(_))));
}

#[test]
fn live_state_applies_each_poll() {
    run_local(async {
        let harness = fast_polling();
        let app = &harness.app;
        app.state()
            .set_state("methods", json!({"state.load": ["get", "/state"]}), None);
        harness.transport.reply("/state", Reply::ok(json!({"count": 1})));
        harness.transport.reply("/state", Reply::ok(json!({"count": 2})));

        app.live_state().expect("live");
        settle(10).await;
        assert_eq!(app.state().get("count"), Some(json!(1)));

        settle(1000).await;
        assert_eq!(app.state().get("count"), Some(json!(2)));

        // restarting replaces the previous subscription
        app.live_state().expect("live");
        settle(10).await;
        let before = harness.transport.requests.borrow().len();
        settle(1000).await;
        assert_eq!(harness.transport.requests.borrow().len(), before + 1);
    });
}

#[test]
fn overlapping_reloads_keep_the_latest() {
    run_local(async {
        let harness = with_methods(json!({"state.load": ["get", "/state"]}));
        harness.transport.reply(
            "/state",
            Reply::ok(json!({"v": "old"})).after(Duration::from_millis(200)),
        );
        harness.transport.reply(
            "/state",
            Reply::ok(json!({"v": "new"})).after(Duration::from_millis(10)),
        );

        let first = tokio::task::spawn_local({
            let app = harness.app.clone();
            async move { app.reload_state().await }
        });
        settle(1).await;
        let second = tokio::task::spawn_local({
            let app = harness.app.clone();
            async move { app.reload_state().await }
        });

        settle(300).await;
        assert_eq!(first.await.expect("join").expect("reload"), ReloadOutcome::Superseded);
        assert_eq!(second.await.expect("join").expect("reload"), ReloadOutcome::Applied);
        assert_eq!(harness.app.state().get("v"), Some(json!("new")));
    });
}

#[test]
fn remote_mode_waits_out_a_superseded_reload() {
    run_local(async {
        let harness = with_methods(json!({"state.load": ["get", "/state"]}));
        let mut patch = StateMap::new();
        patch.insert("mode".into(), json!("editing"));
        harness.app.define_mode("edit", patch, None);
        harness.transport.reply(
            "/state",
            Reply::ok(json!({"mode": "stale"})).after(Duration::from_millis(200)),
        );
        harness.transport.reply(
            "/state",
            Reply::ok(json!({"mode": "fresh"})).after(Duration::from_millis(10)),
        );

        let switch = tokio::task::spawn_local({
            let app = harness.app.clone();
            async move { app.set_mode("edit", true).await }
        });
        settle(1).await;
        let newer = tokio::task::spawn_local({
            let app = harness.app.clone();
            async move { app.reload_state().await }
        });

        settle(300).await;
        switch.await.expect("join").expect("set mode");
        assert_eq!(newer.await.expect("join").expect("reload"), ReloadOutcome::Applied);
        assert_eq!(harness.app.state().get("mode"), Some(json!("fresh")));
    });
}

#[test]
fn failed_reload_reports_false() {
    run_local(async {
        let harness = with_methods(json!({"state.load": ["get", "/state"]}));
        harness.transport.reply(
            "/state",
            Reply::err(TransportError::Parse("not json".into())),
        );

        assert_eq!(
            harness.app.reload_state().await.expect("reload"),
            ReloadOutcome::Failed
        );
    });
}
