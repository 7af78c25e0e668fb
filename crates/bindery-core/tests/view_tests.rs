//! # Mode, View and Surface Tests
//!
//! Covers view arrangement order, mode source tagging, remote-first modes,
//! confirm and alert modals, modal swapping and application start-up.

#![allow(clippy::panic)]

mod common;

use bindery_core::{
    BinderyError, DebugConfig, Element, ModeLogic, ReloadOutcome, RemoteOptions, RemoteOutcome,
    SourceTag, StartOptions, StateMap, SurfaceArgs, SurfaceHooks, TransportError, ViewSpec,
};
use common::{Harness, Reply, run_local, settle, surface};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn map(value: serde_json::Value) -> StateMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// Harness with a `welcome` modal, a `panel` interface and a `main` view
/// that shows both and then journals `logic`.
fn screen() -> Harness {
    let harness = Harness::new();
    let app = &harness.app;
    app.define_modal("welcome", surface("welcome"), SurfaceHooks::new());
    app.define_interface("panel", surface("panel"), SurfaceHooks::new());

    let journal = Rc::clone(&harness.journal);
    let logic: ModeLogic = Rc::new(move |_| {
        journal.borrow_mut().push("logic".into());
        Ok(())
    });
    app.define_view(
        "main",
        ViewSpec {
            state: map(json!({"page": "main"})),
            modals: vec!["welcome".into()],
            interfaces: vec!["panel".into()],
        },
        Some(logic),
    );
    harness
}

// =============================================================================
// VIEWS AND MODES
// =============================================================================

#[test]
fn view_hides_then_shows_then_runs_logic() {
    run_local(async {
        let harness = screen();
        harness.app.show_view("main", false).await.expect("view");

        assert_eq!(
            harness.events(),
            vec!["close", "hide", "close", "open:welcome", "hide", "show:panel", "logic"]
        );
        assert_eq!(harness.app.state().get("page"), Some(json!("main")));
    });
}

#[test]
fn mode_writes_carry_mode_source() {
    run_local(async {
        let harness = Harness::new();
        let sources = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sources);
        harness.app.state().bind_state(["page"], move |_, _, source| {
            sink.borrow_mut().push(source.cloned());
        });
        harness
            .app
            .define_mode("edit", map(json!({"page": "edit"})), None);

        harness.app.set_mode("edit", false).await.expect("mode");

        assert_eq!(*sources.borrow(), vec![Some(SourceTag::named("mode"))]);
    });
}

#[test]
fn unknown_mode_is_an_error() {
    run_local(async {
        let harness = Harness::new();
        let result = harness.app.set_mode("nope", false).await;
        assert!(matches!(result, Err(BinderyError::UnknownMode(name)) if name == "nope"));
    });
}

#[test]
fn remote_mode_reloads_before_applying() {
    run_local(async {
        let harness = Harness::new();
        let app = &harness.app;
        app.state()
            .set_state("methods", json!({"state.load": ["get", "/state"]}), None);
        harness
            .transport
            .reply("/state", Reply::ok(json!({"user": "ada"})));

        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let logic: ModeLogic = Rc::new(move |app| {
            *sink.borrow_mut() = app.state().get("user");
            Ok(())
        });
        app.define_mode("profile", map(json!({"page": "profile"})), Some(logic));

        app.set_mode("profile", true).await.expect("mode");

        assert_eq!(*seen.borrow(), Some(json!("ada")));
        assert_eq!(app.state().get("page"), Some(json!("profile")));
        assert_eq!(
            harness.events(),
            vec!["lock:show", "send:GET /state", "lock:hide"]
        );
    });
}

#[test]
fn failed_reload_leaves_mode_unapplied() {
    run_local(async {
        let harness = Harness::new();
        let app = &harness.app;
        app.state()
            .set_state("methods", json!({"state.load": ["get", "/state"]}), None);
        harness.transport.reply(
            "/state",
            Reply::err(TransportError::ConnectionFailed("/state".into())),
        );
        app.define_mode("profile", map(json!({"page": "profile"})), None);

        app.set_mode("profile", true).await.expect("mode");

        assert!(!app.state().has_state("page"));
    });
}

// =============================================================================
// MODALS
// =============================================================================

#[test]
fn confirm_without_changes_resolves_immediately() {
    run_local(async {
        let harness = Harness::new();
        harness.app.define_confirm_modal("confirm", surface("confirm"));

        let accepted = harness
            .app
            .confirm("confirm", json!(["a", "b"]), json!("b, a"))
            .await
            .expect("confirm");

        assert!(accepted);
        assert!(harness.events().is_empty());
    });
}

#[test]
fn confirm_shows_difference_and_waits_for_response() {
    run_local(async {
        let harness = Harness::new();
        let app = harness.app.clone();
        app.define_confirm_modal("confirm", surface("confirm"));

        let pending = tokio::task::spawn_local({
            let app = app.clone();
            async move { app.confirm("confirm", json!(["a", "b"]), json!(["b", "c"])).await }
        });
        settle(1).await;

        assert_eq!(
            harness.events(),
            vec![
                "fill:added-count=1",
                "fill:removed-count=1",
                "list:added=c",
                "list:removed=a",
                "close",
                "open:confirm"
            ]
        );

        assert!(app.respond_modal("confirm", false).expect("respond"));
        let accepted = pending.await.expect("join").expect("confirm");
        assert!(!accepted);
        assert_eq!(harness.events().last().map(String::as_str), Some("close"));
    });
}

#[test]
fn confirm_pads_empty_side_with_message() {
    run_local(async {
        let harness = Harness::new();
        let app = harness.app.clone();
        app.define_confirm_modal("confirm", surface("confirm"));

        let pending = tokio::task::spawn_local({
            let app = app.clone();
            async move { app.confirm("confirm", json!([]), json!("x@y.com")).await }
        });
        settle(1).await;

        assert!(harness.events().contains(&"list:removed=No changes.".to_string()));
        app.respond_modal("confirm", true).expect("respond");
        assert!(pending.await.expect("join").expect("confirm"));
    });
}

#[test]
fn alert_fills_slots_and_resumes_on_any_response() {
    run_local(async {
        let harness = Harness::new();
        let app = harness.app.clone();
        app.define_alert_modal("alert", surface("alert"));

        let pending = tokio::task::spawn_local({
            let app = app.clone();
            async move { app.alert("alert", "Saved", "All done").await }
        });
        settle(1).await;
        assert_eq!(
            harness.events(),
            vec!["fill:title=Saved", "fill:message=All done", "close", "open:alert"]
        );

        assert!(app.respond_modal("alert", false).expect("respond"));
        pending.await.expect("join").expect("alert");
    });
}

#[test]
fn respond_without_waiting_caller_still_hides() {
    let harness = Harness::new();
    harness.app.define_confirm_modal("confirm", surface("confirm"));
    assert!(!harness.app.respond_modal("confirm", true).expect("respond"));
    assert_eq!(harness.events(), vec!["close"]);
}

#[test]
fn swap_modal_waits_between_hide_and_show() {
    run_local(async {
        let harness = Harness::new();
        let app = harness.app.clone();
        app.define_modal("first", surface("first"), SurfaceHooks::new());
        app.define_modal("second", surface("second"), SurfaceHooks::new());
        app.show_modal("first", &SurfaceArgs::new()).expect("show");
        harness.clear();

        let swap = tokio::task::spawn_local({
            let app = app.clone();
            async move { app.swap_modal("second", SurfaceArgs::new()).await }
        });
        settle(50).await;
        assert_eq!(harness.events(), vec!["close"]);

        settle(60).await;
        assert_eq!(harness.events(), vec!["close", "close", "open:second"]);
        assert!(swap.await.expect("join").expect("swap"));
    });
}

#[test]
fn refresh_hook_can_veto_showing() {
    let harness = Harness::new();
    harness.app.define_interface(
        "locked",
        surface("locked"),
        SurfaceHooks::new().on_refresh(|_, args| Ok(args.get("open").is_some())),
    );

    assert!(!harness.app.show_interface("locked", &SurfaceArgs::new()).expect("show"));
    assert!(harness.events().is_empty());
    assert!(harness
        .app
        .show_interface("locked", &SurfaceArgs::new().with("open", json!(true)))
        .expect("show"));
    assert_eq!(harness.events(), vec!["hide", "show:locked"]);
}

#[test]
fn unknown_surface_names_its_kind() {
    let harness = Harness::new();
    let err = harness
        .app
        .show_modal("ghost", &SurfaceArgs::new())
        .expect_err("unknown");
    assert_eq!(err.to_string(), "Unknown modal: ghost");
}

// =============================================================================
// START
// =============================================================================

#[test]
fn start_prepares_seeds_and_shows_view() {
    run_local(async {
        let harness = screen();
        let app = &harness.app;

        app.start(map(json!({"user": "ada"})), "main", StartOptions::default())
            .await
            .expect("start");

        let modal = app.get_modal("welcome").expect("modal");
        let panel = app.get_interface("panel").expect("interface");
        assert!(modal.has_class("modal"));
        assert!(panel.has_class("interface"));
        assert_eq!(app.state().get("user"), Some(json!("ada")));
        assert_eq!(harness.events().last().map(String::as_str), Some("logic"));
    });
}

#[test]
fn start_bootstraps_from_url() {
    run_local(async {
        let harness = screen();
        harness
            .transport
            .reply("/boot", Reply::ok(json!({"user": "grace"})));

        harness
            .app
            .start("/boot", "main", StartOptions::default())
            .await
            .expect("start");

        assert_eq!(harness.app.state().get("user"), Some(json!("grace")));
        assert_eq!(
            harness.app.state().get("methods"),
            Some(json!({"state.load": ["get", "/boot"]}))
        );
        assert_eq!(&harness.events()[..3], ["lock:show", "send:GET /boot", "lock:hide"]);
    });
}

#[test]
fn failed_bootstrap_aborts_start() {
    run_local(async {
        let harness = screen();
        harness.transport.reply(
            "/boot",
            Reply::err(TransportError::Status {
                status: 503,
                body: "down".into(),
            }),
        );

        let result = harness
            .app
            .start("/boot", "main", StartOptions::default())
            .await;

        assert!(matches!(result, Err(BinderyError::BootstrapFailed(url)) if url == "/boot"));
        assert!(!harness.events().contains(&"logic".to_string()));
    });
}

#[test]
fn warn_option_guards_unsaved_changes() {
    run_local(async {
        let harness = screen();
        let options = StartOptions {
            warn: true,
            ..StartOptions::default()
        };
        harness
            .app
            .start(StateMap::new(), "main", options)
            .await
            .expect("start");

        assert_eq!(harness.app.unload_warning(), None);
        harness.app.dirty_state();
        assert_eq!(
            harness.app.unload_warning().as_deref(),
            Some("You have unsaved changes.")
        );
        harness.app.clean_state();
        assert_eq!(harness.app.unload_warning(), None);
    });
}

#[test]
fn offline_debug_answers_from_canned_responses() {
    run_local(async {
        let harness = screen();
        let app = harness.app.clone();
        let options = StartOptions {
            debug: Some(DebugConfig {
                offline: Some(map(json!({
                    "/hello": {"greeting": "hi"},
                    "*": "%state%"
                }))),
                latency_ms: 3000,
                testing: Some(map(json!({"name": "tester"}))),
            }),
            ..StartOptions::default()
        };
        let seed = map(json!({
            "methods": {
                "state.load": ["get", "/state"],
                "hello.save": ["post", "/hello"]
            }
        }));

        app.start(seed, "main", options).await.expect("start");
        assert!(app.is_debug());
        assert!(app.is_offline());
        assert_eq!(app.state().get("name"), Some(json!("tester")));

        let call = tokio::task::spawn_local({
            let app = app.clone();
            async move {
                app.remote_call("hello.save", &json!({"name": "tester"}), &RemoteOptions::default())
                    .await
            }
        });
        settle(2999).await;
        assert!(!call.is_finished());
        settle(2).await;
        match call.await.expect("join").expect("call") {
            RemoteOutcome::Success(value) => assert_eq!(value, json!({"greeting": "hi"})),
            RemoteOutcome::Failure(e) => panic!("offline call failed: {e}"),
        }

        assert_eq!(app.reload_state().await.expect("reload"), ReloadOutcome::Applied);
        assert_eq!(app.state().get("name"), Some(json!("tester")));
        assert!(harness.transport.requests.borrow().is_empty());
    });
}
