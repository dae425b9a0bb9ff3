//! The fatal latch and error pages.

use serde_json::json;
use std::sync::Arc;
use wayfare::{Dispatcher, NavConfig, NavError, Request, TemplateOptions};
use wayfare_core::NullResponse;

mod common;
use common::{app, ran, run};

#[test]
fn test_die_latches_first_error() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.hook("main_prepare", |_, _| Err(NavError::with_code("boom", "E42")))
    });
    let mut nav = dispatcher.navigator();

    let first = nav.navigate(Request::get(""), NullResponse).unwrap_err();
    assert_eq!(first.message(), "boom");
    assert_eq!(first.code(), Some("E42"));

    let second = nav.die(NavError::custom("later failure"));
    assert!(Arc::ptr_eq(&first, &second));

    let again = nav.navigate(Request::get(""), NullResponse).unwrap_err();
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn test_dead_context_refuses_hooks() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let mut nav = dispatcher.navigator();
    nav.die(NavError::custom("gone"));

    match nav.run_hook("prepare", Some("main")) {
        Err(NavError::Fatal(fatal)) => assert_eq!(fatal.message(), "gone"),
        other => panic!("expected the latched error, got {:?}", other.map(|o| o.into_value())),
    }
}

#[test]
fn test_empty_message_gets_default() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let mut nav = dispatcher.navigator();
    let fatal = nav.die(NavError::custom(""));
    assert_eq!(fatal.message(), "There was an error. Please try again.");
}

#[test]
fn test_unknown_hook_is_fatal() {
    let dispatcher = Dispatcher::builder()
        .table(wayfare::HookTable::builder().constant("pre_navigate", false).build())
        .build()
        .unwrap();
    let (nav, response) = run(&dispatcher, Request::get(""));

    match nav.fatal_error().unwrap().cause() {
        NavError::HookNotFound { hook, .. } => assert_eq!(hook, "pre_loop"),
        other => panic!("unexpected cause: {other}"),
    }
    assert_eq!(response.status(), Some(500));
}

#[test]
fn test_missing_template_renders_not_found_page() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = Dispatcher::builder()
        .template_options(TemplateOptions::default().with_include_paths([dir.path()]))
        .build()
        .unwrap();
    let (nav, response) = run(&dispatcher, Request::get(""));

    let fatal = nav.fatal_error().unwrap();
    assert!(fatal.is_not_found());
    assert_eq!(fatal.message(), "404 - File not found");
    assert!(fatal.orig_message().unwrap().contains("main.html"));

    assert_eq!(response.status(), Some(404));
    assert_eq!(response.content_type().as_deref(), Some("text/html; charset=UTF-8"));
    assert!(response.body().contains("404 - File not found"));
}

#[test]
fn test_development_keeps_original_message() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = Dispatcher::builder()
        .config(NavConfig::default().with_development(true))
        .template_options(TemplateOptions::default().with_include_paths([dir.path()]))
        .build()
        .unwrap();
    let (nav, response) = run(&dispatcher, Request::get(""));

    let fatal = nav.fatal_error().unwrap();
    assert!(fatal.message().contains("main.html"));
    assert!(fatal.orig_message().is_none());
    assert_eq!(response.status(), Some(404));
}

#[test]
fn test_custom_error_template() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("oops.html"), "Sorry: [% message %] ([% code %])").unwrap();

    let config = NavConfig::from_json(r#"{"error_file": "oops.html"}"#).unwrap();
    let dispatcher = Dispatcher::builder()
        .config(config)
        .template_options(TemplateOptions::default().with_include_paths([dir.path()]))
        .extend(|t| {
            t.hook("main_prepare", |_, _| {
                Err(NavError::with_code("db down", "E500"))
            })
        })
        .build()
        .unwrap();
    let (_, response) = run(&dispatcher, Request::get(""));

    assert_eq!(response.status(), Some(500));
    assert_eq!(response.body(), "Sorry: db down (E500)");
}

#[test]
fn test_error_step_shows_stashed_error() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.hook("main_prepare", |nav, _| {
            nav.stash_mut().insert("error_step".into(), json!("main"));
            nav.stash_mut().insert("error".into(), json!("Could not <load>"));
            nav.jump("__error")?;
            Ok(json!(true))
        })
    });
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert!(!nav.is_dead());
    assert_eq!(response.status(), Some(500));
    assert!(response.body().contains("Could not &lt;load&gt;"));
}

#[test]
fn test_failure_after_output_is_only_logged() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.hook("post_print", |_, _| Err(NavError::custom("audit failed")))
    });
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert!(nav.is_dead());
    assert!(nav.output_ended());
    assert_eq!(nav.fatal_error().unwrap().message(), "audit failed");

    let captured = response.captured();
    assert_eq!(captured.sends, 1);
    assert_eq!(captured.status, Some(200));
    assert_eq!(captured.body, "Welcome main");
}

#[test]
fn test_dead_context_skips_post_navigate() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.hook("pre_loop", |nav, _| {
            nav.die(NavError::custom("shutting down"));
            Ok(json!(true))
        })
        .hook("post_navigate", |_, _| Ok(json!(null)))
    });
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert_eq!(nav.fatal_error().unwrap().message(), "shutting down");
    assert!(!nav.has_errors());
    assert!(!ran(&nav).iter().any(|(_, hook)| hook == "post_navigate"));
    assert!(!nav.output_ended());
    assert_eq!(response.status(), Some(500));
}
