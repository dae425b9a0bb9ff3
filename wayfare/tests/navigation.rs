//! Path building, step selection and the navigation loop.

use serde_json::{Value, json};
use wayfare::{NavConfig, NavError, Recorded, Request, Suppress};

mod common;
use common::{Recorder, app, inline, ran, run};

#[test]
fn test_default_step_renders_main() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert!(!nav.is_dead());
    assert_eq!(response.body(), "Welcome main");
    assert_eq!(response.status(), Some(200));
    assert_eq!(response.content_type().as_deref(), Some("text/html"));
    assert!(response.captured().ended);
    assert_eq!(nav.path(), ["main".to_string()]);
}

#[test]
fn test_charset_is_appended_when_valid() {
    let dispatcher = app(NavConfig::default().with_charset("UTF-8"), |t| t);
    let (_, response) = run(&dispatcher, Request::get(""));
    assert_eq!(response.content_type().as_deref(), Some("text/html; charset=UTF-8"));

    let dispatcher = app(NavConfig::default().with_charset("not valid"), |t| t);
    let (_, response) = run(&dispatcher, Request::get(""));
    assert_eq!(response.content_type().as_deref(), Some("text/html"));
}

#[test]
fn test_path_info_selects_step() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let (nav, response) = run(&dispatcher, Request::get("/signup/ignored"));

    assert_eq!(response.body(), "||");
    assert_eq!(nav.path(), ["signup".to_string()]);
    assert_eq!(nav.form()["step"], json!("signup"));
}

#[test]
fn test_path_info_extension_is_dropped() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let (nav, _) = run(&dispatcher, Request::get("/signup.html"));

    assert_eq!(nav.path(), ["signup".to_string()]);
}

#[test]
fn test_unlisted_step_is_forbidden() {
    let config = NavConfig::default().with_valid_steps(["signup"]);
    let dispatcher = app(config, |t| t);
    let (nav, response) = run(&dispatcher, Request::get("/admin"));

    assert_eq!(nav.path(), ["__forbidden".to_string()]);
    assert_eq!(response.status(), Some(403));
    assert!(response.body().contains("<b>\"admin\"</b>"), "{}", response.body());
}

#[test]
fn test_forbidden_step_keeps_original_in_stash() {
    let seen = Recorder::default();
    let hook_seen = seen.clone();
    let dispatcher = app(NavConfig::default(), move |t| {
        t.hook("__forbidden_prepare", move |nav, _| {
            hook_seen.push(nav.stash()["forbidden_step"].clone());
            Ok(json!(true))
        })
    });

    let (nav, _) = run(&dispatcher, Request::get("/_private"));
    assert_eq!(nav.path(), ["__forbidden".to_string()]);

    let (_, _) = run(&dispatcher, Request::get("").with_field("step", "bad-name"));
    assert_eq!(seen.values(), vec![json!("_private"), json!("bad-name")]);
}

#[test]
fn test_step_field_slashes_become_double_underscores() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.constant("admin__users_file_print", inline("users"))
    });
    let (nav, response) = run(&dispatcher, Request::get("").with_field("step", "/admin/users"));

    assert_eq!(nav.path(), ["admin__users".to_string()]);
    assert_eq!(response.body(), "users");
}

#[test]
fn test_default_and_error_steps_bypass_whitelist() {
    let config = NavConfig::default().with_valid_steps(["signup"]);
    let dispatcher = app(config, |t| t);
    let (nav, response) = run(&dispatcher, Request::get("/main"));

    assert_eq!(nav.path(), ["main".to_string()]);
    assert_eq!(response.body(), "Welcome main");
}

#[test]
fn test_recursion_limit_fails_on_nth_pass() {
    let config = NavConfig::default().with_recurse_limit(3);
    let dispatcher = app(config, |t| t.constant("main_info_complete", true));

    let mut nav = dispatcher.navigator();
    let fatal = nav
        .navigate(Request::get(""), wayfare_core::NullResponse)
        .unwrap_err();

    assert_eq!(nav.recurse_count(), 3);
    assert!(matches!(
        fatal.cause(),
        NavError::RecursionLimitExceeded { limit: 3, jumps: 0 }
    ));
    assert_eq!(fatal.message(), "recurse_limit (\"3\") reached");
}

#[test]
fn test_jump_finishes_step_without_rendering() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.hook("main_prepare", |nav, _| {
            nav.jump("signup")?;
            Ok(json!(true))
        })
    });
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert_eq!(nav.jumps(), 1);
    assert_eq!(nav.path(), ["main".to_string(), "signup".to_string()]);
    assert_eq!(response.body(), "||");
    assert_eq!(response.captured().sends, 1);
}

#[test]
fn test_step_path_info_map_fills_form() {
    let config = NavConfig::default().with_path_info_map("signup", ["/signup/{name}"]);
    let dispatcher = app(config, |t| t);

    let (_, response) = run(&dispatcher, Request::get("/signup/Bob"));
    assert_eq!(response.body(), "Bob||");

    let (_, response) = run(&dispatcher, Request::get("/signup/Bob").with_field("name", "Al"));
    assert_eq!(response.body(), "Al||");
}

#[test]
fn test_malformed_path_info_map_is_fatal() {
    let dispatcher = app(NavConfig::default(), |t| t.constant("main_path_info_map", "nope"));
    let (nav, response) = run(&dispatcher, Request::get(""));

    let fatal = nav.fatal_error().unwrap();
    assert!(matches!(fatal.cause(), NavError::Configuration(_)));
    assert_eq!(response.status(), Some(500));
}

#[test]
fn test_pre_navigate_can_take_over() {
    let dispatcher = app(NavConfig::default(), |t| t.constant("pre_navigate", true));
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert!(!nav.is_dead());
    assert_eq!(response.body(), "");
    assert!(nav.path().is_empty());
}

#[test]
fn test_suppressed_pre_navigate_is_skipped() {
    let config = NavConfig::default().with_suppress(Suppress::NO_PRE_NAVIGATE);
    let dispatcher = app(config, |t| t.constant("pre_navigate", true));
    let (_, response) = run(&dispatcher, Request::get(""));
    assert_eq!(response.body(), "Welcome main");
}

#[test]
fn test_post_navigate_failure_is_recovered() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.hook("post_navigate", |_, _| Err(NavError::custom("audit log unavailable")))
    });
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert!(!nav.is_dead());
    assert_eq!(response.body(), "Welcome main");
}

#[test]
fn test_hooks_run_in_lifecycle_order() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let (nav, _) = run(&dispatcher, Request::get(""));

    let main: Vec<String> = ran(&nav)
        .into_iter()
        .filter(|(step, _)| step == "main")
        .map(|(_, hook)| hook)
        .collect();
    let position = |hook: &str| main.iter().position(|h| h == hook).unwrap();

    // Entries are recorded when a hook returns, so nested hooks come first.
    assert!(position("require_auth") < position("morph"));
    assert!(position("morph") < position("run_step"));
    assert!(position("run_step") < position("unmorph"));
    assert!(position("pre_step") < position("prepare"));
    assert!(position("prepare") < position("info_complete"));
    assert!(position("info_complete") < position("print_out"));
    assert!(position("print_out") < position("prepared_print"));
    assert!(!main.iter().any(|h| h == "finalize"));
}

#[test]
fn test_history_records_levels_and_redacts() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let (mut nav, _) = run(&dispatcher, Request::get(""));

    let entries = nav.history().entries();
    let run_step = entries.iter().find(|e| e.hook == "run_step").unwrap();
    let prepare = entries.iter().find(|e| e.hook == "prepare").unwrap();
    assert_eq!(run_step.level, 1);
    assert_eq!(prepare.level, 2);
    assert_eq!(prepare.result, Recorded::Value(json!(true)));
    assert_eq!(nav.lineage().len(), entries.len() - 1);

    nav.run_hook("history", None).unwrap();
    let last = nav.history().entries().last().unwrap();
    assert_eq!(last.result, Recorded::TruncatedHistory);
    assert!(nav.dump_history().contains("main run_step (run_step)"));
}

#[test]
fn test_history_can_be_disabled() {
    let config = NavConfig::default().with_suppress(Suppress::NO_HISTORY);
    let dispatcher = app(config, |t| t);
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert_eq!(response.body(), "Welcome main");
    assert!(nav.history().is_empty());
}

#[test]
fn test_path_editing() {
    let dispatcher = app(NavConfig::default(), |t| t);
    let mut nav = dispatcher.navigator();

    nav.set_path(["a", "b"]).unwrap();
    assert_eq!(nav.current_step(), Some("a"));
    assert_eq!(nav.next_step(), Some("b"));
    assert_eq!(nav.previous_step(), None);

    nav.insert_path(["c"]).unwrap();
    assert_eq!(nav.path(), ["a", "c", "b"].map(String::from));

    nav.append_path(["d"]).unwrap();
    assert_eq!(nav.last_step(), Some("d"));

    nav.replace_path(["e"]).unwrap();
    assert_eq!(nav.path(), ["a", "e"].map(String::from));

    nav.jump("f").unwrap();
    assert_eq!(nav.path(), ["a", "f", "e"].map(String::from));
    assert_eq!(nav.first_step(), Some("a"));
    assert_eq!(nav.jumps(), 1);
}

#[test]
fn test_set_path_is_refused_once_running() {
    let refused = Recorder::default();
    let hook_refused = refused.clone();
    let dispatcher = app(NavConfig::default(), move |t| {
        t.hook("main_prepare", move |nav, _| {
            hook_refused.push(Value::Bool(nav.set_path(["signup"]).is_err()));
            Ok(json!(true))
        })
    });
    run(&dispatcher, Request::get(""));
    assert_eq!(refused.values(), vec![json!(true)]);
}

#[test]
fn test_inserted_invalid_step_becomes_forbidden() {
    let dispatcher = app(NavConfig::default(), |t| {
        t.hook("main_prepare", |nav, _| {
            nav.insert_path(["not-valid"])?;
            Ok(json!(true))
        })
        .constant("main_info_complete", true)
    });
    let (nav, response) = run(&dispatcher, Request::get(""));

    assert_eq!(nav.path()[1], "__forbidden");
    assert_eq!(response.status(), Some(403));
    assert!(response.body().contains("not-valid"));
}
