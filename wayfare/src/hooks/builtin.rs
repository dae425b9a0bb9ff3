//! The forbidden, error and login steps.
//!
//! None of them requires auth or ever completes, so running one always
//! renders its inline template.

use crate::{config::NavConfig, context::Accumulator, navigator::Navigator};
use serde_json::{Value, json};
use wayfare_core::{HookTableBuilder, NavError};

/// Shown in place of a rejected step.
pub const FORBIDDEN_TEMPLATE: &str = "<h1>Denied</h1>\
<p>You do not have access to the step <b>\"[% forbidden_step | html %]\"</b></p>";

/// Shown by the error step.
pub const ERROR_TEMPLATE: &str = "<h1>A fatal error occurred</h1>\
<p>Step: <b>\"[% error_step | html %]\"</b></p>\
<p>[% error | html %]</p>";

/// Shown when a step requires authentication.
pub const LOGIN_TEMPLATE: &str = "<form method=\"post\" name=\"[% form_name | html %]\" \
action=\"[% script_name | html %][% path_info | html %]\">\
<p>[% login_error | html %]</p>\
<input type=\"text\" name=\"username\" value=\"[% username | html %]\">\
<input type=\"password\" name=\"password\">\
<input type=\"submit\" value=\"Login\"></form>";

pub(super) fn register(builder: HookTableBuilder<Navigator>, config: &NavConfig) -> HookTableBuilder<Navigator> {
    let forbidden = &config.forbidden_step;
    let error = &config.error_step;
    let login = &config.login_step;

    builder
        .constant(format!("{forbidden}_require_auth"), false)
        .constant(format!("{forbidden}_info_complete"), false)
        .constant(format!("{forbidden}_file_print"), json!({ "text": FORBIDDEN_TEMPLATE }))
        .constant(format!("{forbidden}_status"), 403)
        .hook(format!("{forbidden}_hash_common"), |nav, _| {
            let stashed = nav.stash().get("forbidden_step").cloned().unwrap_or_default();
            common_with(nav, [("forbidden_step", stashed)])
        })
        .constant(format!("{error}_require_auth"), false)
        .constant(format!("{error}_info_complete"), false)
        .constant(format!("{error}_file_print"), json!({ "text": ERROR_TEMPLATE }))
        .constant(format!("{error}_status"), 500)
        .hook(format!("{error}_hash_common"), |nav, _| {
            let error_step = nav.stash().get("error_step").cloned().unwrap_or_default();
            let error = nav.stash().get("error").cloned().unwrap_or_default();
            common_with(nav, [("error_step", error_step), ("error", error)])
        })
        .constant(format!("{login}_require_auth"), false)
        .constant(format!("{login}_info_complete"), false)
        .constant(format!("{login}_file_print"), json!({ "text": LOGIN_TEMPLATE }))
        .hook(format!("{login}_hash_common"), |nav, _| {
            let auth = nav.auth();
            let login_error = auth.and_then(|a| a.error.clone()).map_or(Value::Null, Value::String);
            let user = auth.and_then(|a| a.user.clone()).map_or(Value::Null, Value::String);
            common_with(nav, [("login_error", login_error), ("login_user", user)])
        })
}

fn common_with<const N: usize>(nav: &Navigator, extra: [(&str, Value); N]) -> Result<Value, NavError> {
    let mut common = nav.accumulator(Accumulator::Common).clone();
    for (key, value) in extra {
        common.insert(key.to_string(), value);
    }
    Ok(Value::Object(common))
}
