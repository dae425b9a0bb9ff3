//! Authentication hooks.
//!
//! A step requires auth when [`NavConfig::require_auth`](crate::NavConfig)
//! is set or the step is listed in `auth_steps`. `get_valid_auth` either
//! accepts the request or renders the login step and halts.
//!
//! Credentials are read from the `username` and `password` form fields and
//! checked by `verify_user` against `get_pass_by_user`, which applications
//! must provide.

use crate::{navigator::Navigator, request::AuthState};
use serde_json::Value;
use tracing::{debug, info};
use wayfare_core::{HookTableBuilder, NavError};

const USER_FIELD: &str = "username";
const PASS_FIELD: &str = "password";

pub(super) fn register(builder: HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator> {
    builder
        .hook("require_auth", |nav, call| {
            let config = nav.config();
            Ok(Value::Bool(
                config.require_auth || config.auth_steps.contains(call.step()),
            ))
        })
        .hook("get_valid_auth", |nav, call| {
            if nav.run_hook("check_valid_auth", call.step)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let login = nav.config().login_step.clone();
            debug!(step = call.step(), "authentication required, showing {login}");
            nav.run_hook("prepared_print", Some(login.as_str()))?;
            nav.run_hook("post_print", Some(login.as_str()))?;
            Ok(Value::Bool(false))
        })
        .hook("check_valid_auth", |nav, call| {
            if nav.is_authed() {
                return Ok(Value::Bool(true));
            }
            let (Some(user), Some(pass)) = (credential(nav, USER_FIELD), credential(nav, PASS_FIELD)) else {
                return Ok(Value::Bool(false));
            };

            let user = match nav.hook_value("cleanup_user", call.step, &[Value::String(user)])? {
                Value::String(user) => user,
                _ => return Ok(Value::Bool(false)),
            };
            let verified = nav
                .run_hook_with("verify_user", call.step, &[Value::String(user.clone()), Value::String(pass)])?
                .is_truthy();

            if verified {
                info!(user = %user, "user authenticated");
                nav.set_auth(AuthState::valid(user));
            } else {
                info!(user = %user, "authentication failed");
                nav.set_auth(AuthState::failed(Some(user), "Invalid login"));
            }
            Ok(Value::Bool(verified))
        })
        .hook("cleanup_user", |_, call| Ok(call.arg(0).cloned().unwrap_or_default()))
        .hook("verify_user", |nav, call| {
            let Some(user) = call.arg(0).cloned() else {
                return Ok(Value::Bool(false));
            };
            let expected = nav.hook_value("get_pass_by_user", call.step, &[user])?;
            Ok(Value::Bool(
                expected.is_string() && Some(&expected) == call.arg(1),
            ))
        })
        .hook("get_pass_by_user", |_, _| {
            Err(NavError::Configuration(
                "get_pass_by_user must be provided to authenticate users".into(),
            ))
        })
}

fn credential(nav: &Navigator, field: &str) -> Option<String> {
    nav.form()
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
