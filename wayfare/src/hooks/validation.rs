//! Form validation hooks.
//!
//! `info_complete` is `ready_validate && validate`. Rules come from
//! `hash_validation`, which defaults to the step's entry in
//! [`NavConfig::validation`](crate::NavConfig::validation).

use crate::navigator::Navigator;
use serde_json::Value;
use tracing::debug;
use wayfare_core::{HookTableBuilder, NavError};
use wayfare_std::validate::{Validator, has_data, rules_from_value};

pub(super) fn register(builder: HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator> {
    builder
        .hook("info_complete", |nav, call| {
            if !nav.run_hook("ready_validate", call.step)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(nav.run_hook("validate", call.step)?.is_truthy()))
        })
        .hook("ready_validate", |nav, call| {
            if let Some(ready) = nav.ready_validate_override() {
                return Ok(Value::Bool(ready));
            }
            if nav.run_hook("validate_when_data", call.step)?.is_truthy() {
                let rules = rules_from_value(nav.hook_value("hash_validation", call.step, &[])?)?;
                return Ok(Value::Bool(has_data(&rules, nav.form())));
            }
            Ok(Value::Bool(nav.request_method().eq_ignore_ascii_case("POST")))
        })
        .hook("validate_when_data", |nav, _| {
            Ok(Value::Bool(nav.config().validate_when_data))
        })
        .hook("hash_validation", |nav, call| {
            match nav.config().validation.get(call.step()) {
                Some(rules) => serde_json::to_value(rules)
                    .map_err(|e| NavError::Configuration(format!("invalid validation rules: {e}"))),
                None => Ok(Value::Null),
            }
        })
        .hook("validate", |nav, call| {
            let rules = rules_from_value(nav.hook_value("hash_validation", call.step, &[])?)?;
            if rules.is_empty() {
                return Ok(Value::Bool(true));
            }

            let errors = Validator::new(&rules)?.check(nav.form());
            if errors.is_empty() {
                return Ok(Value::Bool(true));
            }
            debug!(step = call.step(), failed = errors.len(), "validation failed");
            nav.add_to_errors(&errors);
            Ok(Value::Bool(false))
        })
}
