//! Rendering hooks.
//!
//! `prepared_print` gathers the `hash_*` maps into swap and fill bindings and
//! hands them to `print`, which renders `file_print` through `swap_template`
//! and writes the result with `print_out`.

use crate::{context::Accumulator, navigator::Navigator};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use wayfare_core::{
    Fields, HookCall, HookTableBuilder, NavError, Outcome, fields_from, merge_fields, truthy,
};
use wayfare_std::TemplateSource;

lazy_static! {
    static ref STEP_DIRS: Regex = Regex::new(r"\B__+").expect("step dir regex is valid");
    static ref HAS_EXTENSION: Regex = Regex::new(r"\.\w+$").expect("extension regex is valid");
    static ref CHARSET: Regex = Regex::new(r"^[\w\-\.:\+]+$").expect("charset regex is valid");
}

const DEFAULT_STATUS: u16 = 200;

pub(super) fn register(builder: HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator> {
    builder
        .hook("hash_form", |nav, _| Ok(Value::Object(nav.form().clone())))
        .hook("hash_base", |nav, call| hash_base(nav, call.step))
        .hook("hash_common", |nav, _| accumulated(nav, Accumulator::Common))
        .hook("hash_errors", |nav, _| accumulated(nav, Accumulator::Errors))
        .hook("hash_fill", |nav, _| accumulated(nav, Accumulator::Fill))
        .hook("hash_swap", |nav, _| accumulated(nav, Accumulator::Swap))
        .hook("format_error", |_, call| Ok(call.arg(0).cloned().unwrap_or_default()))
        .hook("form_name", |nav, _| Ok(Value::String(nav.config().form_name.clone())))
        .outcome("prepared_print", prepared_print)
        .outcome("print", print)
        .hook("file_print", file_print)
        .hook("name_step", |_, call| Ok(Value::String(call.step().to_string())))
        .hook("name_module", |nav, _| Ok(Value::String(nav.config().name_module.clone())))
        .hook("swap_template", |nav, call| {
            let source = template_source(call.arg(0))?;
            let swap = fields_from(call.arg(1).cloned().unwrap_or_default());
            Ok(Value::String(nav.templates().process(&source, &swap)?))
        })
        .constant("fill_template", Value::Null)
        .hook("print_out", print_out)
        .hook("mimetype", |nav, _| Ok(Value::String(nav.config().mimetype.clone())))
        .hook("charset", |nav, _| Ok(Value::String(nav.config().charset.clone())))
        .constant("status", DEFAULT_STATUS)
        .hook("history", |nav, _| Ok(Value::String(nav.dump_history())))
}

fn accumulated(nav: &mut Navigator, which: Accumulator) -> Result<Value, NavError> {
    Ok(Value::Object(nav.accumulator(which).clone()))
}

fn hash_base(nav: &mut Navigator, step: Option<&str>) -> Result<Value, NavError> {
    let mut base = Fields::new();
    base.insert("script_name".into(), Value::String(nav.config().script_name.clone()));
    base.insert("path_info".into(), Value::String(nav.path_info().to_string()));
    let form_name = nav.hook_value("form_name", step, &[])?;
    base.insert("form_name".into(), form_name);

    let mut base = merge_fields([&base, nav.accumulator(Accumulator::Base)]);
    base.insert(
        nav.config().step_key.clone(),
        Value::String(step.unwrap_or_default().to_string()),
    );
    Ok(Value::Object(base))
}

fn prepared_print(nav: &mut Navigator, call: &HookCall<'_>) -> Result<Outcome<Navigator>, NavError> {
    let step = call.step;
    let mut gather = |hook: &str| nav.hook_value(hook, step, &[]).map(fields_from);
    let form = gather("hash_form")?;
    let base = gather("hash_base")?;
    let common = gather("hash_common")?;
    let swap = gather("hash_swap")?;
    let fill = gather("hash_fill")?;
    let errors = gather("hash_errors")?;

    let mut formatted = Fields::new();
    for (key, error) in errors {
        let error = nav.hook_value("format_error", step, &[error])?;
        formatted.insert(key, error);
    }
    if formatted.values().any(truthy) {
        formatted.insert("has_errors".into(), Value::from(1));
    }

    let swap = merge_fields([&form, &base, &common, &swap, &formatted]);
    let fill = merge_fields([&form, &base, &common, &fill]);
    nav.run_hook_with("print", step, &[Value::Object(swap), Value::Object(fill)])
}

fn print(nav: &mut Navigator, call: &HookCall<'_>) -> Result<Outcome<Navigator>, NavError> {
    let step = call.step;
    let swap = call.arg(0).cloned().unwrap_or_default();
    let fill = call.arg(1).cloned().unwrap_or_default();

    let file = nav.hook_value("file_print", step, &[])?;
    let rendered = match nav.hook_value("swap_template", step, &[file, swap])? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let output = match nav.hook_value("fill_template", step, &[Value::String(rendered.clone()), fill])? {
        Value::String(filled) => filled,
        _ => rendered,
    };
    nav.run_hook_with("print_out", step, &[Value::String(output)])
}

/// `<base_dir_rel>/<module>/<step>.<ext_print>`, with `__` in the step
/// name turned into directories.
fn file_print(nav: &mut Navigator, call: &HookCall<'_>) -> Result<Value, NavError> {
    let module = text_of(nav.hook_value("name_module", call.step, &[])?);
    let name = text_of(nav.hook_value("name_step", call.step, &[])?);
    if name.is_empty() {
        return Err(NavError::Configuration(format!(
            "name_step returned nothing for step {:?}",
            call.step()
        )));
    }

    let mut file = STEP_DIRS.replace_all(&name, "/").into_owned();
    if !HAS_EXTENSION.is_match(&file) {
        file.push('.');
        file.push_str(&nav.config().ext_print);
    }

    let mut path = String::new();
    for dir in [nav.config().base_dir_rel.as_str(), module.as_str()] {
        if !dir.is_empty() {
            path.push_str(dir);
            if !dir.ends_with('/') {
                path.push('/');
            }
        }
    }
    path.push_str(&file);
    Ok(Value::String(path))
}

fn template_source(file: Option<&Value>) -> Result<TemplateSource, NavError> {
    match file {
        Some(Value::String(identifier)) => Ok(TemplateSource::file(identifier.clone())),
        Some(Value::Object(map)) => match map.get("text") {
            Some(Value::String(text)) => Ok(TemplateSource::inline(text.clone())),
            _ => Err(NavError::Configuration(
                "inline template maps need a string \"text\" entry".into(),
            )),
        },
        other => Err(NavError::Configuration(format!(
            "file_print must return an identifier or {{\"text\": ...}}, got {}",
            other.unwrap_or(&Value::Null)
        ))),
    }
}

fn print_out(nav: &mut Navigator, call: &HookCall<'_>) -> Result<Value, NavError> {
    let body = call.arg(0).and_then(Value::as_str).unwrap_or_default().to_string();
    let mimetype = text_of(nav.hook_value("mimetype", call.step, &[])?);
    let charset = text_of(nav.hook_value("charset", call.step, &[])?);
    let content_type = if CHARSET.is_match(&charset) {
        format!("{mimetype}; charset={charset}")
    } else {
        mimetype
    };
    let status = nav
        .hook_value("status", call.step, &[])?
        .as_u64()
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(DEFAULT_STATUS);

    let response = nav
        .response_mut()
        .ok_or_else(|| NavError::Configuration("no response to print to".into()))?;
    response.set_status(status);
    response.send(&content_type, &body)?;
    response.end();
    nav.mark_output_ended();
    Ok(Value::Null)
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
