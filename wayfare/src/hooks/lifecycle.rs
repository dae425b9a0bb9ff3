//! Lifecycle defaults: every halt hook is falsy and every gate is open.

use crate::navigator::Navigator;
use serde_json::Value;
use wayfare_core::HookTableBuilder;

pub(super) fn register(builder: HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator> {
    builder
        .constant("pre_navigate", false)
        .constant("post_navigate", Value::Null)
        .constant("pre_loop", false)
        .constant("post_loop", false)
        .constant("morph", Value::Null)
        .constant("unmorph", Value::Null)
        .hook("path_info_map", |nav, call| {
            Ok(nav
                .config()
                .path_info_map
                .get(call.step())
                .map_or(Value::Null, |patterns| Value::from(patterns.clone())))
        })
        .hook("run_step", |nav, call| nav.run_step(call.step()).map(Value::Bool))
        .constant("pre_step", false)
        .constant("skip", false)
        .constant("prepare", true)
        .constant("finalize", true)
        .constant("post_step", false)
        .constant("post_print", false)
}
