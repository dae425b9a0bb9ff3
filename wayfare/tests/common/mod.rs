#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use wayfare::{Dispatcher, HookTableBuilder, NavConfig, Navigator, Request};
use wayfare_std::testing::CapturedResponse;

pub const MAIN_PAGE: &str = "Welcome [% step %]";
pub const SIGNUP_PAGE: &str = "[% name %]|[% has_errors %]|[% name_error %]";

/// An inline `file_print` value.
pub fn inline(text: &str) -> Value {
    json!({ "text": text })
}

/// A table with inline pages for `main` and `signup`.
pub fn pages(table: HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator> {
    table
        .constant("main_file_print", inline(MAIN_PAGE))
        .constant("signup_file_print", inline(SIGNUP_PAGE))
}

/// A dispatcher with the inline pages plus `extend`.
pub fn app<F>(config: NavConfig, extend: F) -> Dispatcher
where
    F: FnOnce(HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator> + 'static,
{
    Dispatcher::builder()
        .config(config)
        .extend(pages)
        .extend(extend)
        .build()
        .unwrap()
}

/// Dispatch `request` and return the navigator with what was written.
pub fn run(dispatcher: &Dispatcher, request: Request) -> (Navigator, CapturedResponse) {
    let response = CapturedResponse::new();
    let nav = dispatcher.dispatch(request, response.clone());
    (nav, response)
}

/// Shared slot a hook can record into.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Value>>>);

impl Recorder {
    pub fn push(&self, value: Value) {
        self.0.lock().unwrap().push(value);
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.lock().unwrap().clone()
    }
}

/// The hooks that ran, in order, as `(step, hook)`.
pub fn ran(nav: &Navigator) -> Vec<(String, String)> {
    nav.history()
        .entries()
        .iter()
        .map(|entry| (entry.step.clone().unwrap_or_default(), entry.hook.clone()))
        .collect()
}
