//! # wayfare - Convention-Driven Step Dispatch
//!
//! `wayfare` runs a request through a path of named steps. Each step goes
//! through a fixed lifecycle of hooks (`pre_step`, `prepare`,
//! `info_complete`, `finalize`, ...) and every hook can be overridden per
//! step by registering `<step>_<hook>` in the operation table.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wayfare::prelude::*;
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::builder()
//!     .config(NavConfig::from_json(r#"{
//!         "valid_steps": ["signup"],
//!         "validation": {"signup": {"name": {"required": true, "min_len": 3}}}
//!     }"#)?)
//!     .extend(|table| {
//!         table
//!             .constant("main_file_print", json!({"text": "Welcome"}))
//!             .constant("signup_file_print", json!({"text": "[% name_error %]"}))
//!             .hook("signup_finalize", |nav, _| {
//!                 nav.stash_mut().insert("saved".into(), json!(true));
//!                 Ok(json!(true))
//!             })
//!     })
//!     .build()?;
//!
//! dispatcher.dispatch(Request::get("/signup"), response);
//! ```
//!
//! ## Crates
//!
//! - [`wayfare_core`] - hooks, the operation table, history, errors
//! - [`wayfare_std`] - template cache, path-info maps, validation
//! - `wayfare` - the navigator, default hooks, configuration

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error_page;
pub mod hooks;
pub mod navigator;
pub mod request;
pub mod telemetry;

pub use config::{ConfigError, DEFAULT_RECURSE_LIMIT, NavConfig, Suppress};
pub use context::{Accumulator, Accumulators, DispatchContext};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error_page::{ErrorPage, render_error_page};
pub use hooks::base_table;
pub use navigator::{Navigator, is_step_name};
pub use request::{AuthState, Request};
pub use telemetry::TracingConfig;

pub use wayfare_core::{
    Constant, DynHook, FatalError, Fields, FnHook, History, HistoryEntry, Hook, HookCall,
    HookRef, HookResult, HookTable, HookTableBuilder, NavError, Outcome, Recorded, Response,
    fields_from, merge_fields, truthy,
};
pub use wayfare_std::{
    FieldRule, PathInfoMap, RuleSet, TemplateCache, TemplateError, TemplateOptions,
    TemplateSource, Validator,
};

/// Re-exports core crate
pub use wayfare_core;
/// Re-exports standard crate
pub use wayfare_std;

/// Everything needed to write an application.
pub mod prelude {
    pub use crate::{
        Accumulator, AuthState, Dispatcher, Fields, Hook, HookCall, HookResult, HookTable,
        NavConfig, NavError, Navigator, Outcome, Request, Response, Suppress, TemplateOptions,
        TracingConfig, fields_from,
    };
}
