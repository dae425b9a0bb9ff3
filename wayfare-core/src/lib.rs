//! # wayfare-core
//!
//! Core types for the Wayfare step-dispatch engine.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! applications that only define hooks, without pulling in the template
//! subsystem or the engine itself.
//!
//! # Building Blocks
//!
//! ## Hooks ([`Hook`])
//!
//! The unit of application logic. A hook receives the dispatch context and a
//! [`HookCall`] (step name plus arguments) and hands back an [`Outcome`].
//! Closures implement [`Hook`] directly.
//!
//! ## Operation table ([`HookTable`])
//!
//! Maps names such as `prepare` or `signup_prepare` to hooks. Applications
//! extend a base table with [`HookTable::derive`], overriding only the names
//! they care about. [`HookTable::resolve`] implements the lookup convention:
//! `<step>_<hook>` before `<hook>`.
//!
//! ## History ([`History`])
//!
//! An append-only record of every hook invocation, redacted so that
//! self-references and callables are stored by label.
//!
//! ## Field maps ([`Fields`])
//!
//! Forms and render accumulators, merged immutably with [`merge_fields`].
//!
//! # Error Types
//!
//! - [`NavError`] - Everything a hook or the engine can fail with
//! - [`FatalError`] - The latched error of a dead dispatch context

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod fields;
mod history;
mod hook;
mod response;
mod table;

// Re-exports
pub use error::{BoxError, DEFAULT_FATAL_MESSAGE, FatalError, NOT_FOUND_MESSAGE, NavError};
pub use fields::{Fields, fields_from, merge_fields, with_field};
pub use history::{HISTORY_HOOK, History, HistoryEntry, Recorded, epoch_seconds};
pub use hook::{Constant, DynHook, FnHook, Hook, HookCall, HookResult, Outcome, truthy};
pub use response::{NullResponse, Response};
pub use table::{DIRECT, HookRef, HookTable, HookTableBuilder, Resolved};
