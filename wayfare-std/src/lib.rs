//! # wayfare-std
//!
//! Standard implementations for the Wayfare step-dispatch engine.
//!
//! This crate provides:
//! - **Templates**: [`TemplateCache`] with staleness checks, negative caching
//!   and bounded eviction, plus the default [`TagCompiler`]
//! - **Path-info maps**: [`PathInfoMap`] built on `matchit`
//! - **Validation**: [`Validator`] for per-field form rules
//! - **Testing**: in-memory filesystem, manual clock and captured response

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use wayfare_core;

// Modules
pub mod routing;
pub mod template;
pub mod testing;
pub mod validate;

pub use routing::PathInfoMap;
pub use template::{
    Clock, Compiled, Compiler, Document, FileStat, FileSystem, OsFileSystem, SystemClock,
    TagCompiler, TemplateCache, TemplateError, TemplateOptions, TemplateSource,
};
pub use validate::{FieldRule, RuleSet, Validator};
