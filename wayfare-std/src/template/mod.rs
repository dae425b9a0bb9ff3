//! Template cache and renderer.
//!
//! - [`TemplateCache`] - resolves identifiers to compiled [`Document`]s with
//!   staleness checks, negative caching and bounded eviction
//! - [`Compiler`] / [`Compiled`] - the black-box template engine seam, with
//!   [`TagCompiler`] as the default
//! - [`FileSystem`] / [`Clock`] - injectable I/O and time

mod cache;
mod compile;
mod error;
mod fs;
mod options;

pub use cache::{Document, TemplateCache, TemplateSource};
pub use compile::{Compiled, Compiler, TagCompiler, TagTemplate, escape_html};
pub use error::TemplateError;
pub use fs::{Clock, FileStat, FileSystem, OsFileSystem, SystemClock};
pub use options::{DEFAULT_NEGATIVE_STAT_TTL, DEFAULT_STAT_TTL, TemplateOptions};
