//! Error types for Wayfare.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`NavError`] - Every failure a hook, the resolver or the navigation loop can raise
//! - [`FatalError`] - The latched form of a failure, shared by a dead dispatch context

use std::{fmt, io, sync::Arc};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Message used when a fatal cause carries no text of its own.
pub const DEFAULT_FATAL_MESSAGE: &str = "There was an error. Please try again.";

/// Message shown in place of a not-found cause outside development mode.
pub const NOT_FOUND_MESSAGE: &str = "404 - File not found";

/// Errors raised while dispatching a request.
#[derive(Error, Debug)]
pub enum NavError {
    /// Neither the step-scoped nor the plain hook name is registered.
    #[error("could not find a hook named {}", describe_lookup(.hook, .step.as_deref()))]
    HookNotFound {
        /// The plain hook name that was requested.
        hook: String,
        /// The step the lookup was scoped to, if any.
        step: Option<String>,
    },

    /// The navigation loop ran `limit` times without a step halting it.
    #[error("recurse_limit (\"{limit}\") reached{}", describe_jumps(.jumps))]
    RecursionLimitExceeded {
        /// The configured limit.
        limit: usize,
        /// Number of explicit jumps made during the navigation.
        jumps: usize,
    },

    /// A submitted step name is not a usable identifier.
    #[error("invalid step name: {0:?}")]
    InvalidStepName(String),

    /// A template could not be located.
    #[error("no template could be found for {identifier:?}: {reason}")]
    TemplateNotFound {
        /// The identifier that was looked up.
        identifier: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// A template failed to compile or render.
    #[error("template {identifier:?} failed: {message}")]
    TemplateRender {
        /// The identifier of the failing document.
        identifier: String,
        /// The compiler or renderer message.
        message: String,
    },

    /// A hook or configuration value is malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An I/O failure surfaced by a hook.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A failure raised by application hooks.
    #[error("{message}")]
    Custom {
        /// Human readable message (may be empty).
        message: String,
        /// Optional origin code, preserved through the fatal latch.
        code: Option<String>,
    },

    /// The dispatch context is already dead; carries the latched error.
    #[error(transparent)]
    Fatal(Arc<FatalError>),
}

fn describe_lookup(hook: &str, step: Option<&str>) -> String {
    match step {
        Some(step) => format!("{step}_{hook} or {hook}"),
        None => hook.to_string(),
    }
}

fn describe_jumps(jumps: &usize) -> String {
    if *jumps > 1 {
        format!(" number of jumps ({jumps})")
    } else {
        String::new()
    }
}

impl NavError {
    /// Create an application error with a message.
    pub fn custom(message: impl Into<String>) -> Self {
        NavError::Custom {
            message: message.into(),
            code: None,
        }
    }

    /// Create an application error with a message and an origin code.
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        NavError::Custom {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// The origin code of this error, if it has one.
    pub fn code(&self) -> Option<String> {
        match self {
            NavError::Custom { code, .. } => code.clone(),
            NavError::Io(err) => err.raw_os_error().map(|errno| errno.to_string()),
            NavError::TemplateNotFound { .. } => Some("404".to_string()),
            NavError::Fatal(fatal) => fatal.code().map(str::to_string),
            _ => None,
        }
    }

    /// Whether this error means a file (or template) does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            NavError::TemplateNotFound { .. } => true,
            NavError::Io(err) => err.kind() == io::ErrorKind::NotFound,
            NavError::Fatal(fatal) => fatal.is_not_found(),
            _ => false,
        }
    }
}

/// The error a dispatch context latches when it dies.
///
/// Built once from the first fatal cause; every later fatal trigger on the
/// same context hands back the same `Arc<FatalError>`.
#[derive(Debug)]
pub struct FatalError {
    message: String,
    orig_message: Option<String>,
    code: Option<String>,
    not_found: bool,
    cause: NavError,
}

impl FatalError {
    /// Wrap a cause.
    ///
    /// Empty messages are replaced with [`DEFAULT_FATAL_MESSAGE`]. Outside
    /// development mode a not-found cause is shown as [`NOT_FOUND_MESSAGE`]
    /// and the original text is kept in [`orig_message`](Self::orig_message).
    pub fn new(cause: NavError, is_development: bool) -> Self {
        let mut message = cause.to_string();
        let mut orig_message = None;

        if message.trim().is_empty() {
            message = DEFAULT_FATAL_MESSAGE.to_string();
        }

        let not_found = cause.is_not_found();
        if not_found && !is_development {
            orig_message = Some(std::mem::replace(
                &mut message,
                NOT_FOUND_MESSAGE.to_string(),
            ));
        }

        Self {
            message,
            orig_message,
            code: cause.code(),
            not_found,
            cause,
        }
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The cause's own message when it was replaced by a safe one.
    pub fn orig_message(&self) -> Option<&str> {
        self.orig_message.as_deref()
    }

    /// The origin code carried over from the cause.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Whether the cause was a missing file or template.
    pub fn is_not_found(&self) -> bool {
        self.not_found
    }

    /// The wrapped cause.
    pub fn cause(&self) -> &NavError {
        &self.cause
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl From<BoxError> for NavError {
    fn from(err: BoxError) -> Self {
        NavError::custom(err.to_string())
    }
}
