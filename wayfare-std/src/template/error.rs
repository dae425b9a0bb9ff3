//! Template errors.

use std::io;
use thiserror::Error;
use wayfare_core::NavError;

/// Failures of the template subsystem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// The identifier could not be located (or was rejected).
    #[error("no template could be found for {identifier:?}: {reason}")]
    NotFound {
        /// Identifier that was looked up.
        identifier: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// The file was located but could not be read.
    #[error("template {identifier:?} could not be read: {message}")]
    Read {
        /// Identifier that was located.
        identifier: String,
        /// The I/O failure.
        message: String,
    },

    /// The source text failed to compile.
    #[error("template {identifier:?} failed to compile: {message}")]
    Compile {
        /// Identifier of the document (`inline` for inline text).
        identifier: String,
        /// Compiler message.
        message: String,
    },

    /// Rendering a compiled document failed.
    #[error("template {identifier:?} failed to render: {message}")]
    Render {
        /// Identifier of the document.
        identifier: String,
        /// Renderer message.
        message: String,
    },
}

impl TemplateError {
    pub(crate) fn not_found(identifier: &str, reason: impl Into<String>) -> Self {
        TemplateError::NotFound {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }

    /// Only `ErrorKind::NotFound` counts as a lookup failure.
    pub(crate) fn from_io(identifier: &str, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            return Self::not_found(identifier, err.to_string());
        }
        TemplateError::Read {
            identifier: identifier.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this is a lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TemplateError::NotFound { .. })
    }
}

impl From<TemplateError> for NavError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { identifier, reason } => {
                NavError::TemplateNotFound { identifier, reason }
            }
            TemplateError::Read {
                identifier,
                message,
            }
            | TemplateError::Compile {
                identifier,
                message,
            }
            | TemplateError::Render {
                identifier,
                message,
            } => NavError::TemplateRender {
                identifier,
                message,
            },
        }
    }
}
