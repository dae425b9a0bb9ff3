//! Rendering of fatal errors.
//!
//! A dead navigation has no step left to render, so the dispatcher renders
//! the latched [`FatalError`] on its own: not-found failures use
//! [`NavConfig::not_found_file`], everything else [`NavConfig::error_file`],
//! each falling back to a built-in page.

use crate::config::NavConfig;
use serde_json::Value;
use tracing::warn;
use wayfare_core::{FatalError, Fields, Response};
use wayfare_std::{TemplateCache, TemplateSource};

/// Built-in page for not-found failures.
pub const NOT_FOUND_PAGE: &str = "<h1>Not Found</h1><p>[% message | html %]</p>";

/// Built-in page for other failures.
pub const ERROR_PAGE: &str = "<h1>Error</h1><p>[% message | html %]</p><pre>[% detail | html %]</pre>";

/// A rendered error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    /// 404 for not-found failures, otherwise 500.
    pub status: u16,
    /// Content type from [`NavConfig::error_mimetype`].
    pub content_type: String,
    /// The page.
    pub body: String,
}

impl ErrorPage {
    /// Write the page to `response`.
    pub fn send(&self, response: &mut dyn Response) {
        response.set_status(self.status);
        if let Err(err) = response.send(&self.content_type, &self.body) {
            warn!(error = %err, "failed to send error page");
        }
        response.end();
    }
}

/// Render `fatal` for the client.
///
/// Template failures fall back to the built-in page.
pub fn render_error_page(templates: &TemplateCache, fatal: &FatalError, config: &NavConfig) -> ErrorPage {
    let (status, file, builtin) = if fatal.is_not_found() {
        (404, config.not_found_file.as_deref(), NOT_FOUND_PAGE)
    } else {
        (500, config.error_file.as_deref(), ERROR_PAGE)
    };

    let mut bindings = Fields::new();
    bindings.insert("message".into(), Value::String(fatal.message().to_string()));
    bindings.insert("is_dev".into(), Value::Bool(config.is_development));
    if let Some(code) = fatal.code() {
        bindings.insert("code".into(), Value::String(code.to_string()));
    }
    if config.is_development {
        bindings.insert("detail".into(), Value::String(format!("{:?}", fatal.cause())));
    }

    let body = file
        .and_then(|file| {
            templates
                .process(&TemplateSource::file(file), &bindings)
                .inspect_err(|err| warn!(file, error = %err, "error page template failed"))
                .ok()
        })
        .or_else(|| {
            templates
                .process(&TemplateSource::inline(builtin), &bindings)
                .inspect_err(|err| warn!(error = %err, "built-in error page failed"))
                .ok()
        })
        .unwrap_or_else(|| fatal.message().to_string());

    ErrorPage {
        status,
        content_type: config.error_mimetype.clone(),
        body,
    }
}
