//! Application entry point.
//!
//! A [`Dispatcher`] is built once per application and holds everything
//! requests share: the operation table, the configuration and the template
//! cache. Each request gets its own [`Navigator`].
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder()
//!     .config(NavConfig::default().with_valid_steps(["signup"]))
//!     .extend(|table| {
//!         table.constant("main_file_print", json!({"text": "Welcome"}))
//!     })
//!     .build()?;
//!
//! dispatcher.dispatch(Request::get("/signup"), response);
//! ```

use crate::{
    config::{ConfigError, NavConfig},
    error_page::render_error_page,
    hooks::base_builder,
    navigator::{Navigator, Shared},
    request::Request,
};
use std::sync::Arc;
use tracing::error;
use wayfare_core::{HookTable, HookTableBuilder, Response};
use wayfare_std::{TemplateCache, TemplateOptions};

type Extension = Box<dyn FnOnce(HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator>>;

/// Shared state of one application.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Shared,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.shared.config)
            .field("table", &self.shared.table)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// A dispatcher with the default table.
    pub fn new(config: NavConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// The configuration.
    pub fn config(&self) -> &NavConfig {
        &self.shared.config
    }

    /// The operation table.
    pub fn table(&self) -> &Arc<HookTable<Navigator>> {
        &self.shared.table
    }

    /// The template cache.
    pub fn templates(&self) -> &Arc<TemplateCache> {
        &self.shared.templates
    }

    /// A fresh navigator for one request.
    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.shared.clone())
    }

    /// Run `request` and answer it.
    ///
    /// A fatal failure is rendered as an error page on the same response,
    /// unless a step already ended it; then the failure is only logged.
    /// The navigator is returned for inspection.
    pub fn dispatch(&self, request: Request, response: impl Response + 'static) -> Navigator {
        let mut nav = self.navigator();
        if let Err(fatal) = nav.navigate(request, response) {
            if nav.output_ended() {
                error!(error = %fatal, "navigation failed after output was sent");
                return nav;
            }
            let page = render_error_page(&self.shared.templates, &fatal, &self.shared.config);
            if let Some(mut response) = nav.take_response() {
                page.send(response.as_mut());
            }
        }
        nav
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    config: Option<NavConfig>,
    table: Option<HookTable<Navigator>>,
    extensions: Vec<Extension>,
    templates: Option<Arc<TemplateCache>>,
}

impl DispatcherBuilder {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: NavConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the default table entirely.
    pub fn table(mut self, table: HookTable<Navigator>) -> Self {
        self.table = Some(table);
        self
    }

    /// Override entries of the table.
    ///
    /// Extensions run in order on top of the default (or given) table.
    pub fn extend<F>(mut self, f: F) -> Self
    where
        F: FnOnce(HookTableBuilder<Navigator>) -> HookTableBuilder<Navigator> + 'static,
    {
        self.extensions.push(Box::new(f));
        self
    }

    /// Share an existing template cache.
    pub fn templates(mut self, templates: Arc<TemplateCache>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Use a new template cache with `options`.
    pub fn template_options(self, options: TemplateOptions) -> Self {
        self.templates(Arc::new(TemplateCache::new(options)))
    }

    /// Check the configuration and assemble the dispatcher.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.check()?;

        let mut builder = match &self.table {
            Some(table) => table.derive(),
            None => base_builder(&config),
        };
        for extension in self.extensions {
            builder = extension(builder);
        }

        Ok(Dispatcher {
            shared: Shared {
                table: Arc::new(builder.build()),
                config: Arc::new(config),
                templates: self.templates.unwrap_or_default(),
            },
        })
    }
}
