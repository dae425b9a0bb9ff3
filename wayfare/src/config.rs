//! Engine configuration.
//!
//! [`NavConfig`] replaces the per-application overrides of simple settings
//! (step names, limits, output type). Everything that needs logic is a hook
//! instead. Configs load from JSON with every field optional:
//!
//! ```json
//! {
//!   "default_step": "main",
//!   "valid_steps": ["main", "signup"],
//!   "validation": { "signup": { "name": { "required": true, "min_len": 3 } } },
//!   "suppress": "NO_HISTORY"
//! }
//! ```

use bitflags::bitflags;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use wayfare_core::NavError;
use wayfare_std::RuleSet;

use crate::navigator::is_step_name;

/// Iterations of the navigation loop allowed per request.
pub const DEFAULT_RECURSE_LIMIT: usize = 15;

bitflags! {
    /// Parts of navigation that can be switched off.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Suppress: u8 {
        /// Do not record hook invocations.
        const NO_HISTORY = 1;
        /// Do not run `pre_navigate`.
        const NO_PRE_NAVIGATE = 1 << 1;
        /// Do not run `post_navigate`.
        const NO_POST_NAVIGATE = 1 << 2;
    }
}

impl<'de> Deserialize<'de> for Suppress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The JSON did not parse.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value parsed but is unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for NavError {
    fn from(err: ConfigError) -> Self {
        NavError::Configuration(err.to_string())
    }
}

/// Settings of the navigation engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Navigation loop iterations before giving up.
    pub recurse_limit: usize,
    /// Step run when the path is exhausted.
    pub default_step: String,
    /// Step substituted for rejected step names.
    pub forbidden_step: String,
    /// Step used to display errors.
    pub error_step: String,
    /// Step shown when authentication is required.
    pub login_step: String,
    /// Form field that names the requested step.
    pub step_key: String,
    /// Whitelist of steps that may be requested; `None` allows any.
    pub valid_steps: Option<BTreeSet<String>>,
    /// Development mode shows raw error messages.
    pub is_development: bool,
    /// Overrides the request method seen by `ready_validate`.
    pub request_method: Option<String>,
    /// Every step requires authentication.
    pub require_auth: bool,
    /// Steps that require authentication even without `require_auth`.
    pub auth_steps: BTreeSet<String>,
    /// Validate whenever a validated field is present, not only on POST.
    pub validate_when_data: bool,
    /// Validation rules per step.
    pub validation: BTreeMap<String, RuleSet>,
    /// Patterns applied to the path-info before the path is built.
    /// `None` means `/{<step_key>}`.
    pub path_info_map_base: Option<Vec<String>>,
    /// Patterns applied to the path-info when a step starts.
    pub path_info_map: BTreeMap<String, Vec<String>>,
    /// Directory prefix of step templates.
    pub base_dir_rel: String,
    /// Module directory between `base_dir_rel` and the step.
    pub name_module: String,
    /// Extension appended to step templates.
    pub ext_print: String,
    /// Content type of rendered steps.
    pub mimetype: String,
    /// Charset appended to the content type when set.
    pub charset: String,
    /// Name of the form in rendered pages.
    pub form_name: String,
    /// Script name exposed to templates.
    pub script_name: String,
    /// Template rendered for not-found failures.
    pub not_found_file: Option<String>,
    /// Template rendered for other fatal failures.
    pub error_file: Option<String>,
    /// Content type of error pages.
    pub error_mimetype: String,
    /// Switched-off parts of navigation.
    pub suppress: Suppress,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            recurse_limit: DEFAULT_RECURSE_LIMIT,
            default_step: "main".to_string(),
            forbidden_step: "__forbidden".to_string(),
            error_step: "__error".to_string(),
            login_step: "__login".to_string(),
            step_key: "step".to_string(),
            valid_steps: None,
            is_development: false,
            request_method: None,
            require_auth: false,
            auth_steps: BTreeSet::new(),
            validate_when_data: false,
            validation: BTreeMap::new(),
            path_info_map_base: None,
            path_info_map: BTreeMap::new(),
            base_dir_rel: String::new(),
            name_module: String::new(),
            ext_print: "html".to_string(),
            mimetype: "text/html".to_string(),
            charset: String::new(),
            form_name: "theform".to_string(),
            script_name: String::new(),
            not_found_file: None,
            error_file: None,
            error_mimetype: "text/html; charset=UTF-8".to_string(),
            suppress: Suppress::empty(),
        }
    }
}

impl NavConfig {
    /// Parse and check a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: NavConfig = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.recurse_limit == 0 {
            return Err(ConfigError::Invalid("recurse_limit must be at least 1".into()));
        }
        if self.step_key.is_empty() {
            return Err(ConfigError::Invalid("step_key must not be empty".into()));
        }
        for (what, step) in [
            ("default_step", &self.default_step),
            ("forbidden_step", &self.forbidden_step),
            ("error_step", &self.error_step),
            ("login_step", &self.login_step),
        ] {
            if !is_step_name(step) {
                return Err(ConfigError::Invalid(format!("{what} {step:?} is not a step name")));
            }
        }
        Ok(())
    }

    /// Whether `flag` is switched off.
    pub fn suppresses(&self, flag: Suppress) -> bool {
        self.suppress.contains(flag)
    }

    /// Whether `step` may be requested by a client.
    ///
    /// The default and error steps are always allowed.
    pub fn allows_step(&self, step: &str) -> bool {
        match &self.valid_steps {
            None => true,
            Some(valid) => valid.contains(step) || step == self.default_step || step == self.error_step,
        }
    }

    /// Set the loop limit.
    pub fn with_recurse_limit(mut self, limit: usize) -> Self {
        self.recurse_limit = limit;
        self
    }

    /// Set the default step.
    pub fn with_default_step(mut self, step: impl Into<String>) -> Self {
        self.default_step = step.into();
        self
    }

    /// Set the forbidden step.
    pub fn with_forbidden_step(mut self, step: impl Into<String>) -> Self {
        self.forbidden_step = step.into();
        self
    }

    /// Set the step key.
    pub fn with_step_key(mut self, key: impl Into<String>) -> Self {
        self.step_key = key.into();
        self
    }

    /// Restrict requestable steps.
    pub fn with_valid_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_steps = Some(steps.into_iter().map(Into::into).collect());
        self
    }

    /// Toggle development mode.
    pub fn with_development(mut self, is_development: bool) -> Self {
        self.is_development = is_development;
        self
    }

    /// Override the request method.
    pub fn with_request_method(mut self, method: impl Into<String>) -> Self {
        self.request_method = Some(method.into());
        self
    }

    /// Require authentication for every step.
    pub fn with_require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }

    /// Require authentication for `step`.
    pub fn with_auth_step(mut self, step: impl Into<String>) -> Self {
        self.auth_steps.insert(step.into());
        self
    }

    /// Validate whenever validated fields are present.
    pub fn with_validate_when_data(mut self, enabled: bool) -> Self {
        self.validate_when_data = enabled;
        self
    }

    /// Set the validation rules of `step`.
    pub fn with_validation(mut self, step: impl Into<String>, rules: RuleSet) -> Self {
        self.validation.insert(step.into(), rules);
        self
    }

    /// Set the base path-info patterns.
    pub fn with_path_info_map_base<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_info_map_base = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the path-info patterns of `step`.
    pub fn with_path_info_map<I, S>(mut self, step: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_info_map
            .insert(step.into(), patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the template directory prefix.
    pub fn with_base_dir_rel(mut self, dir: impl Into<String>) -> Self {
        self.base_dir_rel = dir.into();
        self
    }

    /// Set the module directory.
    pub fn with_name_module(mut self, module: impl Into<String>) -> Self {
        self.name_module = module.into();
        self
    }

    /// Set the content type.
    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = mimetype.into();
        self
    }

    /// Set the charset.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the script name.
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    /// Set the not-found page template.
    pub fn with_not_found_file(mut self, file: impl Into<String>) -> Self {
        self.not_found_file = Some(file.into());
        self
    }

    /// Switch parts of navigation off.
    pub fn with_suppress(mut self, suppress: Suppress) -> Self {
        self.suppress = suppress;
        self
    }
}
