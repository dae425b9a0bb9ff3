//! The navigation engine.
//!
//! A [`Navigator`] owns one request's [`DispatchContext`] together with the
//! shared operation table, configuration and template cache. Hooks receive
//! the navigator mutably, so they can read the form, fill accumulators, edit
//! the path or run further hooks.
//!
//! # Request flow
//!
//! ```text
//! navigate
//!   pre_navigate          truthy: done
//!   nav_loop
//!     path                built once from path-info and the step field
//!     pre_loop            truthy: done
//!     for each step
//!       get_valid_auth    when the step requires auth; falsy: done
//!       morph
//!       run_step          truthy: done
//!       unmorph
//!     post_loop           truthy: done
//!     append default step, loop again
//!   post_navigate         failures are logged, not fatal
//!   destroy
//! ```

use crate::{
    config::{NavConfig, Suppress},
    context::{Accumulator, DispatchContext},
    request::{AuthState, Request},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};
use wayfare_core::{
    DIRECT, FatalError, Fields, History, HistoryEntry, HookCall, HookRef, HookResult, HookTable,
    NavError, Outcome, Recorded, Response, epoch_seconds,
};
use wayfare_std::{PathInfoMap, TemplateCache};

lazy_static! {
    static ref STEP_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("step name regex is valid");
}

/// Whether `name` is a syntactically valid step identifier.
pub fn is_step_name(name: &str) -> bool {
    STEP_NAME.is_match(name)
}

/// Shared pieces every request of an application uses.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) table: Arc<HookTable<Navigator>>,
    pub(crate) config: Arc<NavConfig>,
    pub(crate) templates: Arc<TemplateCache>,
}

/// Runs one request through the step pipeline.
pub struct Navigator {
    shared: Shared,
    cx: DispatchContext,
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator").field("cx", &self.cx).finish_non_exhaustive()
    }
}

impl Navigator {
    pub(crate) fn new(shared: Shared) -> Self {
        let record = !shared.config.suppresses(Suppress::NO_HISTORY);
        Self {
            shared,
            cx: DispatchContext::new(record),
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Dispatch `request`, writing output to `response`.
    ///
    /// Any failure before `post_navigate` kills the context and is returned
    /// as the latched [`FatalError`]; a dead context is left as it was.
    pub fn navigate(
        &mut self,
        request: Request,
        response: impl Response + 'static,
    ) -> Result<(), Arc<FatalError>> {
        self.navigate_boxed(request, Box::new(response))
    }

    /// [`navigate`](Self::navigate) with an already boxed response.
    pub fn navigate_boxed(
        &mut self,
        request: Request,
        response: Box<dyn Response>,
    ) -> Result<(), Arc<FatalError>> {
        if let Some(fatal) = &self.cx.fatal {
            return Err(Arc::clone(fatal));
        }

        self.cx.time = epoch_seconds();
        self.cx.path_info = request.path_info.clone();
        for (key, value) in &request.form {
            self.cx.form.insert(key.clone(), value.clone());
        }
        self.cx.request = Some(request);
        self.cx.response = Some(response);

        let handled = match self.pre_navigate_and_loop() {
            Ok(handled) => handled,
            Err(err) => return Err(self.die(err)),
        };

        if !handled && !self.is_dead() && !self.config().suppresses(Suppress::NO_POST_NAVIGATE) {
            if let Err(err) = self.run_hook("post_navigate", None) {
                self.handle_error(err);
            }
        }

        if let Some(fatal) = &self.cx.fatal {
            return Err(Arc::clone(fatal));
        }
        self.destroy();
        Ok(())
    }

    fn pre_navigate_and_loop(&mut self) -> Result<bool, NavError> {
        if !self.config().suppresses(Suppress::NO_PRE_NAVIGATE)
            && self.run_hook("pre_navigate", None)?.is_truthy()
        {
            return Ok(true);
        }
        self.cx.lineage_start = self.cx.history.len();
        self.nav_loop()?;
        Ok(false)
    }

    /// Run steps until one halts the loop.
    ///
    /// Each pass counts against `recurse_limit`; with a limit of `N` the
    /// `N`th pass fails.
    pub fn nav_loop(&mut self) -> Result<(), NavError> {
        loop {
            self.cx.recurse_count += 1;
            let limit = self.config().recurse_limit;
            if self.cx.recurse_count >= limit {
                return Err(NavError::RecursionLimitExceeded {
                    limit,
                    jumps: self.cx.jumps,
                });
            }

            self.ensure_path()?;
            let path = self.path_value();
            if self.run_hook_with("pre_loop", None, &[path])?.is_truthy() {
                return Ok(());
            }

            while let Some(raw) = self.path().get(self.cx.cursor).cloned() {
                self.cx.loop_started = true;
                let step = self.checked_step(raw);

                if !self.is_authed()
                    && self.run_hook("require_auth", Some(step.as_str()))?.is_truthy()
                    && !self.run_hook("get_valid_auth", Some(step.as_str()))?.is_truthy()
                {
                    return Ok(());
                }

                self.run_hook("morph", Some(step.as_str()))?;
                self.apply_step_path_info(&step)?;
                let halted = self.run_hook("run_step", Some(step.as_str()))?.is_truthy();
                self.run_hook("unmorph", Some(step.as_str()))?;
                if halted {
                    return Ok(());
                }

                self.cx.cursor += 1;
                self.cx.ready_validate = Some(false);
                self.cx.accumulators = Default::default();
            }

            let path = self.path_value();
            if self.run_hook_with("post_loop", None, &[path])?.is_truthy() {
                return Ok(());
            }

            let default = self.config().default_step.clone();
            self.append_path([default])?;
        }
    }

    /// Run the lifecycle of one step; `true` halts the navigation loop.
    pub fn run_step(&mut self, step: &str) -> Result<bool, NavError> {
        if self.run_hook("pre_step", Some(step))?.is_truthy() {
            return Ok(true);
        }
        if self.take_jump() {
            return Ok(false);
        }

        if self.run_hook("skip", Some(step))?.is_truthy() {
            return Ok(false);
        }

        for hook in ["prepare", "info_complete", "finalize"] {
            let ok = self.run_hook(hook, Some(step))?.is_truthy();
            if self.take_jump() {
                return Ok(false);
            }
            if !ok {
                self.run_hook("prepared_print", Some(step))?;
                self.run_hook("post_print", Some(step))?;
                return Ok(true);
            }
        }

        if self.run_hook("post_step", Some(step))?.is_truthy() {
            return Ok(true);
        }
        self.take_jump();
        Ok(false)
    }

    fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.cx.jumped)
    }

    /// Steps already in the path are re-checked; bad ones become the
    /// forbidden step. Leading underscores are allowed here.
    fn checked_step(&mut self, raw: String) -> String {
        if is_step_name(&raw) {
            return raw;
        }
        let forbidden = self.config().forbidden_step.clone();
        warn!(step = %raw, "invalid step in path, using {forbidden}");
        self.cx.stash.insert("forbidden_step".into(), Value::String(raw));
        if let Some(slot) = self.cx.path.as_mut().and_then(|p| p.get_mut(self.cx.cursor)) {
            *slot = forbidden.clone();
        }
        forbidden
    }

    fn apply_step_path_info(&mut self, step: &str) -> Result<(), NavError> {
        let patterns = self.run_hook("path_info_map", Some(step))?.into_value();
        let map = PathInfoMap::from_value(&patterns)?;
        if !map.is_empty() {
            map.apply(&self.cx.path_info, &mut self.cx.form);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Run the hook `hook` for `step`.
    pub fn run_hook(&mut self, hook: &str, step: Option<&str>) -> HookResult<Navigator> {
        self.run_hook_with(hook, step, &[])
    }

    /// Run a hook with extra arguments.
    ///
    /// The invocation is recorded in history unless history is disabled.
    /// Nothing runs once the context is dead.
    pub fn run_hook_with<'a>(
        &mut self,
        hook: impl Into<HookRef<'a, Navigator>>,
        step: Option<&str>,
        args: &[Value],
    ) -> HookResult<Navigator> {
        if let Some(fatal) = &self.cx.fatal {
            return Err(NavError::Fatal(Arc::clone(fatal)));
        }

        let hook = hook.into();
        let name = match &hook {
            HookRef::Named(name) => (*name).to_string(),
            HookRef::Direct(_) => DIRECT.to_string(),
        };
        let resolved = self.shared.table.resolve(hook, step)?;

        let started = epoch_seconds();
        let level = self.cx.level + 1;
        self.cx.level = level;
        let result = resolved.hook.call(self, &HookCall::new(step, args));
        self.cx.level = level - 1;
        let elapsed = epoch_seconds().saturating_sub(started);

        match &result {
            Ok(outcome) => {
                let recorded = Recorded::from_outcome(&name, outcome);
                debug!(
                    step = step.unwrap_or(""),
                    hook = %name,
                    found = %resolved.name,
                    level,
                    result = %recorded,
                    "hook"
                );
                self.cx.history.record(HistoryEntry {
                    step: step.map(str::to_string),
                    hook: name,
                    found: resolved.name,
                    time: started,
                    level,
                    elapsed,
                    result: recorded,
                });
            }
            Err(err) => debug!(
                step = step.unwrap_or(""),
                hook = %name,
                found = %resolved.name,
                level,
                error = %err,
                "hook failed"
            ),
        }
        result
    }

    /// Run a hook and return its plain value.
    pub fn hook_value(&mut self, hook: &str, step: Option<&str>, args: &[Value]) -> Result<Value, NavError> {
        self.run_hook_with(hook, step, args).map(Outcome::into_value)
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Kill the context.
    ///
    /// The first call latches `cause`; every call returns the same `Arc`.
    pub fn die(&mut self, cause: NavError) -> Arc<FatalError> {
        if let Some(fatal) = &self.cx.fatal {
            return Arc::clone(fatal);
        }
        let fatal = match cause {
            NavError::Fatal(fatal) => fatal,
            cause => Arc::new(FatalError::new(cause, self.config().is_development)),
        };
        error!(
            message = %fatal.message(),
            code = fatal.code().unwrap_or(""),
            step = self.current_step().unwrap_or(""),
            "dispatch context died"
        );
        self.cx.fatal = Some(Arc::clone(&fatal));
        fatal
    }

    /// The latched error, if the context is dead.
    pub fn fatal_error(&self) -> Option<&Arc<FatalError>> {
        self.cx.fatal.as_ref()
    }

    /// Whether the context is dead.
    pub fn is_dead(&self) -> bool {
        self.cx.fatal.is_some()
    }

    /// Log a recoverable failure and fold it into the error accumulator.
    pub fn handle_error(&mut self, err: NavError) {
        warn!(error = %err, "recovered from navigation error");
        let mut errors = Fields::new();
        errors.insert("navigate_error".into(), Value::String(err.to_string()));
        self.cx.accumulators.add(Accumulator::Errors, &errors);
    }

    /// Tear down per-request state. History and path stay readable.
    pub fn destroy(&mut self) {
        self.cx.destroy();
    }

    // ------------------------------------------------------------------
    // Path
    // ------------------------------------------------------------------

    /// Build the path on first use from the path-info and the step field.
    fn ensure_path(&mut self) -> Result<(), NavError> {
        if self.cx.path.is_some() {
            return Ok(());
        }

        let base = match &self.config().path_info_map_base {
            Some(patterns) => PathInfoMap::new(patterns.iter().cloned())?,
            None => PathInfoMap::for_step_key(&self.config().step_key)?,
        };
        base.apply(&self.cx.path_info, &mut self.cx.form);

        let mut path = Vec::new();
        if let Some(raw) = self.submitted_step() {
            let step = raw.trim_start_matches('/').replace('/', "__");
            if is_step_name(&step) && !step.starts_with('_') && self.config().allows_step(&step) {
                path.push(step);
            } else {
                let forbidden = self.config().forbidden_step.clone();
                debug!(step = %raw, "requested step rejected, using {forbidden}");
                self.cx.stash.insert("forbidden_step".into(), Value::String(raw));
                path.push(forbidden);
            }
        }
        self.cx.path = Some(path);
        Ok(())
    }

    fn submitted_step(&self) -> Option<String> {
        match self.cx.form.get(&self.config().step_key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn path_value(&self) -> Value {
        Value::from(self.path().to_vec())
    }

    /// The current path (empty before it is built).
    pub fn path(&self) -> &[String] {
        self.cx.path.as_deref().unwrap_or_default()
    }

    /// Index of the running step.
    pub fn cursor(&self) -> usize {
        self.cx.cursor
    }

    fn path_mut(&mut self) -> Result<&mut Vec<String>, NavError> {
        self.ensure_path()?;
        Ok(self.cx.path.get_or_insert_with(Vec::new))
    }

    /// Insert steps right after the running step.
    pub fn insert_path<I, S>(&mut self, steps: I) -> Result<(), NavError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let at = self.cx.cursor + 1;
        let path = self.path_mut()?;
        let at = at.min(path.len());
        path.splice(at..at, steps.into_iter().map(Into::into));
        Ok(())
    }

    /// Add steps to the end of the path.
    pub fn append_path<I, S>(&mut self, steps: I) -> Result<(), NavError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_mut()?.extend(steps.into_iter().map(Into::into));
        Ok(())
    }

    /// Replace every step after the running one.
    pub fn replace_path<I, S>(&mut self, steps: I) -> Result<(), NavError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keep = self.cx.cursor + 1;
        let path = self.path_mut()?;
        path.truncate(keep);
        path.extend(steps.into_iter().map(Into::into));
        Ok(())
    }

    /// Replace the whole path; only allowed before the first step runs.
    pub fn set_path<I, S>(&mut self, steps: I) -> Result<(), NavError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.cx.loop_started {
            return Err(NavError::Configuration(
                "set_path cannot be called once the navigation loop has started".into(),
            ));
        }
        self.cx.path = Some(steps.into_iter().map(Into::into).collect());
        Ok(())
    }

    /// Run `step` next, finishing the current step without rendering.
    pub fn jump(&mut self, step: impl Into<String>) -> Result<(), NavError> {
        self.insert_path([step.into()])?;
        self.cx.jumps += 1;
        self.cx.jumped = true;
        Ok(())
    }

    /// Number of jumps so far.
    pub fn jumps(&self) -> usize {
        self.cx.jumps
    }

    /// The running step.
    pub fn current_step(&self) -> Option<&str> {
        self.step_at(Some(self.cx.cursor))
    }

    /// The first step of the path.
    pub fn first_step(&self) -> Option<&str> {
        self.step_at(Some(0))
    }

    /// The last step of the path.
    pub fn last_step(&self) -> Option<&str> {
        self.step_at(self.path().len().checked_sub(1))
    }

    /// The step before the running one.
    pub fn previous_step(&self) -> Option<&str> {
        self.step_at(self.cx.cursor.checked_sub(1))
    }

    /// The step after the running one.
    pub fn next_step(&self) -> Option<&str> {
        self.step_at(Some(self.cx.cursor + 1))
    }

    fn step_at(&self, index: Option<usize>) -> Option<&str> {
        self.path().get(index?).map(String::as_str)
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Engine configuration.
    pub fn config(&self) -> &NavConfig {
        &self.shared.config
    }

    /// The shared template cache.
    pub fn templates(&self) -> &Arc<TemplateCache> {
        &self.shared.templates
    }

    /// Submitted (and path-info derived) fields.
    pub fn form(&self) -> &Fields {
        &self.cx.form
    }

    /// Mutable form.
    pub fn form_mut(&mut self) -> &mut Fields {
        &mut self.cx.form
    }

    /// Scratch space for hooks.
    pub fn stash(&self) -> &Fields {
        &self.cx.stash
    }

    /// Mutable stash.
    pub fn stash_mut(&mut self) -> &mut Fields {
        &mut self.cx.stash
    }

    /// The recorded invocations.
    pub fn history(&self) -> &History {
        &self.cx.history
    }

    /// Invocations recorded by the last navigation.
    pub fn lineage(&self) -> &[HistoryEntry] {
        self.cx.history.since(self.cx.lineage_start)
    }

    /// History as indented text.
    pub fn dump_history(&self) -> String {
        self.cx.history.dump()
    }

    /// Navigation passes made so far.
    pub fn recurse_count(&self) -> usize {
        self.cx.recurse_count
    }

    /// Epoch seconds when navigation started.
    pub fn request_time(&self) -> u64 {
        self.cx.time
    }

    /// The request's path-info.
    pub fn path_info(&self) -> &str {
        &self.cx.path_info
    }

    /// The request method; the configured override wins.
    pub fn request_method(&self) -> &str {
        if let Some(method) = &self.config().request_method {
            return method;
        }
        self.cx
            .request
            .as_ref()
            .map_or("GET", |request| request.method.as_str())
    }

    /// The response sink, once navigation has started.
    pub fn response_mut(&mut self) -> Option<&mut (dyn Response + 'static)> {
        self.cx.response.as_deref_mut()
    }

    /// Note that the response was ended; nothing more may be written to it.
    pub fn mark_output_ended(&mut self) {
        self.cx.output_ended = true;
    }

    /// Whether `print_out` already ended the response.
    pub fn output_ended(&self) -> bool {
        self.cx.output_ended
    }

    /// Take the response back, e.g. to render an error page.
    pub fn take_response(&mut self) -> Option<Box<dyn Response>> {
        self.cx.response.take()
    }

    /// Authentication state set by the auth hooks.
    pub fn auth(&self) -> Option<&AuthState> {
        self.cx.auth.as_ref()
    }

    /// Record the outcome of authentication.
    pub fn set_auth(&mut self, auth: AuthState) {
        self.cx.auth = Some(auth);
    }

    /// Whether a valid authentication state is present.
    pub fn is_authed(&self) -> bool {
        self.cx.auth.as_ref().is_some_and(AuthState::is_valid)
    }

    /// Force `ready_validate` for the running step.
    pub fn set_ready_validate(&mut self, ready: bool) {
        self.cx.ready_validate = Some(ready);
    }

    /// The `ready_validate` override, if one is set.
    pub fn ready_validate_override(&self) -> Option<bool> {
        self.cx.ready_validate
    }

    /// The accumulator `which`.
    pub fn accumulator(&self, which: Accumulator) -> &Fields {
        self.cx.accumulators.get(which)
    }

    /// Merge fields into an accumulator.
    pub fn add_to(&mut self, which: Accumulator, fields: &Fields) {
        self.cx.accumulators.add(which, fields);
    }

    /// Merge into the base accumulator.
    pub fn add_to_base(&mut self, fields: &Fields) {
        self.add_to(Accumulator::Base, fields);
    }

    /// Merge into the common accumulator.
    pub fn add_to_common(&mut self, fields: &Fields) {
        self.add_to(Accumulator::Common, fields);
    }

    /// Merge into the error accumulator.
    pub fn add_to_errors(&mut self, fields: &Fields) {
        self.add_to(Accumulator::Errors, fields);
    }

    /// Merge into the fill accumulator.
    pub fn add_to_fill(&mut self, fields: &Fields) {
        self.add_to(Accumulator::Fill, fields);
    }

    /// Merge into the swap accumulator.
    pub fn add_to_swap(&mut self, fields: &Fields) {
        self.add_to(Accumulator::Swap, fields);
    }

    /// Merge into the form.
    pub fn add_to_form(&mut self, fields: &Fields) {
        for (key, value) in fields {
            self.cx.form.insert(key.clone(), value.clone());
        }
    }

    /// Whether any error has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.cx.accumulators.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names() {
        assert!(is_step_name("main"));
        assert!(is_step_name("_private"));
        assert!(is_step_name("admin__users"));
        assert!(!is_step_name("9lives"));
        assert!(!is_step_name("a-b"));
        assert!(!is_step_name(""));
    }
}
