//! Operation table and the hook resolver.
//!
//! A [`HookTable`] maps operation names to hooks. Tables are extended with
//! [`HookTable::derive`]: the derived table overrides any name it registers
//! and falls through to its base for everything else. The result is
//! flattened at build time, so lookups never walk a chain.

use crate::{
    error::NavError,
    hook::{Constant, DynHook, FnHook, Hook, HookCall, HookResult},
};
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// Label recorded for hooks that were passed in directly instead of by name.
pub const DIRECT: &str = "direct";

/// What to resolve: a registered name or a callable.
pub enum HookRef<'a, C> {
    /// Look the hook up by name.
    Named(&'a str),
    /// Use this callable as-is.
    Direct(DynHook<C>),
}

impl<'a, C> From<&'a str> for HookRef<'a, C> {
    fn from(name: &'a str) -> Self {
        HookRef::Named(name)
    }
}

impl<C> From<DynHook<C>> for HookRef<'_, C> {
    fn from(hook: DynHook<C>) -> Self {
        HookRef::Direct(hook)
    }
}

/// A resolved operation and the name it was found under.
pub struct Resolved<C> {
    /// The operation to run.
    pub hook: DynHook<C>,
    /// `<step>_<hook>`, `<hook>`, or [`DIRECT`].
    pub name: String,
}

impl<C> Clone for Resolved<C> {
    fn clone(&self) -> Self {
        Self {
            hook: Arc::clone(&self.hook),
            name: self.name.clone(),
        }
    }
}

impl<C> fmt::Debug for Resolved<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved").field("name", &self.name).finish()
    }
}

/// A flat table of named operations.
pub struct HookTable<C> {
    entries: HashMap<String, DynHook<C>>,
}

impl<C> Clone for HookTable<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<C> Default for HookTable<C> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for HookTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("HookTable").field("names", &names).finish()
    }
}

impl<C: 'static> HookTable<C> {
    /// Start an empty table.
    pub fn builder() -> HookTableBuilder<C> {
        HookTableBuilder {
            entries: HashMap::new(),
        }
    }

    /// Start a table that overrides entries of this one.
    pub fn derive(&self) -> HookTableBuilder<C> {
        HookTableBuilder {
            entries: self.entries.clone(),
        }
    }

    /// The operation registered under exactly `name`.
    pub fn get(&self, name: &str) -> Option<&DynHook<C>> {
        self.entries.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Find the most specific operation for `hook` in the context of `step`.
    ///
    /// With a step, `<step>_<hook>` wins over `<hook>`. A direct callable is
    /// returned unchanged under the [`DIRECT`] label.
    pub fn resolve(&self, hook: HookRef<'_, C>, step: Option<&str>) -> Result<Resolved<C>, NavError> {
        let name = match hook {
            HookRef::Direct(hook) => {
                return Ok(Resolved {
                    hook,
                    name: DIRECT.to_string(),
                });
            }
            HookRef::Named(name) => name,
        };

        if let Some(step) = step.filter(|s| !s.is_empty()) {
            let scoped = format!("{step}_{name}");
            if let Some(hook) = self.entries.get(&scoped) {
                return Ok(Resolved {
                    hook: Arc::clone(hook),
                    name: scoped,
                });
            }
        }

        match self.entries.get(name) {
            Some(hook) => Ok(Resolved {
                hook: Arc::clone(hook),
                name: name.to_string(),
            }),
            None => Err(NavError::HookNotFound {
                hook: name.to_string(),
                step: step.map(str::to_string),
            }),
        }
    }
}

/// Builder for [`HookTable`].
pub struct HookTableBuilder<C> {
    entries: HashMap<String, DynHook<C>>,
}

impl<C: 'static> HookTableBuilder<C> {
    /// Register a hook returning a plain value.
    pub fn hook<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut C, &HookCall<'_>) -> Result<Value, NavError> + Send + Sync + 'static,
    {
        self.with(name, FnHook(f))
    }

    /// Register a hook returning a full [`Outcome`](crate::Outcome).
    pub fn outcome<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut C, &HookCall<'_>) -> HookResult<C> + Send + Sync + 'static,
    {
        self.with(name, f)
    }

    /// Register a constant value under `name`.
    pub fn constant(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, Constant(value.into()))
    }

    /// Register any [`Hook`] implementation.
    pub fn with<H: Hook<C>>(self, name: impl Into<String>, hook: H) -> Self {
        self.shared(name, Arc::new(hook))
    }

    /// Register an already shared hook.
    pub fn shared(mut self, name: impl Into<String>, hook: DynHook<C>) -> Self {
        self.entries.insert(name.into(), hook);
        self
    }

    /// Drop a name so lookups fall back to the less specific form.
    pub fn without(mut self, name: &str) -> Self {
        self.entries.remove(name);
        self
    }

    /// Finish the table.
    pub fn build(self) -> HookTable<C> {
        HookTable {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Outcome;
    use serde_json::json;

    #[derive(Default)]
    struct Cx;

    fn run(table: &HookTable<Cx>, hook: &str, step: Option<&str>) -> (String, Value) {
        let resolved = table.resolve(HookRef::Named(hook), step).unwrap();
        let value = resolved
            .hook
            .call(&mut Cx, &HookCall::new(step, &[]))
            .unwrap()
            .into_value();
        (resolved.name, value)
    }

    fn base() -> HookTable<Cx> {
        HookTable::builder()
            .hook("prepare", |_, _| Ok(json!("base")))
            .hook("signup_prepare", |_, _| Ok(json!("signup")))
            .constant("finalize", true)
            .build()
    }

    #[test]
    fn test_step_scoped_name_wins() {
        let table = base();
        assert_eq!(run(&table, "prepare", Some("signup")), ("signup_prepare".to_string(), json!("signup")));
        assert_eq!(run(&table, "prepare", Some("main")), ("prepare".to_string(), json!("base")));
        assert_eq!(run(&table, "prepare", None), ("prepare".to_string(), json!("base")));
    }

    #[test]
    fn test_missing_hook_names_both_candidates() {
        let err = base().resolve(HookRef::Named("skip"), Some("main")).unwrap_err();
        match err {
            NavError::HookNotFound { hook, step } => {
                assert_eq!(hook, "skip");
                assert_eq!(step.as_deref(), Some("main"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_direct_hook_is_labelled() {
        let direct: DynHook<Cx> = Arc::new(Constant(json!(7)));
        let resolved = base().resolve(HookRef::Direct(direct), Some("main")).unwrap();
        assert_eq!(resolved.name, DIRECT);
    }

    #[test]
    fn test_derive_overrides_and_falls_through() {
        let base = base();
        let derived = base
            .derive()
            .hook("prepare", |_, _| Ok(json!("derived")))
            .outcome("post_step", |_, _| Ok(Outcome::This))
            .build();

        assert_eq!(run(&derived, "prepare", None).1, json!("derived"));
        assert_eq!(run(&derived, "prepare", Some("signup")).1, json!("signup"));
        assert_eq!(run(&derived, "finalize", None).1, json!(true));
        assert!(derived.contains("post_step"));
        assert!(!base.contains("post_step"));
        assert_eq!(run(&base, "prepare", None).1, json!("base"));
    }
}
