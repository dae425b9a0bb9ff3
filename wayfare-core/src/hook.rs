//! # Hooks
//!
//! A hook is a named operation the dispatch engine invokes at a fixed point of
//! the step lifecycle (`pre_step`, `prepare`, `info_complete`, `print`, ...).
//!
//! Hooks are synchronous and receive the dispatch context mutably, so a hook
//! can read the form, write accumulators, or run further hooks. What a hook
//! hands back is an [`Outcome`]; the engine only ever asks two things of it:
//! whether it is truthy (halt / continue decisions) and its plain value
//! (maps for rendering, template identifiers, output text).
//!
//! # Forms of hook
//!
//! - Any `Fn(&mut C, &HookCall<'_>) -> HookResult<C>` closure
//! - [`FnHook`] - adapts a closure that returns a plain [`Value`]
//! - [`Constant`] - a named value rather than a function (e.g. `false`)

use crate::error::NavError;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Result of running a hook.
pub type HookResult<C> = Result<Outcome<C>, NavError>;

/// A shared, type-erased hook.
pub type DynHook<C> = Arc<dyn Hook<C>>;

/// Arguments of a single hook invocation.
#[derive(Debug, Clone, Copy)]
pub struct HookCall<'a> {
    /// The step the hook runs for, if any.
    pub step: Option<&'a str>,
    /// Extra positional arguments.
    pub args: &'a [Value],
}

impl<'a> HookCall<'a> {
    /// Create a call for `step` with `args`.
    pub fn new(step: Option<&'a str>, args: &'a [Value]) -> Self {
        Self { step, args }
    }

    /// The step name, or an empty string for step-less hooks.
    pub fn step(&self) -> &'a str {
        self.step.unwrap_or("")
    }

    /// The positional argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }
}

/// What a hook hands back to the engine.
pub enum Outcome<C> {
    /// A plain value.
    Value(Value),
    /// The dispatch object itself, returned by hooks meant for chaining.
    This,
    /// A callable produced by the hook.
    Hook(DynHook<C>),
}

impl<C> Outcome<C> {
    /// Whether the outcome counts as "yes" for halt and validation decisions.
    pub fn is_truthy(&self) -> bool {
        match self {
            Outcome::Value(value) => truthy(value),
            Outcome::This | Outcome::Hook(_) => true,
        }
    }

    /// The plain value of this outcome.
    ///
    /// `This` maps to `true` and callables map to `null`, since neither can
    /// travel through a value map.
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Value(value) => value,
            Outcome::This => Value::Bool(true),
            Outcome::Hook(_) => Value::Null,
        }
    }

    /// Borrow the plain value, if this outcome is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<C> fmt::Debug for Outcome<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Outcome::This => f.write_str("This"),
            Outcome::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

impl<C> From<Value> for Outcome<C> {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

impl<C> From<bool> for Outcome<C> {
    fn from(value: bool) -> Self {
        Outcome::Value(Value::Bool(value))
    }
}

impl<C> From<()> for Outcome<C> {
    fn from(_: ()) -> Self {
        Outcome::Value(Value::Null)
    }
}

/// Truthiness of a hook value.
///
/// `null`, `false`, `0`, and `""` are falsy; every other value (including
/// empty maps and lists) is truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A named operation invoked by the dispatch engine.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Hook<{C}>`",
    label = "missing `Hook` implementation",
    note = "Closures of type `Fn(&mut {C}, &HookCall<'_>) -> HookResult<{C}>` implement `Hook` automatically."
)]
pub trait Hook<C>: Send + Sync + 'static {
    /// Run the hook against the dispatch context.
    fn call(&self, cx: &mut C, call: &HookCall<'_>) -> HookResult<C>;
}

impl<C, F> Hook<C> for F
where
    F: Fn(&mut C, &HookCall<'_>) -> HookResult<C> + Send + Sync + 'static,
{
    fn call(&self, cx: &mut C, call: &HookCall<'_>) -> HookResult<C> {
        self(cx, call)
    }
}

/// Adapts a closure returning a plain [`Value`] into a [`Hook`].
pub struct FnHook<F>(pub F);

impl<C, F> Hook<C> for FnHook<F>
where
    F: Fn(&mut C, &HookCall<'_>) -> Result<Value, NavError> + Send + Sync + 'static,
{
    fn call(&self, cx: &mut C, call: &HookCall<'_>) -> HookResult<C> {
        (self.0)(cx, call).map(Outcome::Value)
    }
}

/// A hook that always yields the same value.
#[derive(Debug, Clone)]
pub struct Constant(pub Value);

impl<C> Hook<C> for Constant {
    fn call(&self, _cx: &mut C, _call: &HookCall<'_>) -> HookResult<C> {
        Ok(Outcome::Value(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter(usize);

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(0.0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("0")));
        assert!(truthy(&json!({})));
        assert!(truthy(&json!([])));
    }

    #[test]
    fn test_closure_hook_mutates_context() {
        let hook = |cx: &mut Counter, call: &HookCall<'_>| -> HookResult<Counter> {
            cx.0 += call.args.len();
            Ok(Outcome::This)
        };

        let mut cx = Counter(0);
        let args = [json!(1), json!(2)];
        let outcome = Hook::call(&hook, &mut cx, &HookCall::new(Some("main"), &args)).unwrap();

        assert_eq!(cx.0, 2);
        assert!(outcome.is_truthy());
        assert_eq!(outcome.into_value(), json!(true));
    }

    #[test]
    fn test_fn_hook_and_constant() {
        let hook = FnHook(|_cx: &mut Counter, call: &HookCall<'_>| -> Result<Value, NavError> {
            Ok(json!(call.step()))
        });
        let mut cx = Counter(0);
        let outcome = Hook::call(&hook, &mut cx, &HookCall::new(Some("main"), &[])).unwrap();
        assert_eq!(outcome.as_value(), Some(&json!("main")));

        let constant = Constant(json!(0));
        let outcome = Hook::<Counter>::call(&constant, &mut cx, &HookCall::new(None, &[])).unwrap();
        assert!(!outcome.is_truthy());
    }
}
