//! History recorder.
//!
//! Every hook invocation made through the engine leaves one [`HistoryEntry`].
//! Entries are never edited once recorded.

use crate::hook::Outcome;
use serde_json::Value;
use std::{
    fmt::{self, Write as _},
    time::{SystemTime, UNIX_EPOCH},
};

/// Hook name whose result is never stored verbatim.
pub const HISTORY_HOOK: &str = "history";

/// Current wall-clock time in whole seconds since the epoch.
pub fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// The result of an invocation as stored in history.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    /// A plain value.
    Value(Value),
    /// The hook handed back the dispatch object itself.
    SelfReference,
    /// The hook handed back a callable.
    Function,
    /// The result of the `history` hook.
    TruncatedHistory,
}

impl Recorded {
    /// Redact an outcome for storage.
    pub fn from_outcome<C>(hook: &str, outcome: &Outcome<C>) -> Self {
        if hook == HISTORY_HOOK {
            return Recorded::TruncatedHistory;
        }
        match outcome {
            Outcome::Value(value) => Recorded::Value(value.clone()),
            Outcome::This => Recorded::SelfReference,
            Outcome::Hook(_) => Recorded::Function,
        }
    }

    /// The stored value, if it is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Recorded::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Recorded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recorded::Value(value) => write!(f, "{value}"),
            Recorded::SelfReference => f.write_str("self-reference"),
            Recorded::Function => f.write_str("function"),
            Recorded::TruncatedHistory => f.write_str("TRUNCATED HISTORY"),
        }
    }
}

/// One hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Step the hook ran for.
    pub step: Option<String>,
    /// Plain hook name that was requested.
    pub hook: String,
    /// Name the hook was resolved under.
    pub found: String,
    /// Epoch seconds when the hook started.
    pub time: u64,
    /// Nesting depth; top-level invocations are at level 1.
    pub level: usize,
    /// Whole seconds the hook took.
    pub elapsed: u64,
    /// The redacted result.
    pub result: Recorded,
}

/// Append-only log of invocations.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    enabled: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(true)
    }
}

impl History {
    /// Create a recorder; a disabled one drops every entry.
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            enabled,
        }
    }

    /// Whether entries are kept.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append an entry.
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.enabled {
            self.entries.push(entry);
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entries recorded since position `start`.
    pub fn since(&self, start: usize) -> &[HistoryEntry] {
        self.entries.get(start..).unwrap_or_default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the log as text, one line per entry, indented by level.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let indent = "  ".repeat(entry.level.saturating_sub(1));
            let step = entry.step.as_deref().unwrap_or("-");
            let _ = writeln!(
                out,
                "{indent}{step} {hook} ({found}) {elapsed}s => {result}",
                hook = entry.hook,
                found = entry.found,
                elapsed = entry.elapsed,
                result = entry.result,
            );
        }
        out
    }
}
