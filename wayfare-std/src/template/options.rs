//! Template subsystem configuration.

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Seconds a positive entry is trusted without checking the file.
pub const DEFAULT_STAT_TTL: u64 = 1;

/// Seconds a failed lookup is remembered.
pub const DEFAULT_NEGATIVE_STAT_TTL: u64 = 1;

/// Options for [`TemplateCache`](super::TemplateCache).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    /// Roots searched in order for relative identifiers.
    pub include_paths: Vec<PathBuf>,
    /// Accept absolute identifiers.
    pub allow_absolute: bool,
    /// Accept identifiers containing `..`.
    pub allow_relative_parent: bool,
    /// Seconds a positive entry is trusted without a stat.
    pub stat_ttl: u64,
    /// Seconds a negative entry suppresses lookups; `0` disables negative caching.
    pub negative_stat_ttl: u64,
    /// Upper bound on cached entries; `0` means unbounded.
    pub max_cache_entries: usize,
    /// Treat unknown variables as render errors.
    pub strict: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            include_paths: vec![PathBuf::from(".")],
            allow_absolute: false,
            allow_relative_parent: false,
            stat_ttl: DEFAULT_STAT_TTL,
            negative_stat_ttl: DEFAULT_NEGATIVE_STAT_TTL,
            max_cache_entries: 0,
            strict: false,
        }
    }
}

impl TemplateOptions {
    /// Replace the include roots.
    pub fn with_include_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Accept absolute identifiers.
    pub fn with_allow_absolute(mut self, allow: bool) -> Self {
        self.allow_absolute = allow;
        self
    }

    /// Accept identifiers containing `..`.
    pub fn with_allow_relative_parent(mut self, allow: bool) -> Self {
        self.allow_relative_parent = allow;
        self
    }

    /// Set the positive trust window in seconds.
    pub fn with_stat_ttl(mut self, secs: u64) -> Self {
        self.stat_ttl = secs;
        self
    }

    /// Set the negative trust window in seconds.
    pub fn with_negative_stat_ttl(mut self, secs: u64) -> Self {
        self.negative_stat_ttl = secs;
        self
    }

    /// Bound the number of cached entries.
    pub fn with_max_cache_entries(mut self, max: usize) -> Self {
        self.max_cache_entries = max;
        self
    }

    /// Make unknown variables fail rendering.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub(crate) fn stat_window(&self) -> Duration {
        Duration::from_secs(self.stat_ttl)
    }

    pub(crate) fn negative_window(&self) -> Duration {
        Duration::from_secs(self.negative_stat_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options: TemplateOptions =
            serde_json::from_str(r#"{"include_paths": ["tpl", "shared"], "strict": true}"#).unwrap();
        assert_eq!(
            options.include_paths,
            vec![PathBuf::from("tpl"), PathBuf::from("shared")]
        );
        assert!(options.strict);
        assert_eq!(options.stat_ttl, DEFAULT_STAT_TTL);
        assert_eq!(options.max_cache_entries, 0);
    }
}
