//! The process-wide template cache.
//!
//! Entries are keyed by file identifier. A positive entry is trusted for
//! `stat_ttl` seconds after its last check; after that it is re-stat'ed and
//! rebuilt when the modification time moved. A failed lookup leaves a
//! negative entry that short-circuits lookups for `negative_stat_ttl`.
//!
//! The lock is never held across filesystem access or compilation. Two
//! requests missing the same entry may both compile it; the last insert wins.

use super::{
    compile::{Compiled, Compiler, TagCompiler},
    error::TemplateError,
    fs::{Clock, FileStat, FileSystem, OsFileSystem, SystemClock},
    options::TemplateOptions,
};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use tracing::trace;
use wayfare_core::Fields;

const INLINE: &str = "inline";

/// What to render: a file identifier or inline template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A path relative to the include roots (or absolute, when allowed).
    File(String),
    /// Template text; compiled on every use and never cached.
    Inline(String),
}

impl TemplateSource {
    /// A file source.
    pub fn file(identifier: impl Into<String>) -> Self {
        TemplateSource::File(identifier.into())
    }

    /// An inline source.
    pub fn inline(text: impl Into<String>) -> Self {
        TemplateSource::Inline(text.into())
    }

    /// The file identifier, or `inline`.
    pub fn identifier(&self) -> &str {
        match self {
            TemplateSource::File(identifier) => identifier,
            TemplateSource::Inline(_) => INLINE,
        }
    }
}

/// A compiled template.
pub struct Document {
    identifier: String,
    path: Option<PathBuf>,
    source_text: String,
    compiled: Arc<dyn Compiled>,
    mod_time: Option<SystemTime>,
}

impl Document {
    /// File identifier, or `inline`.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Where the file was found.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The text the document was compiled from.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Modification time of the file; `None` for inline text.
    pub fn mod_time(&self) -> Option<SystemTime> {
        self.mod_time
    }

    /// Whether the document came from inline text.
    pub fn is_inline(&self) -> bool {
        self.path.is_none()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("identifier", &self.identifier)
            .field("path", &self.path)
            .field("mod_time", &self.mod_time)
            .finish_non_exhaustive()
    }
}

enum Entry {
    Positive {
        doc: Arc<Document>,
        checked_at: SystemTime,
    },
    Negative {
        error: TemplateError,
        cached_at: SystemTime,
    },
}

impl Entry {
    fn cache_time(&self) -> SystemTime {
        match self {
            Entry::Positive { checked_at, .. } => *checked_at,
            Entry::Negative { cached_at, .. } => *cached_at,
        }
    }
}

enum Lookup {
    Fresh(Arc<Document>),
    Stale(Arc<Document>),
    Missing(TemplateError),
    Absent,
}

/// Compiles, caches and renders templates.
pub struct TemplateCache {
    options: TemplateOptions,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    compiler: Arc<dyn Compiler>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(TemplateOptions::default())
    }
}

impl fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCache")
            .field("options", &self.options)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl TemplateCache {
    /// A cache over the real filesystem and clock with the tag compiler.
    pub fn new(options: TemplateOptions) -> Self {
        Self {
            options,
            fs: Arc::new(OsFileSystem),
            clock: Arc::new(SystemClock),
            compiler: Arc::new(TagCompiler),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the filesystem.
    pub fn with_file_system(mut self, fs: impl FileSystem) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the compiler.
    pub fn with_compiler(mut self, compiler: impl Compiler) -> Self {
        self.compiler = Arc::new(compiler);
        self
    }

    /// The options this cache was built with.
    pub fn options(&self) -> &TemplateOptions {
        &self.options
    }

    /// Number of cached entries, positive and negative.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether `identifier` has an entry.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.read().contains_key(identifier)
    }

    /// Whether `identifier` is remembered as missing.
    pub fn is_negative(&self, identifier: &str) -> bool {
        matches!(
            self.entries.read().get(identifier),
            Some(Entry::Negative { .. })
        )
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Resolve a source to a compiled document.
    pub fn resolve(&self, source: &TemplateSource) -> Result<Arc<Document>, TemplateError> {
        match source {
            TemplateSource::Inline(text) => {
                let compiled = self.compile(INLINE, text)?;
                Ok(Arc::new(Document {
                    identifier: INLINE.to_string(),
                    path: None,
                    source_text: text.clone(),
                    compiled,
                    mod_time: None,
                }))
            }
            TemplateSource::File(identifier) => self.resolve_file(identifier),
        }
    }

    /// Render a document.
    pub fn render(&self, doc: &Document, bindings: &Fields) -> Result<String, TemplateError> {
        doc.compiled
            .render(bindings, self.options.strict)
            .map_err(|message| TemplateError::Render {
                identifier: doc.identifier.clone(),
                message,
            })
    }

    /// Resolve then render.
    pub fn process(&self, source: &TemplateSource, bindings: &Fields) -> Result<String, TemplateError> {
        let doc = self.resolve(source)?;
        self.render(&doc, bindings)
    }

    fn resolve_file(&self, identifier: &str) -> Result<Arc<Document>, TemplateError> {
        let now = self.clock.now();

        match self.lookup(identifier, now) {
            Lookup::Fresh(doc) => {
                trace!(identifier, "template cache hit");
                return Ok(doc);
            }
            Lookup::Missing(error) => {
                trace!(identifier, "template negative cache hit");
                return Err(error);
            }
            Lookup::Stale(doc) => {
                if let Some(path) = doc.path() {
                    let unchanged = self
                        .fs
                        .stat(path)
                        .is_ok_and(|stat| Some(stat.modified) == doc.mod_time);
                    if unchanged {
                        trace!(identifier, "template unchanged after stat");
                        self.store(
                            identifier,
                            Entry::Positive {
                                doc: Arc::clone(&doc),
                                checked_at: now,
                            },
                        );
                        return Ok(doc);
                    }
                }
                trace!(identifier, "template stale, rebuilding");
            }
            Lookup::Absent => trace!(identifier, "template cache miss"),
        }

        match self.load(identifier) {
            Ok(doc) => {
                let doc = Arc::new(doc);
                self.store(
                    identifier,
                    Entry::Positive {
                        doc: Arc::clone(&doc),
                        checked_at: now,
                    },
                );
                Ok(doc)
            }
            Err(error) => {
                if error.is_not_found() {
                    if self.options.negative_stat_ttl > 0 {
                        self.store(
                            identifier,
                            Entry::Negative {
                                error: error.clone(),
                                cached_at: now,
                            },
                        );
                    } else {
                        self.entries.write().remove(identifier);
                    }
                }
                Err(error)
            }
        }
    }

    fn lookup(&self, identifier: &str, now: SystemTime) -> Lookup {
        let entries = self.entries.read();
        match entries.get(identifier) {
            None => Lookup::Absent,
            Some(Entry::Positive { doc, checked_at }) => {
                if within(now, *checked_at, self.options.stat_window()) {
                    Lookup::Fresh(Arc::clone(doc))
                } else {
                    Lookup::Stale(Arc::clone(doc))
                }
            }
            Some(Entry::Negative { error, cached_at }) => {
                if within(now, *cached_at, self.options.negative_window()) {
                    Lookup::Missing(error.clone())
                } else {
                    Lookup::Absent
                }
            }
        }
    }

    fn load(&self, identifier: &str) -> Result<Document, TemplateError> {
        let (path, stat) = self.locate(identifier)?;
        let source_text = self
            .fs
            .read_to_string(&path)
            .map_err(|err| TemplateError::from_io(identifier, &err))?;
        let compiled = self.compile(identifier, &source_text)?;

        Ok(Document {
            identifier: identifier.to_string(),
            path: Some(path),
            source_text,
            compiled,
            mod_time: Some(stat.modified),
        })
    }

    fn locate(&self, identifier: &str) -> Result<(PathBuf, FileStat), TemplateError> {
        let candidate = Path::new(identifier);

        if candidate.is_absolute() {
            if !self.options.allow_absolute {
                return Err(TemplateError::not_found(
                    identifier,
                    "absolute paths are not allowed",
                ));
            }
            return self
                .fs
                .stat(candidate)
                .map(|stat| (candidate.to_path_buf(), stat))
                .map_err(|err| TemplateError::from_io(identifier, &err));
        }

        if !self.options.allow_relative_parent
            && candidate.components().any(|c| c == Component::ParentDir)
        {
            return Err(TemplateError::not_found(
                identifier,
                "relative parent paths are not allowed",
            ));
        }

        for root in &self.options.include_paths {
            let path = root.join(candidate);
            if let Ok(stat) = self.fs.stat(&path) {
                return Ok((path, stat));
            }
        }

        let roots: Vec<_> = self
            .options
            .include_paths
            .iter()
            .map(|root| root.display().to_string())
            .collect();
        Err(TemplateError::not_found(
            identifier,
            format!("not found in include paths [{}]", roots.join(", ")),
        ))
    }

    fn compile(&self, identifier: &str, text: &str) -> Result<Arc<dyn Compiled>, TemplateError> {
        self.compiler
            .compile(text)
            .map_err(|message| TemplateError::Compile {
                identifier: identifier.to_string(),
                message,
            })
    }

    fn store(&self, identifier: &str, entry: Entry) {
        let mut entries = self.entries.write();
        entries.insert(identifier.to_string(), entry);

        let max = self.options.max_cache_entries;
        if max == 0 {
            return;
        }
        while entries.len() > max {
            let victim = entries
                .iter()
                .filter(|(key, _)| key.as_str() != identifier)
                .min_by(|(ka, a), (kb, b)| a.cache_time().cmp(&b.cache_time()).then_with(|| ka.cmp(kb)))
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    trace!(identifier = %key, "evicting template");
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

fn within(now: SystemTime, then: SystemTime, window: std::time::Duration) -> bool {
    now.duration_since(then).unwrap_or_default() < window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, MemoryFs};
    use serde_json::json;
    use std::time::Duration;
    use wayfare_core::fields_from;

    fn cache(fs: &MemoryFs, clock: &ManualClock, options: TemplateOptions) -> TemplateCache {
        TemplateCache::new(options.with_include_paths(["tpl"]))
            .with_file_system(fs.clone())
            .with_clock(clock.clone())
    }

    #[test]
    fn test_hit_within_ttl_skips_stat() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("tpl/main.html", "Hi [% name %]", clock.now());
        let cache = cache(&fs, &clock, TemplateOptions::default().with_stat_ttl(10));

        let first = cache.resolve(&TemplateSource::file("main.html")).unwrap();
        let stats = fs.stat_count();
        clock.advance(Duration::from_secs(5));
        let second = cache.resolve(&TemplateSource::file("main.html")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.stat_count(), stats);
        assert_eq!(fs.read_count(), 1);
    }

    #[test]
    fn test_modified_file_recompiled_after_ttl() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("tpl/main.html", "old", clock.now());
        let cache = cache(&fs, &clock, TemplateOptions::default().with_stat_ttl(1));

        let bindings = Fields::new();
        let source = TemplateSource::file("main.html");
        assert_eq!(cache.process(&source, &bindings).unwrap(), "old");

        clock.advance(Duration::from_secs(2));
        fs.insert("tpl/main.html", "new", clock.now());
        assert_eq!(cache.process(&source, &bindings).unwrap(), "new");
        assert_eq!(fs.read_count(), 2);
    }

    #[test]
    fn test_unchanged_file_revalidated_without_read() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("tpl/main.html", "same", clock.now());
        let cache = cache(&fs, &clock, TemplateOptions::default().with_stat_ttl(1));

        let first = cache.resolve(&TemplateSource::file("main.html")).unwrap();
        clock.advance(Duration::from_secs(3));
        let second = cache.resolve(&TemplateSource::file("main.html")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.read_count(), 1);
        assert_eq!(fs.stat_count(), 2);
    }

    #[test]
    fn test_negative_entry_suppresses_lookups() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        let cache = cache(&fs, &clock, TemplateOptions::default().with_negative_stat_ttl(5));
        let source = TemplateSource::file("missing.html");

        assert!(cache.resolve(&source).unwrap_err().is_not_found());
        assert!(cache.is_negative("missing.html"));
        let stats = fs.stat_count();

        clock.advance(Duration::from_secs(2));
        assert!(cache.resolve(&source).is_err());
        assert_eq!(fs.stat_count(), stats);

        clock.advance(Duration::from_secs(4));
        fs.insert("tpl/missing.html", "found", clock.now());
        assert_eq!(cache.process(&source, &Fields::new()).unwrap(), "found");
        assert!(!cache.is_negative("missing.html"));
    }

    #[test]
    fn test_negative_caching_disabled() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        let cache = cache(&fs, &clock, TemplateOptions::default().with_negative_stat_ttl(0));
        let source = TemplateSource::file("missing.html");

        assert!(cache.resolve(&source).is_err());
        assert!(cache.resolve(&source).is_err());
        assert!(cache.is_empty());
        assert_eq!(fs.stat_count(), 2);
    }

    #[test]
    fn test_eviction_drops_oldest_then_key_order() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        for name in ["a", "b", "c"] {
            fs.insert(format!("tpl/{name}.html"), name, clock.now());
        }
        let cache = cache(
            &fs,
            &clock,
            TemplateOptions::default().with_max_cache_entries(2).with_stat_ttl(60),
        );

        cache.resolve(&TemplateSource::file("b.html")).unwrap();
        cache.resolve(&TemplateSource::file("a.html")).unwrap();
        clock.advance(Duration::from_secs(1));
        cache.resolve(&TemplateSource::file("c.html")).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a.html"));
        assert!(cache.contains("b.html"));
        assert!(cache.contains("c.html"));
    }

    #[test]
    fn test_inline_text_is_not_cached() {
        let cache = TemplateCache::default();
        let out = cache
            .process(&TemplateSource::inline("[% a %]"), &fields_from(json!({"a": 1})))
            .unwrap();
        assert_eq!(out, "1");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_path_rules() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("secret.html", "x", clock.now());
        fs.insert("/abs/page.html", "abs", clock.now());

        let cache = cache(&fs, &clock, TemplateOptions::default());
        assert!(cache.resolve(&TemplateSource::file("../secret.html")).is_err());
        assert!(cache.resolve(&TemplateSource::file("/abs/page.html")).is_err());

        let cache = cache_with(&fs, &clock, TemplateOptions::default().with_allow_absolute(true));
        assert!(cache.resolve(&TemplateSource::file("/abs/page.html")).is_ok());
    }

    fn cache_with(fs: &MemoryFs, clock: &ManualClock, options: TemplateOptions) -> TemplateCache {
        TemplateCache::new(options)
            .with_file_system(fs.clone())
            .with_clock(clock.clone())
    }

    #[test]
    fn test_first_include_root_wins() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("site/main.html", "site", clock.now());
        fs.insert("default/main.html", "default", clock.now());
        let cache = cache_with(
            &fs,
            &clock,
            TemplateOptions::default().with_include_paths(["site", "default"]),
        );
        let out = cache.process(&TemplateSource::file("main.html"), &Fields::new()).unwrap();
        assert_eq!(out, "site");
    }

    #[test]
    fn test_compile_and_render_errors() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("tpl/bad.html", "[% oops", clock.now());
        fs.insert("tpl/strict.html", "[% nope %]", clock.now());
        let cache = cache(&fs, &clock, TemplateOptions::default().with_strict(true));

        let err = cache.resolve(&TemplateSource::file("bad.html")).unwrap_err();
        assert!(matches!(err, TemplateError::Compile { .. }));
        assert!(!cache.contains("bad.html"));

        let err = cache
            .process(&TemplateSource::file("strict.html"), &Fields::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_unreadable_file_is_not_negative_cached() {
        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("tpl/bad.html", "", clock.now());
        fs.fail_reads("tpl/bad.html");
        let cache = cache(&fs, &clock, TemplateOptions::default().with_negative_stat_ttl(60));
        let source = TemplateSource::file("bad.html");

        let err = cache.resolve(&source).unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }), "{err}");
        assert!(!err.is_not_found());
        assert!(!cache.contains("bad.html"));

        cache.resolve(&source).unwrap_err();
        assert_eq!(fs.read_count(), 2);
    }

    #[test]
    fn test_invalid_utf8_on_disk_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.html"), [0xff, 0xfe, 0x00]).unwrap();
        let cache = TemplateCache::new(TemplateOptions::default().with_include_paths([dir.path()]));

        let err = cache.resolve(&TemplateSource::file("bad.html")).unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }), "{err}");
        assert!(!cache.is_negative("bad.html"));
    }

    #[test]
    fn test_concurrent_resolves_share_the_cache() {
        const THREADS: usize = 8;
        const MAX: usize = 4;

        let fs = MemoryFs::new();
        let clock = ManualClock::new();
        fs.insert("tpl/shared.html", "shared [% n %]", clock.now());
        for i in 0..THREADS {
            fs.insert(format!("tpl/page{i}.html"), format!("page {i}"), clock.now());
        }
        let cache = cache(
            &fs,
            &clock,
            TemplateOptions::default().with_max_cache_entries(MAX).with_stat_ttl(60),
        );

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let cache = &cache;
                    scope.spawn(move || {
                        for _ in 0..20 {
                            let shared = cache
                                .process(&TemplateSource::file("shared.html"), &fields_from(json!({"n": i})))
                                .unwrap();
                            assert_eq!(shared, format!("shared {i}"));

                            let own = cache
                                .process(&TemplateSource::file(format!("page{i}.html")), &Fields::new())
                                .unwrap();
                            assert_eq!(own, format!("page {i}"));
                            assert!(cache.len() <= MAX);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });

        assert!(cache.len() <= MAX);
    }
}
