//! Testing utilities for Wayfare.
//!
//! # Features
//!
//! - [`MemoryFs`]: An in-memory [`FileSystem`] that counts stats and reads
//! - [`ManualClock`]: A [`Clock`] that only moves when told to
//! - [`CapturedResponse`]: A [`Response`] that records what was sent
//!
//! All three are cheap handles: clones share state, so a test can keep one
//! clone for inspection and hand another to the code under test.

use crate::template::{Clock, FileStat, FileSystem};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use wayfare_core::{NavError, Response};

// ============================================================================
// In-memory filesystem
// ============================================================================

#[derive(Default)]
struct MemoryFsInner {
    files: Mutex<HashMap<PathBuf, (String, SystemTime)>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    stats: AtomicUsize,
    reads: AtomicUsize,
}

/// An in-memory filesystem.
///
/// # Example
///
/// ```rust,ignore
/// let fs = MemoryFs::new();
/// fs.insert("tpl/main.html", "Hello", clock.now());
/// let cache = TemplateCache::new(options).with_file_system(fs.clone());
/// cache.resolve(&TemplateSource::file("main.html"))?;
/// assert_eq!(fs.stat_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryFs {
    inner: Arc<MemoryFsInner>,
}

impl MemoryFs {
    /// Create an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>, modified: SystemTime) {
        self.inner
            .files
            .lock()
            .insert(path.into(), (text.into(), modified));
    }

    /// Delete a file.
    pub fn remove(&self, path: impl AsRef<Path>) {
        self.inner.files.lock().remove(path.as_ref());
    }

    /// Make reads of an existing file fail with `InvalidData`; `stat` still succeeds.
    pub fn fail_reads(&self, path: impl Into<PathBuf>) {
        self.inner.unreadable.lock().insert(path.into());
    }

    /// Number of `stat` calls so far, successful or not.
    pub fn stat_count(&self) -> usize {
        self.inner.stats.load(Ordering::SeqCst)
    }

    /// Number of `read_to_string` calls so far.
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }
}

fn missing(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: No such file or directory", path.display()),
    )
}

impl FileSystem for MemoryFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.stats.fetch_add(1, Ordering::SeqCst);
        self.inner
            .files
            .lock()
            .get(path)
            .map(|(_, modified)| FileStat {
                modified: *modified,
            })
            .ok_or_else(|| missing(path))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        if self.inner.unreadable.lock().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream did not contain valid UTF-8",
            ));
        }
        self.inner
            .files
            .lock()
            .get(path)
            .map(|(text, _)| text.clone())
            .ok_or_else(|| missing(path))
    }
}

// ============================================================================
// Manual clock
// ============================================================================

/// A clock that only advances when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<SystemTime>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Start at a fixed, arbitrary instant.
    pub fn new() -> Self {
        Self::starting_at(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }

    /// Start at `now`.
    pub fn starting_at(now: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// The current instant.
    pub fn now(&self) -> SystemTime {
        *self.now.lock()
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        ManualClock::now(self)
    }
}

// ============================================================================
// Captured response
// ============================================================================

/// Everything sent through a [`CapturedResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// The last status set.
    pub status: Option<u16>,
    /// Content type of the last send.
    pub content_type: Option<String>,
    /// All bodies, concatenated.
    pub body: String,
    /// Number of sends.
    pub sends: usize,
    /// Whether `end` was called.
    pub ended: bool,
}

/// A response that records what it receives.
#[derive(Clone, Default)]
pub struct CapturedResponse {
    inner: Arc<Mutex<Captured>>,
}

impl CapturedResponse {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of what was captured.
    pub fn captured(&self) -> Captured {
        self.inner.lock().clone()
    }

    /// The body sent so far.
    pub fn body(&self) -> String {
        self.inner.lock().body.clone()
    }

    /// The last status set.
    pub fn status(&self) -> Option<u16> {
        self.inner.lock().status
    }

    /// The content type of the last send.
    pub fn content_type(&self) -> Option<String> {
        self.inner.lock().content_type.clone()
    }
}

impl Response for CapturedResponse {
    fn set_status(&mut self, status: u16) {
        self.inner.lock().status = Some(status);
    }

    fn send(&mut self, content_type: &str, body: &str) -> Result<(), NavError> {
        let mut inner = self.inner.lock();
        inner.content_type = Some(content_type.to_string());
        inner.body.push_str(body);
        inner.sends += 1;
        Ok(())
    }

    fn end(&mut self) {
        self.inner.lock().ended = true;
    }
}
