//! Cache of resolved process executable paths.
//!
//! Owned by whoever needs it and sized by the caller. Entries expire after
//! `ttl` because pids are recycled; the least recently used entry is evicted
//! when the cache is full.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::{Duration, Instant};

use lru::LruCache;

struct Entry {
    path: Option<String>,
    resolved_at: Instant,
}

/// LRU + TTL cache from pid to executable path.
pub struct ProcessPathCache {
    ttl: Duration,
    /// None when caching is disabled.
    entries: Option<LruCache<u32, Entry>>,
}

impl ProcessPathCache {
    /// A capacity of 0 disables caching; every lookup resolves.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.cap().get())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    /// Cached path for `pid`, if present and fresh.
    ///
    /// The outer `Option` is the cache hit; the inner one is the resolved
    /// path, which may itself be a remembered miss.
    pub fn get(&mut self, pid: u32) -> Option<Option<String>> {
        self.get_at(pid, Instant::now())
    }

    pub fn get_at(&mut self, pid: u32, now: Instant) -> Option<Option<String>> {
        let entries = self.entries.as_mut()?;
        let resolved_at = entries.peek(&pid)?.resolved_at;
        if now.saturating_duration_since(resolved_at) >= self.ttl {
            entries.pop(&pid);
            return None;
        }
        entries.get(&pid).map(|entry| entry.path.clone())
    }

    pub fn insert(&mut self, pid: u32, path: Option<String>) {
        self.insert_at(pid, path, Instant::now());
    }

    /// Store `path`, evicting the least recently used entry when full.
    pub fn insert_at(&mut self, pid: u32, path: Option<String>, now: Instant) {
        if let Some(entries) = self.entries.as_mut() {
            entries.put(pid, Entry { path, resolved_at: now });
        }
    }

    pub fn invalidate(&mut self, pid: u32) {
        if let Some(entries) = self.entries.as_mut() {
            entries.pop(&pid);
        }
    }

    /// Cached path, or the resolver's answer (cached, misses included).
    pub fn get_or_resolve<F>(&mut self, pid: u32, resolve: F) -> Option<String>
    where
        F: FnOnce(u32) -> Option<String>,
    {
        self.get_or_resolve_at(pid, Instant::now(), resolve)
    }

    pub fn get_or_resolve_at<F>(&mut self, pid: u32, now: Instant, resolve: F) -> Option<String>
    where
        F: FnOnce(u32) -> Option<String>,
    {
        if let Some(cached) = self.get_at(pid, now) {
            return cached;
        }
        let path = resolve(pid);
        self.insert_at(pid, path.clone(), now);
        path
    }
}

/// Resolve `<proc_root>/<pid>/exe`. Kernel threads and other users'
/// processes resolve to `None`.
pub fn resolve_exe_path(proc_root: &Path, pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    std::fs::read_link(proc_root.join(pid.to_string()).join("exe"))
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}
