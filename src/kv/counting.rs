//! Call-counting KV store wrapper
//!
//! Forwards every operation to any `KvStore` backend and records how many
//! round trips of each kind were issued. Used to verify that session
//! caches actually spare the store.

use super::{FieldSet, KvStore};
use crate::Result;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot of round-trip counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `exists` calls
    pub exists: usize,
    /// `smembers` calls
    pub smembers: usize,
    /// `hgetall` calls
    pub hgetall: usize,
    /// `hget` calls
    pub hget: usize,
    /// Mutations (`sadd`, `srem`, `hset`, `hdel`, `del`)
    pub writes: usize,
}

impl CallCounts {
    /// Total number of round trips.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.exists + self.smembers + self.hgetall + self.hget + self.writes
    }

    /// Total number of read round trips.
    #[must_use]
    pub const fn reads(&self) -> usize {
        self.exists + self.smembers + self.hgetall + self.hget
    }
}

#[derive(Debug, Default)]
struct Counters {
    exists: AtomicUsize,
    smembers: AtomicUsize,
    hgetall: AtomicUsize,
    hget: AtomicUsize,
    writes: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Counting KV store wrapper
///
/// # Example
///
/// ```rust
/// use experiment_catalog::kv::{CountingKvStore, KvStore, MemoryKvStore};
///
/// let store = CountingKvStore::new(MemoryKvStore::new());
/// store.exists("experiments")?;
/// store.hgetall("experiment_winner")?;
///
/// let counts = store.counts();
/// assert_eq!(counts.exists, 1);
/// assert_eq!(counts.hgetall, 1);
/// assert_eq!(counts.total(), 2);
/// # Ok::<(), experiment_catalog::Error>(())
/// ```
#[derive(Debug)]
pub struct CountingKvStore<S: KvStore> {
    inner: S,
    counters: Counters,
}

impl<S: KvStore> CountingKvStore<S> {
    /// Wrap a store with zeroed counters
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counters: Counters::default(),
        }
    }

    /// Get reference to inner store (writes through it are not counted)
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Current counter values
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        CallCounts {
            exists: self.counters.exists.load(Ordering::Relaxed),
            smembers: self.counters.smembers.load(Ordering::Relaxed),
            hgetall: self.counters.hgetall.load(Ordering::Relaxed),
            hget: self.counters.hget.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter
    pub fn reset_counts(&self) {
        self.counters.exists.store(0, Ordering::Relaxed);
        self.counters.smembers.store(0, Ordering::Relaxed);
        self.counters.hgetall.store(0, Ordering::Relaxed);
        self.counters.hget.store(0, Ordering::Relaxed);
        self.counters.writes.store(0, Ordering::Relaxed);
    }
}

impl<S: KvStore> KvStore for CountingKvStore<S> {
    fn exists(&self, key: &str) -> Result<bool> {
        bump(&self.counters.exists);
        self.inner.exists(key)
    }

    fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        bump(&self.counters.smembers);
        self.inner.smembers(key)
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        bump(&self.counters.writes);
        self.inner.sadd(key, member)
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool> {
        bump(&self.counters.writes);
        self.inner.srem(key, member)
    }

    fn hgetall(&self, key: &str) -> Result<FieldSet> {
        bump(&self.counters.hgetall);
        self.inner.hgetall(key)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        bump(&self.counters.hget);
        self.inner.hget(key, field)
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        bump(&self.counters.writes);
        self.inner.hset(key, field, value)
    }

    fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        bump(&self.counters.writes);
        self.inner.hdel(key, field)
    }

    fn del(&self, key: &str) -> Result<()> {
        bump(&self.counters.writes);
        self.inner.del(key)
    }
}
