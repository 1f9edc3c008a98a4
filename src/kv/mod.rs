//! Key-Value Store Module
//!
//! The catalog reads and writes a shared store with Redis-like semantics:
//! - Sets (the experiment registry)
//! - Hashes (per-experiment config, the winner map, the start-time map)
//!
//! The store is an external collaborator. This module defines its contract
//! and ships an in-memory backend plus a call-counting wrapper.
//!
//! # Example
//!
//! ```rust
//! use experiment_catalog::kv::{KvStore, MemoryKvStore};
//!
//! let store = MemoryKvStore::new();
//!
//! store.sadd("experiments", "homepage_cta")?;
//! store.hset("experiment_winner", "homepage_cta", "blue")?;
//!
//! assert!(store.exists("experiments")?);
//! assert_eq!(
//!     store.hget("experiment_winner", "homepage_cta")?,
//!     Some("blue".to_string())
//! );
//! # Ok::<(), experiment_catalog::Error>(())
//! ```

mod counting;
mod memory;

pub use counting::{CallCounts, CountingKvStore};
pub use memory::MemoryKvStore;

use crate::Result;
use std::collections::{HashMap, HashSet};

/// All fields of one hash, as returned by [`KvStore::hgetall`].
pub type FieldSet = HashMap<String, String>;

/// Key-value store contract used by the catalog.
///
/// Every method is one blocking round trip. Implementations own retries,
/// timeouts and connection handling; errors surface as
/// [`Error::Store`](crate::Error::Store) and are never swallowed by the
/// catalog.
pub trait KvStore: Send + Sync {
    /// Check if a key holds any value.
    fn exists(&self, key: &str) -> Result<bool>;

    /// Members of the set at `key`.
    ///
    /// Returns an empty set if the key doesn't exist.
    fn smembers(&self, key: &str) -> Result<HashSet<String>>;

    /// Add a member to the set at `key`, creating it if needed.
    ///
    /// Returns `true` if the member was not already present.
    fn sadd(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove a member from the set at `key`.
    ///
    /// Returns `true` if the member was present.
    fn srem(&self, key: &str, member: &str) -> Result<bool>;

    /// All fields of the hash at `key`.
    ///
    /// Returns an empty field set if the key doesn't exist.
    fn hgetall(&self, key: &str) -> Result<FieldSet>;

    /// One field of the hash at `key`.
    fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Set one field of the hash at `key`, creating it if needed.
    fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Remove one field of the hash at `key`.
    ///
    /// Returns `true` if the field was present.
    fn hdel(&self, key: &str, field: &str) -> Result<bool>;

    /// Delete a key of any type.
    ///
    /// No-op if the key doesn't exist.
    fn del(&self, key: &str) -> Result<()>;

    /// Set several fields of one hash.
    fn hset_multiple(&self, key: &str, pairs: &[(&str, &str)]) -> Result<()> {
        for (field, value) in pairs {
            self.hset(key, field, value)?;
        }
        Ok(())
    }
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }

    fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        (**self).smembers(key)
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        (**self).sadd(key, member)
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool> {
        (**self).srem(key, member)
    }

    fn hgetall(&self, key: &str) -> Result<FieldSet> {
        (**self).hgetall(key)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        (**self).hget(key, field)
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        (**self).hset(key, field, value)
    }

    fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        (**self).hdel(key, field)
    }

    fn del(&self, key: &str) -> Result<()> {
        (**self).del(key)
    }

    fn hset_multiple(&self, key: &str, pairs: &[(&str, &str)]) -> Result<()> {
        (**self).hset_multiple(key, pairs)
    }
}
