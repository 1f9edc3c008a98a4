//! In-memory KV store implementation using `DashMap`.
//!
//! Data is lost on process restart. Used by tests, benches and demos, and
//! by embedders that keep the experiment registry in-process.

use super::{FieldSet, KvStore};
use crate::{Error, Result};
use dashmap::DashMap;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Value {
    Set(HashSet<String>),
    Hash(FieldSet),
}

impl Value {
    fn is_empty(&self) -> bool {
        match self {
            Self::Set(members) => members.is_empty(),
            Self::Hash(fields) => fields.is_empty(),
        }
    }
}

fn wrong_type(key: &str, expected: &'static str) -> Error {
    Error::WrongType {
        key: key.to_string(),
        expected,
    }
}

/// In-memory key-value store using lock-free concurrent hashmap.
///
/// Follows Redis conventions: reading a missing set or hash yields an empty
/// one, and a set or hash whose last member is removed disappears.
///
/// # Example
///
/// ```rust
/// use experiment_catalog::kv::{KvStore, MemoryKvStore};
///
/// let store = MemoryKvStore::new();
/// store.hset("experiment_start_times", "checkout", "1700000000")?;
/// assert_eq!(store.hgetall("experiment_start_times")?.len(), 1);
/// # Ok::<(), experiment_catalog::Error>(())
/// ```
#[derive(Debug)]
pub struct MemoryKvStore {
    store: DashMap<String, Value>,
}

impl MemoryKvStore {
    /// Create a new in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Create with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: DashMap::with_capacity(capacity),
        }
    }

    /// Get the number of keys in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Clear all keys.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn drop_if_empty(&self, key: &str) {
        self.store.remove_if(key, |_, value| value.is_empty());
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryKvStore {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.contains_key(key))
    }

    fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        match self.store.get(key).as_deref() {
            None => Ok(HashSet::new()),
            Some(Value::Set(members)) => Ok(members.clone()),
            Some(Value::Hash(_)) => Err(wrong_type(key, "set")),
        }
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()));
        match entry.value_mut() {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            Value::Hash(_) => Err(wrong_type(key, "set")),
        }
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let removed = match self.store.get_mut(key) {
            None => return Ok(false),
            Some(mut entry) => match entry.value_mut() {
                Value::Set(members) => members.remove(member),
                Value::Hash(_) => return Err(wrong_type(key, "set")),
            },
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    fn hgetall(&self, key: &str) -> Result<FieldSet> {
        match self.store.get(key).as_deref() {
            None => Ok(FieldSet::new()),
            Some(Value::Hash(fields)) => Ok(fields.clone()),
            Some(Value::Set(_)) => Err(wrong_type(key, "hash")),
        }
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        match self.store.get(key).as_deref() {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(Value::Set(_)) => Err(wrong_type(key, "hash")),
        }
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(FieldSet::new()));
        match entry.value_mut() {
            Value::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Value::Set(_) => Err(wrong_type(key, "hash")),
        }
    }

    fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let removed = match self.store.get_mut(key) {
            None => return Ok(false),
            Some(mut entry) => match entry.value_mut() {
                Value::Hash(fields) => fields.remove(field).is_some(),
                Value::Set(_) => return Err(wrong_type(key, "hash")),
            },
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    fn del(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        Ok(())
    }
}
