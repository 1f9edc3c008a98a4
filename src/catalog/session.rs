//! Catalog session: per-operation memoized store lookups.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use super::slot::CacheSlot;
use crate::config::CatalogConfig;
use crate::descriptor::{canonical_name, ExperimentSpec};
use crate::experiment::Experiment;
use crate::kv::{FieldSet, KvStore};
use crate::Result;

/// Caching context over the experiment registry.
///
/// A session memoizes four kinds of lookups:
///
/// | cache | granularity | filled by |
/// |-------|-------------|-----------|
/// | existence | per name | `exists` |
/// | config | per name | `hgetall(name)` |
/// | winners | whole map | `hgetall(winner_key)` |
/// | start times | whole map | `hgetall(start_times_key)` |
///
/// A cached entry is never refreshed behind the caller's back: it stays
/// until the matching `clear_*` call. Create one session per logical
/// operation and drop it afterwards to keep the staleness window short.
///
/// Sessions are shared with the experiments they build through `Arc`, so
/// lookups that construct experiments take `self: &Arc<Self>`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use experiment_catalog::{CatalogConfig, CatalogSession};
/// use experiment_catalog::kv::{CountingKvStore, KvStore, MemoryKvStore};
///
/// let store = Arc::new(CountingKvStore::new(MemoryKvStore::new()));
/// store.hset("experiment_winner", "checkout", "one_click")?;
/// store.reset_counts();
///
/// let session = CatalogSession::new(Arc::clone(&store), CatalogConfig::default());
/// assert_eq!(session.winner("checkout")?, Some("one_click".to_string()));
/// assert_eq!(session.winner("signup")?, None);
/// assert_eq!(store.counts().hgetall, 1);
/// # Ok::<(), experiment_catalog::Error>(())
/// ```
pub struct CatalogSession<S: KvStore> {
    store: Arc<S>,
    config: CatalogConfig,
    exists: DashMap<String, bool, FxBuildHasher>,
    configs: DashMap<String, Arc<FieldSet>, FxBuildHasher>,
    winners: CacheSlot<FieldSet>,
    start_times: CacheSlot<FieldSet>,
}

impl<S: KvStore> CatalogSession<S> {
    /// Create an empty session over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, config: CatalogConfig) -> Self {
        Self {
            store,
            config,
            exists: DashMap::with_hasher(FxBuildHasher),
            configs: DashMap::with_hasher(FxBuildHasher),
            winners: CacheSlot::new(),
            start_times: CacheSlot::new(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Key layout this session reads.
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Load the experiment stored under `name`.
    ///
    /// Returns `Ok(None)` when no such key exists. The existence check goes
    /// through the existence cache, hydration through the config cache.
    ///
    /// # Errors
    ///
    /// Store failures, or [`Error::CorruptExperiment`](crate::Error::CorruptExperiment)
    /// when the key exists but does not hold a usable config.
    pub fn find(self: &Arc<Self>, name: &str) -> Result<Option<Experiment<S>>> {
        if !self.experiment_exists(name)? {
            return Ok(None);
        }
        let mut experiment = Experiment::builder(name, Arc::clone(self)).build();
        experiment.load_from_store()?;
        Ok(Some(experiment))
    }

    /// Build, without persisting, an experiment from a descriptor, an
    /// optional control and the remaining alternatives.
    ///
    /// The store name is the descriptor's identifier cut at its first `:`;
    /// alternatives are `[control] ++ alternatives`.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use experiment_catalog::{CatalogConfig, CatalogSession};
    /// use experiment_catalog::kv::MemoryKvStore;
    ///
    /// let session = Arc::new(CatalogSession::new(
    ///     Arc::new(MemoryKvStore::new()),
    ///     CatalogConfig::default(),
    /// ));
    /// let experiment = session.find_or_initialize("exp:2", Some("A"), ["B"]);
    /// assert_eq!(experiment.name(), "exp");
    /// assert_eq!(experiment.identifier(), "exp:2");
    /// assert_eq!(experiment.alternatives(), ["A", "B"]);
    /// ```
    #[must_use]
    pub fn find_or_initialize<I>(
        self: &Arc<Self>,
        descriptor: impl Into<ExperimentSpec>,
        control: Option<&str>,
        alternatives: I,
    ) -> Experiment<S>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.initialize(
            descriptor.into(),
            control.map(str::to_string),
            alternatives.into_iter().map(Into::<String>::into).collect(),
        )
    }

    /// List form of [`find_or_initialize`](Self::find_or_initialize): the
    /// first element is the control, the rest are the alternatives.
    #[must_use]
    pub fn find_or_initialize_from_list<I>(
        self: &Arc<Self>,
        descriptor: impl Into<ExperimentSpec>,
        alternatives: I,
    ) -> Experiment<S>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut alternatives = alternatives.into_iter().map(Into::<String>::into);
        let control = alternatives.next();
        self.initialize(descriptor.into(), control, alternatives.collect())
    }

    fn initialize(
        self: &Arc<Self>,
        descriptor: ExperimentSpec,
        control: Option<String>,
        alternatives: Vec<String>,
    ) -> Experiment<S> {
        let (identifier, goals) = descriptor.normalize();
        let name = canonical_name(&identifier).to_string();
        Experiment::builder(name, Arc::clone(self))
            .identifier(identifier)
            .alternatives(control.into_iter().chain(alternatives))
            .goals(goals)
            .build()
    }

    /// Winning alternative of `test`, if one was declared.
    ///
    /// The first call after creation or [`clear_winners`](Self::clear_winners)
    /// fetches the whole winner map; later calls for any test are served
    /// from that snapshot.
    ///
    /// # Errors
    ///
    /// Store failures while fetching the snapshot.
    pub fn winner(&self, test: &str) -> Result<Option<String>> {
        let winners = self.winners.get_or_fetch(|| {
            debug!(key = %self.config.winner_key, "fetching winner map");
            self.store.hgetall(&self.config.winner_key)
        })?;
        Ok(winners.get(test).cloned())
    }

    /// Drop the winner snapshot.
    pub fn clear_winners(&self) {
        debug!("clearing winner snapshot");
        self.winners.clear();
    }

    /// Raw start timestamp of `test`, if it was started.
    ///
    /// Same snapshot discipline as [`winner`](Self::winner), over the
    /// start-time map.
    ///
    /// # Errors
    ///
    /// Store failures while fetching the snapshot.
    pub fn start_time(&self, test: &str) -> Result<Option<String>> {
        let start_times = self.start_times.get_or_fetch(|| {
            debug!(key = %self.config.start_times_key, "fetching start-time map");
            self.store.hgetall(&self.config.start_times_key)
        })?;
        Ok(start_times.get(test).cloned())
    }

    /// Drop the start-time snapshot.
    pub fn clear_start_times(&self) {
        debug!("clearing start-time snapshot");
        self.start_times.clear();
    }

    /// Whether a key named `name` exists in the store.
    ///
    /// Both answers are cached, so a `false` sticks until
    /// [`clear_experiment_exists`](Self::clear_experiment_exists) or
    /// [`add_experiment_exists`](Self::add_experiment_exists).
    ///
    /// # Errors
    ///
    /// Store failures on a cache miss.
    pub fn experiment_exists(&self, name: &str) -> Result<bool> {
        if let Some(cached) = self.exists.get(name) {
            return Ok(*cached);
        }
        debug!(experiment = name, "checking experiment existence");
        let found = self.store.exists(name)?;
        // a racing fill or add_experiment_exists may have landed first
        let cached = *self.exists.entry(name.to_string()).or_insert(found);
        Ok(cached)
    }

    /// Record that `name` exists without asking the store.
    ///
    /// Overwrites a cached `false`.
    pub fn add_experiment_exists(&self, name: &str) {
        self.exists.insert(name.to_string(), true);
    }

    /// Forget the cached existence of `name`.
    pub fn clear_experiment_exists(&self, name: &str) {
        if self.exists.remove(name).is_some() {
            debug!(experiment = name, "cleared existence entry");
        }
    }

    /// All config fields stored for `name`.
    ///
    /// Fetched once per name; an empty result is cached as well.
    ///
    /// # Errors
    ///
    /// Store failures on a cache miss.
    pub fn experiment_config(&self, name: &str) -> Result<Arc<FieldSet>> {
        if let Some(cached) = self.configs.get(name) {
            return Ok(Arc::clone(&cached));
        }
        debug!(experiment = name, "fetching experiment config");
        let fields = Arc::new(self.store.hgetall(name)?);
        let cached = self.configs.entry(name.to_string()).or_insert(fields);
        Ok(Arc::clone(&cached))
    }

    /// Forget the cached config of `name`.
    pub fn clear_experiment_config(&self, name: &str) {
        if self.configs.remove(name).is_some() {
            debug!(experiment = name, "cleared config entry");
        }
    }
}

impl<S: KvStore> std::fmt::Debug for CatalogSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSession")
            .field("config", &self.config)
            .field("cached_exists", &self.exists.len())
            .field("cached_configs", &self.configs.len())
            .field("winners_cached", &self.winners.is_populated())
            .field("start_times_cached", &self.start_times.is_populated())
            .finish_non_exhaustive()
    }
}
