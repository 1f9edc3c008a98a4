//! Experiment catalog: enumerate, find and build experiments.
//!
//! [`Catalog`] is a thin convenience layer: each call opens a fresh
//! [`CatalogSession`], does its work through the session's caches, and
//! hands the session to the experiments it returns. Callers handling
//! several experiments in one logical operation can take a session with
//! [`Catalog::session`] and reuse it.

mod session;
mod slot;

pub use session::CatalogSession;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::descriptor::ExperimentSpec;
use crate::experiment::Experiment;
use crate::kv::KvStore;
use crate::Result;

/// Registry of experiments held by a shared store.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use experiment_catalog::Catalog;
/// use experiment_catalog::kv::MemoryKvStore;
///
/// let catalog = Catalog::new(Arc::new(MemoryKvStore::new()));
///
/// catalog.find_or_create(("homepage:2", "signup"), Some("control"), ["variant"])?;
///
/// let homepage = catalog.find("homepage")?.expect("created above");
/// assert_eq!(homepage.alternatives(), ["control", "variant"]);
/// assert_eq!(homepage.goals(), ["signup"]);
/// assert!(catalog.find("pricing")?.is_none());
/// # Ok::<(), experiment_catalog::Error>(())
/// ```
pub struct Catalog<S: KvStore> {
    store: Arc<S>,
    config: CatalogConfig,
}

impl<S: KvStore> Catalog<S> {
    /// Catalog over `store` with the default key layout.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, CatalogConfig::default())
    }

    /// Catalog over `store` with a custom key layout.
    #[must_use]
    pub const fn with_config(store: Arc<S>, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    /// Create a new catalog builder
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Key layout in use.
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Open a fresh session with empty caches.
    #[must_use]
    pub fn session(&self) -> Arc<CatalogSession<S>> {
        Arc::new(CatalogSession::new(
            Arc::clone(&self.store),
            self.config.clone(),
        ))
    }

    /// Every registered experiment that resolves, in registry order.
    ///
    /// Registry entries whose key is gone or whose config cannot be read
    /// are skipped. All experiments share one session.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn all(&self) -> Result<Vec<Experiment<S>>> {
        let session = self.session();
        let names = self.store.smembers(&self.config.registry_key)?;
        let mut experiments = Vec::with_capacity(names.len());
        for name in names {
            match session.find(&name) {
                Ok(Some(experiment)) => experiments.push(experiment),
                Ok(None) => debug!(experiment = %name, "skipping stale registry entry"),
                Err(e) if e.is_resolution_failure() => {
                    warn!(experiment = %name, error = %e, "skipping unresolvable registry entry");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(experiments)
    }

    /// [`all`](Self::all) with active experiments (no winner) first, then
    /// concluded ones, each group sorted by name.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn all_active_first(&self) -> Result<Vec<Experiment<S>>> {
        let mut active = Vec::new();
        let mut concluded = Vec::new();
        for experiment in self.all()? {
            if experiment.has_winner()? {
                concluded.push(experiment);
            } else {
                active.push(experiment);
            }
        }
        active.sort_by(|a, b| a.name().cmp(b.name()));
        concluded.sort_by(|a, b| a.name().cmp(b.name()));
        active.extend(concluded);
        Ok(active)
    }

    /// Load the experiment stored under `name`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Store failures, or [`Error::CorruptExperiment`](crate::Error::CorruptExperiment).
    pub fn find(&self, name: &str) -> Result<Option<Experiment<S>>> {
        self.session().find(name)
    }

    /// Build, without persisting, an experiment from a descriptor, an
    /// optional control and the remaining alternatives.
    ///
    /// See [`CatalogSession::find_or_initialize`].
    #[must_use]
    pub fn find_or_initialize<I>(
        &self,
        descriptor: impl Into<ExperimentSpec>,
        control: Option<&str>,
        alternatives: I,
    ) -> Experiment<S>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.session()
            .find_or_initialize(descriptor, control, alternatives)
    }

    /// List form: the first element is the control.
    #[must_use]
    pub fn find_or_initialize_from_list<I>(
        &self,
        descriptor: impl Into<ExperimentSpec>,
        alternatives: I,
    ) -> Experiment<S>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.session()
            .find_or_initialize_from_list(descriptor, alternatives)
    }

    /// [`find_or_initialize`](Self::find_or_initialize), then save.
    ///
    /// # Errors
    ///
    /// Whatever [`Experiment::save`] returns.
    pub fn find_or_create<I>(
        &self,
        descriptor: impl Into<ExperimentSpec>,
        control: Option<&str>,
        alternatives: I,
    ) -> Result<Experiment<S>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut experiment = self.find_or_initialize(descriptor, control, alternatives);
        experiment.save()?;
        Ok(experiment)
    }

    /// [`find_or_initialize_from_list`](Self::find_or_initialize_from_list),
    /// then save.
    ///
    /// # Errors
    ///
    /// Whatever [`Experiment::save`] returns.
    pub fn find_or_create_from_list<I>(
        &self,
        descriptor: impl Into<ExperimentSpec>,
        alternatives: I,
    ) -> Result<Experiment<S>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut experiment = self.find_or_initialize_from_list(descriptor, alternatives);
        experiment.save()?;
        Ok(experiment)
    }
}

impl<S: KvStore> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

/// Catalog builder
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    config: CatalogConfig,
}

impl CatalogBuilder {
    /// Replace the whole key layout
    #[must_use]
    pub fn config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the registry set key
    #[must_use]
    pub fn registry_key(mut self, key: impl Into<String>) -> Self {
        self.config.registry_key = key.into();
        self
    }

    /// Set the winner hash key
    #[must_use]
    pub fn winner_key(mut self, key: impl Into<String>) -> Self {
        self.config.winner_key = key.into();
        self
    }

    /// Set the start-time hash key
    #[must_use]
    pub fn start_times_key(mut self, key: impl Into<String>) -> Self {
        self.config.start_times_key = key.into();
        self
    }

    /// Build the catalog over `store`
    #[must_use]
    pub fn build<S: KvStore>(self, store: Arc<S>) -> Catalog<S> {
        Catalog::with_config(store, self.config)
    }
}
