//! Experiment - a named test with alternatives and goals

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::stored_config::StoredConfig;
use crate::catalog::CatalogSession;
use crate::kv::KvStore;
use crate::{Error, Result};

/// An A/B test registered in the store.
///
/// Built by a [`CatalogSession`] (or its builder) and bound to that
/// session: winner, start time and stored config are all read through the
/// session's caches.
pub struct Experiment<S: KvStore> {
    name: String,
    identifier: String,
    alternatives: Vec<String>,
    goals: Vec<String>,
    resettable: bool,
    version: u64,
    session: Arc<CatalogSession<S>>,
}

impl<S: KvStore> Experiment<S> {
    /// Create a builder for an experiment stored under `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>, session: Arc<CatalogSession<S>>) -> ExperimentBuilder<S> {
        ExperimentBuilder::new(name, session)
    }

    /// Canonical store name (no version suffix).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier the experiment was requested with, version suffix
    /// included. Equal to [`name`](Self::name) for stored experiments.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Alternatives in order; the first one is the control.
    #[must_use]
    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// The control alternative, if any.
    #[must_use]
    pub fn control(&self) -> Option<&str> {
        self.alternatives.first().map(String::as_str)
    }

    /// Goals tracked by the experiment.
    #[must_use]
    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    /// Whether participants may be re-assigned after finishing.
    #[must_use]
    pub const fn resettable(&self) -> bool {
        self.resettable
    }

    /// Config version, bumped every time a saved experiment changes shape.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The owning session.
    #[must_use]
    pub const fn session(&self) -> &Arc<CatalogSession<S>> {
        &self.session
    }

    /// Hydrate alternatives, goals and flags from the stored config.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptExperiment`] if the config hash is missing or
    /// malformed; store failures otherwise.
    pub fn load_from_store(&mut self) -> Result<()> {
        let fields = self.session.experiment_config(&self.name)?;
        let stored = StoredConfig::parse(&self.name, &fields)?;
        self.alternatives = stored.alternatives;
        self.goals = stored.goals;
        self.resettable = stored.resettable;
        self.version = stored.version;
        Ok(())
    }

    /// Declared winner, read through the session's winner snapshot.
    ///
    /// # Errors
    ///
    /// Store failures while fetching the snapshot.
    pub fn winner(&self) -> Result<Option<String>> {
        self.session.winner(&self.name)
    }

    /// Whether a winner has been declared.
    ///
    /// # Errors
    ///
    /// Store failures while fetching the snapshot.
    pub fn has_winner(&self) -> Result<bool> {
        Ok(self.winner()?.is_some())
    }

    /// When the experiment started, read through the session's start-time
    /// snapshot.
    ///
    /// Accepts unix seconds or RFC 3339. Anything else reads as "not
    /// started".
    ///
    /// # Errors
    ///
    /// Store failures while fetching the snapshot.
    pub fn start_time(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.session.start_time(&self.name)? else {
            return Ok(None);
        };
        let parsed = raw.parse::<i64>().map_or_else(
            |_| {
                DateTime::parse_from_rfc3339(&raw)
                    .ok()
                    .map(|t| t.with_timezone(&Utc))
            },
            |secs| DateTime::from_timestamp(secs, 0),
        );
        if parsed.is_none() {
            warn!(experiment = %self.name, raw = %raw, "unparseable start time");
        }
        Ok(parsed)
    }

    /// Whether the experiment has not been saved yet.
    ///
    /// # Errors
    ///
    /// Store failures on an existence cache miss.
    pub fn is_new_record(&self) -> Result<bool> {
        Ok(!self.session.experiment_exists(&self.name)?)
    }

    /// Persist the experiment.
    ///
    /// A new experiment is added to the registry, stamped with the current
    /// start time and written at version 0. An existing one whose
    /// alternatives or goals differ from the stored config is rewritten at
    /// the next version and loses its declared winner. An unchanged one
    /// only adopts the stored version.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidExperiment`] without alternatives; store failures.
    pub fn save(&mut self) -> Result<()> {
        if self.alternatives.is_empty() {
            return Err(Error::InvalidExperiment(format!(
                "'{}' needs at least one alternative",
                self.name
            )));
        }
        let store = self.session.store();
        let config = self.session.config();

        if self.is_new_record()? {
            debug!(experiment = %self.name, "creating experiment");
            store.sadd(&config.registry_key, &self.name)?;
            store.hset(
                &config.start_times_key,
                &self.name,
                &Utc::now().timestamp().to_string(),
            )?;
            self.session.clear_start_times();
            self.version = 0;
            self.write_config()?;
            self.session.add_experiment_exists(&self.name);
            return Ok(());
        }

        store.sadd(&config.registry_key, &self.name)?;
        let fields = self.session.experiment_config(&self.name)?;
        match StoredConfig::parse(&self.name, &fields) {
            Ok(stored) if stored.alternatives == self.alternatives && stored.goals == self.goals => {
                self.version = stored.version;
                if stored.resettable != self.resettable {
                    self.write_config()?;
                }
            }
            Ok(stored) => {
                debug!(experiment = %self.name, version = stored.version + 1, "experiment changed, restarting");
                self.version = stored.version + 1;
                store.hdel(&config.winner_key, &self.name)?;
                self.session.clear_winners();
                self.write_config()?;
            }
            Err(e) if e.is_resolution_failure() => {
                warn!(experiment = %self.name, error = %e, "overwriting unreadable config");
                self.version = 0;
                self.write_config()?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn write_config(&self) -> Result<()> {
        let encoded = StoredConfig {
            alternatives: self.alternatives.clone(),
            goals: self.goals.clone(),
            resettable: self.resettable,
            version: self.version,
        }
        .encode()?;
        let pairs: Vec<(&str, &str)> = encoded.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.session.store().hset_multiple(&self.name, &pairs)?;
        self.session.clear_experiment_config(&self.name);
        Ok(())
    }

    /// Declare `alternative` the winner.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidExperiment`] if `alternative` is not one of this
    /// experiment's alternatives; store failures.
    pub fn set_winner(&self, alternative: &str) -> Result<()> {
        if !self.alternatives.iter().any(|a| a == alternative) {
            return Err(Error::InvalidExperiment(format!(
                "'{alternative}' is not an alternative of '{}'",
                self.name
            )));
        }
        let config = self.session.config();
        self.session
            .store()
            .hset(&config.winner_key, &self.name, alternative)?;
        self.session.clear_winners();
        Ok(())
    }

    /// Remove the declared winner, if any.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn reset_winner(&self) -> Result<()> {
        let config = self.session.config();
        self.session.store().hdel(&config.winner_key, &self.name)?;
        self.session.clear_winners();
        Ok(())
    }

    /// Remove every trace of the experiment from the store.
    ///
    /// The in-memory value survives and may be saved again.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn delete(&self) -> Result<()> {
        let store = self.session.store();
        let config = self.session.config();
        store.srem(&config.registry_key, &self.name)?;
        store.del(&self.name)?;
        store.hdel(&config.winner_key, &self.name)?;
        store.hdel(&config.start_times_key, &self.name)?;
        self.session.clear_experiment_exists(&self.name);
        self.session.clear_experiment_config(&self.name);
        self.session.clear_winners();
        self.session.clear_start_times();
        Ok(())
    }
}

impl<S: KvStore> Clone for Experiment<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            identifier: self.identifier.clone(),
            alternatives: self.alternatives.clone(),
            goals: self.goals.clone(),
            resettable: self.resettable,
            version: self.version,
            session: Arc::clone(&self.session),
        }
    }
}

impl<S: KvStore> std::fmt::Debug for Experiment<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("alternatives", &self.alternatives)
            .field("goals", &self.goals)
            .field("resettable", &self.resettable)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Builder for `Experiment`.
pub struct ExperimentBuilder<S: KvStore> {
    name: String,
    identifier: Option<String>,
    alternatives: Vec<String>,
    goals: Vec<String>,
    resettable: bool,
    session: Arc<CatalogSession<S>>,
}

impl<S: KvStore> ExperimentBuilder<S> {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, session: Arc<CatalogSession<S>>) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            alternatives: Vec::new(),
            goals: Vec::new(),
            resettable: true,
            session,
        }
    }

    /// Set the requested identifier (defaults to the name).
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Set the alternatives, control first.
    #[must_use]
    pub fn alternatives<I>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    /// Set the goals.
    #[must_use]
    pub fn goals<I>(mut self, goals: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.goals = goals.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether participants may be re-assigned.
    #[must_use]
    pub const fn resettable(mut self, resettable: bool) -> Self {
        self.resettable = resettable;
        self
    }

    /// Build the `Experiment`.
    #[must_use]
    pub fn build(self) -> Experiment<S> {
        Experiment {
            identifier: self.identifier.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            alternatives: self.alternatives,
            goals: self.goals,
            resettable: self.resettable,
            version: 0,
            session: self.session,
        }
    }
}
