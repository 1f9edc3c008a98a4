//! Catalog configuration: the store keys the registry lives under.

use serde::{Deserialize, Serialize};

/// Default key of the registry set.
pub const DEFAULT_REGISTRY_KEY: &str = "experiments";
/// Default key of the winner hash.
pub const DEFAULT_WINNER_KEY: &str = "experiment_winner";
/// Default key of the start-time hash.
pub const DEFAULT_START_TIMES_KEY: &str = "experiment_start_times";

fn default_registry_key() -> String {
    DEFAULT_REGISTRY_KEY.to_string()
}

fn default_winner_key() -> String {
    DEFAULT_WINNER_KEY.to_string()
}

fn default_start_times_key() -> String {
    DEFAULT_START_TIMES_KEY.to_string()
}

/// Store key layout used by the catalog.
///
/// Missing fields fall back to the defaults, so a partial JSON document
/// is a valid config:
///
/// ```rust
/// use experiment_catalog::CatalogConfig;
///
/// let config: CatalogConfig =
///     serde_json::from_str(r#"{"registry_key": "staging:experiments"}"#).unwrap();
/// assert_eq!(config.registry_key, "staging:experiments");
/// assert_eq!(config.winner_key, "experiment_winner");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Set of experiment names
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
    /// Hash of experiment name to winning alternative
    #[serde(default = "default_winner_key")]
    pub winner_key: String,
    /// Hash of experiment name to start timestamp
    #[serde(default = "default_start_times_key")]
    pub start_times_key: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            registry_key: default_registry_key(),
            winner_key: default_winner_key(),
            start_times_key: default_start_times_key(),
        }
    }
}
