//! # Experiment Catalog: A/B-Test Registry over a Shared Key-Value Store
//!
//! The catalog enumerates, locates, constructs and caches metadata about
//! named experiments kept in a shared store. It is built to:
//!
//! - **Tolerate inconsistent registries**: registry entries that no longer
//!   resolve are skipped, not surfaced
//! - **Normalize call shapes**: names, `name:version` identifiers, goal
//!   lists and control/alternative lists all funnel into one builder
//! - **Spare the store**: a [`CatalogSession`] memoizes existence, config,
//!   winner and start-time lookups until explicitly cleared
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use experiment_catalog::Catalog;
//! use experiment_catalog::kv::MemoryKvStore;
//!
//! let catalog = Catalog::new(Arc::new(MemoryKvStore::new()));
//!
//! catalog.find_or_create_from_list("checkout", ["one_page", "two_page"])?;
//! catalog
//!     .find_or_create(("pricing", "upgrade"), Some("monthly"), ["annual"])?
//!     .set_winner("annual")?;
//!
//! let names: Vec<String> = catalog
//!     .all_active_first()?
//!     .iter()
//!     .map(|e| e.name().to_string())
//!     .collect();
//! assert_eq!(names, ["checkout", "pricing"]);
//! # Ok::<(), experiment_catalog::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod experiment;
pub mod kv;

pub use catalog::{Catalog, CatalogBuilder, CatalogSession};
pub use config::CatalogConfig;
pub use descriptor::{canonical_name, normalize_experiment, ExperimentSpec};
pub use error::{Error, Result};
pub use experiment::{Experiment, ExperimentBuilder};
