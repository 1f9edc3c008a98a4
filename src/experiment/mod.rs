//! Experiment entity
//!
//! An [`Experiment`] is a named test with ordered alternatives (control
//! first) and the goals it tracks. Its config lives in a hash keyed by the
//! experiment name:
//!
//! ```text
//! experiments            (set)   name, name, ...
//! <name>                 (hash)  alternatives, goals, resettable, version
//! experiment_winner      (hash)  name -> alternative
//! experiment_start_times (hash)  name -> unix seconds
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use experiment_catalog::{Catalog, Experiment};
//! use experiment_catalog::kv::MemoryKvStore;
//!
//! let catalog = Catalog::new(Arc::new(MemoryKvStore::new()));
//!
//! let mut experiment = Experiment::builder("checkout", catalog.session())
//!     .alternatives(["one_page", "two_page"])
//!     .goals(["purchase"])
//!     .build();
//! experiment.save()?;
//!
//! let found = catalog.find("checkout")?.expect("just saved");
//! assert_eq!(found.control(), Some("one_page"));
//! # Ok::<(), experiment_catalog::Error>(())
//! ```

mod entity;
mod stored_config;

pub use entity::{Experiment, ExperimentBuilder};
