//! Catalog behaviour against an in-memory store
//!
//! Round trips are observed through `CountingKvStore`.

use std::collections::HashSet;
use std::sync::Arc;

use experiment_catalog::kv::{CountingKvStore, FieldSet, KvStore, MemoryKvStore};
use experiment_catalog::{normalize_experiment, Catalog, CatalogConfig, CatalogSession, Error};

type Store = CountingKvStore<MemoryKvStore>;

fn catalog() -> Catalog<Store> {
    Catalog::new(Arc::new(CountingKvStore::new(MemoryKvStore::new())))
}

fn names<S: KvStore>(experiments: &[experiment_catalog::Experiment<S>]) -> Vec<&str> {
    experiments.iter().map(|e| e.name()).collect()
}

// =============================================================================
// Descriptor normalization
// =============================================================================

#[test]
fn test_normalize_experiment_shapes() {
    assert_eq!(
        normalize_experiment(("exp1", "goal1")),
        ("exp1".to_string(), vec!["goal1".to_string()])
    );
    assert_eq!(
        normalize_experiment(("exp1", ["g1", "g2"])),
        ("exp1".to_string(), vec!["g1".to_string(), "g2".to_string()])
    );
    assert_eq!(normalize_experiment("exp1"), ("exp1".to_string(), vec![]));
}

// =============================================================================
// find_or_initialize / find_or_create
// =============================================================================

#[test]
fn test_find_or_initialize_strips_version_suffix() {
    let catalog = catalog();

    let experiment = catalog.find_or_initialize("exp:2", Some("A"), ["B"]);

    assert_eq!(experiment.name(), "exp");
    assert_eq!(experiment.identifier(), "exp:2");
    assert_eq!(experiment.alternatives(), ["A", "B"]);
}

#[test]
fn test_find_or_initialize_does_not_persist() {
    let catalog = catalog();

    let _ = catalog.find_or_initialize("exp", Some("A"), ["B"]);

    assert_eq!(catalog.store().counts().writes, 0);
    assert!(catalog.find("exp").unwrap().is_none());
}

#[test]
fn test_list_and_variadic_forms_agree() {
    let catalog = catalog();

    let from_list = catalog.find_or_initialize_from_list("exp", ["A", "B", "C"]);
    let variadic = catalog.find_or_initialize("exp", Some("A"), ["B", "C"]);

    assert_eq!(from_list.name(), variadic.name());
    assert_eq!(from_list.alternatives(), variadic.alternatives());
    assert_eq!(from_list.goals(), variadic.goals());
}

#[test]
fn test_find_or_create_persists_under_canonical_name() {
    let catalog = catalog();

    catalog
        .find_or_create(("signup_flow:3", ["register", "activate"]), Some("short"), ["long"])
        .unwrap();

    let inner = catalog.store().inner();
    assert!(inner.smembers("experiments").unwrap().contains("signup_flow"));
    assert!(!inner.exists("signup_flow:3").unwrap());

    let found = catalog.find("signup_flow").unwrap().unwrap();
    assert_eq!(found.alternatives(), ["short", "long"]);
    assert_eq!(found.goals(), ["register", "activate"]);
    assert!(found.start_time().unwrap().is_some());
}

#[test]
fn test_find_or_create_twice_is_idempotent() {
    let catalog = catalog();

    let first = catalog.find_or_create("exp", Some("A"), ["B"]).unwrap();
    let second = catalog.find_or_create("exp", Some("A"), ["B"]).unwrap();

    assert_eq!(first.version(), 0);
    assert_eq!(second.version(), 0);
    assert_eq!(catalog.all().unwrap().len(), 1);
}

#[test]
fn test_find_or_create_without_alternatives_fails() {
    let catalog = catalog();

    let err = catalog
        .find_or_create("exp", None, Vec::<String>::new())
        .unwrap_err();

    assert!(matches!(err, Error::InvalidExperiment(_)));
}

// =============================================================================
// find / all / all_active_first
// =============================================================================

#[test]
fn test_find_absent_and_present() {
    let catalog = catalog();
    catalog.find_or_create("present", Some("A"), ["B"]).unwrap();

    assert!(catalog.find("absent").unwrap().is_none());

    let found = catalog.find("present").unwrap().unwrap();
    assert_eq!(found.name(), "present");
}

#[test]
fn test_all_active_first_ordering() {
    let catalog = catalog();
    for name in ["e3", "e2", "e1"] {
        catalog.find_or_create(name, Some("A"), ["B"]).unwrap();
    }
    catalog.find("e2").unwrap().unwrap().set_winner("B").unwrap();

    let ordered = catalog.all_active_first().unwrap();

    assert_eq!(names(&ordered), ["e1", "e3", "e2"]);
}

#[test]
fn test_all_active_first_sorts_concluded_group() {
    let catalog = catalog();
    for name in ["d", "c", "b", "a"] {
        let experiment = catalog.find_or_create(name, Some("A"), ["B"]).unwrap();
        if name == "d" || name == "b" {
            experiment.set_winner("A").unwrap();
        }
    }

    let ordered = catalog.all_active_first().unwrap();

    assert_eq!(names(&ordered), ["a", "c", "b", "d"]);
}

#[test]
fn test_all_skips_unresolvable_entries() {
    let catalog = catalog();
    catalog.find_or_create("good", Some("A"), ["B"]).unwrap();

    let inner = catalog.store().inner();
    // registry entry with no key behind it
    inner.sadd("experiments", "deleted").unwrap();
    // registry entry whose config is unreadable
    inner.sadd("experiments", "corrupt").unwrap();
    inner.hset("corrupt", "alternatives", "{not json").unwrap();
    // registry entry pointing at a key of another type
    inner.sadd("experiments", "wrong_type").unwrap();
    inner.sadd("wrong_type", "member").unwrap();

    let all = catalog.all().unwrap();

    assert_eq!(names(&all), ["good"]);
}

#[test]
fn test_all_on_empty_registry() {
    let catalog = catalog();

    assert!(catalog.all().unwrap().is_empty());
    assert!(catalog.all_active_first().unwrap().is_empty());
}

#[test]
fn test_all_returns_each_registered_experiment_once() {
    let catalog = catalog();
    for i in 0..20 {
        catalog
            .find_or_create(format!("exp{i}"), Some("A"), ["B"])
            .unwrap();
    }

    let all = catalog.all().unwrap();
    let unique: HashSet<&str> = all.iter().map(|e| e.name()).collect();

    assert_eq!(all.len(), 20);
    assert_eq!(unique.len(), 20);
}

// =============================================================================
// Session caching
// =============================================================================

#[test]
fn test_experiment_exists_queries_store_once() {
    let catalog = catalog();
    let session = catalog.session();

    session.experiment_exists("exp").unwrap();
    session.experiment_exists("exp").unwrap();

    assert!(catalog.store().counts().exists <= 1);
}

#[test]
fn test_add_experiment_exists_needs_no_query() {
    let catalog = catalog();
    let session = catalog.session();

    session.add_experiment_exists("exp");

    assert!(session.experiment_exists("exp").unwrap());
    assert_eq!(catalog.store().counts().total(), 0);
}

#[test]
fn test_clear_winners_refetches_winner_map() {
    let catalog = catalog();
    let session = catalog.session();

    assert_eq!(session.winner("exp").unwrap(), None);
    assert_eq!(session.winner("other").unwrap(), None);
    assert_eq!(catalog.store().counts().hgetall, 1);

    session.clear_winners();
    session.winner("exp").unwrap();
    assert_eq!(catalog.store().counts().hgetall, 2);
}

#[test]
fn test_shared_session_amortizes_lookups() {
    let catalog = catalog();
    catalog.find_or_create("a", Some("x"), ["y"]).unwrap();
    catalog.find_or_create("b", Some("x"), ["y"]).unwrap();
    catalog.store().reset_counts();

    let session = catalog.session();
    for _ in 0..3 {
        for name in ["a", "b"] {
            let experiment = session.find(name).unwrap().unwrap();
            experiment.winner().unwrap();
            experiment.start_time().unwrap();
        }
    }

    let counts = catalog.store().counts();
    assert_eq!(counts.exists, 2);
    // two configs, one winner map, one start-time map
    assert_eq!(counts.hgetall, 4);
}

#[test]
fn test_session_staleness_is_caller_managed() {
    let catalog = catalog();
    catalog.find_or_create("exp", Some("A"), ["B"]).unwrap();

    let session = catalog.session();
    assert_eq!(session.winner("exp").unwrap(), None);

    // another process declares a winner
    catalog
        .store()
        .inner()
        .hset("experiment_winner", "exp", "B")
        .unwrap();
    assert_eq!(session.winner("exp").unwrap(), None);

    session.clear_winners();
    assert_eq!(session.winner("exp").unwrap(), Some("B".to_string()));
}

#[test]
fn test_session_over_custom_config() {
    let store = Arc::new(MemoryKvStore::new());
    store.hset("winners", "exp", "B").unwrap();
    let config = CatalogConfig {
        winner_key: "winners".to_string(),
        ..CatalogConfig::default()
    };

    let session = CatalogSession::new(store, config);

    assert_eq!(session.winner("exp").unwrap(), Some("B".to_string()));
}

// =============================================================================
// Error propagation
// =============================================================================

/// Store whose every call fails, as a disconnected client would.
struct DownStore;

fn down<T>() -> experiment_catalog::Result<T> {
    Err(Error::Store("connection refused".to_string()))
}

impl KvStore for DownStore {
    fn exists(&self, _key: &str) -> experiment_catalog::Result<bool> {
        down()
    }

    fn smembers(&self, _key: &str) -> experiment_catalog::Result<HashSet<String>> {
        down()
    }

    fn sadd(&self, _key: &str, _member: &str) -> experiment_catalog::Result<bool> {
        down()
    }

    fn srem(&self, _key: &str, _member: &str) -> experiment_catalog::Result<bool> {
        down()
    }

    fn hgetall(&self, _key: &str) -> experiment_catalog::Result<FieldSet> {
        down()
    }

    fn hget(&self, _key: &str, _field: &str) -> experiment_catalog::Result<Option<String>> {
        down()
    }

    fn hset(&self, _key: &str, _field: &str, _value: &str) -> experiment_catalog::Result<()> {
        down()
    }

    fn hdel(&self, _key: &str, _field: &str) -> experiment_catalog::Result<bool> {
        down()
    }

    fn del(&self, _key: &str) -> experiment_catalog::Result<()> {
        down()
    }
}

#[test]
fn test_store_failures_propagate() {
    let catalog = Catalog::new(Arc::new(DownStore));

    assert!(matches!(catalog.all(), Err(Error::Store(_))));
    assert!(matches!(catalog.find("exp"), Err(Error::Store(_))));
    assert!(matches!(
        catalog.find_or_create("exp", Some("A"), ["B"]),
        Err(Error::Store(_))
    ));
    assert!(matches!(catalog.session().winner("exp"), Err(Error::Store(_))));
}

#[test]
fn test_failed_fetch_is_not_cached() {
    let catalog = Catalog::new(Arc::new(DownStore));
    let session = catalog.session();

    assert!(session.experiment_exists("exp").is_err());
    assert!(session.experiment_config("exp").is_err());
    assert!(session.start_time("exp").is_err());
    // a later success would be fetched again; here it just fails again
    assert!(session.experiment_exists("exp").is_err());
}
