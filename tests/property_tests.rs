//! Property-based tests for descriptor normalization and catalog building
//!
//! - Normalization is pure and loses nothing
//! - Version suffixes never reach the store name
//! - List and variadic call shapes build the same experiment
//! - Run with ProptestConfig::with_cases(100)

use std::sync::Arc;

use experiment_catalog::kv::MemoryKvStore;
use experiment_catalog::{canonical_name, normalize_experiment, Catalog, ExperimentSpec};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Experiment name without a version separator
fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

/// Optional `:version` suffix
fn arb_suffix() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[0-9]{1,3}".prop_map(|v| format!(":{v}"))]
}

fn arb_labels(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[A-Za-z0-9 _-]{1,12}", 0..=max)
}

fn catalog() -> Catalog<MemoryKvStore> {
    Catalog::new(Arc::new(MemoryKvStore::new()))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a bare name normalizes to itself with no goals
    #[test]
    fn prop_named_only_has_no_goals(name in arb_name(), suffix in arb_suffix()) {
        let identifier = format!("{name}{suffix}");
        let (normalized, goals) = normalize_experiment(identifier.as_str());
        prop_assert_eq!(normalized, identifier);
        prop_assert!(goals.is_empty());
    }

    /// Property: goal lists pass through unchanged and in order
    #[test]
    fn prop_goal_lists_pass_through(name in arb_name(), goals in arb_labels(6)) {
        let (normalized, normalized_goals) =
            normalize_experiment((name.as_str(), goals.clone()));
        prop_assert_eq!(normalized, name);
        prop_assert_eq!(normalized_goals, goals);
    }

    /// Property: JSON object descriptors agree with tuple descriptors
    #[test]
    fn prop_json_matches_tuple(name in arb_name(), goals in arb_labels(4)) {
        let json = serde_json::json!({ name.clone(): goals.clone() });
        let from_json = ExperimentSpec::try_from(&json).unwrap().normalize();
        let from_tuple = normalize_experiment((name.as_str(), goals));
        prop_assert_eq!(from_json, from_tuple);
    }

    /// Property: the store name is the identifier's first segment
    #[test]
    fn prop_canonical_name_drops_suffix(name in arb_name(), suffix in arb_suffix()) {
        let identifier = format!("{name}{suffix}");
        prop_assert_eq!(canonical_name(&identifier), name.as_str());
    }

    /// Property: list and variadic forms build the same alternatives
    #[test]
    fn prop_list_and_variadic_agree(
        name in arb_name(),
        control in "[A-Z][a-z]{0,8}",
        rest in arb_labels(5),
    ) {
        let catalog = catalog();
        let mut list = vec![control.clone()];
        list.extend(rest.iter().cloned());

        let from_list = catalog.find_or_initialize_from_list(name.as_str(), list.clone());
        let variadic = catalog.find_or_initialize(name.as_str(), Some(control.as_str()), rest);

        prop_assert_eq!(from_list.alternatives(), list.as_slice());
        prop_assert_eq!(variadic.alternatives(), list.as_slice());
        prop_assert_eq!(from_list.control(), Some(control.as_str()));
    }

    /// Property: saved experiments come back from find with the same shape
    #[test]
    fn prop_create_then_find(
        name in arb_name(),
        suffix in arb_suffix(),
        alternatives in proptest::collection::vec("[a-z]{1,8}", 1..5),
        goals in arb_labels(3),
    ) {
        let catalog = catalog();
        let identifier = format!("{name}{suffix}");

        catalog
            .find_or_create_from_list((identifier, goals.clone()), alternatives.clone())
            .unwrap();

        let found = catalog.find(&name).unwrap().unwrap();
        prop_assert_eq!(found.name(), name.as_str());
        prop_assert_eq!(found.alternatives(), alternatives.as_slice());
        prop_assert_eq!(found.goals(), goals.as_slice());
    }

    /// Property: all_active_first puts every winner-less experiment first,
    /// each group sorted by name
    #[test]
    fn prop_all_active_first_partitions(
        entries in proptest::collection::btree_map(arb_name(), any::<bool>(), 0..12),
    ) {
        let catalog = catalog();
        for (name, won) in &entries {
            let experiment = catalog
                .find_or_create(name.as_str(), Some("control"), ["variant"])
                .unwrap();
            if *won {
                experiment.set_winner("variant").unwrap();
            }
        }

        let ordered: Vec<String> = catalog
            .all_active_first()
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();

        let mut expected: Vec<String> =
            entries.iter().filter(|(_, won)| !**won).map(|(n, _)| n.clone()).collect();
        expected.extend(entries.iter().filter(|(_, won)| **won).map(|(n, _)| n.clone()));
        prop_assert_eq!(ordered, expected);
    }
}
