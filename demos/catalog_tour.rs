//! Experiment Catalog Tour
//!
//! Run with: `RUST_LOG=experiment_catalog=debug cargo run --example catalog_tour`
//!
//! Walks through creating, listing and concluding experiments, and shows
//! how many store round trips a shared session saves.

use std::sync::Arc;

use experiment_catalog::kv::{CountingKvStore, KvStore, MemoryKvStore};
use experiment_catalog::{Catalog, ExperimentSpec};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Experiment Catalog Tour ===\n");

    let store = Arc::new(CountingKvStore::new(MemoryKvStore::new()));
    let catalog = Catalog::new(Arc::clone(&store));

    demo_create(&catalog)?;
    demo_listing(&catalog)?;
    demo_shared_session(&catalog, &store)?;
    demo_inconsistent_registry(&catalog, &store)?;

    println!("Tour complete.");
    Ok(())
}

fn demo_create(catalog: &Catalog<CountingKvStore<MemoryKvStore>>) -> anyhow::Result<()> {
    println!("1. Creating experiments");
    println!("   --------------------");

    catalog.find_or_create("button_color", Some("red"), ["green", "blue"])?;
    println!("   button_color: red (control), green, blue");

    catalog.find_or_create_from_list(("checkout:2", ["purchase"]), ["one_page", "two_page"])?;
    println!("   checkout:2 -> stored as 'checkout', goal 'purchase'");

    let json = serde_json::json!({"pricing": ["upgrade", "retain"]});
    let pricing = catalog.find_or_create(ExperimentSpec::try_from(&json)?, Some("monthly"), ["annual"])?;
    pricing.set_winner("annual")?;
    println!("   pricing (from JSON descriptor), winner declared: annual");

    println!();
    Ok(())
}

fn demo_listing(catalog: &Catalog<CountingKvStore<MemoryKvStore>>) -> anyhow::Result<()> {
    println!("2. Active experiments first");
    println!("   ------------------------");

    for experiment in catalog.all_active_first()? {
        let status = experiment
            .winner()?
            .map_or_else(|| "active".to_string(), |w| format!("won by {w}"));
        let started = experiment
            .start_time()?
            .map_or_else(|| "not started".to_string(), |t| t.to_rfc3339());
        println!(
            "   {:<14} {:<16} goals={:?} started={}",
            experiment.name(),
            status,
            experiment.goals(),
            started
        );
    }

    println!();
    Ok(())
}

fn demo_shared_session(
    catalog: &Catalog<CountingKvStore<MemoryKvStore>>,
    store: &CountingKvStore<MemoryKvStore>,
) -> anyhow::Result<()> {
    println!("3. Shared session vs one session per lookup");
    println!("   -----------------------------------------");

    let names = ["button_color", "checkout", "pricing"];

    store.reset_counts();
    for _ in 0..10 {
        for name in names {
            if let Some(experiment) = catalog.find(name)? {
                experiment.winner()?;
            }
        }
    }
    println!("   fresh sessions: {} round trips", store.counts().total());

    store.reset_counts();
    let session = catalog.session();
    for _ in 0..10 {
        for name in names {
            if let Some(experiment) = session.find(name)? {
                experiment.winner()?;
            }
        }
    }
    println!("   shared session: {} round trips", store.counts().total());

    println!();
    Ok(())
}

fn demo_inconsistent_registry(
    catalog: &Catalog<CountingKvStore<MemoryKvStore>>,
    store: &CountingKvStore<MemoryKvStore>,
) -> anyhow::Result<()> {
    println!("4. Tolerating a partially-migrated registry");
    println!("   ----------------------------------------");

    store.inner().sadd("experiments", "half_deleted")?;
    store.inner().sadd("experiments", "legacy_format")?;
    store.inner().hset("legacy_format", "alternatives", "red,green")?;

    let names: Vec<String> = catalog.all()?.iter().map(|e| e.name().to_string()).collect();
    println!("   registry holds 5 names, {} resolve: {names:?}", names.len());

    println!();
    Ok(())
}
