//! Example: Evolve a manual through a few delta batches.
//!
//! Usage:
//!   cargo run --example basic -- [manual_path]
//!
//! Example:
//!   cargo run --example basic -- /tmp/project.manual.json

use std::env;

use vademecum::{
    ContextSelector, DeltaUpdate, IndexFilter, ItemType, ManualStore, MergeEngine, PrioritizeBy,
};

fn main() -> vademecum::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "/tmp/project.manual.json".to_string());

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Manual evolution: {}", path);
    println!("{}", separator);
    println!();

    let engine = MergeEngine::new();
    let mut store = ManualStore::new();

    // First batch: seed the manual from a generator and a reflector.
    let report = engine.apply_batch(
        &mut store,
        vec![
            DeltaUpdate::add(ItemType::Instruction, "Validate all inputs before processing")
                .with_tags(["validation"])
                .with_created_by("generator"),
            DeltaUpdate::add(ItemType::Insight, "Timeouts cluster during startup")
                .with_tags(["timing"])
                .with_confidence(0.7)
                .with_created_by("reflector"),
            DeltaUpdate::add(ItemType::Insight, "Cold caches slow the first requests")
                .with_tags(["timing"])
                .with_confidence(0.6)
                .with_created_by("reflector"),
        ],
    );
    println!("## Batch 1: {}/{} applied", report.applied, report.total());
    for detail in &report.details {
        match detail.item_id() {
            Some(id) => println!("  {} {} -> {}", detail.delta_id, detail.action.label(), id),
            None => println!("  {} {} rejected", detail.delta_id, detail.action.label()),
        }
    }
    println!();

    // Second batch: refine one item, consolidate the two timing insights.
    let report = engine.apply_batch(
        &mut store,
        vec![
            DeltaUpdate::modify("itm_0001", "Validate all inputs before any side effect")
                .with_tag("safety"),
            DeltaUpdate::merge(["itm_0002".to_string(), "itm_0003".to_string()])
                .with_created_by("reflector"),
        ],
    );
    println!("## Batch 2: {}/{} applied", report.applied, report.total());
    println!();

    // Query by index.
    let timing = store.query(&IndexFilter::new().with_tag("timing"));
    println!("## Active + retired items tagged 'timing': {}", timing.len());
    for item in timing {
        println!(
            "  {} [{}] v{} {:?}",
            item.id,
            item.item_type.label(),
            item.metadata.version,
            item.metadata.status
        );
    }
    println!();

    // Render a bounded context block.
    store.record_usage("itm_0001")?;
    let selector = ContextSelector::new()
        .with_max_items(5)
        .with_priority(PrioritizeBy::Usage);
    println!("## Context ({} tokens estimated)", store.estimate_total_tokens());
    println!("{}", selector.render(&store));
    println!();

    // Persist and report.
    store.save(&path)?;
    let stats = store.stats();
    println!("## Saved to {}", path);
    println!(
        "  {} items ({} active, {} superseded), mean confidence {:.2}",
        stats.total_items, stats.active, stats.superseded, stats.average_confidence
    );

    Ok(())
}
