use anyhow::Result;

use crate::config::CurioConfig;

/// Display index state and counts in the terminal.
pub fn status(config: &CurioConfig, json: bool) -> Result<()> {
    let index = super::build_index(config)?;
    let stats = index.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Index Status");
    println!("{}", "=".repeat(40));
    println!("  State:               {}", stats.state);

    let Some(build_id) = &stats.build_id else {
        println!("  No snapshot yet. Run `curio rebuild` to build one.");
        return Ok(());
    };

    println!("  Build:               {build_id}");
    if let (Some(age), Some(ttl)) = (stats.age_ms, stats.ttl_ms) {
        let marker = if stats.stale == Some(true) { " (stale)" } else { "" };
        println!("  Age:                 {}s / ttl {}s{marker}", age / 1000, ttl / 1000);
    }
    println!();

    println!("By Type:");
    for (element_type, count) in &stats.elements_by_type {
        println!("  {:<12} {}", element_type, count);
    }
    println!();

    println!("By Tier:");
    for (tier, count) in &stats.elements_by_tier {
        println!("  {:<12} {}", tier, count);
    }
    println!();

    println!("Elements:              {} across {} keys", stats.elements, stats.keys);
    println!("Relationship edges:    {}", stats.edges);
    println!("Indexed verbs:         {}", stats.verbs);
    println!(
        "Query cache:           {} entries, {} bytes",
        stats.query_cache_entries, stats.query_cache_bytes
    );
    Ok(())
}
