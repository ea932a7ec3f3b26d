use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::CurioConfig;

/// Rebuild the index now, regardless of snapshot age.
pub async fn rebuild(config: &CurioConfig, json: bool) -> Result<()> {
    let index = super::build_index(config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Rebuilding index...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let outcome = index.rebuild().await;
    pb.finish_and_clear();
    let stats = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!(
        "Rebuilt index {}: {} elements across {} keys, {} edges, {} verbs.",
        stats.build_id.as_deref().unwrap_or("-"),
        stats.elements,
        stats.keys,
        stats.edges,
        stats.verbs
    );
    Ok(())
}
