use anyhow::Result;

use crate::config::CurioConfig;
use crate::elements::Tier;
use crate::index::SearchRequest;

/// Run a search from the terminal.
pub async fn search(
    config: &CurioConfig,
    term: String,
    tiers: Vec<Tier>,
    limit: Option<usize>,
    offset: Option<usize>,
    json: bool,
) -> Result<()> {
    let index = super::build_index(config)?;

    let request = SearchRequest {
        term,
        tiers: if tiers.is_empty() { None } else { Some(tiers) },
        limit,
        offset,
    };
    let result = index.search(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.items.is_empty() {
        println!("No elements found.");
        return Ok(());
    }

    println!("Found {} element(s)\n", result.total);
    super::print_elements(&result.items);
    if result.has_more {
        println!(
            "\nShowing {} of {}; use --offset to page further.",
            result.items.len(),
            result.total
        );
    }
    Ok(())
}
