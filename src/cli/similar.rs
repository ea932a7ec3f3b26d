use anyhow::Result;

use crate::config::CurioConfig;
use crate::elements::ElementKey;

/// Show elements related to one element.
pub async fn similar(
    config: &CurioConfig,
    key: ElementKey,
    limit: usize,
    json: bool,
) -> Result<()> {
    let index = super::build_index(config)?;
    let related = index.find_similar(&key, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&related)?);
        return Ok(());
    }

    if related.is_empty() {
        println!("No related elements for {key}.");
        return Ok(());
    }

    println!("Elements related to {key}:\n");
    super::print_elements(&related);
    Ok(())
}
