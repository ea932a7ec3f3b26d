use anyhow::Result;

use crate::config::CurioConfig;

/// List elements declaring a verb.
pub async fn verbs(config: &CurioConfig, verb: String, json: bool) -> Result<()> {
    let index = super::build_index(config)?;
    let elements = index.by_verb(&verb).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&elements)?);
        return Ok(());
    }

    if elements.is_empty() {
        println!("No elements declare \"{verb}\".");
        return Ok(());
    }

    println!("Elements declaring \"{verb}\":\n");
    super::print_elements(&elements);
    Ok(())
}
