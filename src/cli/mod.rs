pub mod rebuild;
pub mod search;
pub mod similar;
pub mod status;
pub mod verbs;

use anyhow::Result;

use crate::config::CurioConfig;
use crate::elements::ElementRef;
use crate::index::CapabilityIndex;

/// Assemble the capability index from configuration.
pub fn build_index(config: &CurioConfig) -> Result<CapabilityIndex> {
    let (local, remote, collection) = crate::sources::create_stores(config)?;
    Ok(CapabilityIndex::new(
        config.index_config(),
        local,
        remote,
        collection,
    ))
}

/// One element per line: type, name, tier, version.
pub(crate) fn print_elements(elements: &[ElementRef]) {
    for element in elements {
        println!(
            "  {:<10} {:<28} {:<11} {}",
            element.element_type.as_str(),
            element.name,
            element.tier.as_str(),
            element.version.as_deref().unwrap_or("-")
        );
    }
}
