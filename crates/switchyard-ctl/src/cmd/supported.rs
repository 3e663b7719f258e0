//! Aggregated capability listing.

use anyhow::Result;

use switchyard_core::wire::SupportedResponse;

use super::http::{endpoint, get_json};

pub async fn cmd_supported(gateway: &str) -> Result<()> {
    let resp: SupportedResponse = get_json(&endpoint(gateway, "/supported")).await?;

    if resp.kinds.is_empty() {
        println!("No kinds advertised by any active peer.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Supported Kinds ({})", resp.kinds.len());
    println!("═══════════════════════════════════════");
    for kind in &resp.kinds {
        println!("  • {}", kind);
    }

    Ok(())
}
