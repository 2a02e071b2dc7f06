//! List registered backends.

use console::style;

use corpus::Settings;
use corpus_scrape::{default_registry, ScrapeOptions};

pub fn cmd_backends(settings: &Settings) -> anyhow::Result<()> {
    let registry = default_registry(&ScrapeOptions::from(settings));

    println!("\n{}", style("Registered Backends").bold());
    println!("{}", "-".repeat(30));
    for identifier in registry.identifiers() {
        println!("  {}", identifier);
    }

    Ok(())
}
