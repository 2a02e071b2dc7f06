//! List catalog passes.

use console::style;

use corpus::PassCatalog;

pub fn cmd_passes() -> anyhow::Result<()> {
    let catalog = PassCatalog::with_builtins();

    println!("\n{}", style("Text Passes").bold());
    println!("{}", "-".repeat(80));
    println!("{:<45} {:<6} Description", "Name", "Args");
    println!("{}", "-".repeat(80));

    for name in catalog.names() {
        if let Some(entry) = catalog.get(name) {
            println!("{:<45} {:<6} {}", name, entry.arity_label(), entry.summary);
        }
    }

    Ok(())
}
