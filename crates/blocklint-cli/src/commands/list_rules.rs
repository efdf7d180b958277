//! List rules command implementation.

use blocklint::rules::RuleRegistry;

/// Runs the list-rules command.
pub fn run() {
    let registry = RuleRegistry::with_builtins();

    println!("Available rule types:\n");
    println!("{:<26} Description", "Type");
    println!("{}", "-".repeat(80));

    for (kind, description) in registry.kinds() {
        println!("{kind:<26} {description}");
    }

    println!("\nUse them in [[rules]] entries, e.g.:");
    println!("  [[rules]]");
    println!("  type = \"heading-numbering\"");
    println!("  id = \"HDG-001\"");
    println!("\nStyle checks (class-style mode) report STYLE-<CHECK>-<LABEL> codes.");
}
