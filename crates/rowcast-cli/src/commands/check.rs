//! Check command - validate a rules file and summarize it.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use rowcast::{Coverage, RuleSpec, TypeRegistry};

pub fn run(rules: PathBuf, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !rules.exists() {
        return Err(format!("Rules file not found: {}", rules.display()).into());
    }

    let spec = RuleSpec::from_file(&rules)?;
    let registry = Arc::new(TypeRegistry::with_builtins());
    spec.build(Arc::clone(&registry))?;

    let summary = spec.summary();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Rules OK:".green().bold(),
        rules.display().to_string().white()
    );
    println!();

    let allowed = if summary.allowed == 0 {
        "all input fields".dimmed().to_string()
    } else {
        format!("{} ({} with inline types)", summary.allowed, summary.inline_typed)
    };
    println!("  {:<10} {}", "allow".cyan(), allowed);
    println!("  {:<10} {}", "deny".cyan(), summary.denied);

    for (name, coverage) in &summary.selections {
        let coverage = match coverage {
            Coverage::All => "all fields".yellow().to_string(),
            Coverage::Fields(n) => n.to_string(),
        };
        println!("  {:<10} {}", name.cyan(), coverage);
    }

    for (name, count) in [
        ("rename", summary.renames),
        ("default", summary.defaults),
        ("add", summary.added),
        ("merge", summary.merged),
    ] {
        if count > 0 {
            println!("  {:<10} {}", name.cyan(), count);
        }
    }

    if !summary.named.is_empty() {
        println!();
        println!(
            "Custom types: {}",
            summary.named.join(", ").white().bold()
        );
        let available: Vec<_> = registry.names().collect();
        println!("Available:    {}", available.join(", ").dimmed());
    }

    Ok(())
}
