//! Resolve command - look up one mention against a consolidated file.

use colored::Colorize;

use almanac::{AlmanacConfig, EntityKind, EntityResolver, Resolution};

pub fn run(
    config: &AlmanacConfig,
    mention: &str,
    kind: EntityKind,
    city: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config.consolidated_path(kind);
    if !path.exists() {
        return Err(format!(
            "Consolidated file not found: {}\nRun 'almanac consolidate --type {}' first.",
            path.display(),
            kind
        )
        .into());
    }

    let resolver = EntityResolver::from_file(&path, kind)?;

    match resolver.resolve(mention, city.as_deref()) {
        Resolution::Resolved { entity, matched_by } => {
            println!(
                "{} {} {}",
                mention.white(),
                "->".cyan(),
                entity.canonical.display_name().green().bold()
            );
            println!("  Key:        {}", entity.canonical_key);
            println!("  Matched by: {}", matched_by);
            println!("  Variants:   {}", entity.raw_names.join(", "));
            println!("  Dates:      {}", entity.date_count());
        }
        Resolution::Unresolved { mention, reason } => {
            println!("{} {} ({})", mention.white(), "unresolved".red().bold(), reason);
        }
    }

    Ok(())
}
