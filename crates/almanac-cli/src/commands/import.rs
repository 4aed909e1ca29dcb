//! Import command - write resolved journal entries to the database.

use colored::Colorize;

use almanac::source::discover_sources;
use almanac::store::SqliteStore;
use almanac::{AlmanacConfig, CurationImporter, EntityKind, EntityResolver, ImportLedger};

pub fn run(config: &AlmanacConfig, dry_run: bool, failed_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let people = load_resolver(config, EntityKind::People)?;
    let locations = load_resolver(config, EntityKind::Locations)?;
    let ledger = ImportLedger::load(&config.ledger_path)?;

    if failed_only && ledger.is_empty() {
        println!("{}", "No failed imports to retry.".green());
        return Ok(());
    }

    let mut store = SqliteStore::open(&config.database_path)?;
    let mut importer = CurationImporter::new(&mut store, &people, &locations, ledger)
        .with_config(config.import.clone())
        .with_source_root(&config.source_dir)
        .with_dry_run(dry_run);

    let report = if failed_only {
        println!("{} {} ledgered file(s)", "Retrying".cyan().bold(), importer.ledger().len());
        importer.run_failed_only()?
    } else {
        let files = discover_sources(&config.source_dir)?;
        println!(
            "{} {} file(s) from {}",
            "Importing".cyan().bold(),
            files.len(),
            config.source_dir.display()
        );
        importer.run(&files)?
    };

    let stats = &report.stats;
    println!();
    println!("  Processed: {}", stats.processed);
    println!("  Succeeded: {}", stats.succeeded.to_string().green());
    println!("  Skipped:   {} (unchanged)", stats.skipped);
    println!("  Failed:    {}", stats.failed.to_string().red());

    if !stats.created.is_empty() {
        println!();
        println!("{}", "Created:".yellow().bold());
        for (kind, count) in &stats.created {
            println!("  {:<10} {}", kind, count);
        }
    }

    for outcome in report.outcomes.iter().filter(|o| o.error.is_some()) {
        println!(
            "  {} {}: {}",
            "failed".red(),
            outcome.path.display(),
            outcome.error.as_deref().unwrap_or_default()
        );
    }

    if let Some(error) = &report.ledger_error {
        println!();
        println!("{} {}", "Failed to save import ledger:".red().bold(), error);
    } else if stats.failed > 0 && !dry_run {
        println!();
        println!("Failures recorded in {}", report.ledger_path.display());
    }
    if dry_run {
        println!();
        println!("{}", "Dry run: nothing committed.".yellow());
    }

    if let Some(reason) = &report.aborted {
        return Err(format!("import {}; {} file(s) not processed", reason, report.remaining).into());
    }
    Ok(())
}

fn load_resolver(config: &AlmanacConfig, kind: EntityKind) -> Result<EntityResolver, Box<dyn std::error::Error>> {
    let path = config.consolidated_path(kind);
    if !path.exists() {
        return Err(format!(
            "Consolidated file not found: {}\nRun 'almanac consolidate --type {}' first.",
            path.display(),
            kind
        )
        .into());
    }
    Ok(EntityResolver::from_file(&path, kind)?)
}
