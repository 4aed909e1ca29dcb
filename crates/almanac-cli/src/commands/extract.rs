//! Extract command - collect raw mentions into the curation files.

use colored::Colorize;

use almanac::AlmanacConfig;
use almanac::extract::Extractor;

pub fn run(config: &AlmanacConfig, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{} {}",
        "Extracting from".cyan().bold(),
        config.source_dir.display().to_string().white()
    );

    let report = Extractor::new()
        .with_dry_run(dry_run)
        .run(&config.source_dir, &config.curation_dir)?;

    println!("  Documents read: {}", report.documents);
    for path in &report.failed {
        println!("  {} {}", "unreadable".red(), path.display());
    }
    println!();

    for year in &report.years {
        println!(
            "  {} {:<10} {:>5} names, {} new, {} refreshed, {} curated, {} groups",
            year.year,
            year.kind,
            year.mentions,
            year.added.to_string().green(),
            year.refreshed,
            year.preserved,
            year.groups
        );
    }

    if dry_run {
        println!();
        println!("{}", "Dry run: no files written.".yellow());
    } else if report.added() > 0 {
        println!();
        println!(
            "{} new name(s) need curation in {}",
            report.added().to_string().white().bold(),
            config.curation_dir.display()
        );
    }

    Ok(())
}
