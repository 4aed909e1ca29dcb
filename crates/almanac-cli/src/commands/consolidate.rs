//! Consolidate command - merge curated years into one file.

use colored::Colorize;

use almanac::consolidate::SkipReason;
use almanac::{AlmanacConfig, Consolidator, EntityKind, Severity};

use super::print_issue;

pub fn run(
    config: &AlmanacConfig,
    years: Vec<i32>,
    kind: EntityKind,
    validate_only: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if force && !validate_only {
        eprintln!(
            "{} {}",
            "WARNING:".red().bold(),
            "--force writes the consolidated file even if validation fails.".yellow()
        );
    }

    let years = (!years.is_empty()).then_some(years);
    let consolidator = Consolidator::new(kind)
        .with_force(force)
        .with_validate_only(validate_only);

    // Validation errors surface as Err unless forced.
    let run = consolidator.run(&config.curation_dir, &config.output_dir, years.as_deref())?;

    for issue in run.report.issues.iter().filter(|i| i.severity >= Severity::Warning) {
        print_issue(issue);
    }

    let Some(result) = &run.result else {
        println!(
            "{} {} validation: {} errors, {} warnings",
            "Checked".cyan().bold(),
            kind,
            run.report.error_count(),
            run.report.count(Severity::Warning)
        );
        if run.report.has_errors() {
            return Err(format!("{} validation error(s)", run.report.error_count()).into());
        }
        return Ok(());
    };

    if run.forced {
        println!(
            "{}",
            format!("Consolidated despite {} validation error(s).", run.report.error_count())
                .red()
                .bold()
        );
    }

    println!("{} {}", "Consolidated".green().bold(), kind.to_string().white());
    let years: Vec<String> = result.years.iter().map(i32::to_string).collect();
    println!("  Years:      {}", years.join(", "));
    println!("  Entities:   {}", result.entities.len().to_string().white().bold());
    println!(
        "  Skipped:    {} ({} unresolved same_as)",
        result.skipped.len(),
        result.skipped_with(SkipReason::UnresolvedSameAs).count()
    );
    if kind == EntityKind::People {
        println!("  Self:       {}", result.self_refs.raw_names.len());
    }
    println!("  Conflicts:  {}", result.conflicts.len().to_string().yellow());
    if let Some(path) = &run.output_path {
        println!("  Output:     {}", path.display());
    }

    Ok(())
}
