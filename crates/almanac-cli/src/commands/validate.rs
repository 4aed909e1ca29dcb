//! Validate command - check curation files before consolidation.

use colored::Colorize;

use almanac::{AlmanacConfig, EntityKind, Severity, ValidationEngine};

use super::print_issue;

pub fn run(
    config: &AlmanacConfig,
    year: Option<i32>,
    kind: Option<EntityKind>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => vec![EntityKind::People, EntityKind::Locations],
    };
    let years = year.map(|y| vec![y]);

    let engine = ValidationEngine::new();
    let mut reports = Vec::new();
    for kind in kinds {
        reports.push(engine.validate_dir(&config.curation_dir, kind, years.as_deref())?);
    }

    let errors: usize = reports.iter().map(|r| r.error_count()).sum();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let kind = report.kind.map(|k| k.to_string()).unwrap_or_default();
            let years: Vec<String> = report.years.iter().map(i32::to_string).collect();
            println!(
                "{} {} ({})",
                "Validated".cyan().bold(),
                kind.white(),
                if years.is_empty() { "no files".to_string() } else { years.join(", ") }
            );

            for issue in &report.issues {
                print_issue(issue);
            }

            println!(
                "  {} errors, {} warnings, {} ambiguous",
                report.error_count().to_string().red(),
                report.count(Severity::Warning).to_string().yellow(),
                report.count(Severity::Ambiguous).to_string().magenta()
            );
            println!();
        }

        if errors == 0 {
            println!("{}", "Curation files are valid.".green().bold());
        }
    }

    if errors > 0 {
        return Err(format!("{} validation error(s)", errors).into());
    }
    Ok(())
}
