//! Almanac CLI - journal mention curation pipeline.

mod cli;
mod commands;
mod logging;

use almanac::AlmanacConfig;
use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = AlmanacConfig::load(cli.config.as_deref())
        .map_err(|e| -> Box<dyn std::error::Error> { e.into() })
        .and_then(|config| match cli.command {
            Commands::Extract { dry_run } => commands::extract::run(&config, dry_run),

            Commands::Validate { year, kind, json } => commands::validate::run(&config, year, kind, json),

            Commands::Consolidate {
                years,
                kind,
                validate_only,
                force,
            } => commands::consolidate::run(&config, years, kind, validate_only, force),

            Commands::Import { dry_run, failed_only } => commands::import::run(&config, dry_run, failed_only),

            Commands::Resolve { mention, kind, city } => commands::resolve::run(&config, &mention, kind, city),
        });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
