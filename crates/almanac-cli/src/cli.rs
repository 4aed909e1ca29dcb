//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use almanac::EntityKind;

/// Almanac: resolve journal mentions into canonical people and places
#[derive(Parser)]
#[command(name = "almanac")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ./almanac.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract raw mentions from the journal into the curation files
    Extract {
        /// Report counts without writing any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate curation files
    Validate {
        /// Only this year
        #[arg(short, long)]
        year: Option<i32>,

        /// Only this entity type (people or locations)
        #[arg(short = 't', long = "type")]
        kind: Option<EntityKind>,

        /// Output the issues as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge curated years into one consolidated file
    Consolidate {
        /// Years to merge (default: every year found)
        #[arg(long, num_args = 1..)]
        years: Vec<i32>,

        /// Entity type (people or locations)
        #[arg(short = 't', long = "type")]
        kind: EntityKind,

        /// Validate and stop
        #[arg(long)]
        validate_only: bool,

        /// Write the output even when validation reports errors
        #[arg(long)]
        force: bool,
    },

    /// Import journal entries into the database
    Import {
        /// Resolve and validate without committing
        #[arg(long)]
        dry_run: bool,

        /// Retry only the files recorded in the failure ledger
        #[arg(long)]
        failed_only: bool,
    },

    /// Show how a mention resolves against the consolidated file
    Resolve {
        /// Mention as written in the journal
        #[arg(value_name = "MENTION")]
        mention: String,

        /// Entity type (people or locations)
        #[arg(short = 't', long = "type")]
        kind: EntityKind,

        /// City scope for locations
        #[arg(long)]
        city: Option<String>,
    },
}
