//! LayerSync CLI
//!
//! Command-line interface for the reconcile operation: one command, four
//! parameters, report text on stdout.

use clap::Parser;
use std::path::PathBuf;

use layersync_core::logging_facility::{self, Profile};
use layersync_core::{reconcile, ReconcileOptions, TracingProgress};
use layersync_store::SqliteDataset;

#[derive(Debug, Parser)]
#[command(name = "layersync")]
#[command(about = "Reconcile a user vector dataset against a shared one", long_about = None)]
struct Cli {
    /// Database file of the shared dataset (the one to update)
    #[arg(long)]
    shared: PathBuf,

    /// Table holding the shared dataset
    #[arg(long, default_value = "features")]
    shared_table: String,

    /// Database file of the user dataset (the one with edits)
    #[arg(long)]
    user: PathBuf,

    /// Table holding the user dataset
    #[arg(long, default_value = "features")]
    user_table: String,

    /// Field whose text value identifies a record across datasets
    #[arg(long, default_value = "fuuid")]
    key_field: String,

    /// Apply the detected changes (default is preview only)
    #[arg(long)]
    apply: bool,
}

fn main() {
    logging_facility::init(Profile::Development);
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut shared = SqliteDataset::open(&cli.shared, &cli.shared_table)?;
    let user = SqliteDataset::open(&cli.user, &cli.user_table)?;

    let options = ReconcileOptions {
        key_field: cli.key_field,
        preview_only: !cli.apply,
    };

    let outcome = reconcile(&mut shared, &user, &options, &TracingProgress)?;
    println!("{}", outcome.report);

    Ok(())
}
