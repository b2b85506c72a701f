//! tracker-sync: Mirror the store to static JSON files
//!
//! Usage:
//!   # Rewrite research.json, reformImpacts.json and validationMetadata.json
//!   tracker-sync --output-dir src/data

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracker_sync::{Mirror, RestStore, StoreArgs, SyncConfig};

#[derive(Parser, Debug)]
#[command(name = "tracker-sync")]
#[command(about = "Write stored collections to consumption-format JSON files", long_about = None)]
struct Args {
    /// Directory the JSON files are written to
    #[arg(long, short = 'o', default_value = "src/data")]
    output_dir: PathBuf,

    #[command(flatten)]
    store: StoreArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let config = SyncConfig {
        store: args.store.resolve()?,
        output_dir: args.output_dir,
        ..SyncConfig::default()
    };
    let store = RestStore::new(config.require_store()?)?;

    let report = Mirror::new(&store, &config.output_dir)?
        .run()
        .context("Sync failed")?;

    println!("{report}");
    println!("Static files updated in {}", config.output_dir.display());
    Ok(())
}
