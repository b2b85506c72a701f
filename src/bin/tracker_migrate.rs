//! tracker-migrate: Load the legacy research catalog and impacts into the store
//!
//! Usage:
//!   # Preview what would be written; no store needed
//!   tracker-migrate --dry-run
//!
//!   # Migrate into the store named by SUPABASE_URL / SUPABASE_KEY
//!   tracker-migrate --source src/data/research.js --impacts src/data/reformImpacts.json

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracker_sync::{run_migration, MigrationInput, RecordStore, RestStore, StoreArgs, SyncConfig, UpsertPipeline};

#[derive(Parser, Debug)]
#[command(name = "tracker-migrate")]
#[command(about = "Migrate the research catalog and reform impacts into the store", long_about = None)]
struct Args {
    /// Show what would be written without modifying the store
    #[arg(long)]
    dry_run: bool,

    /// Legacy source file containing `export const <array> = [...]`
    #[arg(long, value_name = "FILE", default_value = "src/data/research.js")]
    source: PathBuf,

    /// Impact artifact, a JSON object keyed by research id
    #[arg(long, value_name = "FILE", default_value = "src/data/reformImpacts.json")]
    impacts: PathBuf,

    /// Name of the exported array in the source file
    #[arg(long, default_value = "research")]
    array_name: String,

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
        dry_run: args.dry_run,
        source_path: args.source,
        impacts_path: args.impacts,
        array_name: args.array_name,
        ..SyncConfig::default()
    };
    config.validate()?;

    if config.dry_run {
        eprintln!("DRY RUN MODE - no changes will be made");
    }

    let input = MigrationInput::load(&config)
        .with_context(|| format!("Failed to load {}", config.source_path.display()))?;

    let mut rest = config.store.as_ref().map(RestStore::new).transpose()?;
    let store = rest.as_mut().map(|s| s as &mut dyn RecordStore);
    let mut pipeline = UpsertPipeline::new(store, config.dry_run)?;

    let report = run_migration(&input, &mut pipeline)?;
    println!("{report}");

    if !report.is_complete() {
        bail!("one or more batch writes failed");
    }
    Ok(())
}
