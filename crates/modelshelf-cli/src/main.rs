//! modelshelf - catalog and organize model weight files.
//!
//! Runs the classify and relocate phases over a model root, logging every
//! processed file to stdout and to a timestamped run log.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use modelshelf_core::{CatalogStore, Organizer, OrganizerConfig, Phase, RegistryClient, RunReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "modelshelf")]
#[command(about = "Catalog, deduplicate and organize model files by registry metadata")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model root (staging area and bucket tree)
    #[arg(long)]
    model_root: Option<PathBuf>,

    /// Catalog database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory for the timestamped run log
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Registry API base URL
    #[arg(long)]
    registry_url: Option<String>,

    /// Registry API token
    #[arg(long, env = "CIVITAI_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Seconds to wait before retrying a transient registry failure
    #[arg(long)]
    backoff_seconds: Option<u64>,

    /// Phases to run
    #[arg(long, value_enum, default_value_t = PhaseArg::All)]
    phase: PhaseArg,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PhaseArg {
    All,
    Classify,
    Relocate,
}

impl From<PhaseArg> for Phase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::All => Phase::All,
            PhaseArg::Classify => Phase::Classify,
            PhaseArg::Relocate => Phase::Relocate,
        }
    }
}

/// Merge the config file (or defaults) with command-line overrides.
fn build_config(args: &Args) -> Result<OrganizerConfig> {
    let mut config = match &args.config {
        Some(path) => OrganizerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => OrganizerConfig::default(),
    };

    if let Some(root) = &args.model_root {
        config.model_root = root.clone();
    }
    if let Some(database) = &args.database {
        config.database_path = database.clone();
    }
    if let Some(log_dir) = &args.log_dir {
        config.log_dir = log_dir.clone();
    }
    if let Some(url) = &args.registry_url {
        config.registry.base_url = url.clone();
    }
    if let Some(token) = &args.api_token {
        config.registry.api_token = Some(token.clone());
    }
    if let Some(seconds) = args.backoff_seconds {
        config.registry.backoff_seconds = seconds;
    }

    config.validate()?;
    Ok(config)
}

async fn run(config: &OrganizerConfig, phase: Phase) -> Result<RunReport> {
    info!("Model root: {}", config.model_root.display());
    info!("Catalog: {}", config.database_path.display());

    let store = CatalogStore::open(&config.database_path)?;
    let registry = RegistryClient::new(&config.registry)?;
    let mut organizer = Organizer::new(config, store, registry)?;

    let report = organizer.run(phase).await?;
    let stats = organizer.store().stats()?;
    info!(
        "Catalog holds {} files and {} entries",
        stats.model_files, stats.catalog_entries
    );
    Ok(report)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init(&config.log_dir, args.debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config, args.phase.into()).await {
        Ok(report) => {
            info!(
                "Done: {} classified, {} relocated, {} quarantined, {} duplicates, {} target conflicts",
                report.classified,
                report.relocated,
                report.quarantined,
                report.duplicates,
                report.target_conflicts
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
