//! MPC ETL (mpcp-etl) - Main entry point
//!
//! Ingests Machine Performance Check measurement folders: `run` processes one
//! folder, `scan` walks a tree and processes every measurement folder found.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mpcp_common::config::{resolve_database_url, resolve_root_folder};
use mpcp_common::{LoggingConfig, TomlConfig};
use mpcp_etl::config::log_config_source;
use mpcp_etl::services::{FieldAnalyzer, FolderScanner};
use mpcp_etl::{
    BeamTypeDispatcher, DryRunGateway, FolderOutcome, IngestSettings, PersistenceGateway,
    SqliteGateway,
};

const ENV_CONFIG: &str = "MPCP_CONFIG";
const ENV_DATABASE_URL: &str = "MPCP_DATABASE_URL";
const ENV_ROOT_FOLDER: &str = "MPCP_ROOT_FOLDER";

/// Command-line arguments for mpcp-etl
#[derive(Parser, Debug)]
#[command(name = "mpcp-etl")]
#[command(about = "Machine Performance Check measurement ingest")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Database URL (default: sqlite://<root>/mpcp.db)
    #[arg(long, global = true, env = ENV_DATABASE_URL)]
    database: Option<String>,

    /// Root folder holding measurement folders and the default database
    #[arg(long, global = true, env = ENV_ROOT_FOLDER)]
    root_folder: Option<PathBuf>,

    /// Log records instead of storing them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Skip flatness/symmetry image analysis
    #[arg(long, global = true)]
    skip_images: bool,

    /// Log filter (overrides RUST_LOG and the config file), e.g. "debug" or "mpcp_etl=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a single measurement folder
    Run {
        folder: PathBuf,
    },
    /// Find and process every measurement folder under ROOT (default: the root folder)
    Scan {
        root: Option<PathBuf>,

        /// Limit directory recursion
        #[arg(long)]
        max_depth: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) = TomlConfig::load_or_default(args.config.as_deref(), ENV_CONFIG)
        .context("Failed to load configuration")?;
    init_tracing(args.log_level.as_deref(), &config.logging)?;
    log_config_source(&config_source);

    info!("Starting mpcp-etl v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = IngestSettings::from_toml(&config)?.with_env_overrides()?;
    if args.skip_images {
        settings.analyze_images = false;
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ENV_ROOT_FOLDER, &config);

    let sqlite = if args.dry_run {
        info!("Dry run: records will be logged, not stored");
        None
    } else {
        let url = resolve_database_url(
            args.database.as_deref(),
            ENV_DATABASE_URL,
            &config,
            &root_folder,
        );
        let gateway = SqliteGateway::connect(&url)
            .await
            .with_context(|| format!("Failed to open database {}", url))?;
        Some(Arc::new(gateway))
    };
    let gateway: Arc<dyn PersistenceGateway> = match &sqlite {
        Some(gateway) => gateway.clone(),
        None => Arc::new(DryRunGateway::new()),
    };

    let dispatcher = BeamTypeDispatcher::new(settings, Arc::new(FieldAnalyzer::new()), gateway);
    let result = execute(&dispatcher, args.command, &root_folder).await;

    drop(dispatcher);
    if let Some(gateway) = sqlite.and_then(|g| Arc::try_unwrap(g).ok()) {
        gateway.close().await;
    }

    result
}

async fn execute(dispatcher: &BeamTypeDispatcher, command: Command, root_folder: &Path) -> Result<()> {
    match command {
        Command::Run { folder } => match dispatcher.process_folder(&folder).await? {
            FolderOutcome::Persisted { record, run } => {
                println!(
                    "{}: {} record stored in {} (run {})",
                    folder.display(),
                    record.beam_type(),
                    record.table_tag(),
                    run.run_id
                );
                Ok(())
            }
            FolderOutcome::Excluded { marker, .. } => {
                println!("{}: excluded template ({}), nothing stored", folder.display(), marker);
                Ok(())
            }
            FolderOutcome::Incomplete {
                error, persisted, ..
            } => {
                let held = if persisted {
                    "stored as incomplete"
                } else {
                    "held for manual review"
                };
                bail!("{}: record {}: {}", folder.display(), held, error)
            }
        },
        Command::Scan { root, max_depth } => {
            let root = root.unwrap_or_else(|| root_folder.to_path_buf());
            let mut scanner = FolderScanner::new();
            if let Some(depth) = max_depth {
                scanner = scanner.with_max_depth(depth);
            }

            let summary = dispatcher.process_tree(&root, &scanner).await?;
            println!(
                "{} folders: {} persisted, {} excluded, {} incomplete, {} failed",
                summary.discovered,
                summary.persisted,
                summary.excluded,
                summary.incomplete,
                summary.failed.len()
            );
            for (folder, reason) in &summary.failed {
                println!("  {}: {}", folder.display(), reason);
            }
            Ok(())
        }
    }
}

/// Console logging plus an optional log file
///
/// Filter priority: `--log-level`, then `RUST_LOG`, then `[logging] level`.
fn init_tracing(cli_level: Option<&str>, logging: &LoggingConfig) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?,
    };

    let file_layer = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}
