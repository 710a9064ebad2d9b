//! Web Resource Scanner main entry point
//!
//! This is the command-line interface for scanning sites, browsing the
//! discovered resources and downloading them on demand.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use web_resource_scanner::api::{
    DownloadHistoryResponse, DownloadRequest, ResourceFilter, ResourceListResponse, ScanRequest,
    ScanResponse,
};
use web_resource_scanner::config::{load_config_with_hash, Config};
use web_resource_scanner::crawler::{DownloadContext, DownloadManager, ScanOrchestrator};
use web_resource_scanner::model::ResourceType;
use web_resource_scanner::output::{load_session_statistics, print_json, print_statistics};
use web_resource_scanner::storage::{lock_storage, open_storage, shared, SharedStorage, Storage};

/// Web Resource Scanner: discovers and catalogues the assets behind a URL
///
/// Scans crawl a target site and record every image, script, stylesheet and
/// document they reach. Recorded resources can be listed, filtered and
/// downloaded again later with a full download history.
#[derive(Parser, Debug)]
#[command(name = "wrscan")]
#[command(version)]
#[command(about = "Discovers and catalogues the resources behind a URL", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a target URL and record every resource found
    Scan {
        /// The target URL
        url: String,

        /// Username for basic authentication
        #[arg(long)]
        username: Option<String>,

        /// Password for basic authentication
        #[arg(long, requires = "username")]
        password: Option<String>,

        /// Bearer token, used when no username is given
        #[arg(long)]
        token: Option<String>,

        /// Body to POST with the initial target request
        #[arg(long)]
        payload: Option<String>,
    },

    /// List the resources of a scan session
    Resources {
        session_id: i64,

        /// Only these resource types (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<ResourceType>,

        /// Only these file extensions (repeatable)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,

        #[arg(long)]
        min_size: Option<u64>,

        #[arg(long)]
        max_size: Option<u64>,

        #[arg(long)]
        downloadable: Option<bool>,

        /// Case-insensitive match on URL or relative path
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 50)]
        page_size: u32,
    },

    /// Download a resource and record the attempt
    Download {
        resource_id: i64,

        /// Client IP to record with the download
        #[arg(long)]
        client_ip: Option<String>,

        /// User agent to record with the download
        #[arg(long)]
        user_agent: Option<String>,

        /// Write the body to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the download history of a resource
    History { resource_id: i64 },

    /// Show statistics for a scan session
    Stats { session_id: i64 },

    /// List all scan sessions
    Sessions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_ref())?;

    let storage = open_storage(std::path::Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;
    let storage = shared(storage);

    match cli.command {
        Command::Scan {
            url,
            username,
            password,
            token,
            payload,
        } => {
            let request = ScanRequest {
                target_url: url,
                username,
                password,
                auth_token: token,
                payload,
            };
            handle_scan(config, storage, request).await?;
        }
        Command::Resources {
            session_id,
            types,
            extensions,
            min_size,
            max_size,
            downloadable,
            search,
            page,
            page_size,
        } => {
            let filter = ResourceFilter {
                resource_types: (!types.is_empty()).then_some(types),
                file_extensions: (!extensions.is_empty()).then_some(extensions),
                min_file_size: min_size,
                max_file_size: max_size,
                is_downloadable: downloadable,
                search_query: search,
            };
            handle_resources(&storage, session_id, &filter, page, page_size)?;
        }
        Command::Download {
            resource_id,
            client_ip,
            user_agent,
            output,
        } => {
            let request = DownloadRequest {
                resource_id,
                client_ip,
                user_agent,
            };
            handle_download(&config, storage, request, output).await?;
        }
        Command::History { resource_id } => handle_history(&storage, resource_id)?,
        Command::Stats { session_id } => {
            let guard = lock_storage(&storage)?;
            let stats = load_session_statistics(&*guard, session_id)?;
            print_statistics(&stats);
        }
        Command::Sessions => {
            let guard = lock_storage(&storage)?;
            let sessions: Vec<ScanResponse> =
                guard.list_sessions()?.iter().map(ScanResponse::from).collect();
            print_json(&sessions)?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("web_resource_scanner=info,warn"),
            1 => EnvFilter::new("web_resource_scanner=debug,info"),
            2 => EnvFilter::new("web_resource_scanner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_configuration(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

async fn handle_scan(config: Config, storage: SharedStorage, request: ScanRequest) -> anyhow::Result<()> {
    let new_session = request.into_new_session().context("Invalid scan request")?;
    let session_id = lock_storage(&storage)?.create_session(&new_session)?;

    let orchestrator = ScanOrchestrator::new(config, storage.clone())?;
    let status = orchestrator.start(session_id).await?;
    tracing::info!("Scan {} finished as {}", session_id, status);

    let session = lock_storage(&storage)?.get_session(session_id)?;
    print_json(&ScanResponse::from(&session))?;
    Ok(())
}

fn handle_resources(
    storage: &SharedStorage,
    session_id: i64,
    filter: &ResourceFilter,
    page: u32,
    page_size: u32,
) -> anyhow::Result<()> {
    filter.validate().context("Invalid resource filter")?;
    if page == 0 || page_size == 0 {
        bail!("--page and --page-size must be at least 1");
    }

    let guard = lock_storage(storage)?;
    // Confirms the session exists before listing
    guard.get_session(session_id)?;
    let resources = guard.list_resources(session_id)?;

    let listing = ResourceListResponse::paginate(&resources, filter, page, page_size);
    print_json(&listing)?;
    Ok(())
}

async fn handle_download(
    config: &Config,
    storage: SharedStorage,
    request: DownloadRequest,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    request.validate().context("Invalid download request")?;

    let manager = DownloadManager::new(config, storage)?;
    let context = DownloadContext {
        client_ip: request.client_ip,
        user_agent: request.user_agent,
    };
    let outcome = manager.download(request.resource_id, &context).await?;

    if let (Some(path), Some(content)) = (&output, &outcome.content) {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote {} bytes to {}", content.len(), path.display());
    }

    print_json(&DownloadHistoryResponse::from(&outcome.history))?;

    if !outcome.succeeded() {
        bail!(
            "Download failed: {}",
            outcome.history.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn handle_history(storage: &SharedStorage, resource_id: i64) -> anyhow::Result<()> {
    let guard = lock_storage(storage)?;
    guard.get_resource(resource_id)?;
    let history: Vec<DownloadHistoryResponse> = guard
        .list_download_history(resource_id)?
        .iter()
        .map(DownloadHistoryResponse::from)
        .collect();
    print_json(&history)?;
    Ok(())
}
