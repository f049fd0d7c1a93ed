//! Mentora server
//!
//! Main entry point for serving the Mentora learning API.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mentora_api::{create_router, AppState, Config, LearningService, StoreKind};
use mentora_llm::HttpChatClient;
use mentora_store::{DocumentStore, FileStore, MemoryStore};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Mentora - AI-driven personalized learning backend
///
/// Serves the learning API: course, quiz, tutor and teaching content is
/// generated by an OpenAI-compatible model and persisted to a JSON document
/// store.
#[derive(Parser, Debug)]
#[command(name = "mentora")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: mentora.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Interface to bind (overrides config)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Data file for the document store (overrides config)
    #[arg(long, value_name = "FILE", conflicts_with = "memory")]
    data_file: Option<String>,

    /// Keep all data in memory; nothing is written to disk
    #[arg(long)]
    memory: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Mentora starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads configuration, wires the store and model client, and serves until
/// Ctrl+C.
async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.apply_process_env();

    // Apply CLI argument overrides
    if let Some(ref host) = args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ref data_file) = args.data_file {
        config.store.kind = StoreKind::File;
        config.store.path.clone_from(data_file);
    }
    if args.memory {
        config.store.kind = StoreKind::Memory;
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    if config.llm.api_key.is_none() {
        tracing::warn!("No LLM API key configured; set LLM_API_KEY or llm.apiKey");
    }

    let store = open_store(&config).await?;
    let llm = HttpChatClient::new(config.llm.client_options())
        .map_err(|e| anyhow::anyhow!("Failed to build LLM client: {e}"))?;
    let service = LearningService::new(store, Arc::new(llm), config.quiz_scoring);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;
    let local_addr = listener.local_addr()?;

    let router = create_router(AppState::new(config, service));

    println!();
    println!("Mentora API running on http://{local_addr}/api");
    println!("Press Ctrl+C to stop");
    tracing::info!(address = %local_addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves when the process receives Ctrl+C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Opens the configured document store.
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store.kind {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::File => {
            let store = FileStore::open(&config.store.path).await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to open data file: {e}\n\nSuggestion: Fix or move '{}', or run with --memory",
                    config.store.path
                )
            })?;
            tracing::info!(path = %store.path().display(), "Opened data file");
            Ok(Arc::new(store))
        }
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Bind address: {}", config.bind_address());
    println!("  CORS origins: {}", config.cors_origins.join(", "));
    match config.store.kind {
        StoreKind::File => println!("  Store: file ({})", config.store.path),
        StoreKind::Memory => println!("  Store: memory"),
    }
    println!("  LLM endpoint: {}", config.llm.endpoint);
    println!("  LLM model: {}", config.llm.model);
    println!("  LLM timeout: {}s", config.llm.timeout_secs);
    println!("  LLM retries: {}", config.llm.max_retries);
    println!("  Quiz scoring: {}", config.quiz_scoring);
}
