//! vindec-decoder - VIN decoding service
//!
//! Subcommands:
//! - `serve`: HTTP API (decode, admin, submissions, settings, health)
//! - `decode <VIN>`: one-off decode printed to stdout
//! - `purge-submissions --days N`: retention cleanup

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vindec_common::config::{
    database_path, default_config_path, load_toml_config, resolve_root_folder, TomlConfig,
};
use vindec_decoder::{build_router, config::load_settings, db::submissions, AppState};

const DEFAULT_PORT: u16 = 5780;

/// Command-line arguments for vindec-decoder
#[derive(Parser, Debug)]
#[command(name = "vindec-decoder")]
#[command(about = "VIN decoding service with NHTSA and VinDecoder.eu sources")]
#[command(version)]
struct Args {
    /// Root folder holding the database (overrides VINDEC_ROOT_FOLDER and TOML)
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML config file
    #[arg(short, long, global = true, env = "VINDEC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides TOML)
        #[arg(short, long, env = "VINDEC_PORT")]
        port: Option<u16>,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1", env = "VINDEC_HOST")]
        host: std::net::IpAddr,
    },
    /// Decode one VIN and print the result
    Decode {
        vin: String,

        /// Print the canonical record as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Delete form submissions older than N days
    PurgeSubmissions {
        #[arg(long)]
        days: u32,
    },
}

fn init_tracing(toml_config: &TomlConfig) {
    let level = &toml_config.logging.level;
    let default_filter = format!("vindec_decoder={0},vindec_common={0},tower_http=info", level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml_config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    init_tracing(&toml_config);

    info!(
        "Starting vindec-decoder v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db = vindec_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Serve { port, host } => {
            let port = port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
            serve(db, &toml_config, &config_path, SocketAddr::new(host, port)).await
        }
        Command::Decode { vin, json } => decode_once(db, &toml_config, &vin, json).await,
        Command::PurgeSubmissions { days } => {
            let deleted = submissions::purge_older_than(&db, days).await?;
            println!("Deleted {} submission(s) older than {} day(s)", deleted, days);
            Ok(())
        }
    }
}

async fn serve(
    db: sqlx::SqlitePool,
    toml_config: &TomlConfig,
    config_path: &Path,
    addr: SocketAddr,
) -> Result<()> {
    let settings = load_settings(&db, toml_config).await?;
    info!(
        api_timeout_secs = settings.api_timeout_secs,
        enable_secondary_api = settings.enable_secondary_api,
        "Settings loaded"
    );

    let state = AppState::with_default_sources(db, settings, Some(config_path.to_path_buf()))?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn decode_once(
    db: sqlx::SqlitePool,
    toml_config: &TomlConfig,
    raw_vin: &str,
    as_json: bool,
) -> Result<()> {
    let settings = load_settings(&db, toml_config).await?;
    let state = AppState::with_default_sources(db, settings, None)?;

    let outcome = state.orchestrator.decode(raw_vin).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome.record)?);
    } else {
        println!("VIN: {}{}", outcome.vin, if outcome.cached { " (cached)" } else { "" });
        println!();
        println!("{}", vindec_decoder::services::format_record(&outcome.record));
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
