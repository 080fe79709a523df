//! numis-intake - Coin intake and catalog enrichment service
//!
//! Accepts front/back photographs of a coin, runs them through background
//! removal and cropping, extracts attributes with an AI model, stores the
//! coin and matches it against the Numista catalog in the background.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use numis_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use numis_intake::clients::gemini::DEFAULT_GEMINI_MODEL;
use numis_intake::clients::{GeminiClient, LocalImageProcessor, LocalStorage, NumistaClient, RembgClient};
use numis_intake::config::{ServiceConfig, DEFAULT_PORT};
use numis_intake::db::{SqliteCoinRepository, SqliteGroupRepository};
use numis_intake::services::CoinService;
use numis_intake::types::{AnalysisOptions, CatalogClient};
use numis_intake::AppState;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MODULE_NAME: &str = "numis-intake";

/// Command-line arguments for numis-intake
#[derive(Parser, Debug)]
#[command(name = "numis-intake")]
#[command(about = "Coin intake and catalog enrichment service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the TOML config)
    #[arg(short, long, env = "NUMIS_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and image storage
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default(MODULE_NAME);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting numis-intake v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .with_toml_root(toml_config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = numis_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let config = ServiceConfig::resolve(&pool, &toml_config)
        .await
        .context("Failed to resolve service configuration")?;

    let catalog: Option<Arc<dyn CatalogClient>> = match config.numista_api_key.as_deref() {
        Some(key) => Some(Arc::new(
            NumistaClient::new(key).context("Failed to create Numista client")?,
        )),
        None => None,
    };
    if catalog.is_none() {
        warn!("Catalog enrichment disabled");
    }

    let analyzer = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())
        .context("Failed to create Gemini client")?;
    let remover = RembgClient::new(&config.rembg_url).context("Failed to create rembg client")?;
    info!("Background removal: {}", config.rembg_url);

    let service = CoinService::new(
        Arc::new(SqliteCoinRepository::new(pool.clone())),
        Arc::new(SqliteGroupRepository::new(pool.clone())),
        Arc::new(LocalStorage::new(initializer.storage_path())),
        Arc::new(remover),
        Arc::new(LocalImageProcessor::new()),
        Arc::new(analyzer),
        catalog,
    );

    let analysis_defaults = AnalysisOptions {
        model: if config.gemini_model.trim().is_empty() {
            DEFAULT_GEMINI_MODEL.to_string()
        } else {
            config.gemini_model.clone()
        },
        ..AnalysisOptions::default()
    };
    let app = numis_intake::build_router(AppState::new(service, analysis_defaults));

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
