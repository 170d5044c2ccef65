//! Raster reformat API service.
//!
//! Accepts requests naming a remote raster product (NetCDF subdataset or
//! zipped archive) and a layer within it, transcodes the layer to a tiled,
//! deflate-compressed GeoTIFF through the raster engine, streams the result
//! to object storage, and answers with a 307 redirect to the delivered
//! object.

mod config;
mod metrics;
mod netrc;
mod secrets;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use delivery::Pipeline;
use raster_engine::{GdalCliConfig, GdalCliEngine};
use storage::ObjectStorage;

use config::ReformatConfig;
use secrets::SecretsManagerSource;
use server::AppState;

#[derive(Parser, Debug)]
#[command(name = "reformat-api")]
#[command(about = "Raster reformat and delivery API server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Skip the credential bootstrap (for local development)
    #[arg(long)]
    no_netrc: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting reformat API");

    let config = ReformatConfig::from_env().context("failed to load configuration")?;

    // One-time credential bootstrap; never re-resolved per request.
    if !args.no_netrc {
        if let Some(secret_arn) = &config.secret_arn {
            let source = SecretsManagerSource::new().await;
            netrc::set_up_netrc(&source, secret_arn)
                .await
                .context("credential bootstrap failed")?;
        }
    }

    let engine = Arc::new(GdalCliEngine::new(GdalCliConfig {
        scratch_dir: config.scratch_dir.clone(),
        ..GdalCliConfig::default()
    }));
    match engine.preflight().await {
        Ok(version) => info!(version = %version, "raster engine ready"),
        Err(fault) => anyhow::bail!("raster engine unavailable: {fault}"),
    }

    let storage = ObjectStorage::new(&config.storage)?;
    let pipeline = Pipeline::new(engine, storage, config.pipeline())?;

    let prometheus = metrics::install_recorder()?;
    let state = Arc::new(AppState {
        pipeline,
        prometheus,
    });

    server::run_server(state, &args.listen).await
}
