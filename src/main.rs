//! Health Profile Predictor - Main Entry Point
//!
//! Fetches the model artifacts, loads them once and serves the prediction form.

use anyhow::{Context, Result};
use health_profile_predictor::{
    config::{AppConfig, LoggingConfig},
    feature_extractor::FeatureAssembler,
    metrics::{MetricsReporter, PredictionMetrics},
    models::{ArtifactFetcher, ModelCache, ModelLoader},
    server::{router, AppState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config.logging)?;

    info!("Starting Health Profile Predictor");
    info!(
        models_dir = %config.artifacts.models_dir,
        bind_address = %config.server.bind_address,
        "Configuration loaded successfully"
    );

    // Initialize metrics
    let metrics = Arc::new(PredictionMetrics::new());

    let assembler = FeatureAssembler::new();
    info!(
        "Feature assembler initialized ({} features)",
        assembler.feature_count()
    );
    debug!(columns = ?assembler.feature_names(), "Model input column order");

    // Fetch and load the scaler and both classifiers
    let fetcher = ArtifactFetcher::from_config(&config.artifacts)
        .context("Failed to build artifact HTTP client")?;
    let loader = ModelLoader::with_threads(config.artifacts.onnx_threads)?;
    let cache = ModelCache::new(fetcher, loader, config.artifacts.clone());
    let availability = cache.load_models().await.clone();

    if availability.is_ready() {
        info!("Models ready, prediction enabled");
    } else {
        warn!("Serving without models; the form reports the missing artifacts");
    }

    let state = AppState::new(availability, &config.artifacts, metrics.clone())?;

    // Start metrics reporter
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Print final summary
    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("health_profile_predictor={}", logging.level).parse()?);

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
