//! SnapClass Server
//!
//! Serves a pretrained ResNet over HTTP: upload an image, get the five most
//! likely ImageNet classes back.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use snapclass_classifiers::{InferenceService, LabelTable};
use snapclass_server::{run_server, AppState, Cli, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting SnapClass server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded");
    info!("Labels: {}", config.labels_path.display());
    info!("Model: {} on {}", config.model.architecture.display_name(), config.model.device);

    let metrics_handle = init_metrics()?;

    let labels = Arc::new(LabelTable::load_or_fallback(&config.labels_path));
    info!("Label table ready with {} classes ({})", labels.len(), labels.source());

    // Weight download and mmap block, keep them off the runtime threads
    let model = config.model.clone();
    let options = config.service_options();
    let service = tokio::task::spawn_blocking(move || {
        InferenceService::initialize(labels, &model, options)
    })
    .await?;

    if service.is_ready() {
        info!("Model loaded, service is ready");
    } else {
        warn!("Model unavailable, serving in degraded mode");
    }

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let state = AppState::new(config, Arc::new(service), metrics_handle);

    println!();
    println!("  SnapClass image classification");
    println!();
    println!("  Upload UI:  http://{}", addr);
    println!("  Health:     http://{}/health", addr);
    println!("  Test:       http://{}/test", addr);
    println!("  API docs:   http://{}/docs", addr);
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    run_server(state, listener, shutdown).await
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("snapclass_server=debug,snapclass_classifiers=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("snapclass_server=info,snapclass_classifiers=info,tower_http=warn")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder and return the handle for `/metrics`
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("snapclass_requests_total", "Total number of requests by endpoint");
    metrics::describe_counter!(
        "snapclass_classifications_total",
        "Classification attempts by outcome"
    );
    metrics::describe_counter!(
        "snapclass_rejections_total",
        "Uploads rejected before classification, by reason"
    );
    metrics::describe_histogram!(
        "snapclass_inference_latency_ms",
        metrics::Unit::Milliseconds,
        "End-to-end classification latency in milliseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
