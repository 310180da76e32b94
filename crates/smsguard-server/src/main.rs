//! smsguard Server
//!
//! Serves spam/ham predictions from the models declared in a registry file.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{info, warn};

use smsguard_server::{create_router, AppState, Cli, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting smsguard server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Registry: {}", config.registry_path.display());
    info!("Results: {}", config.results_dir.display());
    if !config.preload.is_empty() {
        info!("Preloading: {}", config.preload.join(", "));
    }

    let metrics_handle = init_metrics()?;

    // Registry load and preloading are blocking file work
    let state_config = config.clone();
    let state = tokio::task::spawn_blocking(move || {
        AppState::from_config(&state_config, Some(metrics_handle))
    })
    .await??;
    info!("Application state initialized");

    let app = create_router(state);

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("smsguard_server=debug,smsguard_classifiers=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("smsguard_server=info,smsguard_classifiers=info,tower_http=info")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "smsguard_requests_total",
        "Total number of requests processed by route"
    );
    metrics::describe_counter!(
        "smsguard_predictions_total",
        "Total number of verdicts by model and label"
    );
    metrics::describe_counter!(
        "smsguard_model_loads_total",
        "Total number of model artifact loads"
    );
    metrics::describe_counter!("smsguard_errors_total", "Total number of errors by kind");
    metrics::describe_histogram!(
        "smsguard_inference_latency_us",
        metrics::Unit::Microseconds,
        "Model call latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
