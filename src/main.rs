use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};

use es_document_api::{
    config::Config,
    middleware::init_tracing,
    repository::ElasticsearchRepository,
    router::create_router,
    service::DocumentService,
};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize structured logging
    if let Err(e) = init_tracing(&config.environment) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }
    info!("Configuration loaded successfully ({:?})", config.environment);

    // Build the Elasticsearch-backed repository; no request is sent yet
    let repository = match ElasticsearchRepository::new(&config.elasticsearch) {
        Ok(repository) => repository,
        Err(e) => {
            error!("Failed to configure Elasticsearch client: {}", e);
            std::process::exit(1);
        }
    };
    let service = Arc::new(DocumentService::new(Arc::new(repository)));

    // Create indices up front; if the cluster is unreachable the repository retries before its first write
    match service.prepare().await {
        Ok(()) => info!(
            "Connected to Elasticsearch at {} (indices {}, {})",
            config.elasticsearch.url,
            config.elasticsearch.articles_index(),
            config.elasticsearch.users_index()
        ),
        Err(e) => warn!(
            "Elasticsearch at {} is not ready, index bootstrap deferred to first use: {}",
            config.elasticsearch.url, e
        ),
    }

    let app = create_router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Start the server with graceful shutdown handling
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
/// Listens for SIGTERM and SIGINT signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        },
    }
}
