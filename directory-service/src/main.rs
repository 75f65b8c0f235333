use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use directory_service::{AggregateCache, DirectoryEngine, GrpcServer, PgFileStore, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "directory_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Directory Service v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::from_env()?;

    info!("Configuration loaded:");
    info!("  gRPC Port: {}", config.grpc_port);
    info!("  Default page limit: {}", config.default_page_limit);
    info!("  Aggregate cache TTL: {:?}", config.aggregate_cache_ttl);
    info!("  Public base URL: {}", config.public_base_url);
    info!("  Database URL: {}", config.masked_database_url());

    let store = PgFileStore::new(&config.database_url).await?;
    let mut engine = DirectoryEngine::new(store).with_default_limit(config.default_page_limit);
    if config.cache_enabled() {
        engine = engine.with_cache(AggregateCache::new(config.aggregate_cache_ttl));
    }
    let engine = Arc::new(engine);
    info!("Directory engine initialized successfully");

    let grpc_server = GrpcServer::new(engine, config.public_base_url.clone());
    let grpc_addr: SocketAddr = ([0, 0, 0, 0], config.grpc_port).into();
    let grpc_handle = tokio::spawn(async move {
        if let Err(e) = grpc_server.start(grpc_addr).await {
            error!("gRPC server error: {}", e);
        }
    });

    info!("gRPC server listening on {}", grpc_addr);

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, gracefully shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    grpc_handle.abort();

    info!("Directory Service shutdown complete");
    Ok(())
}
