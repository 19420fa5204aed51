use std::sync::Arc;

use dnsentinel::classifier::Classifier;
use dnsentinel::config::Config;
use dnsentinel::forwarder::UpstreamForwarder;
use dnsentinel::graceful_shutdown::GracefulShutdown;
use dnsentinel::http::{self, AppState};
use dnsentinel::metrics::FirewallMetrics;
use dnsentinel::queue::ClassificationQueue;
use dnsentinel::resolver::Resolver;
use dnsentinel::server::run_udp_server;
use dnsentinel::store::{SqliteStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(dns_bind_addr = %config.dns_bind_addr, api_bind_addr = %config.api_bind_addr, "starting dnsentinel");

    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&config.database_url).await?);
    let metrics = Arc::new(FirewallMetrics::new()?);
    let queue = Arc::new(ClassificationQueue::new(config.queue_capacity));
    let forwarder = UpstreamForwarder::new(config.upstream_addr, config.upstream_timeout);

    let resolver = Arc::new(Resolver::new(store.clone(), forwarder, queue.clone(), metrics.clone()));
    let classifier = Arc::new(Classifier::new(store.clone(), queue.clone(), &config, metrics.clone()));

    let shutdown = GracefulShutdown::new();

    let dns_task = tokio::spawn(run_udp_server(config.dns_bind_addr, resolver, shutdown.subscribe()));

    let classifier_shutdown = shutdown.subscribe();
    let shutdown_grace = config.shutdown_grace;
    let classifier_task = tokio::spawn(async move {
        classifier.run(classifier_shutdown, shutdown_grace).await;
    });

    let app_state = AppState {
        store: store.clone(),
        secret_key: config.secret_key.clone(),
        metrics: metrics.clone(),
    };
    let app = http::router(app_state);
    let api_listener = tokio::net::TcpListener::bind(config.api_bind_addr).await?;
    tracing::info!(bind_addr = %config.api_bind_addr, "control API listening");

    let mut api_shutdown = shutdown.subscribe();
    let api_task = tokio::spawn(async move {
        axum::serve(api_listener, app)
            .with_graceful_shutdown(async move {
                let _ = api_shutdown.recv().await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown.trigger();

    let _ = tokio::join!(dns_task, classifier_task, api_task);

    Ok(())
}
