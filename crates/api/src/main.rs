//! API server entry point.

use std::sync::Arc;

use api::auth::JwtKeys;
use api::config::Config;
use api::metrics::PrometheusMetrics;
use api::AppState;
use pvz_store::PostgresStore;
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // 1. Initialize tracing
    api::telemetry::init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = api::metrics::install_prometheus()?;

    // 3. Connect to PostgreSQL and apply migrations
    let store = PostgresStore::connect_with_retry(
        &config.database_url,
        config.db_max_connections,
        config.db_connect_retries,
        Config::DB_RETRY_DELAY,
    )
    .await?;
    store.run_migrations().await?;
    tracing::info!("database ready");

    // 4. Build the application
    let state = Arc::new(AppState::new(
        store,
        JwtKeys::new(&config.jwt_secret),
        Arc::new(PrometheusMetrics),
    )
    .with_password_cost(config.password_cost));
    let app = api::create_app(state, metrics_handle.clone());

    // 5. Start the scrape endpoint on its own port
    let metrics_addr = config.metrics_addr();
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr).await?;
    tracing::info!(addr = %metrics_addr, "starting metrics server");
    let metrics_server = tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, api::create_metrics_app(metrics_handle)).await {
            tracing::error!(error = %e, "metrics server failed");
        }
    });

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    metrics_server.abort();
    tracing::info!("server shut down gracefully");
    Ok(())
}
