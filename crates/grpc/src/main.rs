//! gRPC server entry point.

use std::net::SocketAddr;

use api::config::Config;
use grpc::PvzGrpcService;
use grpc::proto::pvz_service_server::PvzServiceServer;
use pvz_store::PostgresStore;
use tonic::transport::Server;
use tonic_health::server::health_reporter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    api::telemetry::init_tracing(&config);

    let addr: SocketAddr = config.grpc_addr().parse()?;

    let store = PostgresStore::connect_with_retry(
        &config.database_url,
        config.db_max_connections,
        config.db_connect_retries,
        Config::DB_RETRY_DELAY,
    )
    .await?;
    store.run_migrations().await?;

    let (mut health_reporter, health_service) = health_reporter();
    health_reporter
        .set_serving::<PvzServiceServer<PvzGrpcService<PostgresStore>>>()
        .await;

    tracing::info!(%addr, "starting gRPC server");

    Server::builder()
        .add_service(health_service)
        .add_service(PvzGrpcService::new(store).into_server())
        .serve_with_shutdown(addr, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received SIGINT, shutting down gRPC server");
            }
        })
        .await?;

    Ok(())
}
