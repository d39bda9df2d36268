use std::net::SocketAddr;
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use pictor_api::ApiServer;
use pictor_config::AppConfig;
use pictor_core::VariantResolver;
use pictor_store::S3ObjectStore;
use pictor_telemetry::{LoggingConfig, Metrics};
use pictor_transform::ImageTransformer;
use tracing::info;

use crate::error::{AppError, AppResult};

/// Entry point for the Pictor application boot sequence.
///
/// # Errors
///
/// Returns an error if configuration loading, telemetry wiring, or server
/// startup fails.
pub async fn run_app() -> AppResult<()> {
    let config =
        pictor_config::load_from_env().map_err(|err| AppError::config("config.load", err))?;
    run_app_with(config).await
}

/// Boot sequence over an already-resolved configuration.
pub(crate) async fn run_app_with(config: AppConfig) -> AppResult<()> {
    let logging = LoggingConfig::default();
    pictor_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!("pictor application bootstrap starting");

    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.store.region.clone()))
        .load()
        .await;
    let client = aws_sdk_s3::Client::new(&sdk_config);

    let store = Arc::new(S3ObjectStore::new(client, config.store.bucket.clone()));
    let engine = Arc::new(ImageTransformer::new());
    let resolver = Arc::new(VariantResolver::new(store, engine, metrics.clone()));

    let api = ApiServer::new(resolver, metrics, config.store.domain());

    let addr = SocketAddr::new(config.http.bind_addr, config.http.port);
    info!(addr = %addr, bucket = %config.store.bucket, "launching api listener");

    api.serve(addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;

    info!("api server shutdown complete");
    Ok(())
}
