use crate::cli::ServeArgs;
use crate::infra::{object_storage, AppParts, AppState, FormStore};
use crate::routes::build_app;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use surveyor_registry::config::AppConfig;
use surveyor_registry::error::AppError;
use surveyor_registry::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let storage = object_storage(&config.storage).await;
    let parts = AppParts::from_config(&config, app_state, storage);

    let app = match FormStore::connect(&config).await? {
        FormStore::Postgres(repository) => build_app(Arc::new(repository), parts),
        FormStore::Memory(repository) => build_app(Arc::new(repository), parts),
    }
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "surveyor registry backend ready");

    axum::serve(listener, app).await?;
    Ok(())
}
