use crate::cli::ServeArgs;
use crate::infra::{build_workflow, seed_store, shutdown_signal, AppState};
use crate::routes::with_adoption_routes;
use adoption_engine::config::AppConfig;
use adoption_engine::error::AppError;
use adoption_engine::telemetry;
use adoption_engine::workflows::adoption::{InMemoryEntityStore, ThreadRandom, TransitionWorker};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.adoption.catalog_path = Some(catalog);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryEntityStore::default());
    let loaded = seed_store(&store, config.adoption.catalog_path.as_deref())?;
    let workflow = Arc::new(build_workflow(store, ThreadRandom, &config.adoption));

    let cancel = CancellationToken::new();
    let worker = TransitionWorker::new(
        workflow.scheduler().clone(),
        config.adoption.worker_poll_interval,
    )
    .spawn(cancel.clone());

    let app = with_adoption_routes(workflow)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        catalog_entries = loaded,
        preparation_delay_secs = config.adoption.preparation_delay.as_secs(),
        "adoption service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Err(err) = worker.await {
        tracing::warn!(error = %err, "transition worker did not stop cleanly");
    }
    Ok(())
}
