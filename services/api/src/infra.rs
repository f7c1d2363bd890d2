use adoption_engine::config::AdoptionConfig;
use adoption_engine::error::AppError;
use adoption_engine::workflows::adoption::{
    AcceptanceOracle, Adoptable, AdoptionWorkflow, Clock, InMemoryEntityStore, RandomSource,
    SystemClock, TransitionScheduler, UuidGenerator,
};
use adoption_engine::workflows::catalog::CatalogImporter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ServiceWorkflow<G> = AdoptionWorkflow<InMemoryEntityStore, UuidGenerator, G>;

/// Wires the in-memory store, scheduler, and oracle into a workflow.
pub(crate) fn build_workflow<G: RandomSource>(
    store: Arc<InMemoryEntityStore>,
    random: G,
    config: &AdoptionConfig,
) -> ServiceWorkflow<G> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = Arc::new(TransitionScheduler::new(store.clone(), clock));
    AdoptionWorkflow::new(
        store,
        UuidGenerator,
        AcceptanceOracle::new(random),
        scheduler,
        config.preparation_delay,
    )
}

/// Loads the configured catalog, or a small built-in one when none is given.
pub(crate) fn seed_store(
    store: &InMemoryEntityStore,
    catalog: Option<&Path>,
) -> Result<usize, AppError> {
    let adoptables = match catalog {
        Some(path) => {
            info!(path = %path.display(), "loading catalog");
            CatalogImporter::from_path(path)?
        }
        None => starter_catalog(),
    };
    Ok(CatalogImporter::load_into(store, adoptables)?)
}

pub(crate) fn starter_catalog() -> Vec<Adoptable> {
    let entry = |id: &str, name: &str, types: &[&str], abilities: &[&str]| Adoptable {
        types: types.iter().map(|value| value.to_string()).collect::<BTreeSet<_>>(),
        abilities: abilities
            .iter()
            .map(|value| value.to_string())
            .collect::<BTreeSet<_>>(),
        photo_ref: format!("https://img.pokemondb.net/artwork/{name}.jpg"),
        ..Adoptable::available(id, name)
    };

    vec![
        entry("1", "bulbasaur", &["grass", "poison"], &["overgrow", "chlorophyll"]),
        entry("4", "charmander", &["fire"], &["blaze", "solar-power"]),
        entry("7", "squirtle", &["water"], &["torrent", "rain-dish"]),
        entry("25", "pikachu", &["electric"], &["static", "lightning-rod"]),
        entry("133", "eevee", &["normal"], &["run-away", "adaptability"]),
    ]
}

pub(crate) async fn shutdown_signal(cancel: tokio_util::sync::CancellationToken) {
    wait_for_interrupt(tokio::signal::ctrl_c()).await;
    info!("received Ctrl+C, shutting down");
    cancel.cancel();
}

/// Resolves on the interrupt; never resolves when the signal handler cannot be installed.
async fn wait_for_interrupt<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        tracing::warn!(error = %err, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
