use crate::infra::{build_workflow, seed_store};
use adoption_engine::config::AdoptionConfig;
use adoption_engine::error::AppError;
use adoption_engine::workflows::adoption::{
    AdoptableId, AdoptionRequest, AdoptionStage, FixedDraw, InMemoryEntityStore, RandomSource,
    RequesterId, SubmissionOutcome, ThreadRandom, TransitionWorker,
};
use adoption_engine::workflows::catalog::CatalogImporter;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// CSV catalog to adopt from (defaults to the built-in starter catalog).
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Adoptable to request (defaults to the first available entry).
    #[arg(long)]
    pub(crate) adoptable_id: Option<String>,
    /// Seconds the adoption stays in preparation.
    #[arg(long, default_value_t = 2)]
    pub(crate) delay_secs: u64,
    /// Force the acceptance draw (0.0 always accepts, 1.0 always rejects).
    #[arg(long)]
    pub(crate) draw: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogCheckArgs {
    /// Path to the CSV catalog
    pub(crate) path: PathBuf,
}

/// Either a forced or a random draw, chosen at the command line.
enum DemoDraw {
    Forced(FixedDraw),
    Random(ThreadRandom),
}

impl RandomSource for DemoDraw {
    fn draw(&self) -> f64 {
        match self {
            DemoDraw::Forced(fixed) => fixed.draw(),
            DemoDraw::Random(random) => random.draw(),
        }
    }
}

pub(crate) fn run_catalog_check(args: CatalogCheckArgs) -> Result<(), AppError> {
    let adoptables = CatalogImporter::from_path(&args.path)?;
    let adopted = adoptables.iter().filter(|entry| entry.adopted).count();

    println!("Catalog {}", args.path.display());
    println!(
        "- {} entries | {} available | {} already adopted",
        adoptables.len(),
        adoptables.len() - adopted,
        adopted
    );
    for entry in adoptables.iter().filter(|entry| !entry.adopted) {
        let types: Vec<&str> = entry.types.iter().map(String::as_str).collect();
        println!("  - #{} {} [{}]", entry.id, entry.name, types.join(", "));
    }

    Ok(())
}

/// What an in-process walk-through left behind.
struct DemoRun {
    store: Arc<InMemoryEntityStore>,
    final_stage: Option<AdoptionStage>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    walk_through(args).await.map(|_| ())
}

async fn walk_through(args: DemoArgs) -> Result<DemoRun, AppError> {
    let DemoArgs {
        catalog,
        adoptable_id,
        delay_secs,
        draw,
    } = args;

    let config = AdoptionConfig {
        preparation_delay: Duration::from_secs(delay_secs),
        worker_poll_interval: Duration::from_millis(200),
        catalog_path: catalog,
    };
    let random = match draw {
        Some(value) => DemoDraw::Forced(FixedDraw(value)),
        None => DemoDraw::Random(ThreadRandom),
    };

    let store = Arc::new(InMemoryEntityStore::default());
    seed_store(&store, config.catalog_path.as_deref())?;
    let workflow = build_workflow(store.clone(), random, &config);

    println!("Adoption workflow demo");
    let available = workflow.list_available()?;
    println!("Available adoptables: {}", available.len());
    for entry in &available {
        println!("- #{} {}", entry.id, entry.name);
    }

    let target = match adoptable_id {
        Some(id) => AdoptableId(id),
        None => match available.first() {
            Some(entry) => entry.id.clone(),
            None => {
                println!("Nothing left to adopt");
                return Ok(DemoRun {
                    store,
                    final_stage: None,
                });
            }
        },
    };

    let request = AdoptionRequest {
        requester_name: "Ash".to_string(),
        requester_last_name: "Ketchum".to_string(),
        requester_id_number: RequesterId("1-9".to_string()),
        address: Some("Pallet Town".to_string()),
        description: "Demo adoption request".to_string(),
        adoptable_id: target.clone(),
    };

    println!("\nSubmitting request for #{target}");
    let tracking_id = match workflow.submit_request(request)? {
        SubmissionOutcome::Accepted {
            message,
            tracking_id,
        } => {
            println!("- {message}");
            tracking_id
        }
        SubmissionOutcome::Rejected { message, .. } => {
            println!("- {message}");
            return Ok(DemoRun {
                store,
                final_stage: None,
            });
        }
    };

    let cancel = CancellationToken::new();
    let worker = TransitionWorker::new(workflow.scheduler().clone(), config.worker_poll_interval)
        .spawn(cancel.clone());

    let poll_every = Duration::from_millis(500);
    let give_up_after = config.preparation_delay + Duration::from_secs(5);
    let mut waited = Duration::ZERO;
    let final_stage = loop {
        let stage = workflow
            .get_status(&tracking_id)?
            .map(|status| status.status);
        let label = stage.map(AdoptionStage::label).unwrap_or("unknown");
        println!("- status after {:.1}s: {label}", waited.as_secs_f32());
        if stage == Some(AdoptionStage::Success) || waited >= give_up_after {
            break stage;
        }
        tokio::time::sleep(poll_every).await;
        waited += poll_every;
    };

    cancel.cancel();
    if let Err(err) = worker.await {
        println!("Transition worker stopped unexpectedly: {err}");
    }
    Ok(DemoRun { store, final_stage })
}
