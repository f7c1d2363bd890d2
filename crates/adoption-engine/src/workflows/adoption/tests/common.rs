use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::workflows::adoption::domain::{
    Adoptable, AdoptableId, AdoptionRequest, AdoptionStage, AdoptionStatus, JobState, Requester,
    RequesterId, TrackingId, TransitionJob,
};
use crate::workflows::adoption::identifier::IdentifierGenerator;
use crate::workflows::adoption::memory::InMemoryEntityStore;
use crate::workflows::adoption::oracle::{AcceptanceOracle, FixedDraw};
use crate::workflows::adoption::scheduler::{ManualClock, TransitionScheduler};
use crate::workflows::adoption::service::AdoptionWorkflow;
use crate::workflows::adoption::store::{EntityStore, StoreError};

pub(super) const PREPARATION_DELAY: Duration = Duration::from_secs(60);

pub(super) type MemoryWorkflow = AdoptionWorkflow<InMemoryEntityStore, SequenceIds, FixedDraw>;

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn pikachu() -> Adoptable {
    Adoptable {
        id: AdoptableId("25".to_string()),
        name: "pikachu".to_string(),
        types: BTreeSet::from(["electric".to_string()]),
        abilities: BTreeSet::from(["static".to_string(), "lightning-rod".to_string()]),
        adopted: false,
        photo_ref: "https://img.example/25.png".to_string(),
    }
}

pub(super) fn bulbasaur() -> Adoptable {
    Adoptable::available("1", "bulbasaur")
}

pub(super) fn adopted_eevee() -> Adoptable {
    Adoptable {
        adopted: true,
        ..Adoptable::available("133", "eevee")
    }
}

pub(super) fn request_for(adoptable_id: &str) -> AdoptionRequest {
    AdoptionRequest {
        requester_name: "Ash".to_string(),
        requester_last_name: "Ketchum".to_string(),
        requester_id_number: RequesterId("1-9".to_string()),
        address: Some("Pallet Town".to_string()),
        description: "Experienced trainer with a large backyard".to_string(),
        adoptable_id: AdoptableId(adoptable_id.to_string()),
    }
}

pub(super) fn seeded_store() -> InMemoryEntityStore {
    InMemoryEntityStore::with_adoptables([pikachu(), bulbasaur(), adopted_eevee()])
}

/// Deterministic tracking ids: `trk-000001`, `trk-000002`, ...
#[derive(Debug, Default)]
pub(super) struct SequenceIds {
    next: AtomicU64,
}

impl IdentifierGenerator for SequenceIds {
    fn next(&self) -> TrackingId {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        TrackingId(format!("trk-{id:06}"))
    }
}

/// Always hands out the same id, to exercise duplicate-key handling.
#[derive(Debug, Default)]
pub(super) struct RepeatingIds;

impl IdentifierGenerator for RepeatingIds {
    fn next(&self) -> TrackingId {
        TrackingId("trk-fixed".to_string())
    }
}

pub(super) fn build_workflow_with_store<S>(
    store: Arc<S>,
    draw: f64,
) -> (AdoptionWorkflow<S, SequenceIds, FixedDraw>, Arc<ManualClock>)
where
    S: EntityStore + 'static,
{
    let clock = Arc::new(ManualClock::new(epoch()));
    let scheduler = Arc::new(TransitionScheduler::new(store.clone(), clock.clone()));
    let workflow = AdoptionWorkflow::new(
        store,
        SequenceIds::default(),
        AcceptanceOracle::new(FixedDraw(draw)),
        scheduler,
        PREPARATION_DELAY,
    );
    (workflow, clock)
}

pub(super) fn build_workflow(
    draw: f64,
) -> (MemoryWorkflow, Arc<InMemoryEntityStore>, Arc<ManualClock>) {
    let store = Arc::new(seeded_store());
    let (workflow, clock) = build_workflow_with_store(store.clone(), draw);
    (workflow, store, clock)
}

/// Delegates to an in-memory store but fails status writes.
#[derive(Debug)]
pub(super) struct StatusWriteFailure {
    pub(super) inner: InMemoryEntityStore,
    failing_saves: bool,
    failing_updates: AtomicUsize,
}

impl StatusWriteFailure {
    /// Every `save_status` and `update_status` fails.
    pub(super) fn always(inner: InMemoryEntityStore) -> Self {
        Self {
            inner,
            failing_saves: true,
            failing_updates: AtomicUsize::new(usize::MAX),
        }
    }

    /// The first `times` calls to `update_status` fail, later ones succeed.
    pub(super) fn updates_recover_after(inner: InMemoryEntityStore, times: usize) -> Self {
        Self {
            inner,
            failing_saves: false,
            failing_updates: AtomicUsize::new(times),
        }
    }
}

impl EntityStore for StatusWriteFailure {
    fn list_available(&self) -> Result<Vec<Adoptable>, StoreError> {
        self.inner.list_available()
    }

    fn get_adoptable(&self, id: &AdoptableId) -> Result<Option<Adoptable>, StoreError> {
        self.inner.get_adoptable(id)
    }

    fn insert_adoptable(&self, adoptable: Adoptable) -> Result<(), StoreError> {
        self.inner.insert_adoptable(adoptable)
    }

    fn mark_adopted(&self, id: &AdoptableId) -> Result<(), StoreError> {
        self.inner.mark_adopted(id)
    }

    fn get_requester(&self, id_number: &RequesterId) -> Result<Option<Requester>, StoreError> {
        self.inner.get_requester(id_number)
    }

    fn upsert_requester(&self, requester: Requester) -> Result<Requester, StoreError> {
        self.inner.upsert_requester(requester)
    }

    fn save_adoption_request(
        &self,
        tracking_id: &TrackingId,
        request: AdoptionRequest,
    ) -> Result<(), StoreError> {
        self.inner.save_adoption_request(tracking_id, request)
    }

    fn get_adoption_request(
        &self,
        tracking_id: &TrackingId,
    ) -> Result<Option<AdoptionRequest>, StoreError> {
        self.inner.get_adoption_request(tracking_id)
    }

    fn save_status(&self, status: AdoptionStatus) -> Result<(), StoreError> {
        if self.failing_saves {
            return Err(StoreError::Unavailable("status collection offline".to_string()));
        }
        self.inner.save_status(status)
    }

    fn update_status(
        &self,
        tracking_id: &TrackingId,
        status: AdoptionStage,
    ) -> Result<AdoptionStatus, StoreError> {
        let failing = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("status collection offline".to_string()));
        }
        self.inner.update_status(tracking_id, status)
    }

    fn get_status(&self, tracking_id: &TrackingId) -> Result<Option<AdoptionStatus>, StoreError> {
        self.inner.get_status(tracking_id)
    }

    fn save_job(&self, job: TransitionJob) -> Result<(), StoreError> {
        self.inner.save_job(job)
    }

    fn get_job(&self, tracking_id: &TrackingId) -> Result<Option<TransitionJob>, StoreError> {
        self.inner.get_job(tracking_id)
    }

    fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<TransitionJob>, StoreError> {
        self.inner.due_jobs(now)
    }

    fn pending_jobs(&self) -> Result<Vec<TransitionJob>, StoreError> {
        self.inner.pending_jobs()
    }

    fn set_job_state(
        &self,
        tracking_id: &TrackingId,
        from: JobState,
        to: JobState,
    ) -> Result<bool, StoreError> {
        self.inner.set_job_state(tracking_id, from, to)
    }
}

/// Store whose reads fail outright.
#[derive(Debug, Default)]
pub(super) struct UnavailableStore;

impl EntityStore for UnavailableStore {
    fn list_available(&self) -> Result<Vec<Adoptable>, StoreError> {
        Err(unavailable())
    }

    fn get_adoptable(&self, _id: &AdoptableId) -> Result<Option<Adoptable>, StoreError> {
        Err(unavailable())
    }

    fn insert_adoptable(&self, _adoptable: Adoptable) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn mark_adopted(&self, _id: &AdoptableId) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn get_requester(&self, _id_number: &RequesterId) -> Result<Option<Requester>, StoreError> {
        Err(unavailable())
    }

    fn upsert_requester(&self, _requester: Requester) -> Result<Requester, StoreError> {
        Err(unavailable())
    }

    fn save_adoption_request(
        &self,
        _tracking_id: &TrackingId,
        _request: AdoptionRequest,
    ) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn get_adoption_request(
        &self,
        _tracking_id: &TrackingId,
    ) -> Result<Option<AdoptionRequest>, StoreError> {
        Err(unavailable())
    }

    fn save_status(&self, _status: AdoptionStatus) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn update_status(
        &self,
        _tracking_id: &TrackingId,
        _status: AdoptionStage,
    ) -> Result<AdoptionStatus, StoreError> {
        Err(unavailable())
    }

    fn get_status(&self, _tracking_id: &TrackingId) -> Result<Option<AdoptionStatus>, StoreError> {
        Err(unavailable())
    }

    fn save_job(&self, _job: TransitionJob) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn get_job(&self, _tracking_id: &TrackingId) -> Result<Option<TransitionJob>, StoreError> {
        Err(unavailable())
    }

    fn due_jobs(&self, _now: DateTime<Utc>) -> Result<Vec<TransitionJob>, StoreError> {
        Err(unavailable())
    }

    fn pending_jobs(&self) -> Result<Vec<TransitionJob>, StoreError> {
        Err(unavailable())
    }

    fn set_job_state(
        &self,
        _tracking_id: &TrackingId,
        _from: JobState,
        _to: JobState,
    ) -> Result<bool, StoreError> {
        Err(unavailable())
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("document store offline".to_string())
}
