use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Adoptable, AdoptableId, AdoptionRequest, AdoptionStage, AdoptionStatus, JobState, Requester,
    RequesterId, TrackingId, TransitionJob,
};
use super::store::{EntityStore, StoreError};

/// Process-local store with one lock per collection.
///
/// Cloning shares the underlying maps, which is how the service and the transition worker
/// observe the same records.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEntityStore {
    adoptables: Arc<Mutex<HashMap<AdoptableId, Adoptable>>>,
    requesters: Arc<Mutex<HashMap<RequesterId, Requester>>>,
    requests: Arc<Mutex<HashMap<TrackingId, AdoptionRequest>>>,
    statuses: Arc<Mutex<HashMap<TrackingId, AdoptionStatus>>>,
    jobs: Arc<Mutex<JobTable>>,
}

/// Job records plus an index of the pending ones ordered by fire time.
#[derive(Debug, Default)]
struct JobTable {
    records: HashMap<TrackingId, TransitionJob>,
    pending: BTreeSet<(DateTime<Utc>, TrackingId)>,
}

impl JobTable {
    fn resolve<'a>(
        &'a self,
        keys: impl Iterator<Item = &'a (DateTime<Utc>, TrackingId)> + 'a,
    ) -> impl Iterator<Item = TransitionJob> + 'a {
        keys.filter_map(|(_, tracking_id)| self.records.get(tracking_id).cloned())
    }
}

impl InMemoryEntityStore {
    pub fn with_adoptables(adoptables: impl IntoIterator<Item = Adoptable>) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.adoptables.lock() {
            guard.extend(
                adoptables
                    .into_iter()
                    .map(|adoptable| (adoptable.id.clone(), adoptable)),
            );
        }
        store
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn status_count(&self) -> usize {
        self.statuses.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn requester_count(&self) -> usize {
        self.requesters.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
}

impl EntityStore for InMemoryEntityStore {
    fn list_available(&self) -> Result<Vec<Adoptable>, StoreError> {
        let guard = lock(&self.adoptables)?;
        let mut available: Vec<Adoptable> = guard
            .values()
            .filter(|adoptable| !adoptable.adopted)
            .cloned()
            .collect();
        available.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(available)
    }

    fn get_adoptable(&self, id: &AdoptableId) -> Result<Option<Adoptable>, StoreError> {
        Ok(lock(&self.adoptables)?.get(id).cloned())
    }

    fn insert_adoptable(&self, mut adoptable: Adoptable) -> Result<(), StoreError> {
        let mut guard = lock(&self.adoptables)?;
        if let Some(existing) = guard.get(&adoptable.id) {
            adoptable.adopted |= existing.adopted;
        }
        guard.insert(adoptable.id.clone(), adoptable);
        Ok(())
    }

    fn mark_adopted(&self, id: &AdoptableId) -> Result<(), StoreError> {
        let mut guard = lock(&self.adoptables)?;
        let adoptable = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if adoptable.adopted {
            return Err(StoreError::Conflict);
        }
        adoptable.adopted = true;
        Ok(())
    }

    fn get_requester(&self, id_number: &RequesterId) -> Result<Option<Requester>, StoreError> {
        Ok(lock(&self.requesters)?.get(id_number).cloned())
    }

    fn upsert_requester(&self, requester: Requester) -> Result<Requester, StoreError> {
        let mut guard = lock(&self.requesters)?;
        let stored = match guard.get_mut(&requester.id_number) {
            Some(existing) => {
                existing.merge(requester);
                existing.clone()
            }
            None => {
                guard.insert(requester.id_number.clone(), requester.clone());
                requester
            }
        };
        Ok(stored)
    }

    fn save_adoption_request(
        &self,
        tracking_id: &TrackingId,
        request: AdoptionRequest,
    ) -> Result<(), StoreError> {
        let mut guard = lock(&self.requests)?;
        if guard.contains_key(tracking_id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(tracking_id.clone(), request);
        Ok(())
    }

    fn get_adoption_request(
        &self,
        tracking_id: &TrackingId,
    ) -> Result<Option<AdoptionRequest>, StoreError> {
        Ok(lock(&self.requests)?.get(tracking_id).cloned())
    }

    fn save_status(&self, status: AdoptionStatus) -> Result<(), StoreError> {
        let mut guard = lock(&self.statuses)?;
        if guard.contains_key(&status.tracking_id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(status.tracking_id.clone(), status);
        Ok(())
    }

    fn update_status(
        &self,
        tracking_id: &TrackingId,
        status: AdoptionStage,
    ) -> Result<AdoptionStatus, StoreError> {
        let mut guard = lock(&self.statuses)?;
        let record = guard.get_mut(tracking_id).ok_or(StoreError::NotFound)?;
        if !record.status.can_become(status) {
            return Err(StoreError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        Ok(record.clone())
    }

    fn get_status(&self, tracking_id: &TrackingId) -> Result<Option<AdoptionStatus>, StoreError> {
        Ok(lock(&self.statuses)?.get(tracking_id).cloned())
    }

    fn save_job(&self, job: TransitionJob) -> Result<(), StoreError> {
        let mut guard = lock(&self.jobs)?;
        if guard.records.contains_key(&job.tracking_id) {
            return Err(StoreError::Conflict);
        }
        if job.state == JobState::Pending {
            guard.pending.insert((job.fire_at, job.tracking_id.clone()));
        }
        guard.records.insert(job.tracking_id.clone(), job);
        Ok(())
    }

    fn get_job(&self, tracking_id: &TrackingId) -> Result<Option<TransitionJob>, StoreError> {
        Ok(lock(&self.jobs)?.records.get(tracking_id).cloned())
    }

    fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<TransitionJob>, StoreError> {
        let guard = lock(&self.jobs)?;
        let due = guard
            .resolve(guard.pending.iter().take_while(|(fire_at, _)| *fire_at <= now))
            .filter(|job| job.is_due(now))
            .collect();
        Ok(due)
    }

    fn pending_jobs(&self) -> Result<Vec<TransitionJob>, StoreError> {
        let guard = lock(&self.jobs)?;
        let pending = guard.resolve(guard.pending.iter()).collect();
        Ok(pending)
    }

    fn set_job_state(
        &self,
        tracking_id: &TrackingId,
        from: JobState,
        to: JobState,
    ) -> Result<bool, StoreError> {
        let mut guard = lock(&self.jobs)?;
        let table = &mut *guard;
        let job = table
            .records
            .get_mut(tracking_id)
            .ok_or(StoreError::NotFound)?;
        if job.state != from {
            return Ok(false);
        }
        let key = (job.fire_at, job.tracking_id.clone());
        job.state = to;
        if to == JobState::Pending {
            table.pending.insert(key);
        } else {
            table.pending.remove(&key);
        }
        Ok(true)
    }
}
