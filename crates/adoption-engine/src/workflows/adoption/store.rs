use chrono::{DateTime, Utc};

use super::domain::{
    Adoptable, AdoptableId, AdoptionRequest, AdoptionStage, AdoptionStatus, JobState, Requester,
    RequesterId, TrackingId, TransitionJob,
};

/// Storage abstraction for every record the adoption workflow touches.
///
/// Each call is atomic with respect to the record it addresses. Nothing spans records, so a
/// failure midway through an acceptance leaves earlier writes in place.
pub trait EntityStore: Send + Sync {
    fn list_available(&self) -> Result<Vec<Adoptable>, StoreError>;
    fn get_adoptable(&self, id: &AdoptableId) -> Result<Option<Adoptable>, StoreError>;
    fn insert_adoptable(&self, adoptable: Adoptable) -> Result<(), StoreError>;

    /// Flips `adopted` from `false` to `true` in a single conditional write.
    ///
    /// Returns [`StoreError::Conflict`] when the entry is already adopted so concurrent
    /// submitters cannot both commit the same adoptable.
    fn mark_adopted(&self, id: &AdoptableId) -> Result<(), StoreError>;

    fn get_requester(&self, id_number: &RequesterId) -> Result<Option<Requester>, StoreError>;
    /// Creates the requester or unions `adopted_ids` into the existing record.
    fn upsert_requester(&self, requester: Requester) -> Result<Requester, StoreError>;

    fn save_adoption_request(
        &self,
        tracking_id: &TrackingId,
        request: AdoptionRequest,
    ) -> Result<(), StoreError>;
    fn get_adoption_request(
        &self,
        tracking_id: &TrackingId,
    ) -> Result<Option<AdoptionRequest>, StoreError>;

    fn save_status(&self, status: AdoptionStatus) -> Result<(), StoreError>;
    fn update_status(
        &self,
        tracking_id: &TrackingId,
        status: AdoptionStage,
    ) -> Result<AdoptionStatus, StoreError>;
    fn get_status(&self, tracking_id: &TrackingId) -> Result<Option<AdoptionStatus>, StoreError>;

    fn save_job(&self, job: TransitionJob) -> Result<(), StoreError>;
    fn get_job(&self, tracking_id: &TrackingId) -> Result<Option<TransitionJob>, StoreError>;
    fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<TransitionJob>, StoreError>;
    fn pending_jobs(&self) -> Result<Vec<TransitionJob>, StoreError>;
    /// Compare-and-set on the job state. `Ok(false)` means the job was not in `from`.
    fn set_job_state(
        &self,
        tracking_id: &TrackingId,
        from: JobState,
        to: JobState,
    ) -> Result<bool, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("status cannot move from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: AdoptionStage,
        to: AdoptionStage,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether the same write may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
