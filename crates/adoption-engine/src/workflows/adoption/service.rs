use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::domain::{
    Adoptable, AdoptionRequest, AdoptionStatus, RejectionReason, Requester, SubmissionOutcome,
    TrackingId, TransitionKind,
};
use super::identifier::IdentifierGenerator;
use super::oracle::{AcceptanceOracle, RandomSource};
use super::scheduler::{ScheduleError, TransitionScheduler};
use super::store::{EntityStore, StoreError};

/// Orchestrates availability checks, the acceptance draw, the commit, and the deferred
/// `preparation -> success` transition.
pub struct AdoptionWorkflow<S, I, G> {
    store: Arc<S>,
    identifiers: I,
    oracle: AcceptanceOracle<G>,
    scheduler: Arc<TransitionScheduler<S>>,
    preparation_delay: Duration,
}

impl<S, I, G> AdoptionWorkflow<S, I, G>
where
    S: EntityStore + 'static,
    I: IdentifierGenerator,
    G: RandomSource,
{
    pub fn new(
        store: Arc<S>,
        identifiers: I,
        oracle: AcceptanceOracle<G>,
        scheduler: Arc<TransitionScheduler<S>>,
        preparation_delay: Duration,
    ) -> Self {
        Self {
            store,
            identifiers,
            oracle,
            scheduler,
            preparation_delay,
        }
    }

    pub fn scheduler(&self) -> &Arc<TransitionScheduler<S>> {
        &self.scheduler
    }

    pub fn preparation_delay(&self) -> Duration {
        self.preparation_delay
    }

    pub fn list_available(&self) -> Result<Vec<Adoptable>, WorkflowError> {
        Ok(self.store.list_available()?)
    }

    /// Decide and, on acceptance, commit an adoption request.
    ///
    /// Missing or already adopted targets and declined draws come back as
    /// [`SubmissionOutcome::Rejected`] without any writes. Only store failures are errors.
    pub fn submit_request(
        &self,
        request: AdoptionRequest,
    ) -> Result<SubmissionOutcome, WorkflowError> {
        let Some(adoptable) = self.store.get_adoptable(&request.adoptable_id)? else {
            info!(adoptable_id = %request.adoptable_id, "adoption target not found");
            return Ok(SubmissionOutcome::rejected(RejectionReason::NotFound));
        };
        if adoptable.adopted {
            info!(adoptable_id = %adoptable.id, "adoption target already adopted");
            return Ok(SubmissionOutcome::rejected(RejectionReason::AlreadyAdopted));
        }

        let requester = self.store.get_requester(&request.requester_id_number)?;
        let decision = self.oracle.decide(requester.as_ref());
        info!(
            adoptable_id = %adoptable.id,
            requester = %request.requester_id_number,
            probability = decision.probability,
            draw = decision.draw,
            accepted = decision.accepted,
            "acceptance decided"
        );
        if !decision.accepted {
            return Ok(SubmissionOutcome::rejected(RejectionReason::Declined));
        }

        let tracking_id = self.identifiers.next();

        match self.store.mark_adopted(&adoptable.id) {
            Ok(()) => {}
            Err(StoreError::Conflict) => {
                warn!(adoptable_id = %adoptable.id, "adoption lost a concurrent commit race");
                return Ok(SubmissionOutcome::rejected(RejectionReason::AlreadyAdopted));
            }
            Err(StoreError::NotFound) => {
                return Ok(SubmissionOutcome::rejected(RejectionReason::NotFound));
            }
            Err(err) => return Err(err.into()),
        }

        self.store
            .save_adoption_request(&tracking_id, request.clone())?;
        self.store.save_status(AdoptionStatus::preparing(
            tracking_id.clone(),
            request.requester_id_number.clone(),
        ))?;
        self.store
            .upsert_requester(Requester::from_request(&request))?;
        self.scheduler.schedule(
            &tracking_id,
            TransitionKind::CompletePreparation,
            self.preparation_delay,
        )?;

        info!(
            tracking_id = %tracking_id,
            adoptable_id = %adoptable.id,
            "adoption accepted"
        );
        Ok(SubmissionOutcome::accepted(tracking_id))
    }

    pub fn get_status(
        &self,
        tracking_id: &TrackingId,
    ) -> Result<Option<AdoptionStatus>, WorkflowError> {
        Ok(self.store.get_status(tracking_id)?)
    }

    /// Cancel a pending `preparation -> success` transition.
    pub fn cancel_transition(&self, tracking_id: &TrackingId) -> Result<bool, WorkflowError> {
        Ok(self.scheduler.cancel(tracking_id)?)
    }
}

/// Error raised by the adoption workflow. Business rejections are not errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("scheduling failure: {0}")]
    Scheduling(ScheduleError),
}

impl From<ScheduleError> for WorkflowError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::Store(err) => Self::Persistence(err),
            other => Self::Scheduling(other),
        }
    }
}
