//! Deferred status transitions backed by persisted job records.
//!
//! Scheduling writes a [`TransitionJob`] to the store instead of arming an in-process timer, and
//! a [`TransitionWorker`] polls for due jobs. A worker started after a restart therefore picks up
//! every job that came due while the process was down.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::domain::{JobState, TrackingId, TransitionJob, TransitionKind};
use super::store::{EntityStore, StoreError};

/// Wall-clock source so due-ness can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("delay of {0:?} cannot be represented as a fire time")]
    DelayOutOfRange(Duration),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persists, inspects, cancels, and fires deferred transitions.
pub struct TransitionScheduler<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> TransitionScheduler<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Records a pending job due `delay` from now. Returns without waiting.
    pub fn schedule(
        &self,
        tracking_id: &TrackingId,
        kind: TransitionKind,
        delay: Duration,
    ) -> Result<TransitionJob, ScheduleError> {
        let fire_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delta| self.clock.now().checked_add_signed(delta))
            .ok_or(ScheduleError::DelayOutOfRange(delay))?;

        let job = TransitionJob {
            tracking_id: tracking_id.clone(),
            fire_at,
            kind,
            state: JobState::Pending,
        };
        self.store.save_job(job.clone())?;

        debug!(tracking_id = %tracking_id, %fire_at, ?kind, "transition scheduled");
        Ok(job)
    }

    /// Cancels a pending job. `false` when it already fired or was cancelled.
    pub fn cancel(&self, tracking_id: &TrackingId) -> Result<bool, StoreError> {
        let cancelled =
            self.store
                .set_job_state(tracking_id, JobState::Pending, JobState::Cancelled)?;
        if cancelled {
            info!(tracking_id = %tracking_id, "transition cancelled");
        }
        Ok(cancelled)
    }

    pub fn pending(&self) -> Result<Vec<TransitionJob>, StoreError> {
        self.store.pending_jobs()
    }

    pub fn job(&self, tracking_id: &TrackingId) -> Result<Option<TransitionJob>, StoreError> {
        self.store.get_job(tracking_id)
    }

    /// Fires every job due at `now`, returning how many status transitions were applied.
    ///
    /// The status is written before the job leaves `pending`, so a job interrupted between the
    /// two steps is replayed; `update_status` accepts `success -> success`. Transient store
    /// failures leave the job pending for the next poll. Transitions that can never apply move
    /// the job to `failed`.
    pub fn run_due(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut applied = 0;

        for job in self.store.due_jobs(now)? {
            let target = job.kind.target_stage();
            match self.store.update_status(&job.tracking_id, target) {
                Ok(status) => {
                    if self.settle(&job.tracking_id, JobState::Fired) {
                        applied += 1;
                        info!(
                            tracking_id = %status.tracking_id,
                            status = status.status.label(),
                            "adoption status advanced"
                        );
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(
                        tracking_id = %job.tracking_id,
                        error = %err,
                        "deferred transition failed, retrying on next poll"
                    );
                }
                Err(err) => {
                    warn!(
                        tracking_id = %job.tracking_id,
                        error = %err,
                        "deferred transition cannot be applied"
                    );
                    self.settle(&job.tracking_id, JobState::Failed);
                }
            }
        }

        Ok(applied)
    }

    /// Moves a pending job to `to`; `false` when another worker settled it first.
    fn settle(&self, tracking_id: &TrackingId, to: JobState) -> bool {
        match self.store.set_job_state(tracking_id, JobState::Pending, to) {
            Ok(settled) => settled,
            Err(err) => {
                warn!(tracking_id = %tracking_id, error = %err, "job state not recorded");
                false
            }
        }
    }
}

/// Background loop that drains due transitions on a fixed poll interval.
pub struct TransitionWorker<S> {
    scheduler: Arc<TransitionScheduler<S>>,
    poll_interval: Duration,
}

impl<S> TransitionWorker<S>
where
    S: EntityStore + 'static,
{
    pub fn new(scheduler: Arc<TransitionScheduler<S>>, poll_interval: Duration) -> Self {
        Self {
            scheduler,
            poll_interval,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        match self.scheduler.pending() {
            Ok(pending) => info!(pending = pending.len(), "transition worker started"),
            Err(err) => warn!(error = %err, "transition worker started without job inventory"),
        }

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = self.scheduler.now();
                    match self.scheduler.run_due(now) {
                        Ok(0) => {}
                        Ok(applied) => debug!(applied, "due transitions applied"),
                        Err(err) => warn!(error = %err, "could not load due transitions"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("transition worker shutting down");
                    break;
                }
            }
        }
    }
}
