//! Adoption request intake, acceptance, and status tracking.

pub mod domain;
pub mod identifier;
pub mod memory;
pub mod oracle;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Adoptable, AdoptableId, AdoptionRequest, AdoptionStage, AdoptionStatus, JobState,
    RejectionReason, Requester, RequesterId, SubmissionOutcome, SubmissionSummary, TrackingId,
    TransitionJob, TransitionKind,
};
pub use identifier::{IdentifierGenerator, UuidGenerator};
pub use memory::InMemoryEntityStore;
pub use oracle::{
    AcceptanceDecision, AcceptanceOracle, AcceptancePolicy, FixedDraw, RandomSource,
    ScriptedDraws, ThreadRandom,
};
pub use router::adoption_router;
pub use scheduler::{
    Clock, ManualClock, ScheduleError, SystemClock, TransitionScheduler, TransitionWorker,
};
pub use service::{AdoptionWorkflow, WorkflowError};
pub use store::{EntityStore, StoreError};
