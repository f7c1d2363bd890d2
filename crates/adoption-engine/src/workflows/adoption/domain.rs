use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog identifier of an adoptable entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdoptableId(pub String);

impl fmt::Display for AdoptableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity number of a requester (national id, passport, etc.).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(pub String);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle returned for a committed adoption and used to poll its status.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(pub String);

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A catalog entry that can be adopted at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adoptable {
    pub id: AdoptableId,
    pub name: String,
    #[serde(default, rename = "type")]
    pub types: BTreeSet<String>,
    #[serde(default)]
    pub abilities: BTreeSet<String>,
    #[serde(default)]
    pub adopted: bool,
    #[serde(default, alias = "photo")]
    pub photo_ref: String,
}

impl Adoptable {
    /// Convenience constructor for an available entry without traits or photo.
    pub fn available(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: AdoptableId(id.into()),
            name: name.into(),
            types: BTreeSet::new(),
            abilities: BTreeSet::new(),
            adopted: false,
            photo_ref: String::new(),
        }
    }
}

/// Submission payload from the client. Persisted verbatim once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionRequest {
    pub requester_name: String,
    pub requester_last_name: String,
    pub requester_id_number: RequesterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub description: String,
    pub adoptable_id: AdoptableId,
}

/// Two-state lifecycle of an accepted adoption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptionStage {
    Preparation,
    Success,
}

impl AdoptionStage {
    pub const fn label(self) -> &'static str {
        match self {
            AdoptionStage::Preparation => "preparation",
            AdoptionStage::Success => "success",
        }
    }

    /// Only forward moves are legal; repeating the current stage is tolerated.
    pub fn can_become(self, next: AdoptionStage) -> bool {
        next >= self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionStatus {
    pub tracking_id: TrackingId,
    pub requester_id_number: RequesterId,
    pub status: AdoptionStage,
}

impl AdoptionStatus {
    pub fn preparing(tracking_id: TrackingId, requester_id_number: RequesterId) -> Self {
        Self {
            tracking_id,
            requester_id_number,
            status: AdoptionStage::Preparation,
        }
    }
}

/// A party that has completed at least one adoption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub name: String,
    pub last_name: String,
    pub id_number: RequesterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub adopted_ids: BTreeSet<AdoptableId>,
}

impl Requester {
    pub fn from_request(request: &AdoptionRequest) -> Self {
        let mut adopted_ids = BTreeSet::new();
        adopted_ids.insert(request.adoptable_id.clone());
        Self {
            name: request.requester_name.clone(),
            last_name: request.requester_last_name.clone(),
            id_number: request.requester_id_number.clone(),
            address: request.address.clone(),
            adopted_ids,
        }
    }

    pub fn has_prior_adoptions(&self) -> bool {
        !self.adopted_ids.is_empty()
    }

    /// Set union of adopted ids; contact details are refreshed from `other` when present.
    pub fn merge(&mut self, other: Requester) {
        self.adopted_ids.extend(other.adopted_ids);
        if !other.name.is_empty() {
            self.name = other.name;
        }
        if !other.last_name.is_empty() {
            self.last_name = other.last_name;
        }
        if other.address.is_some() {
            self.address = other.address;
        }
    }
}

/// Work a transition job performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    CompletePreparation,
}

impl TransitionKind {
    pub const fn target_stage(self) -> AdoptionStage {
        match self {
            TransitionKind::CompletePreparation => AdoptionStage::Success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Fired,
    Cancelled,
    /// The transition can never apply, e.g. its status record is missing.
    Failed,
}

/// Persisted record of a deferred status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionJob {
    pub tracking_id: TrackingId,
    pub fire_at: DateTime<Utc>,
    pub kind: TransitionKind,
    pub state: JobState,
}

impl TransitionJob {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == JobState::Pending && self.fire_at <= now
    }
}

/// Why a submission did not result in an adoption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NotFound,
    AlreadyAdopted,
    Declined,
}

impl RejectionReason {
    pub const fn message(self) -> &'static str {
        match self {
            RejectionReason::NotFound => "The requested adoptable does not exist",
            RejectionReason::AlreadyAdopted => "The requested adoptable has already been adopted",
            RejectionReason::Declined => "Your application has been rejected",
        }
    }
}

/// Result of `submit_request` for business outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted {
        message: String,
        tracking_id: TrackingId,
    },
    Rejected {
        reason: RejectionReason,
        message: String,
    },
}

impl SubmissionOutcome {
    pub fn accepted(tracking_id: TrackingId) -> Self {
        Self::Accepted {
            message: format!("Adoption application accepted. Tracking ID: {tracking_id}"),
            tracking_id,
        }
    }

    pub fn rejected(reason: RejectionReason) -> Self {
        Self::Rejected {
            reason,
            message: reason.message().to_string(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }

    pub fn tracking_id(&self) -> Option<&TrackingId> {
        match self {
            SubmissionOutcome::Accepted { tracking_id, .. } => Some(tracking_id),
            SubmissionOutcome::Rejected { .. } => None,
        }
    }

    pub fn summary(&self) -> SubmissionSummary {
        match self {
            SubmissionOutcome::Accepted {
                message,
                tracking_id,
            } => SubmissionSummary {
                accepted: true,
                message: message.clone(),
                tracking_id: Some(tracking_id.clone()),
            },
            SubmissionOutcome::Rejected { message, .. } => SubmissionSummary {
                accepted: false,
                message: message.clone(),
                tracking_id: None,
            },
        }
    }
}

/// Client-facing shape of a submission result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub accepted: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<TrackingId>,
}
