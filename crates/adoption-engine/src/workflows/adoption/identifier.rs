use uuid::Uuid;

use super::domain::TrackingId;

/// Source of tracking identifiers for committed adoptions.
pub trait IdentifierGenerator: Send + Sync {
    fn next(&self) -> TrackingId;
}

/// Random v4 UUIDs; 122 random bits keep collisions negligible.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdentifierGenerator for UuidGenerator {
    fn next(&self) -> TrackingId {
        TrackingId(Uuid::new_v4().to_string())
    }
}
