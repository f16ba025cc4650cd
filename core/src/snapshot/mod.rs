use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod types;
pub use types::*;

/// Identifier attached to every captured entity in a snapshot: timeline
/// entities, sketch points, curves and profiles all carry one.
/// Wrapping Uuid keeps the id space strongly typed and leaves room for
/// extension (e.g. a generation counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a fresh random id. Used when naming profiles the engine
    /// produced on its own and no captured id exists for them.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an id that already exists in captured data.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Derive a stable id from a string seed. Handy for fixtures that need
    /// readable, repeatable ids.
    pub fn new_deterministic(seed: &str) -> Self {
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
        Self(uuid)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
