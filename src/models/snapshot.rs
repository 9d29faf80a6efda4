use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A feature model persisted in the model store.
///
/// Snapshots are immutable: re-scanning a codebase produces a new snapshot
/// rather than updating an old one, so builds can be compared over time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub id: Uuid,
    pub label: String,
    /// Where the scanned source tree came from, if known.
    pub source: Option<String>,
    pub node_count: usize,
    pub diagnostic_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Input for saving a new snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSnapshotInput {
    pub label: String,
    pub source: Option<String>,
}
