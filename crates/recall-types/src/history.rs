//! History entries, partitions, and write/read option types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Mode;

/// One of the three independent history tables a logical event can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Global,
    User,
    Machine,
}

impl Partition {
    /// Stable lowercase name used for the `source` tag on merged reads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Global => "global",
            Partition::User => "user",
            Partition::Machine => "machine",
        }
    }

    /// Table backing this partition.
    pub fn table(&self) -> &'static str {
        match self {
            Partition::Global => "history_global",
            Partition::User => "history_user",
            Partition::Machine => "history_machine",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved command/response pair, normalized across partitions.
///
/// Partition-specific columns (`tokens_used`, `execution_time_ms`, `tags`,
/// `context`, `error_code`) are `None` when the source partition does not
/// carry them. `source` is set on merged (hybrid) reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub command: String,
    /// Nullable until asynchronous completion fills it in.
    pub response: Option<String>,
    pub machine_id: Option<String>,
    pub user_id: Option<String>,
    /// Seconds since epoch.
    pub timestamp: i64,
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    /// Which partition this row came from, on cross-partition reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Partition>,
}

/// Metadata attached to a `save_command` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Overrides the client's process session id.
    pub session_id: Option<String>,
    pub tokens_used: Option<i64>,
    pub execution_time_ms: Option<i64>,
    /// Stored on the global partition as a JSON array.
    pub tags: Vec<String>,
    /// Stored on the user partition.
    pub context: Option<String>,
    /// Stored on the machine partition.
    pub error_code: Option<i64>,
    /// Suppresses the command-cache upsert for this save.
    pub skip_cache: bool,
}

/// Outcome of a successful `save_command`, enumerating what was written.
///
/// Hybrid mode writes up to three rows; each gets its own id. Partitions
/// share nothing beyond `session_id` and `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub written: Vec<(Partition, Uuid)>,
    pub session_id: String,
    pub timestamp: i64,
}

impl WriteReceipt {
    /// Row id written to the given partition, if any.
    pub fn id_for(&self, partition: Partition) -> Option<Uuid> {
        self.written
            .iter()
            .find(|(p, _)| *p == partition)
            .map(|(_, id)| *id)
    }
}

/// Options for `search_history`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Scope override; defaults to the client's current mode.
    pub mode: Option<Mode>,
    /// Maximum rows returned. No implicit bound beyond this.
    pub limit: Option<u32>,
}
