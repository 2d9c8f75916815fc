//! Command result-cache row.

use serde::{Deserialize, Serialize};

/// Cached output for one distinct command text on one machine.
///
/// `avg_execution_time_ms` is the weighted running mean over
/// `execution_count` observations, never just the latest sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCommand {
    /// SHA-256 hex of the literal command string.
    pub command_hash: String,
    pub command: String,
    pub output: Option<String>,
    pub machine_id: String,
    /// Seconds since epoch. Lookups older than the freshness window miss.
    pub last_executed: i64,
    pub execution_count: i64,
    pub avg_execution_time_ms: f64,
}
