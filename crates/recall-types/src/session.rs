//! Session lifetime row.

use serde::{Deserialize, Serialize};

/// One running client instance.
///
/// Opened at client initialization, closed exactly once at shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// `session-<epoch-secs>-<random>`, unique per process lifetime.
    pub id: String,
    pub machine_id: Option<String>,
    pub user_id: Option<String>,
    /// Seconds since epoch.
    pub started_at: i64,
    /// Seconds since epoch; `None` while the session is open.
    pub ended_at: Option<i64>,
    pub command_count: i64,
}
