//! Machine registration row.

use serde::{Deserialize, Serialize};

/// A machine known to the store.
///
/// `machine_id` is generated externally (identity collaborator) and stable
/// across restarts. `total_commands` increments exactly once per saved
/// command, independent of how many partitions that save touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub machine_id: String,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub os_info: String,
    /// Seconds since epoch.
    pub first_seen: i64,
    /// Seconds since epoch.
    pub last_seen: i64,
    pub total_commands: i64,
}
