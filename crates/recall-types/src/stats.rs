//! Rolling-window usage statistics.

use serde::{Deserialize, Serialize};

/// How often one literal command text was saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandFrequency {
    pub command: String,
    pub count: i64,
}

/// Point-in-time snapshot over a rolling `window_days` window.
///
/// Every field is recomputed by a fresh scan on each call; nothing is
/// maintained incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub window_days: u32,
    pub global_commands: i64,
    /// Only present when a user is resolved on the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_commands: Option<i64>,
    /// Scoped to the current machine.
    pub machine_commands: i64,
    pub active_machines: i64,
    pub active_users: i64,
    /// Top 10 commands by frequency, descending.
    pub top_commands: Vec<CommandFrequency>,
}
