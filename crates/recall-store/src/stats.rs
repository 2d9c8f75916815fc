//! Rolling-window statistics over the history partitions.

use libsql::{Connection, params};
use recall_types::{CommandFrequency, StatsReport};
use tracing::debug;

use crate::db::{self, now_secs};
use crate::{HistoryClient, Result};

async fn count(conn: &Connection, sql: &str, params: impl libsql::params::IntoParams) -> Result<i64> {
    let mut rows = conn.query(sql, params).await?;
    match rows.next().await? {
        Some(row) => Ok(db::integer(&row, 0)?),
        None => Ok(0),
    }
}

impl HistoryClient {
    /// Snapshot usage counts and the top-10 command list over the last
    /// `days` days. Every call re-scans the window; nothing is maintained
    /// incrementally.
    pub async fn get_stats(&self, days: u32) -> Result<StatsReport> {
        let conn = self.connection();
        let cutoff = now_secs() - i64::from(days) * 86_400;

        let global_commands = count(
            &conn,
            "SELECT COUNT(*) FROM history_global WHERE timestamp >= ?",
            params![cutoff],
        )
        .await?;

        let user_commands = match self.user_id() {
            Some(user_id) => Some(
                count(
                    &conn,
                    "SELECT COUNT(*) FROM history_user WHERE user_id = ? AND timestamp >= ?",
                    params![user_id, cutoff],
                )
                .await?,
            ),
            None => None,
        };

        let machine_commands = count(
            &conn,
            "SELECT COUNT(*) FROM history_machine WHERE machine_id = ? AND timestamp >= ?",
            params![self.machine_id(), cutoff],
        )
        .await?;

        // Activity can show up in either the shared or the scoped partition
        // depending on the writer's mode, so distinct counts union both.
        let active_machines = count(
            &conn,
            "SELECT COUNT(*) FROM (
                 SELECT machine_id FROM history_global
                     WHERE machine_id IS NOT NULL AND timestamp >= ?
                 UNION
                 SELECT machine_id FROM history_machine WHERE timestamp >= ?
             )",
            params![cutoff, cutoff],
        )
        .await?;

        let active_users = count(
            &conn,
            "SELECT COUNT(*) FROM (
                 SELECT user_id FROM history_global
                     WHERE user_id IS NOT NULL AND timestamp >= ?
                 UNION
                 SELECT user_id FROM history_user WHERE timestamp >= ?
             )",
            params![cutoff, cutoff],
        )
        .await?;

        let mut top_commands = Vec::new();
        let mut rows = conn
            .query(
                "SELECT command, COUNT(*) AS uses FROM history_global
                 WHERE timestamp >= ?
                 GROUP BY command ORDER BY uses DESC LIMIT 10",
                params![cutoff],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            top_commands.push(CommandFrequency {
                command: db::text(&row, 0)?,
                count: db::integer(&row, 1)?,
            });
        }

        debug!(target: "recall::stats", days, "stats computed");

        Ok(StatsReport {
            window_days: days,
            global_commands,
            user_commands,
            machine_commands,
            active_machines,
            active_users,
            top_commands,
        })
    }
}
