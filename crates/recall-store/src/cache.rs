//! Command result cache with running-average execution times.
//!
//! Keyed by a SHA-256 content hash of the literal command text, scoped per
//! machine. The upsert does its read-modify-write server-side in a single
//! statement, so concurrent upserts to the same key cannot lose samples.

use libsql::params;
use recall_types::CachedCommand;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::db::{self, now_secs};
use crate::{HistoryClient, Result};

/// Stable content hash of a command string.
pub(crate) fn command_hash(command: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(command.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A cache row is only served while younger than the freshness window.
pub(crate) fn is_fresh(last_executed: i64, now: i64, ttl_secs: u64) -> bool {
    now.saturating_sub(last_executed) < ttl_secs as i64
}

impl HistoryClient {
    /// Upsert the cache entry for a command.
    ///
    /// First sight inserts a fresh row; repeats replace the output, bump
    /// `execution_count`, and fold `execution_time_ms` into the weighted
    /// running mean `(old_avg * old_count + sample) / (old_count + 1)`.
    pub async fn update_command_cache(
        &self,
        command: &str,
        output: Option<&str>,
        execution_time_ms: i64,
    ) -> Result<()> {
        let hash = command_hash(command);
        self.connection()
            .execute(
                "INSERT INTO command_cache
                     (command_hash, machine_id, command, output, last_executed,
                      execution_count, avg_execution_time_ms)
                 VALUES (?, ?, ?, ?, ?, 1, ?)
                 ON CONFLICT(command_hash, machine_id) DO UPDATE SET
                     output = excluded.output,
                     last_executed = excluded.last_executed,
                     avg_execution_time_ms =
                         (command_cache.avg_execution_time_ms * command_cache.execution_count
                          + excluded.avg_execution_time_ms)
                         / (command_cache.execution_count + 1),
                     execution_count = command_cache.execution_count + 1",
                params![
                    hash,
                    self.machine_id(),
                    command,
                    output,
                    now_secs(),
                    execution_time_ms as f64
                ],
            )
            .await?;
        debug!(target: "recall::cache", command = %command, "cache upserted");
        Ok(())
    }

    /// Look up a cached result for a command.
    ///
    /// Entries older than the freshness window are a miss, not an error, and
    /// are left in place; the caller re-executes and resaves.
    pub async fn get_cached_command(&self, command: &str) -> Result<Option<CachedCommand>> {
        let hash = command_hash(command);
        let mut rows = self
            .connection()
            .query(
                "SELECT command_hash, command, output, machine_id, last_executed,
                        execution_count, avg_execution_time_ms
                 FROM command_cache WHERE command_hash = ? AND machine_id = ?",
                params![hash, self.machine_id()],
            )
            .await?;

        let row = match rows.next().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let entry = CachedCommand {
            command_hash: db::text(&row, 0)?,
            command: db::text(&row, 1)?,
            output: db::opt_text(&row, 2)?,
            machine_id: db::text(&row, 3)?,
            last_executed: db::integer(&row, 4)?,
            execution_count: db::integer(&row, 5)?,
            avg_execution_time_ms: db::real(&row, 6)?,
        };

        if !is_fresh(entry.last_executed, now_secs(), self.config().cache_ttl_secs) {
            debug!(target: "recall::cache", command = %command, "cache entry stale");
            return Ok(None);
        }
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_hash_is_stable_and_distinct() {
        assert_eq!(command_hash("ls -la"), command_hash("ls -la"));
        assert_ne!(command_hash("ls -la"), command_hash("ls -l"));
        assert_eq!(command_hash("").len(), 64);
    }

    #[test]
    fn test_freshness_window() {
        // Within the window.
        assert!(is_fresh(1000, 1500, 3600));
        // Exactly at the boundary counts as stale.
        assert!(!is_fresh(1000, 4600, 3600));
        // Zero-width window never serves.
        assert!(!is_fresh(1000, 1000, 0));
    }
}
