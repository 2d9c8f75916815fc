//! Write path: partition routing, hybrid fan-out, counters, cache upkeep.

use futures::FutureExt;
use futures::future::BoxFuture;
use libsql::{Connection, params};
use recall_types::{Mode, Partition, SaveOptions, WriteReceipt};
use tracing::{debug, error};
use uuid::Uuid;

use crate::db::now_secs;
use crate::{HistoryClient, Result, StoreError};

/// One logical event, owned so per-partition insert futures can run
/// concurrently.
#[derive(Debug, Clone)]
struct EventRow {
    command: String,
    response: Option<String>,
    machine_id: String,
    user_id: Option<String>,
    timestamp: i64,
    session_id: String,
    tokens_used: Option<i64>,
    execution_time_ms: Option<i64>,
    tags: Option<String>,
    context: Option<String>,
    error_code: Option<i64>,
}

/// How a concurrent fan-out went.
enum FanoutError<E> {
    /// Nothing committed; the first underlying error.
    AllFailed(E),
    /// Some partitions committed, some failed. The committed rows stay: there
    /// is no cross-table transaction to roll them back.
    Partial {
        written: Vec<(Partition, Uuid)>,
        failed: Vec<(Partition, String)>,
    },
}

/// Split per-partition outcomes into a receipt or a fan-out error.
fn classify<E: std::fmt::Display>(
    results: Vec<(Partition, Uuid, std::result::Result<u64, E>)>,
) -> std::result::Result<Vec<(Partition, Uuid)>, FanoutError<E>> {
    let mut written = Vec::new();
    let mut failed = Vec::new();
    let mut first_error = None;
    for (partition, id, result) in results {
        match result {
            Ok(_) => written.push((partition, id)),
            Err(e) => {
                failed.push((partition, e.to_string()));
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match (written.is_empty(), first_error) {
        (_, None) => Ok(written),
        (true, Some(e)) => Err(FanoutError::AllFailed(e)),
        (false, Some(_)) => Err(FanoutError::Partial { written, failed }),
    }
}

async fn insert_partition(
    conn: Connection,
    partition: Partition,
    id: Uuid,
    row: EventRow,
) -> std::result::Result<u64, libsql::Error> {
    let id = id.to_string();
    match partition {
        Partition::Global => {
            conn.execute(
                "INSERT INTO history_global
                     (id, command, response, machine_id, user_id, timestamp, session_id,
                      tokens_used, execution_time_ms, tags)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    row.command,
                    row.response,
                    row.machine_id,
                    row.user_id,
                    row.timestamp,
                    row.session_id,
                    row.tokens_used,
                    row.execution_time_ms,
                    row.tags
                ],
            )
            .await
        }
        Partition::User => {
            conn.execute(
                "INSERT INTO history_user
                     (id, command, response, machine_id, user_id, timestamp, session_id,
                      context, tokens_used)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    row.command,
                    row.response,
                    row.machine_id,
                    row.user_id,
                    row.timestamp,
                    row.session_id,
                    row.context,
                    row.tokens_used
                ],
            )
            .await
        }
        Partition::Machine => {
            conn.execute(
                "INSERT INTO history_machine
                     (id, command, response, machine_id, user_id, timestamp, session_id,
                      error_code)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    row.command,
                    row.response,
                    row.machine_id,
                    row.user_id,
                    row.timestamp,
                    row.session_id,
                    row.error_code
                ],
            )
            .await
        }
    }
}

impl HistoryClient {
    /// Save a command/response pair, routed by the current mode.
    ///
    /// Hybrid mode fans out concurrently to global + machine (+ user when one
    /// is resolved) with no cross-table transaction: a partition that
    /// committed before a sibling failed stays committed, and the error
    /// enumerates both sides so operators can reconcile.
    ///
    /// On success the machine's `total_commands` and the session's
    /// `command_count` each advance exactly once, then the command cache is
    /// upserted unless `opts.skip_cache`.
    pub async fn save_command(
        &self,
        command: &str,
        response: Option<&str>,
        opts: SaveOptions,
    ) -> Result<WriteReceipt> {
        let row = EventRow {
            command: command.to_string(),
            response: response.map(str::to_string),
            machine_id: self.machine_id().to_string(),
            user_id: self.user_id().map(str::to_string),
            timestamp: now_secs(),
            session_id: opts
                .session_id
                .clone()
                .unwrap_or_else(|| self.session_id().to_string()),
            tokens_used: opts.tokens_used,
            execution_time_ms: opts.execution_time_ms,
            tags: if opts.tags.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&opts.tags)?)
            },
            context: opts.context.clone(),
            error_code: opts.error_code,
        };

        let targets: Vec<Partition> = match self.mode() {
            Mode::Global => vec![Partition::Global],
            Mode::User => {
                if row.user_id.is_none() {
                    return Err(StoreError::ModeRequiresUser);
                }
                vec![Partition::User]
            }
            Mode::Machine => vec![Partition::Machine],
            Mode::Hybrid => {
                let mut targets = vec![Partition::Global, Partition::Machine];
                if row.user_id.is_some() {
                    targets.push(Partition::User);
                }
                targets
            }
        };

        let futures: Vec<BoxFuture<'_, (Partition, Uuid, std::result::Result<u64, libsql::Error>)>> =
            targets
                .into_iter()
                .map(|partition| {
                    let conn = self.connection();
                    let row = row.clone();
                    let id = Uuid::new_v4();
                    async move { (partition, id, insert_partition(conn, partition, id, row).await) }
                        .boxed()
                })
                .collect();

        let results = futures::future::join_all(futures).await;
        let written = match classify(results) {
            Ok(written) => written,
            Err(FanoutError::AllFailed(e)) => return Err(StoreError::Database(e)),
            Err(FanoutError::Partial { written, failed }) => {
                let err = StoreError::PartialWrite {
                    written: written.iter().map(|(p, _)| *p).collect(),
                    failed,
                };
                // Logged distinctly from a clean failure: the partitions have
                // diverged and need reconciliation.
                error!(target: "recall::write", error = %err, "hybrid fan-out diverged");
                return Err(err);
            }
        };

        let conn = self.connection();
        conn.execute(
            "UPDATE machines SET total_commands = total_commands + 1, last_seen = ?
             WHERE machine_id = ?",
            params![row.timestamp, row.machine_id.clone()],
        )
        .await?;
        conn.execute(
            "UPDATE sessions SET command_count = command_count + 1 WHERE id = ?",
            params![self.session_id()],
        )
        .await?;

        if !opts.skip_cache {
            self.update_command_cache(command, response, opts.execution_time_ms.unwrap_or(0))
                .await?;
        }

        debug!(
            target: "recall::write",
            mode = %self.mode(),
            partitions = written.len(),
            "command saved"
        );

        Ok(WriteReceipt {
            written,
            session_id: row.session_id,
            timestamp: row.timestamp,
        })
    }

    /// Fill in the response of a previously saved entry (asynchronous
    /// completion). Returns whether a row was updated.
    pub async fn complete_command(
        &self,
        partition: Partition,
        id: Uuid,
        response: &str,
    ) -> Result<bool> {
        let sql = format!("UPDATE {} SET response = ? WHERE id = ?", partition.table());
        let changed = self
            .connection()
            .execute(&sql, params![response, id.to_string()])
            .await?;
        Ok(changed > 0)
    }
}
