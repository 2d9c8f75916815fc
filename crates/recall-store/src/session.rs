//! Session lifetime bookkeeping.

use libsql::{Connection, params};
use recall_types::SessionRecord;
use tracing::debug;
use uuid::Uuid;

use crate::db::{self, now_secs};
use crate::Result;

/// Generate a process-lifetime session id: `session-<epoch-secs>-<random>`.
pub(crate) fn new_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session-{}-{}", now_secs(), &suffix[..8])
}

/// Open the session row at client initialization.
pub(crate) async fn open_session(
    conn: &Connection,
    session_id: &str,
    machine_id: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, machine_id, user_id, started_at, ended_at, command_count)
         VALUES (?, ?, NULL, ?, NULL, 0)",
        params![session_id, machine_id, now_secs()],
    )
    .await?;
    debug!(target: "recall::session", session_id = %session_id, "session opened");
    Ok(())
}

/// Mark the session ended. The `ended_at IS NULL` guard makes the close
/// idempotent at the storage layer: the timestamp is set exactly once.
pub(crate) async fn close_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET ended_at = ? WHERE id = ? AND ended_at IS NULL",
        params![now_secs(), session_id],
    )
    .await?;
    debug!(target: "recall::session", session_id = %session_id, "session closed");
    Ok(())
}

/// Read back a session row.
pub(crate) async fn get_session(
    conn: &Connection,
    session_id: &str,
) -> Result<Option<SessionRecord>> {
    let mut rows = conn
        .query(
            "SELECT id, machine_id, user_id, started_at, ended_at, command_count
             FROM sessions WHERE id = ?",
            params![session_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(SessionRecord {
            id: db::text(&row, 0)?,
            machine_id: db::opt_text(&row, 1)?,
            user_id: db::opt_text(&row, 2)?,
            started_at: db::integer(&row, 3)?,
            ended_at: db::opt_integer(&row, 4)?,
            command_count: db::integer(&row, 5)?,
        })),
        None => Ok(None),
    }
}
