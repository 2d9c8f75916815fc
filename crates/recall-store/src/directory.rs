//! User directory lookups and administration.
//!
//! The store proper consumes users read-only: an active-username lookup gated
//! on `is_active`. Creation and deactivation are the out-of-band
//! administration surface (exposed through the CLI), kept here so the
//! remediation path for `UserNotFound` has somewhere to point.

use libsql::{Connection, params};
use recall_types::User;
use tracing::info;
use uuid::Uuid;

use crate::db::{self, now_secs};
use crate::Result;

/// Look up an active user by username. Inactive behaves exactly like
/// missing.
pub async fn find_active_user(conn: &Connection, username: &str) -> Result<Option<User>> {
    let mut rows = conn
        .query(
            "SELECT id, username, name, email, created_at, updated_at, is_active
             FROM users WHERE username = ? AND is_active = 1",
            params![username],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_user(&row)?)),
        None => Ok(None),
    }
}

/// Create a user. Fails if the username is taken.
pub async fn create_user(
    conn: &Connection,
    username: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<User> {
    let now = now_secs();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        name: name.map(str::to_string),
        email: email.map(str::to_string),
        created_at: now,
        updated_at: now,
        is_active: true,
    };
    conn.execute(
        "INSERT INTO users (id, username, name, email, created_at, updated_at, is_active)
         VALUES (?, ?, ?, ?, ?, ?, 1)",
        params![
            user.id.clone(),
            user.username.clone(),
            user.name.clone(),
            user.email.clone(),
            now,
            now
        ],
    )
    .await?;
    info!(target: "recall::directory", username = %username, "user created");
    Ok(user)
}

/// Deactivate a user. Subsequent lookups treat them as not found.
pub async fn deactivate_user(conn: &Connection, username: &str) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE users SET is_active = 0, updated_at = ? WHERE username = ?",
            params![now_secs(), username],
        )
        .await?;
    if changed > 0 {
        info!(target: "recall::directory", username = %username, "user deactivated");
    }
    Ok(changed > 0)
}

fn row_to_user(row: &libsql::Row) -> Result<User> {
    Ok(User {
        id: db::text(row, 0)?,
        username: db::text(row, 1)?,
        name: db::opt_text(row, 2)?,
        email: db::opt_text(row, 3)?,
        created_at: db::integer(row, 4)?,
        updated_at: db::integer(row, 5)?,
        is_active: db::integer(row, 6)? != 0,
    })
}
