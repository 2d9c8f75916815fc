//! User directory row.

use serde::{Deserialize, Serialize};

/// A directory user.
///
/// Created out-of-band by the directory administration surface; the store
/// consumes users read-only via active-username lookup. An inactive user is
/// indistinguishable from a missing one to every lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Seconds since epoch.
    pub created_at: i64,
    /// Seconds since epoch.
    pub updated_at: i64,
    pub is_active: bool,
}
