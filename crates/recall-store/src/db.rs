//! Connection handling and schema bootstrap.

use libsql::{Builder, Connection, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::is_remote_url;
use crate::{Result, StoreConfig, StoreError, schema};

/// An open history database.
///
/// Wraps the libSQL database handle in whichever of its three shapes the
/// config asked for: remote over URL + auth token, embedded replica syncing
/// against a remote, or plain local file.
pub struct Database {
    inner: libsql::Database,
    conn: Connection,
}

impl Database {
    /// Validate credentials, open the connection, probe liveness, and apply
    /// the idempotent schema. Safe to call on every process start.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let inner = match &config.sync_url {
            Some(sync_url) if is_remote_url(sync_url) => {
                let token = config.auth_token.clone().unwrap_or_default();
                let mut builder =
                    Builder::new_remote_replica(config.url.clone(), sync_url.clone(), token);
                if let Some(secs) = config.sync_interval_secs {
                    builder = builder.sync_interval(Duration::from_secs(secs));
                }
                let db = builder.build().await?;
                // A failed initial sync is tolerable: replica mode is for
                // offline operation, reads serve from the local copy.
                if let Err(e) = db.sync().await {
                    warn!(target: "recall::store", error = %e, "initial replica sync failed");
                }
                info!(target: "recall::store", url = %sync_url, "connected (embedded replica)");
                db
            }
            _ if config.is_remote() => {
                let token = config.auth_token.clone().unwrap_or_default();
                let db = Builder::new_remote(config.url.clone(), token).build().await?;
                info!(target: "recall::store", url = %config.url, "connected (remote)");
                db
            }
            _ => {
                if let Some(parent) = std::path::Path::new(&config.url).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let db = Builder::new_local(config.url.clone()).build().await?;
                debug!(target: "recall::store", path = %config.url, "connected (local)");
                db
            }
        };

        let conn = inner.connect()?;
        let db = Self { inner, conn };
        db.ping().await?;
        db.bootstrap().await?;
        Ok(db)
    }

    /// Trivial liveness probe.
    async fn ping(&self) -> Result<()> {
        self.conn.query("SELECT 1", ()).await?;
        Ok(())
    }

    /// Execute each schema statement independently so a partially applied
    /// earlier run cannot block reruns.
    async fn bootstrap(&self) -> Result<()> {
        for stmt in schema::statements() {
            self.conn.execute(stmt, ()).await?;
        }
        debug!(target: "recall::store", "schema bootstrap complete");
        Ok(())
    }

    /// Handle to the shared connection. Cheap to clone; safe for sequential
    /// reuse across many operations.
    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }

    /// Push local replica writes to the remote, if in replica mode.
    pub async fn sync(&self) -> Result<()> {
        self.inner.sync().await?;
        Ok(())
    }
}

// Row accessors. libsql hands back dynamically typed values; these keep the
// mapping code short and make NULL handling explicit.

pub(crate) fn text(row: &libsql::Row, idx: i32) -> Result<String> {
    match row.get_value(idx)? {
        Value::Text(s) => Ok(s),
        other => Err(type_error("TEXT", idx, &other)),
    }
}

pub(crate) fn opt_text(row: &libsql::Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(type_error("TEXT or NULL", idx, &other)),
    }
}

pub(crate) fn integer(row: &libsql::Row, idx: i32) -> Result<i64> {
    match row.get_value(idx)? {
        Value::Integer(n) => Ok(n),
        other => Err(type_error("INTEGER", idx, &other)),
    }
}

pub(crate) fn opt_integer(row: &libsql::Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(n) => Ok(Some(n)),
        other => Err(type_error("INTEGER or NULL", idx, &other)),
    }
}

pub(crate) fn real(row: &libsql::Row, idx: i32) -> Result<f64> {
    match row.get_value(idx)? {
        Value::Real(f) => Ok(f),
        Value::Integer(n) => Ok(n as f64),
        other => Err(type_error("REAL", idx, &other)),
    }
}

fn type_error(expected: &str, idx: i32, got: &Value) -> StoreError {
    StoreError::Decode(format!(
        "unexpected column type at index {}: expected {}, got {:?}",
        idx, expected, got
    ))
}

/// Current time as integer seconds since epoch.
pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
