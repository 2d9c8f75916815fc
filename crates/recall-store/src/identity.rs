//! Machine identity: a stable per-host id plus host metadata.
//!
//! The id is generated once and persisted in the local data dir, so every
//! process on the host resolves the same machine. Registration upserts the
//! host row and bumps `last_seen`; it never resets `first_seen` or the
//! command counter.

use libsql::{Connection, params};
use std::net::UdpSocket;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::db::now_secs;
use crate::Result;

/// Resolved identity of the host this client runs on. Immutable for the
/// process lifetime.
#[derive(Debug, Clone)]
pub struct MachineIdentity {
    pub machine_id: String,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub os_info: String,
}

impl MachineIdentity {
    /// Resolve the host identity, creating and persisting a machine id on
    /// first contact.
    pub fn resolve(data_dir: Option<&Path>) -> Result<Self> {
        let dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("recall"),
        };
        let machine_id = load_or_create_machine_id(&dir)?;
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        let os_info = format!("{} {}", std::env::consts::OS, std::env::consts::ARCH);

        Ok(Self {
            machine_id,
            hostname,
            ip_address: local_ip(),
            os_info,
        })
    }

    /// Upsert this machine's row and bump `last_seen`.
    pub async fn register(&self, conn: &Connection) -> Result<()> {
        let now = now_secs();
        conn.execute(
            "INSERT INTO machines (machine_id, hostname, ip_address, os_info, first_seen, last_seen, total_commands)
             VALUES (?, ?, ?, ?, ?, ?, 0)
             ON CONFLICT(machine_id) DO UPDATE SET
                 hostname = excluded.hostname,
                 ip_address = excluded.ip_address,
                 os_info = excluded.os_info,
                 last_seen = excluded.last_seen",
            params![
                self.machine_id.clone(),
                self.hostname.clone(),
                self.ip_address.clone(),
                self.os_info.clone(),
                now,
                now
            ],
        )
        .await?;
        debug!(target: "recall::identity", machine_id = %self.machine_id, "machine registered");
        Ok(())
    }
}

fn load_or_create_machine_id(dir: &Path) -> Result<String> {
    let path = dir.join("machine-id");
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    std::fs::create_dir_all(dir)?;
    let id = Uuid::new_v4().to_string();
    std::fs::write(&path, &id)?;
    Ok(id)
}

/// Best-effort outbound address. No packets are sent; connect() on UDP only
/// selects a route.
fn local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}
