//! The history client: connection lifecycle, identity, and mode control.

use libsql::Connection;
use recall_types::{MachineInfo, Mode, SessionRecord, User};
use tracing::info;

use crate::db::{self, Database};
use crate::{directory, session, MachineIdentity, Result, StoreConfig, StoreError};

/// Client for the distributed command-history store.
///
/// Holds the one shared connection, the resolved machine identity, the
/// process session, and the mutable mode/user state. All state is
/// process-local; there is no parallel mutation path.
pub struct HistoryClient {
    db: Database,
    conn: Connection,
    config: StoreConfig,
    machine: MachineIdentity,
    mode: Mode,
    user_id: Option<String>,
    session_id: String,
}

impl HistoryClient {
    /// Open the store: validate config, connect, bootstrap the schema,
    /// register this machine, and open the process session.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let db = Database::connect(&config).await?;
        let conn = db.connection();

        let machine = MachineIdentity::resolve(config.data_dir.as_deref())?;
        machine.register(&conn).await?;

        let session_id = session::new_session_id();
        session::open_session(&conn, &session_id, &machine.machine_id).await?;

        info!(
            target: "recall::store",
            machine_id = %machine.machine_id,
            session_id = %session_id,
            mode = %config.mode,
            "history client initialized"
        );

        Ok(Self {
            mode: config.mode,
            db,
            conn,
            config,
            machine,
            user_id: None,
            session_id,
        })
    }

    /// Current operating mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Resolved user id, when a user is set.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Stable id of the machine this client runs on.
    pub fn machine_id(&self) -> &str {
        &self.machine.machine_id
    }

    /// Process session id attached to every write by default.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Handle to the underlying connection, for administration tooling.
    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }

    /// Switch the operating mode. The set is closed at compile time; no
    /// invalid value can reach the write/read dispatch.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// String surface for `set_mode`, used by config/CLI layers. Rejects
    /// anything outside the closed set and leaves the active mode unchanged.
    pub fn set_mode_name(&mut self, name: &str) -> Result<()> {
        let mode: Mode = name.parse().map_err(StoreError::InvalidMode)?;
        self.set_mode(mode);
        Ok(())
    }

    /// Resolve an active user and switch to user mode.
    ///
    /// Unknown or inactive usernames fail with `UserNotFound` and leave both
    /// mode and any previously resolved user untouched. `None` (or an empty
    /// username) clears the user and resets the mode to global.
    pub async fn set_user(&mut self, username: Option<&str>) -> Result<Option<User>> {
        let username = match username {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                self.user_id = None;
                self.mode = Mode::Global;
                return Ok(None);
            }
        };

        match directory::find_active_user(&self.conn, username).await? {
            Some(user) => {
                self.user_id = Some(user.id.clone());
                self.mode = Mode::User;
                info!(target: "recall::store", username = %username, "user resolved");
                Ok(Some(user))
            }
            None => Err(StoreError::UserNotFound(username.to_string())),
        }
    }

    /// Create a directory user (administration surface).
    pub async fn create_user(
        &self,
        username: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User> {
        directory::create_user(&self.conn, username, name, email).await
    }

    /// Deactivate a directory user (administration surface).
    pub async fn deactivate_user(&self, username: &str) -> Result<bool> {
        directory::deactivate_user(&self.conn, username).await
    }

    /// Read back this machine's registration row.
    pub async fn machine_info(&self) -> Result<MachineInfo> {
        let mut rows = self
            .conn
            .query(
                "SELECT machine_id, hostname, ip_address, os_info, first_seen, last_seen, total_commands
                 FROM machines WHERE machine_id = ?",
                libsql::params![self.machine.machine_id.clone()],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::Decode("machine row missing after registration".into()))?;
        Ok(MachineInfo {
            machine_id: db::text(&row, 0)?,
            hostname: db::text(&row, 1)?,
            ip_address: db::opt_text(&row, 2)?,
            os_info: db::text(&row, 3)?,
            first_seen: db::integer(&row, 4)?,
            last_seen: db::integer(&row, 5)?,
            total_commands: db::integer(&row, 6)?,
        })
    }

    /// Read back the process session row, including its command count.
    pub async fn session_info(&self) -> Result<SessionRecord> {
        session::get_session(&self.conn, &self.session_id)
            .await?
            .ok_or_else(|| StoreError::Decode("session row missing after open".into()))
    }

    /// Push replica writes to the remote, when in replica mode.
    pub async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    /// Close the session and release the connection. Consuming `self` makes
    /// use-after-close unrepresentable.
    pub async fn close(self) -> Result<()> {
        session::close_session(&self.conn, &self.session_id).await?;
        info!(target: "recall::store", session_id = %self.session_id, "history client closed");
        Ok(())
    }
}
